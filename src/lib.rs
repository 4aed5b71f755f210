//! Generate a 16-color terminal scheme from an image, render it through
//! templates for other programs and tell running programs to reload.

pub mod cache;
pub mod cli;
pub mod color;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod preview;
pub mod reload;
pub mod render;
pub mod run;
pub mod scheme;
pub mod storage;
pub mod template;
pub mod themes;
pub mod wallpaper;
