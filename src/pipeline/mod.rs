//! Image -> palette -> scheme.

pub mod assign;
pub mod detect;
pub mod extract;
