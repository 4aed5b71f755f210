//! `--preview`: print a scheme as colored swatches.

use std::io::Write;

use crossterm::{
    queue,
    style::{Color as TermColor, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
};

use crate::color::Color;
use crate::scheme::ColorScheme;

const SLOT_NAMES: [&str; 8] = ["Blk", "Red", "Grn", "Yel", "Blu", "Mag", "Cyn", "Wht"];

fn to_term(c: Color) -> TermColor {
    TermColor::Rgb {
        r: c.r,
        g: c.g,
        b: c.b,
    }
}

/// Black or white, whichever reads better on `c`.
fn contrast_fg(c: Color) -> TermColor {
    if c.relative_luminance() > 0.4 {
        TermColor::Black
    } else {
        TermColor::White
    }
}

fn swatch_row<W: Write>(out: &mut W, label: &str, colors: &[Color]) -> std::io::Result<()> {
    queue!(out, Print(format!("  {label:<7}")))?;
    for (i, c) in colors.iter().enumerate() {
        queue!(
            out,
            SetBackgroundColor(to_term(*c)),
            SetForegroundColor(contrast_fg(*c)),
            Print(format!("{:^6}", SLOT_NAMES[i % SLOT_NAMES.len()])),
            ResetColor,
            Print(" "),
        )?;
    }
    queue!(out, Print("\n"))
}

/// Write the 16 ANSI colors in two rows, then the special colors with their
/// hex values.
pub fn print_preview<W: Write>(out: &mut W, scheme: &ColorScheme) -> std::io::Result<()> {
    let colors = scheme.colors();
    queue!(out, Print("\n"))?;
    swatch_row(out, "Normal", &colors[..8])?;
    swatch_row(out, "Bright", &colors[8..])?;
    queue!(out, Print("\n"))?;

    let specials = [
        ("background", scheme.background()),
        ("foreground", scheme.foreground()),
        ("cursor", scheme.cursor()),
    ];
    for (name, c) in specials {
        queue!(
            out,
            Print(format!("  {name:<11}")),
            SetBackgroundColor(to_term(c)),
            Print("      "),
            ResetColor,
            Print(format!(" {c}\n")),
        )?;
    }
    queue!(
        out,
        SetBackgroundColor(to_term(scheme.background())),
        SetForegroundColor(to_term(scheme.foreground())),
        Print("  The quick brown fox jumps over the lazy dog  "),
        ResetColor,
        Print("\n\n"),
    )?;
    out.flush()
}
