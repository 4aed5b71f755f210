use crate::cli::ThemeMode;
use crate::color::Color;
use crate::scheme::{ColorScheme, Palette, PALETTE_LEN};

/// Oklch lightness added to color0..color7 to get their bright variants.
pub const BRIGHT_STEP: f32 = 0.12;

/// Slots left alone by saturation changes: background, foreground and their
/// bright variants.
const NEUTRAL_SLOTS: [usize; 4] = [0, 7, 8, 15];

/// Map a 16-color palette onto the scheme slots.
///
/// Entries are ranked by WCAG relative luminance (stable, so ties keep
/// palette order). Dark mode takes the darkest entry as background and the
/// lightest as foreground; light mode swaps them. color1..color6 are the six
/// most dominant remaining entries, color8..color15 are color0..color7
/// lightened by [`BRIGHT_STEP`], and the cursor follows the foreground.
pub fn build_scheme(palette: &Palette, mode: ThemeMode) -> ColorScheme {
    let colors = palette.colors();

    let mut by_luminance: Vec<usize> = (0..PALETTE_LEN).collect();
    by_luminance.sort_by(|&a, &b| {
        colors[a]
            .relative_luminance()
            .total_cmp(&colors[b].relative_luminance())
    });
    let darkest = by_luminance[0];
    let lightest = by_luminance[PALETTE_LEN - 1];
    let (bg_idx, fg_idx) = match mode {
        ThemeMode::Dark => (darkest, lightest),
        ThemeMode::Light => (lightest, darkest),
    };
    let background = colors[bg_idx];
    let foreground = colors[fg_idx];

    let mut slots = [background; PALETTE_LEN];
    let accents = (0..PALETTE_LEN)
        .filter(|&i| i != bg_idx && i != fg_idx)
        .map(|i| colors[i])
        .take(6);
    for (slot, color) in slots[1..7].iter_mut().zip(accents) {
        *slot = color;
    }
    slots[7] = foreground;
    for i in 0..8 {
        slots[i + 8] = slots[i].adjust_lightness(BRIGHT_STEP);
    }

    ColorScheme::new(slots, background, foreground, foreground)
}

/// Set the HSL saturation of every accent slot to `amount` (0-1).
pub fn saturate_accents(scheme: ColorScheme, amount: f32) -> ColorScheme {
    let accents: Vec<usize> = (0..PALETTE_LEN)
        .filter(|i| !NEUTRAL_SLOTS.contains(i))
        .collect();
    scheme.map_ansi(&accents, |c: Color| c.with_saturation(amount))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_tone() -> Palette {
        let mut colors = [Color::BLACK; PALETTE_LEN];
        colors[1] = Color::WHITE;
        Palette::new(colors)
    }

    fn rainbow() -> Palette {
        Palette::new([
            Color::new(40, 44, 52),
            Color::new(224, 108, 117),
            Color::new(152, 195, 121),
            Color::new(229, 192, 123),
            Color::new(97, 175, 239),
            Color::new(198, 120, 221),
            Color::new(86, 182, 194),
            Color::new(171, 178, 191),
            Color::new(20, 20, 20),
            Color::new(240, 240, 240),
            Color::new(120, 60, 30),
            Color::new(30, 60, 120),
            Color::new(60, 120, 30),
            Color::new(200, 200, 40),
            Color::new(100, 100, 100),
            Color::new(150, 20, 80),
        ])
    }

    #[test]
    fn dark_mode_uses_darkest_background() {
        let scheme = build_scheme(&two_tone(), ThemeMode::Dark);
        assert_eq!(scheme.background(), Color::BLACK);
        assert_eq!(scheme.foreground(), Color::WHITE);
        assert_eq!(scheme.colors()[0], Color::BLACK);
        assert_eq!(scheme.colors()[7], Color::WHITE);
    }

    #[test]
    fn light_mode_inverts() {
        let scheme = build_scheme(&two_tone(), ThemeMode::Light);
        assert_eq!(scheme.background(), Color::WHITE);
        assert_eq!(scheme.foreground(), Color::BLACK);
    }

    #[test]
    fn cursor_follows_foreground() {
        for mode in [ThemeMode::Dark, ThemeMode::Light] {
            let scheme = build_scheme(&rainbow(), mode);
            assert_eq!(scheme.cursor(), scheme.foreground());
        }
    }

    #[test]
    fn extremes_come_from_luminance() {
        let scheme = build_scheme(&rainbow(), ThemeMode::Dark);
        assert_eq!(scheme.background(), Color::new(20, 20, 20));
        assert_eq!(scheme.foreground(), Color::new(240, 240, 240));
    }

    #[test]
    fn accents_keep_dominance_order() {
        let scheme = build_scheme(&rainbow(), ThemeMode::Dark);
        let accents = &scheme.colors()[1..7];
        assert_eq!(accents, &rainbow().colors()[0..6]);
    }

    #[test]
    fn bright_variants_are_not_darker() {
        let scheme = build_scheme(&rainbow(), ThemeMode::Dark);
        for i in 0..8 {
            let normal = scheme.colors()[i].relative_luminance();
            let bright = scheme.colors()[i + 8].relative_luminance();
            assert!(
                bright >= normal,
                "color{} ({normal}) brighter than color{} ({bright})",
                i,
                i + 8
            );
        }
    }

    #[test]
    fn building_is_deterministic() {
        let a = build_scheme(&rainbow(), ThemeMode::Light);
        let b = build_scheme(&rainbow(), ThemeMode::Light);
        assert_eq!(a, b);
        assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
    }

    #[test]
    fn saturation_skips_neutral_slots() {
        let scheme = build_scheme(&rainbow(), ThemeMode::Dark);
        let grayed = saturate_accents(scheme.clone(), 0.0);
        for i in NEUTRAL_SLOTS {
            assert_eq!(grayed.colors()[i], scheme.colors()[i]);
        }
        let c1 = grayed.colors()[1];
        assert_eq!((c1.r, c1.g), (c1.g, c1.b));
    }
}
