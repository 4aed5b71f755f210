use super::Template;

/// Templates shipped in the binary, keyed by output file name.
const BUILTINS: &[(&str, &str)] = &[
    ("colors", include_str!("../../templates/colors")),
    ("colors.sh", include_str!("../../templates/colors.sh")),
    ("colors.Xresources", include_str!("../../templates/colors.Xresources")),
    ("colors.css", include_str!("../../templates/colors.css")),
    ("colors.scss", include_str!("../../templates/colors.scss")),
    ("colors.yml", include_str!("../../templates/colors.yml")),
    ("colors.toml", include_str!("../../templates/colors.toml")),
    ("colors-kitty.conf", include_str!("../../templates/colors-kitty.conf")),
    (
        "colors-alacritty.toml",
        include_str!("../../templates/colors-alacritty.toml"),
    ),
    ("colors-ghostty", include_str!("../../templates/colors-ghostty")),
    ("colors-zellij.kdl", include_str!("../../templates/colors-zellij.kdl")),
    (
        "colors-rofi-dark.rasi",
        include_str!("../../templates/colors-rofi-dark.rasi"),
    ),
    ("colors-waybar.css", include_str!("../../templates/colors-waybar.css")),
];

pub fn builtin_templates() -> Vec<Template> {
    BUILTINS
        .iter()
        .map(|(target, source)| Template::new(*target, *source))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_are_unique() {
        let mut targets: Vec<&str> = BUILTINS.iter().map(|(t, _)| *t).collect();
        targets.sort_unstable();
        targets.dedup();
        assert_eq!(targets.len(), BUILTINS.len());
    }

    #[test]
    fn every_builtin_mentions_the_background() {
        for (target, source) in BUILTINS {
            assert!(
                source.contains("{background") || source.contains("{color0"),
                "{target} never uses the background"
            );
        }
    }
}
