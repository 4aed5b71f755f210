//! Template parsing and placeholder substitution.
//!
//! Templates use the placeholder syntax of wal templates:
//! `{color4}`, `{background.strip}`, `{color1.lighten(20).rgb}`, with `{{`
//! and `}}` for literal braces.

mod builtin;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::color::Color;
use crate::error::TemplateError;
use crate::scheme::{ColorScheme, Slot};

pub use builtin::builtin_templates;

/// Where a template came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateOrigin {
    Builtin,
    User(PathBuf),
}

/// A target-specific text pattern. `target` doubles as the output file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    target: String,
    source: String,
    origin: TemplateOrigin,
}

impl Template {
    pub fn new(target: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            source: source.into(),
            origin: TemplateOrigin::Builtin,
        }
    }

    /// Read a user template; the file name becomes the target.
    pub fn from_file(path: &Path) -> Result<Self, TemplateError> {
        let target = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let source = std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
            template: target.clone(),
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            target,
            source,
            origin: TemplateOrigin::User(path.to_path_buf()),
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn origin(&self) -> &TemplateOrigin {
        &self.origin
    }

    /// Substitute every placeholder. Any unknown placeholder fails the whole
    /// template; all of them are listed in the error.
    pub fn render(&self, scheme: &ColorScheme) -> Result<String, TemplateError> {
        let pieces = parse(&self.source).map_err(|(offset, message)| TemplateError::Syntax {
            template: self.target.clone(),
            offset,
            message,
        })?;

        let mut out = String::with_capacity(self.source.len());
        let mut unresolved = Vec::new();
        for piece in pieces {
            match piece {
                Piece::Text(text) => out.push_str(text),
                Piece::Placeholder(raw) => match resolve(raw, scheme) {
                    Some(value) => out.push_str(&value),
                    None => unresolved.push(raw.to_string()),
                },
            }
        }

        if unresolved.is_empty() {
            Ok(out)
        } else {
            Err(TemplateError::Unresolved {
                template: self.target.clone(),
                placeholders: unresolved,
            })
        }
    }
}

/// Built-in templates overlaid with the user's `templates/` directory.
///
/// A user file replaces the built-in of the same name. Unreadable user files
/// are returned as errors next to the usable templates.
pub fn load_templates(user_dir: Option<&Path>) -> (Vec<Template>, Vec<TemplateError>) {
    let mut by_target: BTreeMap<String, Template> = builtin_templates()
        .into_iter()
        .map(|t| (t.target.clone(), t))
        .collect();
    let mut errors = Vec::new();

    if let Some(dir) = user_dir {
        match std::fs::read_dir(dir) {
            Ok(entries) => {
                let mut paths: Vec<PathBuf> = entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.path())
                    .filter(|p| p.is_file())
                    .filter(|p| {
                        !p.file_name()
                            .map(|n| n.to_string_lossy().starts_with('.'))
                            .unwrap_or(true)
                    })
                    .collect();
                paths.sort();
                for path in paths {
                    match Template::from_file(&path) {
                        Ok(template) => {
                            if by_target.contains_key(&template.target) {
                                debug!(
                                    template = %template.target,
                                    "user template overrides built-in"
                                );
                            }
                            by_target.insert(template.target.clone(), template);
                        }
                        Err(err) => {
                            warn!("{err}");
                            errors.push(err);
                        }
                    }
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(dir = %dir.display(), "no user templates");
            }
            Err(source) => errors.push(TemplateError::Io {
                template: "templates/".to_string(),
                path: dir.to_path_buf(),
                source,
            }),
        }
    }

    (by_target.into_values().collect(), errors)
}

#[derive(Debug, PartialEq, Eq)]
enum Piece<'a> {
    Text(&'a str),
    Placeholder(&'a str),
}

/// Split a template into literal text and placeholder bodies.
/// Errors carry the byte offset of the offending brace.
fn parse(source: &str) -> Result<Vec<Piece<'_>>, (usize, &'static str)> {
    let bytes = source.as_bytes();
    let mut pieces = Vec::new();
    let mut text_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' if bytes.get(i + 1) == Some(&b'{') => {
                pieces.push(Piece::Text(&source[text_start..=i]));
                i += 2;
                text_start = i;
            }
            b'{' => {
                let close = source[i + 1..]
                    .find('}')
                    .map(|rel| i + 1 + rel)
                    .ok_or((i, "unterminated placeholder"))?;
                if text_start < i {
                    pieces.push(Piece::Text(&source[text_start..i]));
                }
                pieces.push(Piece::Placeholder(source[i + 1..close].trim()));
                i = close + 1;
                text_start = i;
            }
            b'}' if bytes.get(i + 1) == Some(&b'}') => {
                pieces.push(Piece::Text(&source[text_start..=i]));
                i += 2;
                text_start = i;
            }
            b'}' => return Err((i, "single '}' outside a placeholder")),
            _ => i += 1,
        }
    }
    if text_start < bytes.len() {
        pieces.push(Piece::Text(&source[text_start..]));
    }
    Ok(pieces)
}

/// Resolve one placeholder body, `None` when anything in it is unknown.
fn resolve(raw: &str, scheme: &ColorScheme) -> Option<String> {
    let segments = split_segments(raw)?;
    let (head, chain) = segments.split_first()?;

    match *head {
        "wallpaper" if chain.is_empty() => {
            return Some(scheme.wallpaper().unwrap_or("None").to_string())
        }
        "alpha" if chain.is_empty() => return Some(scheme.alpha().to_string()),
        _ => {}
    }

    let mut color = scheme.slot(head.parse::<Slot>().ok()?);
    for (i, segment) in chain.iter().enumerate() {
        if let Some((name, arg)) = parse_call(segment) {
            color = apply_function(color, name, arg, scheme)?;
            continue;
        }
        // Formatters end the chain.
        if i + 1 != chain.len() {
            return None;
        }
        return format_color(color, segment, scheme.alpha());
    }
    Some(color.to_hex())
}

/// Split on dots outside parentheses.
fn split_segments(raw: &str) -> Option<Vec<&str>> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, ch) in raw.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.checked_sub(1)?,
            '.' if depth == 0 => {
                segments.push(&raw[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return None;
    }
    segments.push(&raw[start..]);
    if segments.iter().any(|s| s.is_empty()) {
        return None;
    }
    Some(segments)
}

/// `lighten(20)` -> `("lighten", "20")`.
fn parse_call(segment: &str) -> Option<(&str, &str)> {
    let open = segment.find('(')?;
    let inner = segment[open + 1..].strip_suffix(')')?;
    Some((&segment[..open], inner.trim()))
}

fn parse_percent(arg: &str) -> Option<f32> {
    let value: f32 = arg.trim_end_matches('%').trim().parse().ok()?;
    (0.0..=100.0).contains(&value).then_some(value / 100.0)
}

fn apply_function(color: Color, name: &str, arg: &str, scheme: &ColorScheme) -> Option<Color> {
    match name {
        "lighten" => Some(color.lighten(parse_percent(arg)?)),
        "darken" => Some(color.darken(parse_percent(arg)?)),
        "saturate" => Some(color.with_saturation(parse_percent(arg)?)),
        "blend" => Some(color.blend(scheme.slot(arg.parse::<Slot>().ok()?))),
        _ => None,
    }
}

fn format_color(color: Color, format: &str, alpha: u8) -> Option<String> {
    let value = match format {
        "hex" => color.to_hex(),
        "strip" => color.to_hex()[1..].to_string(),
        "rgb" => color.to_rgb_triplet(),
        "rgba" => format!("rgba({},{})", color.to_rgb_triplet(), alpha_decimal(alpha)),
        "xrgba" => color.to_xrgba(),
        "alpha" => format!("[{alpha}]{color}"),
        "red" => format!("{:.3}", f32::from(color.r) / 255.0),
        "green" => format!("{:.3}", f32::from(color.g) / 255.0),
        "blue" => format!("{:.3}", f32::from(color.b) / 255.0),
        "decimal" => format!("#{}", color.to_u32()),
        "decimal_strip" => color.to_u32().to_string(),
        "octal" => format!("#{:o}", color.to_u32()),
        "octal_strip" => format!("{:o}", color.to_u32()),
        _ => return None,
    };
    Some(value)
}

/// Alpha percent as a decimal the way the wal templates print it (`1.0`, `0.9`).
fn alpha_decimal(alpha: u8) -> String {
    let value = f64::from(alpha) / 100.0;
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheme::PALETTE_LEN;

    fn scheme() -> ColorScheme {
        let mut colors = [Color::BLACK; PALETTE_LEN];
        colors[1] = Color::new(0xcc, 0x24, 0x1d);
        colors[3] = Color::new(0xd7, 0x99, 0x21);
        colors[7] = Color::new(0xeb, 0xdb, 0xb2);
        ColorScheme::new(
            colors,
            Color::new(0x28, 0x28, 0x28),
            colors[7],
            colors[7],
        )
        .with_wallpaper("/walls/forest.png")
        .with_alpha(90)
    }

    fn render(source: &str) -> Result<String, TemplateError> {
        Template::new("test", source).render(&scheme())
    }

    #[test]
    fn substitutes_slots() {
        assert_eq!(
            render("bg={background} fg={foreground} c1={color1}").unwrap(),
            "bg=#282828 fg=#ebdbb2 c1=#cc241d"
        );
    }

    #[test]
    fn doubled_braces_are_literal() {
        assert_eq!(
            render(":root {{ --bg: {background}; }}").unwrap(),
            ":root { --bg: #282828; }"
        );
    }

    #[test]
    fn formatters() {
        let cases = [
            ("{color1.strip}", "cc241d"),
            ("{color1.rgb}", "204,36,29"),
            ("{color1.rgba}", "rgba(204,36,29,0.9)"),
            ("{color1.xrgba}", "cc/24/1d/ff"),
            ("{background.alpha}", "[90]#282828"),
            ("{color1.red}", "0.800"),
            ("{color0.decimal}", "#0"),
            ("{color1.decimal_strip}", "13378589"),
            ("{color1.octal_strip}", "63022035"),
            ("{color1.hex}", "#cc241d"),
        ];
        for (source, expected) in cases {
            assert_eq!(render(source).unwrap(), expected, "{source}");
        }
    }

    #[test]
    fn metadata_placeholders() {
        assert_eq!(
            render("{wallpaper} {alpha}").unwrap(),
            "/walls/forest.png 90"
        );
    }

    #[test]
    fn color_functions_chain() {
        assert_eq!(render("{color0.lighten(50)}").unwrap(), "#7f7f7f");
        assert_eq!(render("{color7.darken(100).strip}").unwrap(), "000000");
        assert_eq!(render("{color0.blend(color7)}").unwrap(), "#756d59");
    }

    #[test]
    fn unknown_placeholders_are_all_reported() {
        let err = render("{color1} {color16} {accent} {color2.shout}").unwrap_err();
        match err {
            TemplateError::Unresolved {
                template,
                placeholders,
            } => {
                assert_eq!(template, "test");
                assert_eq!(placeholders, vec!["color16", "accent", "color2.shout"]);
            }
            other => panic!("expected Unresolved, got {other:?}"),
        }
    }

    #[test]
    fn formatter_must_be_last() {
        assert!(render("{color1.strip.rgb}").is_err());
        assert!(render("{color1.lighten(200)}").is_err());
        assert!(render("{color1.blend(nothing)}").is_err());
        assert!(render("{wallpaper.strip}").is_err());
    }

    #[test]
    fn syntax_errors_carry_offset() {
        match render("abc {color1").unwrap_err() {
            TemplateError::Syntax { offset, .. } => assert_eq!(offset, 4),
            other => panic!("expected Syntax, got {other:?}"),
        }
        assert!(matches!(
            render("a } b").unwrap_err(),
            TemplateError::Syntax { offset: 2, .. }
        ));
    }

    #[test]
    fn rendering_is_idempotent() {
        let template = Template::new("t", "{color1} {{x}} {background.rgba}\n");
        let s = scheme();
        assert_eq!(template.render(&s).unwrap(), template.render(&s).unwrap());
    }

    #[test]
    fn parse_keeps_text_between_placeholders() {
        assert_eq!(
            parse("a{b}c").unwrap(),
            vec![Piece::Text("a"), Piece::Placeholder("b"), Piece::Text("c")]
        );
    }

    #[test]
    fn every_builtin_renders() {
        for template in builtin_templates() {
            let rendered = template.render(&scheme());
            assert!(rendered.is_ok(), "{}: {:?}", template.target(), rendered.err());
        }
    }

    #[test]
    fn user_templates_override_builtins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("colors.sh"), "custom {color0}\n").unwrap();
        std::fs::write(dir.path().join("my-app.conf"), "x={color1}\n").unwrap();
        std::fs::write(dir.path().join(".hidden"), "ignored").unwrap();

        let (templates, errors) = load_templates(Some(dir.path()));
        assert!(errors.is_empty());

        let sh = templates.iter().find(|t| t.target() == "colors.sh").unwrap();
        assert_eq!(sh.source(), "custom {color0}\n");
        assert!(matches!(sh.origin(), TemplateOrigin::User(_)));
        assert!(templates.iter().any(|t| t.target() == "my-app.conf"));
        assert!(!templates.iter().any(|t| t.target() == ".hidden"));
        assert_eq!(templates.len(), builtin_templates().len() + 1);
    }

    #[test]
    fn missing_user_dir_is_fine() {
        let (templates, errors) = load_templates(Some(Path::new("/nonexistent/templates")));
        assert!(errors.is_empty());
        assert_eq!(templates.len(), builtin_templates().len());
    }
}
