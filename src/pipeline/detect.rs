use crate::cli::ThemeMode;
use crate::color::Color;

/// CIELAB lightness below which an image counts as dark.
const DARK_THRESHOLD: f32 = 50.0;

/// Detect whether the image is predominantly dark or light.
///
/// Uses the mean CIELAB lightness of all pixels. Empty input is dark.
pub fn detect_mode(pixels: &[Color]) -> ThemeMode {
    if pixels.is_empty() {
        return ThemeMode::Dark;
    }
    let total: f64 = pixels.iter().map(|p| f64::from(p.to_lab().l)).sum();
    let mean = total / pixels.len() as f64;
    if mean < f64::from(DARK_THRESHOLD) {
        ThemeMode::Dark
    } else {
        ThemeMode::Light
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn black_image_is_dark() {
        assert_eq!(detect_mode(&[Color::BLACK; 64]), ThemeMode::Dark);
    }

    #[test]
    fn white_image_is_light() {
        assert_eq!(detect_mode(&[Color::WHITE; 64]), ThemeMode::Light);
    }

    #[test]
    fn mostly_dark_image_is_dark() {
        let mut pixels = vec![Color::new(20, 20, 30); 90];
        pixels.extend(vec![Color::WHITE; 10]);
        assert_eq!(detect_mode(&pixels), ThemeMode::Dark);
    }

    #[test]
    fn empty_defaults_to_dark() {
        assert_eq!(detect_mode(&[]), ThemeMode::Dark);
    }
}
