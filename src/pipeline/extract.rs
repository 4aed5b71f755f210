use std::collections::HashMap;
use std::path::Path;

use image::imageops::FilterType;
use kmeans_colors::get_kmeans_hamerly;
use palette::Lab;
use tracing::debug;

use crate::color::Color;
use crate::error::{DecodeError, ExtractionError};
use crate::scheme::Palette;

/// A color extracted from the image with its cluster weight.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedColor {
    pub color: Color,
    pub weight: f32,
}

/// Result of palette extraction: exactly `k` colors, most dominant first.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub colors: Vec<ExtractedColor>,
    /// Set when the image had fewer than `k` distinct colors and the palette
    /// was padded.
    pub degenerate: Option<ExtractionError>,
    palette: Palette,
}

impl Extraction {
    /// The 16-entry palette the scheme builder works on.
    pub fn palette(&self) -> &Palette {
        &self.palette
    }
}

pub const DEFAULT_COLORS: usize = 16;
/// Cluster indices are stored as `u8` by the K-means implementation.
pub const MAX_COLORS: usize = 255;

const MAX_DIM: u32 = 256;
const MAX_ITER: usize = 20;
const CONVERGE: f32 = 5.0;
const SEED: u64 = 42;
const DEDUP_THRESHOLD: f32 = 25.0; // ΔE² < 25 means ΔE < 5

/// Load an image, resize to fit within 256x256 (preserving aspect ratio)
/// and return its pixels in row-major order.
pub fn load_and_prepare(path: &Path) -> Result<Vec<Color>, DecodeError> {
    let img = image::open(path).map_err(|source| {
        if !path.exists() {
            DecodeError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            DecodeError::Unsupported {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let img = if img.width() > MAX_DIM || img.height() > MAX_DIM {
        img.resize(MAX_DIM, MAX_DIM, FilterType::Lanczos3)
    } else {
        img
    };
    let rgb_img = img.to_rgb8();

    let pixels: Vec<Color> = rgb_img
        .pixels()
        .map(|p| Color::new(p[0], p[1], p[2]))
        .collect();

    if pixels.is_empty() {
        return Err(DecodeError::Empty {
            path: path.to_path_buf(),
        });
    }
    debug!(path = %path.display(), pixels = pixels.len(), "image loaded");
    Ok(pixels)
}

/// A candidate palette entry before padding.
#[derive(Debug, Clone, Copy)]
struct Cluster {
    color: Color,
    count: usize,
    /// Index of the first pixel that fell into this cluster.
    first_seen: usize,
}

/// Extract `k` representative colors ordered by descending pixel population.
///
/// Images with at most `k` distinct colors use the exact histogram; others
/// run K-means (Hamerly, K-means++ init, fixed seed) in CIELAB. Equal
/// populations keep first-seen order. Short results are padded with the most
/// dominant color and flagged as degenerate.
pub fn extract_palette(pixels: &[Color], k: usize) -> Result<Extraction, ExtractionError> {
    if k == 0 || k > MAX_COLORS {
        return Err(ExtractionError::InvalidCount {
            requested: k,
            max: MAX_COLORS,
        });
    }
    if pixels.is_empty() {
        return Err(ExtractionError::NoPixels);
    }

    let mut clusters = match exact_histogram(pixels, k) {
        Some(histogram) => histogram,
        None => cluster_kmeans(pixels, k),
    };
    rank(&mut clusters);

    let total = pixels.len() as f32;
    let mut colors: Vec<ExtractedColor> = clusters
        .iter()
        .map(|c| ExtractedColor {
            color: c.color,
            weight: c.count as f32 / total,
        })
        .collect();

    let distinct = colors.len();
    let degenerate = (distinct < k).then(|| {
        let dominant = colors[0].color;
        colors.resize(
            k,
            ExtractedColor {
                color: dominant,
                weight: 0.0,
            },
        );
        ExtractionError::Degenerate {
            distinct,
            requested: k,
        }
    });
    debug!(requested = k, distinct, "palette extracted");

    let ranked: Vec<Color> = colors.iter().map(|c| c.color).collect();
    let palette = Palette::from_ranked(&ranked).ok_or(ExtractionError::NoPixels)?;
    Ok(Extraction {
        colors,
        degenerate,
        palette,
    })
}

/// Exact color counts in first-seen order, or `None` once more than `k`
/// distinct colors show up.
fn exact_histogram(pixels: &[Color], k: usize) -> Option<Vec<Cluster>> {
    let mut index: HashMap<Color, usize> = HashMap::new();
    let mut clusters: Vec<Cluster> = Vec::new();
    for (i, &color) in pixels.iter().enumerate() {
        match index.get(&color) {
            Some(&slot) => clusters[slot].count += 1,
            None => {
                if clusters.len() == k {
                    return None;
                }
                index.insert(color, clusters.len());
                clusters.push(Cluster {
                    color,
                    count: 1,
                    first_seen: i,
                });
            }
        }
    }
    Some(clusters)
}

fn cluster_kmeans(pixels: &[Color], k: usize) -> Vec<Cluster> {
    let lab: Vec<Lab> = pixels.iter().map(|c| c.to_lab()).collect();
    let result = get_kmeans_hamerly(k, MAX_ITER, CONVERGE, false, &lab, SEED);

    let mut counts = vec![0usize; result.centroids.len()];
    let mut first_seen = vec![usize::MAX; result.centroids.len()];
    for (i, &idx) in result.indices.iter().enumerate() {
        let idx = idx as usize;
        counts[idx] += 1;
        first_seen[idx] = first_seen[idx].min(i);
    }

    let mut clusters: Vec<Cluster> = result
        .centroids
        .iter()
        .enumerate()
        .filter(|(i, _)| counts[*i] > 0)
        .map(|(i, lab)| Cluster {
            color: Color::from_lab(*lab),
            count: counts[i],
            first_seen: first_seen[i],
        })
        .collect();

    rank(&mut clusters);
    deduplicate(&mut clusters);
    clusters
}

/// Descending population, ties by first-seen pixel.
fn rank(clusters: &mut [Cluster]) {
    clusters.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.first_seen.cmp(&b.first_seen))
    });
}

/// Merge clusters that are too similar (ΔE < 5 in LAB space) into the more
/// dominant one. Expects ranked input.
fn deduplicate(clusters: &mut Vec<Cluster>) {
    let mut i = 0;
    while i < clusters.len() {
        let lab_i = clusters[i].color.to_lab();
        let mut j = i + 1;
        while j < clusters.len() {
            let lab_j = clusters[j].color.to_lab();
            let delta_e_sq = (lab_i.l - lab_j.l).powi(2)
                + (lab_i.a - lab_j.a).powi(2)
                + (lab_i.b - lab_j.b).powi(2);
            if delta_e_sq < DEDUP_THRESHOLD {
                clusters[i].count += clusters[j].count;
                clusters[i].first_seen = clusters[i].first_seen.min(clusters[j].first_seen);
                clusters.remove(j);
            } else {
                j += 1;
            }
        }
        i += 1;
    }
}
