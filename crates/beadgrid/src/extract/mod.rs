//! Dominant-color extraction for occupied cells.
//!
//! Samples are collected from an annulus around the cell center (the bead
//! body, avoiding the center hole and the board background), clustered with
//! seeded K-means in linear RGB, and the center of the largest cluster is
//! taken as the bead color.

mod kmeans;

use image::RgbaImage;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::color::{linear_to_srgb, srgb_to_linear, Rgb8};

/// Color extraction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Annulus inner radius as a fraction of the cell radius.
    pub ring_inner_frac: f64,
    /// Annulus outer radius as a fraction of the cell radius.
    pub ring_outer_frac: f64,
    /// Number of clusters.
    pub k: usize,
    /// Maximum Lloyd iterations per run.
    pub max_iters: usize,
    /// Convergence epsilon on center movement.
    pub epsilon: f64,
    /// Independent seedings per K-means invocation (best inertia wins).
    pub restarts: usize,
    /// Whole-K-means repetitions (largest dominant cluster wins).
    pub repeats: usize,
    /// Base RNG seed; the per-cell seed is derived from it and the cell
    /// index so recognition results are reproducible.
    pub seed: u64,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            ring_inner_frac: 0.4,
            ring_outer_frac: 0.95,
            k: 3,
            max_iters: 50,
            epsilon: 1e-3,
            restarts: 3,
            repeats: 5,
            seed: 0x6265_6164,
        }
    }
}

/// Extraction outcome for one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractedColor {
    /// Dominant sRGB color.
    pub rgb: Rgb8,
    /// False when extraction degraded to the neutral-gray fallback.
    pub ok: bool,
}

/// Neutral fallback emitted when no samples can be clustered.
pub const FALLBACK_GRAY: Rgb8 = Rgb8 {
    r: 128,
    g: 128,
    b: 128,
};

/// Extract the dominant color of the cell centered at `(cx, cy)` with
/// radius `r` (half the pitch).
///
/// `cell_index` seeds the RNG so repeated runs of the same recognition are
/// bitwise identical.
pub fn dominant_cell_color(
    image: &RgbaImage,
    cx: f64,
    cy: f64,
    r: f64,
    config: &ExtractConfig,
    cell_index: u64,
) -> ExtractedColor {
    let mut samples = ring_samples(image, cx, cy, r, config);
    if samples.is_empty() {
        // Borderline cell: fall back to the full bounding square.
        samples = square_samples(image, cx, cy, r);
    }
    if samples.is_empty() {
        return ExtractedColor {
            rgb: FALLBACK_GRAY,
            ok: false,
        };
    }

    let mut best: Option<(usize, kmeans::KmeansRun)> = None;
    for repeat in 0..config.repeats.max(1) {
        let seed = config
            .seed
            .wrapping_add(cell_index.wrapping_mul(0x9E37_79B9_7F4A_7C15))
            .wrapping_add(repeat as u64);
        let mut rng = StdRng::seed_from_u64(seed);
        let Some(run) = kmeans::kmeans(
            &samples,
            config.k,
            config.max_iters,
            config.epsilon,
            config.restarts,
            &mut rng,
        ) else {
            continue;
        };
        let largest = run.sizes[run.largest_cluster()];
        match &best {
            Some((best_size, _)) if *best_size >= largest => {}
            _ => best = Some((largest, run)),
        }
    }

    let Some((_, run)) = best else {
        return ExtractedColor {
            rgb: FALLBACK_GRAY,
            ok: false,
        };
    };
    let center = run.centers[run.largest_cluster()];
    ExtractedColor {
        rgb: Rgb8::new(
            linear_to_srgb(center[0]),
            linear_to_srgb(center[1]),
            linear_to_srgb(center[2]),
        ),
        ok: true,
    }
}

/// Linear-RGB samples from the annulus around `(cx, cy)`.
fn ring_samples(
    image: &RgbaImage,
    cx: f64,
    cy: f64,
    r: f64,
    config: &ExtractConfig,
) -> Vec<[f64; 3]> {
    let (w, h) = image.dimensions();
    let inner = config.ring_inner_frac * r;
    let outer = config.ring_outer_frac * r;
    let scan = outer.ceil() as i64;
    let (cxi, cyi) = (cx.round() as i64, cy.round() as i64);

    let mut samples = Vec::new();
    for dy in -scan..=scan {
        for dx in -scan..=scan {
            let px = cxi + dx;
            let py = cyi + dy;
            if px < 0 || py < 0 || px >= w as i64 || py >= h as i64 {
                continue;
            }
            let d = (((px as f64 - cx).powi(2)) + ((py as f64 - cy).powi(2))).sqrt();
            if d < inner || d > outer {
                continue;
            }
            samples.push(linear_pixel(image, px as u32, py as u32));
        }
    }
    samples
}

/// Linear-RGB samples from the bounding square, clipped to the image.
fn square_samples(image: &RgbaImage, cx: f64, cy: f64, r: f64) -> Vec<[f64; 3]> {
    let (w, h) = image.dimensions();
    let x0 = ((cx - r).floor() as i64).max(0);
    let y0 = ((cy - r).floor() as i64).max(0);
    let x1 = ((cx + r).ceil() as i64).min(w as i64 - 1);
    let y1 = ((cy + r).ceil() as i64).min(h as i64 - 1);

    let mut samples = Vec::new();
    for py in y0..=y1 {
        for px in x0..=x1 {
            if px < 0 || py < 0 {
                continue;
            }
            samples.push(linear_pixel(image, px as u32, py as u32));
        }
    }
    samples
}

fn linear_pixel(image: &RgbaImage, x: u32, y: u32) -> [f64; 3] {
    let p = image.get_pixel(x, y);
    [
        srgb_to_linear(p[0]),
        srgb_to_linear(p[1]),
        srgb_to_linear(p[2]),
    ]
}
