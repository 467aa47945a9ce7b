//! Projection-autocorrelation fallback for grid recovery.
//!
//! When the candidate cloud is too sparse, the lattice period is still
//! visible as periodicity in the mean-subtracted row/column projections of
//! the grayscale image. The pitch is read off the projection
//! autocorrelation; the origin is found by an exhaustive phase scan.

use image::GrayImage;

use crate::detector::candidates::ring_center_contrast;
use crate::detector::config::DetectorConfig;
use crate::detector::GridModel;

/// Per-axis pitch estimates found by the fallback, for diagnostics.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ProjectionPitches {
    pub pitch_x: Option<usize>,
    pub pitch_y: Option<usize>,
}

/// Estimate a grid model from projection autocorrelation.
pub(crate) fn estimate_from_projections(
    gray: &GrayImage,
    config: &DetectorConfig,
) -> (Option<GridModel>, ProjectionPitches) {
    let (w, h) = gray.dimensions();
    let [min_lag, max_lag] = config.projection_pitch_range;

    let col_proj = column_projection(gray);
    let row_proj = row_projection(gray);
    let pitch_x = projection_pitch(&col_proj, min_lag, max_lag);
    let pitch_y = projection_pitch(&row_proj, min_lag, max_lag);
    let pitches = ProjectionPitches { pitch_x, pitch_y };

    let (Some(px), Some(py)) = (pitch_x, pitch_y) else {
        return (None, pitches);
    };
    let (px, py) = (px as f64, py as f64);

    // Phase scan: the offset inducing the strongest absolute ring
    // contrast over its cells is the origin.
    let origin = best_phase(gray, px, py);

    let rows = ((h as f64 - origin[1]) / py).floor() as usize;
    let cols = ((w as f64 - origin[0]) / px).floor() as usize;
    if rows == 0 || cols == 0 {
        return (None, pitches);
    }

    let model = GridModel::clamped(px, py, origin[0], origin[1], rows, cols, 0.5, [w, h]);
    (model, pitches)
}

fn column_projection(gray: &GrayImage) -> Vec<f64> {
    let (w, h) = gray.dimensions();
    let mut proj = vec![0.0f64; w as usize];
    for y in 0..h {
        for x in 0..w {
            proj[x as usize] += gray.get_pixel(x, y)[0] as f64;
        }
    }
    subtract_mean(&mut proj);
    proj
}

fn row_projection(gray: &GrayImage) -> Vec<f64> {
    let (w, h) = gray.dimensions();
    let mut proj = vec![0.0f64; h as usize];
    for y in 0..h {
        for x in 0..w {
            proj[y as usize] += gray.get_pixel(x, y)[0] as f64;
        }
    }
    subtract_mean(&mut proj);
    proj
}

fn subtract_mean(values: &mut [f64]) {
    if values.is_empty() {
        return;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    for v in values.iter_mut() {
        *v -= mean;
    }
}

/// Pitch from the projection autocorrelation: the first local maximum with
/// lag inside `[min_lag, max_lag]` and value above 10% of the zero-lag
/// energy; failing that, the first local maximum after the first trough.
fn projection_pitch(proj: &[f64], min_lag: usize, max_lag: usize) -> Option<usize> {
    let max_scan = (2 * max_lag).min(proj.len().saturating_sub(1));
    if max_scan < 2 {
        return None;
    }

    let mut ac = vec![0.0f64; max_scan + 1];
    for (lag, slot) in ac.iter_mut().enumerate() {
        let mut sum = 0.0;
        for i in 0..proj.len() - lag {
            sum += proj[i] * proj[i + lag];
        }
        *slot = sum;
    }
    if ac[0] <= 0.0 {
        return None;
    }

    let is_local_max =
        |lag: usize| -> bool { ac[lag] > ac[lag - 1] && (lag + 1 > max_scan || ac[lag] >= ac[lag + 1]) };

    for lag in min_lag.max(1)..=max_lag.min(max_scan) {
        if is_local_max(lag) && ac[lag] > 0.1 * ac[0] {
            return Some(lag);
        }
    }

    // No confident peak: take the first local maximum past the first
    // autocorrelation trough, still within the lag range.
    let trough = (1..max_scan)
        .find(|&lag| ac[lag] < ac[lag - 1] && ac[lag] <= ac[lag + 1])?;
    ((trough + 1)..=max_lag.min(max_scan))
        .find(|&lag| lag >= min_lag && is_local_max(lag))
}

/// Exhaustive phase scan (step 2 px) within one period. Returns the offset
/// maximizing the sum of absolute ring contrasts at the induced centers.
fn best_phase(gray: &GrayImage, pitch_x: f64, pitch_y: f64) -> [f64; 2] {
    let (w, h) = gray.dimensions();
    let half_x = pitch_x / 2.0;
    let half_y = pitch_y / 2.0;
    let inner = 0.35 * half_y.min(half_x);
    let outer = 0.9 * half_y.min(half_x);

    let mut best = [half_x, half_y];
    let mut best_score = f64::NEG_INFINITY;
    let mut oy = 0.0;
    while oy < pitch_y {
        let mut ox = 0.0;
        while ox < pitch_x {
            let mut score = 0.0;
            let mut cy = oy + half_y;
            while cy + outer < h as f64 {
                let mut cx = ox + half_x;
                while cx + outer < w as f64 {
                    if cx >= outer && cy >= outer {
                        if let Some(contrast) = ring_center_contrast(gray, cx, cy, inner, outer)
                        {
                            score += contrast.abs();
                        }
                    }
                    cx += pitch_x;
                }
                cy += pitch_y;
            }
            if score > best_score {
                best_score = score;
                best = [ox + half_x, oy + half_y];
            }
            ox += 2.0;
        }
        oy += 2.0;
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::draw_disk_lattice;

    #[test]
    fn recovers_pitch_from_a_disk_lattice() {
        let rgba = draw_disk_lattice(
            400, 400, 24.0, 24.0, 16.0, 22, 22, 6.0, [40, 40, 40], None,
        );
        let gray = image::imageops::grayscale(&rgba);
        let config = DetectorConfig::default();
        let (model, pitches) = estimate_from_projections(&gray, &config);
        assert_eq!(pitches.pitch_x, Some(16));
        assert_eq!(pitches.pitch_y, Some(16));
        let model = model.expect("fallback model");
        assert!((model.pitch_x - 16.0).abs() < 0.5);
        assert!((model.confidence - 0.5).abs() < 1e-6);
    }

    #[test]
    fn flat_image_has_no_pitch() {
        let gray = GrayImage::from_pixel(200, 200, image::Luma([128]));
        let config = DetectorConfig::default();
        let (model, pitches) = estimate_from_projections(&gray, &config);
        assert!(model.is_none());
        assert!(pitches.pitch_x.is_none());
        assert!(pitches.pitch_y.is_none());
    }

    #[test]
    fn autocorrelation_peak_matches_a_synthetic_period() {
        // Period-14 square wave.
        let proj: Vec<f64> = (0..280)
            .map(|i| if (i / 7) % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        assert_eq!(projection_pitch(&proj, 12, 50), Some(14));
    }
}
