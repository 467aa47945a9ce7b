//! Per-cell occupancy classification.
//!
//! Each lattice cell is measured on concentric regions (center disk, ring),
//! then classified against thresholds derived from the whole population:
//! Otsu's split sharpened by the population mean plus half a standard
//! deviation. Saturation rescues weak-contrast cells; two morphology passes
//! remove speckle and fill single-cell holes.

mod features;
mod morphology;
mod otsu;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::detector::GridModel;
use features::SaturationPlane;

/// Analyzer tuning knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Gradient magnitude (`|∂x|+|∂y|`) above which a ring pixel counts as
    /// an edge pixel.
    pub edge_gradient_min: f64,
    /// Weight of the contrast term in the confidence score.
    pub contrast_weight: f64,
    /// Weight of the saturation term in the confidence score.
    pub saturation_weight: f64,
    /// Weight of the edge-density term in the confidence score.
    pub edge_weight: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            edge_gradient_min: 30.0,
            contrast_weight: 0.6,
            saturation_weight: 0.25,
            edge_weight: 0.15,
        }
    }
}

/// Full per-cell analysis record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellAnalysis {
    /// Lattice row.
    pub row: usize,
    /// Lattice column.
    pub col: usize,
    /// Cell center in image coordinates.
    pub center_xy: [f64; 2],
    /// Mean grayscale over the center disk.
    pub center_mean: f64,
    /// Mean grayscale over the ring.
    pub ring_mean: f64,
    /// `ring_mean - center_mean`.
    pub contrast: f64,
    /// Mean saturation over the ring (0–255).
    pub saturation: f64,
    /// Fraction of ring pixels with a strong gradient.
    pub edge_density: f64,
    /// Classification result.
    pub occupied: bool,
    /// Classification confidence in `[0, 1]`.
    pub confidence: f32,
}

/// Analyze every cell of the detected lattice, row-major.
///
/// Cells whose sampling disk extends past the image border get zeroed
/// features, are excluded from the threshold populations, and stay empty.
pub fn analyze_cells(
    image: &RgbaImage,
    model: &GridModel,
    config: &AnalyzerConfig,
) -> Vec<CellAnalysis> {
    let gray = image::imageops::grayscale(image);
    let saturation = SaturationPlane::from_rgba(image);
    let r = 0.5 * model.pitch_x.min(model.pitch_y);

    let mut cells = Vec::with_capacity(model.rows * model.cols);
    let mut in_image = Vec::with_capacity(model.rows * model.cols);
    for row in 0..model.rows {
        for col in 0..model.cols {
            let [cx, cy] = model.cell_center(row, col);
            let f = features::cell_features(
                &gray,
                &saturation,
                cx,
                cy,
                r,
                config.edge_gradient_min,
            );
            in_image.push(f.in_image);
            cells.push(CellAnalysis {
                row,
                col,
                center_xy: [cx, cy],
                center_mean: f.center_mean,
                ring_mean: f.ring_mean,
                contrast: f.contrast,
                saturation: f.saturation,
                edge_density: f.edge_density,
                occupied: false,
                confidence: 0.0,
            });
        }
    }

    classify(&mut cells, &in_image, config);
    morphology::postprocess(&mut cells, model.rows, model.cols);

    let occupied = cells.iter().filter(|c| c.occupied).count();
    tracing::info!(cells = cells.len(), occupied, "cell analysis complete");
    cells
}

/// Threshold derivation and scoring over the whole population.
fn classify(cells: &mut [CellAnalysis], in_image: &[bool], config: &AnalyzerConfig) {
    let contrasts: Vec<f64> = cells
        .iter()
        .zip(in_image)
        .filter(|&(_, &ok)| ok)
        .map(|(c, _)| c.contrast)
        .collect();
    let saturations: Vec<f64> = cells
        .iter()
        .zip(in_image)
        .filter(|&(_, &ok)| ok)
        .map(|(c, _)| c.saturation)
        .collect();
    if contrasts.is_empty() {
        return;
    }

    let t_contrast = effective_threshold(&contrasts);
    let t_saturation = effective_threshold(&saturations);
    tracing::debug!(t_contrast, t_saturation, "occupancy thresholds");

    for (cell, &ok) in cells.iter_mut().zip(in_image) {
        if !ok {
            continue;
        }
        let by_contrast = cell.contrast > t_contrast;
        let by_saturation = t_saturation > 0.0
            && cell.contrast > 0.6 * t_contrast
            && cell.saturation > 0.8 * t_saturation;
        cell.occupied = by_contrast || by_saturation;

        let contrast_term = safe_ratio(cell.contrast, 1.5 * t_contrast);
        let saturation_term = safe_ratio(cell.saturation, 1.5 * t_saturation);
        let edge_term = (8.0 * cell.edge_density).min(1.0);
        let score = config.contrast_weight * contrast_term
            + config.saturation_weight * saturation_term
            + config.edge_weight * edge_term;
        cell.confidence = if cell.occupied {
            score.clamp(0.0, 1.0) as f32
        } else {
            (1.0 - score).max(0.0) as f32
        };
    }
}

/// `max(otsu, mean + 0.5·std)` over a population.
fn effective_threshold(values: &[f64]) -> f64 {
    let t = otsu::otsu_threshold(values);
    let (mean, std) = otsu::mean_std(values);
    t.max(mean + 0.5 * std)
}

/// `clamp01(value / denom)`, zero for a non-positive denominator.
fn safe_ratio(value: f64, denom: f64) -> f64 {
    if denom <= 0.0 {
        0.0
    } else {
        (value / denom).clamp(0.0, 1.0)
    }
}
