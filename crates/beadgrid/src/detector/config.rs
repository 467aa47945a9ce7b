//! Grid detector configuration.

use serde::{Deserialize, Serialize};

/// One circle-detector preset: peak extraction parameters applied to the
/// shared voting accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CirclePreset {
    /// Minimum distance between accepted centers (pixels).
    pub min_distance: f64,
    /// Minimum accumulator value for a peak.
    pub accumulator_threshold: f32,
}

/// Configuration of the bead-board grid detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Pitch clamp range for the candidate-cloud estimate (pixels).
    pub cloud_pitch_range: [f64; 2],
    /// Accepted pitch lag range for the projection fallback (pixels).
    pub projection_pitch_range: [usize; 2],
    /// Minimum candidate count required to trust the cloud method.
    pub min_cloud_candidates: usize,
    /// Non-maximum-suppression radius applied to the unioned candidates.
    pub nms_radius: f64,
    /// Circle detector peak-extraction presets (outputs are unioned).
    pub circle_presets: Vec<CirclePreset>,
    /// Candidate bead radius range for circle voting (pixels).
    pub circle_radius_range: [f64; 2],
    /// Gradient magnitude threshold as a fraction of the image maximum.
    pub circle_gradient_fraction: f32,
    /// Ring-contrast sampler window size (pixels).
    pub ring_window: u32,
    /// Ring-contrast sampler stride (pixels).
    pub ring_step: u32,
    /// Minimum `ring_mean - center_mean` to emit a ring candidate.
    pub ring_contrast_min: f64,
    /// Saturation sampler window size (pixels).
    pub saturation_window: u32,
    /// Saturation sampler stride (pixels).
    pub saturation_step: u32,
    /// Minimum 7×7 neighborhood mean saturation to emit a candidate.
    pub saturation_min: f64,
    /// Neighbor search radius as a multiple of the pitch, used when
    /// filtering isolated candidates.
    pub neighbor_radius_factor: f64,
    /// Minimum neighbor count for a candidate to survive the bounds pass.
    pub min_neighbors: usize,
    /// Percentile (from each end) used for the active-bounds estimate.
    pub bounds_percentile: f64,
    /// Bounds inflation as a multiple of the pitch.
    pub bounds_inflation: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            cloud_pitch_range: [10.0, 40.0],
            projection_pitch_range: [12, 50],
            min_cloud_candidates: 50,
            nms_radius: 8.0,
            circle_presets: vec![
                CirclePreset {
                    min_distance: 15.0,
                    accumulator_threshold: 25.0,
                },
                CirclePreset {
                    min_distance: 12.0,
                    accumulator_threshold: 20.0,
                },
                CirclePreset {
                    min_distance: 18.0,
                    accumulator_threshold: 30.0,
                },
            ],
            circle_radius_range: [5.0, 25.0],
            circle_gradient_fraction: 0.15,
            ring_window: 12,
            ring_step: 6,
            ring_contrast_min: 15.0,
            saturation_window: 10,
            saturation_step: 8,
            saturation_min: 50.0,
            neighbor_radius_factor: 1.8,
            min_neighbors: 3,
            bounds_percentile: 0.03,
            bounds_inflation: 0.3,
        }
    }
}
