//! Grid detection: recover cell pitch, origin and shape from a roughly
//! frontal photograph of a bead board.
//!
//! Two methods run in order. The candidate-cloud method unions three
//! independent center detectors and reads the lattice geometry off the
//! resulting point cloud; when the cloud is too sparse the detector falls
//! back to projection autocorrelation. Neither method ever returns made-up
//! dimensions: structural failure surfaces as [`DetectError::GridNotFound`]
//! with a diagnostic record.

mod candidates;
mod cloud;
mod config;
mod projection;

pub use config::{CirclePreset, DetectorConfig};

use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Detected lattice geometry in image coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridModel {
    /// Horizontal center-to-center spacing (pixels).
    pub pitch_x: f64,
    /// Vertical center-to-center spacing (pixels).
    pub pitch_y: f64,
    /// X coordinate of the (0,0) cell center.
    pub origin_x: f64,
    /// Y coordinate of the (0,0) cell center.
    pub origin_y: f64,
    /// Number of lattice rows.
    pub rows: usize,
    /// Number of lattice columns.
    pub cols: usize,
    /// Detection confidence in `[0, 1]`.
    pub confidence: f32,
}

impl GridModel {
    /// Build a model, shrinking `rows`/`cols` until the last cell center
    /// stays inside the image minus one half-pitch on each axis. Returns
    /// `None` when nothing of the grid fits.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn clamped(
        pitch_x: f64,
        pitch_y: f64,
        origin_x: f64,
        origin_y: f64,
        rows: usize,
        cols: usize,
        confidence: f32,
        image_size: [u32; 2],
    ) -> Option<Self> {
        if pitch_x <= 0.0 || pitch_y <= 0.0 || rows == 0 || cols == 0 {
            return None;
        }
        let max_x = image_size[0] as f64 - pitch_x / 2.0;
        let max_y = image_size[1] as f64 - pitch_y / 2.0;
        let mut rows = rows;
        let mut cols = cols;
        while rows > 0 && origin_y + (rows - 1) as f64 * pitch_y > max_y {
            rows -= 1;
        }
        while cols > 0 && origin_x + (cols - 1) as f64 * pitch_x > max_x {
            cols -= 1;
        }
        if rows == 0 || cols == 0 {
            return None;
        }
        Some(Self {
            pitch_x,
            pitch_y,
            origin_x,
            origin_y,
            rows,
            cols,
            confidence,
        })
    }

    /// Image coordinates of the center of cell `(row, col)`.
    pub fn cell_center(&self, row: usize, col: usize) -> [f64; 2] {
        [
            self.origin_x + col as f64 * self.pitch_x,
            self.origin_y + row as f64 * self.pitch_y,
        ]
    }
}

/// Diagnostic record attached to [`DetectError::GridNotFound`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GridDebug {
    /// Candidates surviving NMS across all detectors.
    pub candidate_count: usize,
    /// Pitch estimates considered, in the order they were produced.
    pub pitch_candidates: Vec<f64>,
    /// Whether the candidate-cloud method ran.
    pub cloud_attempted: bool,
    /// Whether the projection fallback ran.
    pub projection_attempted: bool,
}

/// Grid detection failures.
#[derive(Debug, Clone)]
pub enum DetectError {
    /// The input image has a zero dimension.
    InvalidImage,
    /// Neither detection method found a plausible lattice.
    GridNotFound {
        /// Diagnostics for the failed detection.
        debug: Box<GridDebug>,
    },
}

impl std::fmt::Display for DetectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectError::InvalidImage => write!(f, "input image has zero dimension"),
            DetectError::GridNotFound { debug } => write!(
                f,
                "no bead grid found ({} candidates, pitch candidates {:?})",
                debug.candidate_count, debug.pitch_candidates
            ),
        }
    }
}

impl std::error::Error for DetectError {}

/// Detect the bead lattice in a photograph.
pub fn detect_grid(image: &RgbaImage, config: &DetectorConfig) -> Result<GridModel, DetectError> {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return Err(DetectError::InvalidImage);
    }

    let gray = image::imageops::grayscale(image);
    let mut dbg_info = GridDebug::default();

    let candidates = candidates::gather_candidates(&gray, image, config);
    dbg_info.candidate_count = candidates.len();
    tracing::debug!(candidates = candidates.len(), "gathered center candidates");

    if candidates.len() >= config.min_cloud_candidates {
        dbg_info.cloud_attempted = true;
        let (model, pitch) = cloud::estimate_from_cloud(&candidates, [w, h], config);
        if let Some(p) = pitch {
            dbg_info.pitch_candidates.push(p);
        }
        if let Some(model) = model {
            tracing::info!(
                pitch = model.pitch_x,
                rows = model.rows,
                cols = model.cols,
                confidence = model.confidence,
                "grid detected from candidate cloud"
            );
            return Ok(model);
        }
    }

    dbg_info.projection_attempted = true;
    let (model, pitches) = projection::estimate_from_projections(&gray, config);
    if let Some(p) = pitches.pitch_x {
        dbg_info.pitch_candidates.push(p as f64);
    }
    if let Some(p) = pitches.pitch_y {
        dbg_info.pitch_candidates.push(p as f64);
    }
    if let Some(model) = model {
        tracing::info!(
            pitch_x = model.pitch_x,
            pitch_y = model.pitch_y,
            rows = model.rows,
            cols = model.cols,
            "grid detected from projection autocorrelation"
        );
        return Ok(model);
    }

    tracing::warn!(
        candidates = dbg_info.candidate_count,
        "grid detection failed on both methods"
    );
    Err(DetectError::GridNotFound {
        debug: Box::new(dbg_info),
    })
}
