//! Recognition pipeline: detect → analyze → extract → match.
//!
//! The pipeline is a synchronous routine. It reports progress through a
//! caller-supplied callback and polls a [`CancelToken`] between phases and
//! between per-cell work items; there is no event-loop integration and no
//! shared mutable state.

mod cancel;
mod progress;

pub use cancel::CancelToken;
pub use progress::{Phase, Progress};

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::analyzer::{analyze_cells, AnalyzerConfig, CellAnalysis};
use crate::color::rgb_to_lab;
use crate::detector::{detect_grid, DetectorConfig};
use crate::error::RecognizeError;
use crate::extract::{dominant_cell_color, ExtractConfig, ExtractedColor, FALLBACK_GRAY};
use crate::grid::{PixelCell, PixelGrid};
use crate::palette::{match_confidence, Palette};

/// Configuration of the whole recognition pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizeConfig {
    /// Grid detection parameters.
    pub detector: DetectorConfig,
    /// Occupancy analysis parameters.
    pub analyzer: AnalyzerConfig,
    /// Dominant-color extraction parameters.
    pub extract: ExtractConfig,
}

/// Recognize a populated bead board in a photograph.
///
/// Returns a normalized [`PixelGrid`]: the smallest occupied row and column
/// map to 0. Per-cell extraction failures degrade that cell to neutral gray
/// with zero confidence; structural failures abort with an error.
pub fn recognize(
    image: &RgbaImage,
    palette: &Palette,
    config: &RecognizeConfig,
    on_progress: &mut dyn FnMut(Progress),
    cancel: &CancelToken,
) -> Result<PixelGrid, RecognizeError> {
    // Load phase: validate inputs up front.
    on_progress(Progress::at(Phase::Load, 0.0));
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return Err(RecognizeError::InvalidImage);
    }
    if palette.is_empty() {
        return Err(crate::palette::PaletteError::Empty.into());
    }
    on_progress(Progress::at(Phase::Load, 1.0));
    check_cancel(cancel)?;

    let model = detect_grid(image, &config.detector)?;
    on_progress(Progress::at(Phase::Detect, 1.0));
    check_cancel(cancel)?;

    let cells = analyze_cells(image, &model, &config.analyzer);
    on_progress(Progress::at(Phase::Analyze, 1.0));
    check_cancel(cancel)?;

    // Per-cell color extraction, row-major over occupied cells.
    let r = 0.5 * model.pitch_x.min(model.pitch_y);
    let occupied: Vec<&CellAnalysis> = cells.iter().filter(|c| c.occupied).collect();
    let mut colored: Vec<(usize, usize, ExtractedColor, f32)> =
        Vec::with_capacity(occupied.len());
    for (done, cell) in occupied.iter().enumerate() {
        check_cancel(cancel)?;
        let cell_index = (cell.row * model.cols + cell.col) as u64;
        let extracted = dominant_cell_color(
            image,
            cell.center_xy[0],
            cell.center_xy[1],
            r,
            &config.extract,
            cell_index,
        );
        colored.push((cell.row, cell.col, extracted, cell.confidence));
        on_progress(Progress::at(
            Phase::Colors,
            (done + 1) as f32 / occupied.len().max(1) as f32,
        ));
    }
    check_cancel(cancel)?;

    let grid = assemble(&colored, &model, palette)?;
    on_progress(Progress::at(Phase::Finalize, 1.0));
    tracing::info!(
        rows = grid.rows(),
        cols = grid.cols(),
        beads = grid.bead_count(),
        "recognition complete"
    );
    Ok(grid)
}

fn check_cancel(cancel: &CancelToken) -> Result<(), RecognizeError> {
    if cancel.is_cancelled() {
        tracing::info!("recognition cancelled by caller");
        Err(RecognizeError::Cancelled)
    } else {
        Ok(())
    }
}

/// Match extracted colors against the palette and build the normalized
/// grid: minimum occupied row/column map to 0.
///
/// A recognition with zero occupied cells keeps the detected dimensions
/// with every cell empty.
fn assemble(
    colored: &[(usize, usize, ExtractedColor, f32)],
    model: &crate::detector::GridModel,
    palette: &Palette,
) -> Result<PixelGrid, RecognizeError> {
    let Some(min_row) = colored.iter().map(|&(r, _, _, _)| r).min() else {
        return Ok(PixelGrid::new(model.rows, model.cols));
    };
    let min_col = colored.iter().map(|&(_, c, _, _)| c).min().unwrap_or(0);
    let max_row = colored.iter().map(|&(r, _, _, _)| r).max().unwrap_or(min_row);
    let max_col = colored.iter().map(|&(_, c, _, _)| c).max().unwrap_or(min_col);

    let mut grid = PixelGrid::new(max_row - min_row + 1, max_col - min_col + 1);
    for &(row, col, extracted, occupancy_confidence) in colored {
        let (entry, delta_e) = palette.nearest(rgb_to_lab(extracted.rgb))?;
        let confidence = if extracted.ok {
            // Combined: how well the cell read, and how well its color
            // matched.
            occupancy_confidence.min(match_confidence(delta_e))
        } else {
            0.0
        };
        let rgb = if extracted.ok { extracted.rgb } else { FALLBACK_GRAY };
        grid.set(
            row - min_row,
            col - min_col,
            PixelCell::Bead {
                rgb,
                palette_id: entry.id.clone(),
                confidence,
            },
        );
    }
    Ok(grid)
}
