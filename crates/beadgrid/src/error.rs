//! Pipeline-boundary error kinds.

use crate::detector::{DetectError, GridDebug};
use crate::palette::PaletteError;

/// Errors surfaced by the recognition pipeline.
///
/// Structural failures abort the whole run; per-cell numeric failures do
/// not appear here — the affected cell degrades to neutral gray with zero
/// confidence and the pipeline continues.
#[derive(Debug, Clone)]
pub enum RecognizeError {
    /// The input buffer is empty or has a zero dimension.
    InvalidImage,
    /// The palette rejected the request (empty, bad selection, ...).
    Palette(PaletteError),
    /// Grid detection failed on both methods.
    GridNotFound {
        /// Diagnostics: candidate count, pitch candidates, attempted
        /// methods.
        debug: Box<GridDebug>,
    },
    /// The cancel token fired; no grid was produced.
    Cancelled,
}

impl From<PaletteError> for RecognizeError {
    fn from(e: PaletteError) -> Self {
        RecognizeError::Palette(e)
    }
}

impl From<DetectError> for RecognizeError {
    fn from(e: DetectError) -> Self {
        match e {
            DetectError::InvalidImage => RecognizeError::InvalidImage,
            DetectError::GridNotFound { debug } => RecognizeError::GridNotFound { debug },
        }
    }
}

impl std::fmt::Display for RecognizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecognizeError::InvalidImage => write!(f, "input image is empty or zero-sized"),
            RecognizeError::Palette(e) => write!(f, "palette: {e}"),
            RecognizeError::GridNotFound { debug } => write!(
                f,
                "no bead grid found ({} candidates, pitch candidates {:?})",
                debug.candidate_count, debug.pitch_candidates
            ),
            RecognizeError::Cancelled => write!(f, "recognition cancelled"),
        }
    }
}

impl std::error::Error for RecognizeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RecognizeError::Palette(e) => Some(e),
            _ => None,
        }
    }
}
