//! beadgrid — imaging core for bead-craft ("perler"/"Hama") design tools.
//!
//! Two workflows share one data model, a rows×cols grid of palette colors:
//!
//! 1. **Synthesis** – [`quantize`] projects a raster image onto a palette
//!    grid through block sampling and perceptual (ΔE2000) matching.
//! 2. **Recognition** – [`recognize`] runs the photo pipeline:
//!    grid detection (candidate cloud with a projection-autocorrelation
//!    fallback) → per-cell occupancy analysis (contrast/saturation/edge
//!    fusion with Otsu-derived thresholds) → dominant-color extraction
//!    (seeded K-means on an annulus) → palette matching.
//!
//! The core holds no global state: images are borrowed read-only, the
//! palette is shared read-only, and the produced [`PixelGrid`] is owned by
//! the caller. Progress reporting and cancellation are cooperative; see
//! [`recognize`].

mod analyzer;
mod color;
mod design;
mod detector;
mod error;
mod extract;
mod grid;
mod palette;
mod pipeline;
mod quantize;
mod sampler;
#[cfg(test)]
mod test_utils;

pub use analyzer::{analyze_cells, AnalyzerConfig, CellAnalysis};
pub use color::{
    delta_e_2000, lab_to_rgb, lab_to_xyz, linear_rgb_to_xyz, linear_to_srgb, rgb_to_hsv,
    rgb_to_lab, srgb_to_linear, xyz_to_lab, xyz_to_linear_rgb, Hsv, Lab, ParseColorError, Rgb8,
};
pub use design::DesignRecord;
pub use detector::{detect_grid, CirclePreset, DetectError, DetectorConfig, GridDebug, GridModel};
pub use error::RecognizeError;
pub use extract::{dominant_cell_color, ExtractConfig, ExtractedColor};
pub use grid::{PixelCell, PixelGrid};
pub use palette::{
    match_confidence, Palette, PaletteColorRecord, PaletteEntry, PaletteError, PaletteFile,
    PaletteId,
};
pub use pipeline::{recognize, CancelToken, Phase, Progress, RecognizeConfig};
pub use quantize::{quantize, QuantizeError, QuantizeSpec};
pub use sampler::{Block, SampleMode};
