//! Synthesis direction: project a raster image onto a W×H palette grid.

use image::imageops::{self, FilterType};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::color::{rgb_to_lab, Rgb8};
use crate::grid::{PixelCell, PixelGrid};
use crate::palette::{match_confidence, Palette, PaletteError};
use crate::sampler::{Block, SampleMode};

/// Parameters of one quantization request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantizeSpec {
    /// Target grid width in cells.
    pub width: u32,
    /// Target grid height in cells.
    pub height: u32,
    /// Block sampling mode.
    pub mode: SampleMode,
    /// Apply the 15% edge trim to each block before sampling.
    pub edge_trim: bool,
}

/// Quantizer failures.
#[derive(Debug, Clone, PartialEq)]
pub enum QuantizeError {
    /// Source image has a zero dimension.
    InvalidImage,
    /// Requested grid has a zero dimension.
    GridTooSmall {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
    /// Palette rejected the request.
    Palette(PaletteError),
}

impl From<PaletteError> for QuantizeError {
    fn from(e: PaletteError) -> Self {
        QuantizeError::Palette(e)
    }
}

impl std::fmt::Display for QuantizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuantizeError::InvalidImage => write!(f, "source image has zero dimension"),
            QuantizeError::GridTooSmall { width, height } => {
                write!(f, "target grid {width}x{height} has a zero dimension")
            }
            QuantizeError::Palette(e) => write!(f, "palette: {e}"),
        }
    }
}

impl std::error::Error for QuantizeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QuantizeError::Palette(e) => Some(e),
            _ => None,
        }
    }
}

/// Quantize `image` to a `spec.width × spec.height` grid of palette colors.
///
/// Cells are visited row-major; each block is fully contained in the image
/// and non-empty. Identical inputs (including palette order) produce
/// bitwise-identical grids.
pub fn quantize(
    image: &RgbaImage,
    spec: &QuantizeSpec,
    palette: &Palette,
) -> Result<PixelGrid, QuantizeError> {
    let (iw, ih) = image.dimensions();
    if iw == 0 || ih == 0 {
        return Err(QuantizeError::InvalidImage);
    }
    if spec.width == 0 || spec.height == 0 {
        return Err(QuantizeError::GridTooSmall {
            width: spec.width,
            height: spec.height,
        });
    }
    if palette.is_empty() {
        return Err(PaletteError::Empty.into());
    }

    let (w, h) = (spec.width, spec.height);
    let mut grid = PixelGrid::new(h as usize, w as usize);

    // `original` bypasses block sampling: one bilinear resample, then a
    // direct pixel read per cell.
    let resampled = if spec.mode == SampleMode::Original {
        Some(imageops::resize(image, w, h, FilterType::Triangle))
    } else {
        None
    };

    for row in 0..h {
        for col in 0..w {
            let rgb = match &resampled {
                Some(small) => {
                    let p = small.get_pixel(col, row);
                    Rgb8::new(p[0], p[1], p[2])
                }
                None => {
                    let block = cell_block(iw, ih, w, h, col, row);
                    let block = if spec.edge_trim {
                        block.edge_trim()
                    } else {
                        block
                    };
                    block.sample_rgb(image, spec.mode)
                }
            };
            let (entry, delta_e) = palette.nearest(rgb_to_lab(rgb))?;
            grid.set(
                row as usize,
                col as usize,
                PixelCell::Bead {
                    rgb: entry.rgb,
                    palette_id: entry.id.clone(),
                    confidence: match_confidence(delta_e),
                },
            );
        }
    }

    tracing::debug!(
        width = spec.width,
        height = spec.height,
        mode = ?spec.mode,
        "quantized image to palette grid"
    );
    Ok(grid)
}

/// The source-image block of cell `(col, row)`. Spans are rounded so that
/// consecutive blocks tile the image; each span is at least one pixel and
/// clamped inside the image.
fn cell_block(iw: u32, ih: u32, w: u32, h: u32, col: u32, row: u32) -> Block {
    let span = |i: u32, n: u32, extent: u32| -> (u32, u32) {
        let step = extent as f64 / n as f64;
        let lo = (i as f64 * step).round() as u32;
        let hi = ((i + 1) as f64 * step).round() as u32;
        let lo = lo.min(extent - 1);
        let hi = hi.clamp(lo + 1, extent);
        (lo, hi)
    };
    let (x0, x1) = span(col, w, iw);
    let (y0, y1) = span(row, h, ih);
    Block::new(x0, y0, x1, y1)
}
