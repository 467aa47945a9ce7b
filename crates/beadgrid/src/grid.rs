//! The shared output model: a dense rows×cols grid of palette-matched cells.

use serde::{Deserialize, Serialize};

use crate::color::Rgb8;
use crate::palette::PaletteId;

/// One grid cell: empty board position or a palette-matched bead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "Option<CellRepr>", from = "Option<CellRepr>")]
pub enum PixelCell {
    /// No bead at this position.
    Empty,
    /// A bead bound to a palette entry.
    Bead {
        /// Observed (or quantized) sRGB value.
        rgb: Rgb8,
        /// Id of the matched palette entry.
        palette_id: PaletteId,
        /// Match confidence in `[0, 1]`.
        confidence: f32,
    },
}

impl PixelCell {
    /// True for a bead cell.
    pub fn is_bead(&self) -> bool {
        matches!(self, PixelCell::Bead { .. })
    }
}

/// Wire form of a cell: `null` for empty, a flat record for a bead.
#[derive(Clone, Serialize, Deserialize)]
struct CellRepr {
    r: u8,
    g: u8,
    b: u8,
    palette_id: PaletteId,
    confidence: f32,
}

impl From<PixelCell> for Option<CellRepr> {
    fn from(cell: PixelCell) -> Self {
        match cell {
            PixelCell::Empty => None,
            PixelCell::Bead {
                rgb,
                palette_id,
                confidence,
            } => Some(CellRepr {
                r: rgb.r,
                g: rgb.g,
                b: rgb.b,
                palette_id,
                confidence,
            }),
        }
    }
}

impl From<Option<CellRepr>> for PixelCell {
    fn from(repr: Option<CellRepr>) -> Self {
        match repr {
            None => PixelCell::Empty,
            Some(c) => PixelCell::Bead {
                rgb: Rgb8::new(c.r, c.g, c.b),
                palette_id: c.palette_id,
                confidence: c.confidence,
            },
        }
    }
}

/// A rectangular, row-major grid of [`PixelCell`].
///
/// Always rectangular with `rows >= 1` and `cols >= 1`; producers validate
/// their dimensions before construction. Iteration order is `(row, col)`,
/// row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PixelGrid {
    rows: usize,
    cols: usize,
    cells: Vec<PixelCell>,
}

impl PixelGrid {
    /// Create a grid of the given shape with every cell empty.
    pub fn new(rows: usize, cols: usize) -> Self {
        debug_assert!(rows >= 1 && cols >= 1, "grid shape {rows}x{cols}");
        Self {
            rows,
            cols,
            cells: vec![PixelCell::Empty; rows * cols],
        }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Cell at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> &PixelCell {
        &self.cells[self.index(row, col)]
    }

    /// Replace the cell at `(row, col)`.
    pub fn set(&mut self, row: usize, col: usize, cell: PixelCell) {
        let i = self.index(row, col);
        self.cells[i] = cell;
    }

    /// Iterate cells with their coordinates in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &PixelCell)> {
        let cols = self.cols;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| (i / cols, i % cols, cell))
    }

    /// Number of bead cells.
    pub fn bead_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_bead()).count()
    }

    fn index(&self, row: usize, col: usize) -> usize {
        assert!(row < self.rows && col < self.cols, "cell ({row},{col}) out of {}x{}", self.rows, self.cols);
        row * self.cols + col
    }
}
