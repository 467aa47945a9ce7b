//! Block sampling: pick one representative RGB for a rectangular image
//! region under a sampling mode.
//!
//! Blocks carry both their full rectangle and the active sample rectangle.
//! The optional edge trim (15% inset per side, at least one pixel) is always
//! derived from the full rectangle, so re-applying it is a no-op.

use std::collections::HashMap;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::color::Rgb8;

/// How one block of the source image is reduced to a single RGB value.
///
/// The set is closed; `Original` bypasses block sampling entirely (the
/// quantizer resamples the whole image once and reads single pixels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleMode {
    /// Most frequent exact (R,G,B) value; ties go to the first seen.
    Dominant,
    /// Channel-wise integer mean over the block.
    Average,
    /// Single pixel at the geometric center of the block.
    Center,
    /// Single pixel at fractional offset (4/5, 4/5) into the block.
    Diagonal45,
    /// No block sampling: the image is resampled to the grid size and the
    /// pixel at `(col, row)` is used directly.
    Original,
}

impl SampleMode {
    /// Parse the CLI/file spelling of a mode.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "dominant" => Some(SampleMode::Dominant),
            "average" => Some(SampleMode::Average),
            "center" => Some(SampleMode::Center),
            "diagonal45" => Some(SampleMode::Diagonal45),
            "original" => Some(SampleMode::Original),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rect {
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
}

impl Rect {
    fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    fn height(&self) -> u32 {
        self.y1 - self.y0
    }
}

/// A sampling block: the full `[x0,x1)×[y0,y1)` rectangle plus the active
/// sample rectangle (equal to the full one until [`Block::edge_trim`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    full: Rect,
    sample: Rect,
}

// Inset fraction per side used by the edge trim.
const TRIM_FRACTION: f64 = 0.15;

impl Block {
    /// Construct a block spanning `[x0,x1)×[y0,y1)`. Must be non-empty.
    pub fn new(x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        debug_assert!(x1 > x0 && y1 > y0, "empty block [{x0},{x1})x[{y0},{y1})");
        let full = Rect { x0, y0, x1, y1 };
        Self { full, sample: full }
    }

    /// Apply the 15% edge trim (at least one pixel per side).
    ///
    /// The trimmed rectangle is always computed from the full rectangle, so
    /// trimming an already-trimmed block yields the same result. Blocks too
    /// small to survive the inset keep their full extent.
    pub fn edge_trim(mut self) -> Self {
        self.sample = trim_rect(self.full);
        self
    }

    /// The sample rectangle as `(x0, y0, x1, y1)`.
    pub fn sample_bounds(&self) -> (u32, u32, u32, u32) {
        let r = self.sample;
        (r.x0, r.y0, r.x1, r.y1)
    }

    /// Reduce the sample rectangle to one RGB value.
    ///
    /// `Original` never reaches this path in the quantizer; if passed, it is
    /// treated as `Center`.
    pub fn sample_rgb(&self, image: &RgbaImage, mode: SampleMode) -> Rgb8 {
        let r = self.sample;
        match mode {
            SampleMode::Dominant => dominant_in(image, r),
            SampleMode::Average => average_in(image, r),
            SampleMode::Center | SampleMode::Original => {
                pixel_at(image, r.x0 + r.width() / 2, r.y0 + r.height() / 2, r)
            }
            SampleMode::Diagonal45 => {
                // Integer-floored 4/5 offset into the sample rect. For
                // trimmed blocks this lands on a different pixel than the
                // untrimmed 4/5 point would; the offset is relative to the
                // active rectangle by definition.
                pixel_at(
                    image,
                    r.x0 + r.width() * 4 / 5,
                    r.y0 + r.height() * 4 / 5,
                    r,
                )
            }
        }
    }
}

fn trim_rect(r: Rect) -> Rect {
    let inset_x = ((r.width() as f64 * TRIM_FRACTION).round() as u32).max(1);
    let inset_y = ((r.height() as f64 * TRIM_FRACTION).round() as u32).max(1);
    if r.width() <= 2 * inset_x || r.height() <= 2 * inset_y {
        return r;
    }
    Rect {
        x0: r.x0 + inset_x,
        y0: r.y0 + inset_y,
        x1: r.x1 - inset_x,
        y1: r.y1 - inset_y,
    }
}

fn pixel_at(image: &RgbaImage, x: u32, y: u32, r: Rect) -> Rgb8 {
    let x = x.min(r.x1 - 1);
    let y = y.min(r.y1 - 1);
    let p = image.get_pixel(x, y);
    Rgb8::new(p[0], p[1], p[2])
}

fn dominant_in(image: &RgbaImage, r: Rect) -> Rgb8 {
    // (count, first-seen order) per exact color; ties fall to the earliest.
    let mut counts: HashMap<[u8; 3], (u32, u32)> = HashMap::new();
    let mut order = 0u32;
    for y in r.y0..r.y1 {
        for x in r.x0..r.x1 {
            let p = image.get_pixel(x, y);
            let key = [p[0], p[1], p[2]];
            let slot = counts.entry(key).or_insert((0, order));
            slot.0 += 1;
            order += 1;
        }
    }
    let best = counts
        .into_iter()
        .min_by_key(|&(_, (count, first))| (std::cmp::Reverse(count), first))
        .map(|(color, _)| color)
        .unwrap_or([0, 0, 0]);
    Rgb8::from(best)
}

fn average_in(image: &RgbaImage, r: Rect) -> Rgb8 {
    let mut sums = [0u64; 3];
    let mut count = 0u64;
    for y in r.y0..r.y1 {
        for x in r.x0..r.x1 {
            let p = image.get_pixel(x, y);
            sums[0] += p[0] as u64;
            sums[1] += p[1] as u64;
            sums[2] += p[2] as u64;
            count += 1;
        }
    }
    if count == 0 {
        return Rgb8::new(0, 0, 0);
    }
    Rgb8::new(
        (sums[0] / count) as u8,
        (sums[1] / count) as u8,
        (sums[2] / count) as u8,
    )
}
