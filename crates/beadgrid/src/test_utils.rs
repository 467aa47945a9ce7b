//! Shared synthetic-board renderers for unit tests.

use image::{Rgba, RgbaImage};

/// Render a lattice of filled disks on a white background.
///
/// Disk centers sit at `origin + (col, row) · pitch`. `skip` suppresses
/// individual lattice positions; `None` renders every cell.
#[allow(clippy::too_many_arguments)]
pub(crate) fn draw_disk_lattice(
    w: u32,
    h: u32,
    origin_x: f64,
    origin_y: f64,
    pitch: f64,
    rows: usize,
    cols: usize,
    radius: f64,
    disk_rgb: [u8; 3],
    skip: Option<&dyn Fn(usize, usize) -> bool>,
) -> RgbaImage {
    let mut img = RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255]));
    for row in 0..rows {
        for col in 0..cols {
            if skip.is_some_and(|f| f(row, col)) {
                continue;
            }
            let cx = origin_x + col as f64 * pitch;
            let cy = origin_y + row as f64 * pitch;
            fill_disk(&mut img, cx, cy, radius, disk_rgb);
        }
    }
    img
}

/// Fill one disk, clipped to the image.
pub(crate) fn fill_disk(img: &mut RgbaImage, cx: f64, cy: f64, radius: f64, rgb: [u8; 3]) {
    let (w, h) = img.dimensions();
    let scan = radius.ceil() as i64;
    let (cxi, cyi) = (cx.round() as i64, cy.round() as i64);
    for dy in -scan..=scan {
        for dx in -scan..=scan {
            let px = cxi + dx;
            let py = cyi + dy;
            if px < 0 || py < 0 || px >= w as i64 || py >= h as i64 {
                continue;
            }
            let d = (((px as f64 - cx).powi(2)) + ((py as f64 - cy).powi(2))).sqrt();
            if d <= radius {
                img.put_pixel(px as u32, py as u32, Rgba([rgb[0], rgb[1], rgb[2], 255]));
            }
        }
    }
}
