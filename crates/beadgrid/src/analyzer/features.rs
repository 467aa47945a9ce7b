//! Per-cell feature measurement on concentric sampling regions.

use image::GrayImage;

/// Raw per-cell features measured around one lattice center.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CellFeatures {
    pub center_mean: f64,
    pub ring_mean: f64,
    pub contrast: f64,
    pub saturation: f64,
    pub edge_density: f64,
    /// False when the sampling disk extends past the image border; such
    /// cells carry zeroed features and are excluded from the threshold
    /// populations.
    pub in_image: bool,
}

/// Precomputed per-pixel saturation plane (0–255 scale).
pub(crate) struct SaturationPlane {
    width: u32,
    values: Vec<f64>,
}

impl SaturationPlane {
    pub(crate) fn from_rgba(rgba: &image::RgbaImage) -> Self {
        use crate::color::{rgb_to_hsv, Rgb8};
        let (w, h) = rgba.dimensions();
        let mut values = Vec::with_capacity((w * h) as usize);
        for p in rgba.pixels() {
            values.push(rgb_to_hsv(Rgb8::new(p[0], p[1], p[2])).s);
        }
        Self {
            width: w,
            values,
        }
    }

    fn get(&self, x: u32, y: u32) -> f64 {
        self.values[(y * self.width + x) as usize]
    }
}

/// Measure one cell: grayscale means over the center disk and the ring,
/// mean ring saturation, and the fraction of ring pixels with a strong
/// gradient.
///
/// The center disk has radius `0.35·r`, the ring spans `0.45·r..0.9·r`
/// with `r` half the pitch. `contrast = ring_mean - center_mean`, so a
/// bead (bright ring around its dark hole) scores positive.
pub(crate) fn cell_features(
    gray: &GrayImage,
    saturation: &SaturationPlane,
    cx: f64,
    cy: f64,
    r: f64,
    edge_gradient_min: f64,
) -> CellFeatures {
    let (w, h) = gray.dimensions();
    let outer = 0.9 * r;
    if cx - outer < 0.0 || cy - outer < 0.0 || cx + outer > w as f64 || cy + outer > h as f64 {
        return CellFeatures::default();
    }

    let center_radius = 0.35 * r;
    let ring_inner = 0.45 * r;

    let mut center_sum = 0.0;
    let mut center_n = 0u32;
    let mut ring_sum = 0.0;
    let mut sat_sum = 0.0;
    let mut ring_n = 0u32;
    let mut edge_n = 0u32;

    let scan = outer.ceil() as i64;
    let (cxi, cyi) = (cx.round() as i64, cy.round() as i64);
    for dy in -scan..=scan {
        for dx in -scan..=scan {
            let px = cxi + dx;
            let py = cyi + dy;
            if px < 0 || py < 0 || px >= w as i64 || py >= h as i64 {
                continue;
            }
            let d = (((px as f64 - cx).powi(2)) + ((py as f64 - cy).powi(2))).sqrt();
            let (ux, uy) = (px as u32, py as u32);
            let v = gray.get_pixel(ux, uy)[0] as f64;
            if d <= center_radius {
                center_sum += v;
                center_n += 1;
            } else if d >= ring_inner && d <= outer {
                ring_sum += v;
                sat_sum += saturation.get(ux, uy);
                ring_n += 1;
                if gradient_magnitude(gray, ux, uy) > edge_gradient_min {
                    edge_n += 1;
                }
            }
        }
    }

    if center_n == 0 || ring_n == 0 {
        return CellFeatures::default();
    }

    let center_mean = center_sum / center_n as f64;
    let ring_mean = ring_sum / ring_n as f64;
    CellFeatures {
        center_mean,
        ring_mean,
        contrast: ring_mean - center_mean,
        saturation: sat_sum / ring_n as f64,
        edge_density: edge_n as f64 / ring_n as f64,
        in_image: true,
    }
}

/// `|∂x| + |∂y|` by central differences, clamped at the borders.
fn gradient_magnitude(gray: &GrayImage, x: u32, y: u32) -> f64 {
    let (w, h) = gray.dimensions();
    let sample = |x: i64, y: i64| -> f64 {
        let x = x.clamp(0, w as i64 - 1) as u32;
        let y = y.clamp(0, h as i64 - 1) as u32;
        gray.get_pixel(x, y)[0] as f64
    };
    let (x, y) = (x as i64, y as i64);
    let dx = (sample(x + 1, y) - sample(x - 1, y)) / 2.0;
    let dy = (sample(x, y + 1) - sample(x, y - 1)) / 2.0;
    dx.abs() + dy.abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgba, RgbaImage};

    fn flat_saturation(w: u32, h: u32) -> SaturationPlane {
        SaturationPlane::from_rgba(&RgbaImage::from_pixel(w, h, Rgba([100, 100, 100, 255])))
    }

    #[test]
    fn bead_signature_has_positive_contrast() {
        // Dark hole at the center, bright ring around it.
        let mut gray = GrayImage::from_pixel(64, 64, Luma([120]));
        for y in 0..64 {
            for x in 0..64 {
                let d = (((x as f64) - 32.0).powi(2) + ((y as f64) - 32.0).powi(2)).sqrt();
                if d < 3.0 {
                    gray.put_pixel(x, y, Luma([20]));
                } else if d < 7.5 {
                    gray.put_pixel(x, y, Luma([220]));
                }
            }
        }
        let features = cell_features(&gray, &flat_saturation(64, 64), 32.0, 32.0, 8.0, 30.0);
        assert!(features.in_image);
        assert!(features.contrast > 50.0, "contrast {}", features.contrast);
        assert!(features.edge_density > 0.0);
    }

    #[test]
    fn empty_cell_has_near_zero_contrast() {
        let gray = GrayImage::from_pixel(64, 64, Luma([200]));
        let features = cell_features(&gray, &flat_saturation(64, 64), 32.0, 32.0, 8.0, 30.0);
        assert!(features.in_image);
        assert!(features.contrast.abs() < 1.0);
        assert_eq!(features.edge_density, 0.0);
    }

    #[test]
    fn saturation_is_averaged_over_the_ring() {
        let rgba = RgbaImage::from_pixel(64, 64, Rgba([255, 0, 0, 255]));
        let saturation = SaturationPlane::from_rgba(&rgba);
        let gray = image::imageops::grayscale(&rgba);
        let features = cell_features(&gray, &saturation, 32.0, 32.0, 8.0, 30.0);
        assert!((features.saturation - 255.0).abs() < 1e-6);
    }

    #[test]
    fn border_cells_are_flagged_out_of_image() {
        let gray = GrayImage::from_pixel(32, 32, Luma([100]));
        let features = cell_features(&gray, &flat_saturation(32, 32), 3.0, 16.0, 8.0, 30.0);
        assert!(!features.in_image);
    }
}
