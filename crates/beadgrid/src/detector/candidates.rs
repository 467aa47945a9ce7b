//! Candidate bead-center detectors.
//!
//! Three independent detectors feed the candidate cloud: a gradient-voting
//! circle detector (votes cast along gradient directions converge at the
//! centers of circular beads), a ring-contrast window sampler, and a
//! saturation window sampler. Their outputs are unioned and then
//! non-maximum-suppressed; precise sources win over coarse ones.

use image::{GrayImage, RgbaImage};

use crate::color::{rgb_to_hsv, Rgb8};
use crate::detector::config::{CirclePreset, DetectorConfig};

/// Which detector produced a candidate. Order is precision rank: earlier
/// variants suppress later ones inside the NMS radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum CandidateSource {
    Circle,
    RingContrast,
    Saturation,
}

/// A candidate bead center in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Candidate {
    pub x: f64,
    pub y: f64,
    pub score: f32,
    pub source: CandidateSource,
}

/// Run all detectors and reduce the union with NMS.
pub(crate) fn gather_candidates(
    gray: &GrayImage,
    rgba: &RgbaImage,
    config: &DetectorConfig,
) -> Vec<Candidate> {
    let mut all = circle_candidates(
        gray,
        config.circle_radius_range,
        config.circle_gradient_fraction,
        &config.circle_presets,
    );
    all.extend(ring_contrast_candidates(gray, config));
    all.extend(saturation_candidates(rgba, config));
    non_max_suppress(all, config.nms_radius)
}

/// Deposit a weighted vote into the accumulator with bilinear splatting.
#[inline]
fn bilinear_add(accum: &mut [f32], stride: usize, x: f32, y: f32, weight: f32) {
    let x0 = x as usize;
    let y0 = y as usize;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;
    let base = y0 * stride + x0;
    accum[base] += weight * (1.0 - fx) * (1.0 - fy);
    accum[base + 1] += weight * fx * (1.0 - fy);
    accum[base + stride] += weight * (1.0 - fx) * fy;
    accum[base + stride + 1] += weight * fx * fy;
}

/// Gradient-voting circle detection.
///
/// Every strong-gradient pixel votes along its gradient direction (both
/// polarities) at each radius in the candidate range. Bead centers collect
/// votes from their whole rim; peaks are extracted once per preset against
/// that preset's threshold and minimum center distance, and the peak sets
/// are unioned.
fn circle_candidates(
    gray: &GrayImage,
    radius_range: [f64; 2],
    gradient_fraction: f32,
    presets: &[CirclePreset],
) -> Vec<Candidate> {
    let (w, h) = gray.dimensions();
    if w < 8 || h < 8 {
        return Vec::new();
    }

    let gx = imageproc::gradients::horizontal_scharr(gray);
    let gy = imageproc::gradients::vertical_scharr(gray);
    let gx_raw = gx.as_raw();
    let gy_raw = gy.as_raw();

    let mut max_mag_sq = 0.0f32;
    for (&gxv, &gyv) in gx_raw.iter().zip(gy_raw.iter()) {
        let (gxv, gyv) = (gxv as f32, gyv as f32);
        max_mag_sq = max_mag_sq.max(gxv * gxv + gyv * gyv);
    }
    if max_mag_sq < 1e-6 {
        return Vec::new();
    }
    let threshold_sq = max_mag_sq * gradient_fraction * gradient_fraction;

    let stride = w as usize;
    let mut accum = vec![0.0f32; stride * h as usize];
    let r_min = radius_range[0].max(1.0) as f32;
    let r_max = radius_range[1] as f32;
    let mut radii = Vec::new();
    let mut r = r_min;
    while r <= r_max {
        radii.push(r);
        r += 1.0;
    }

    let x_limit = (w - 1) as f32;
    let y_limit = (h - 1) as f32;
    for y in 0..h as usize {
        for x in 0..stride {
            let idx = y * stride + x;
            let gxv = gx_raw[idx] as f32;
            let gyv = gy_raw[idx] as f32;
            let mag_sq = gxv * gxv + gyv * gyv;
            if mag_sq < threshold_sq {
                continue;
            }
            let inv_mag = mag_sq.sqrt().recip();
            let dx = gxv * inv_mag;
            let dy = gyv * inv_mag;
            let (xf, yf) = (x as f32, y as f32);
            for &r in &radii {
                for sign in [1.0f32, -1.0] {
                    let vx = xf + sign * dx * r;
                    let vy = yf + sign * dy * r;
                    if vx >= 0.0 && vx < x_limit && vy >= 0.0 && vy < y_limit {
                        bilinear_add(&mut accum, stride, vx, vy, 1.0);
                    }
                }
            }
        }
    }

    let mut out = Vec::new();
    for preset in presets {
        out.extend(accumulator_peaks(&accum, w, h, preset));
    }
    out
}

/// Extract local maxima from the vote accumulator for one preset.
fn accumulator_peaks(accum: &[f32], w: u32, h: u32, preset: &CirclePreset) -> Vec<Candidate> {
    let stride = w as usize;
    let radius = preset.min_distance.ceil() as i64;
    let radius_sq = preset.min_distance * preset.min_distance;

    let mut peaks = Vec::new();
    for y in 0..h as i64 {
        for x in 0..w as i64 {
            let val = accum[y as usize * stride + x as usize];
            if val < preset.accumulator_threshold {
                continue;
            }
            let mut is_max = true;
            'scan: for dy in -radius..=radius {
                let ny = y + dy;
                if ny < 0 || ny >= h as i64 {
                    continue;
                }
                for dx in -radius..=radius {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    if (dx * dx + dy * dy) as f64 > radius_sq {
                        continue;
                    }
                    let nx = x + dx;
                    if nx < 0 || nx >= w as i64 {
                        continue;
                    }
                    let nidx = ny as usize * stride + nx as usize;
                    let nval = accum[nidx];
                    let idx = y as usize * stride + x as usize;
                    if nval > val || (nval == val && nidx < idx) {
                        is_max = false;
                        break 'scan;
                    }
                }
            }
            if is_max {
                peaks.push(Candidate {
                    x: x as f64,
                    y: y as f64,
                    score: val,
                    source: CandidateSource::Circle,
                });
            }
        }
    }
    peaks
}

/// Windowed ring-contrast sampler: emits positions where a bright annulus
/// surrounds a darker core (a bead seen from above).
fn ring_contrast_candidates(gray: &GrayImage, config: &DetectorConfig) -> Vec<Candidate> {
    let (w, h) = gray.dimensions();
    let win = config.ring_window;
    let step = config.ring_step.max(1);
    if w < win || h < win {
        return Vec::new();
    }
    let half = win as f64 / 2.0;
    let inner = half * 0.4;
    let outer = half * 0.8;

    let mut out = Vec::new();
    let mut y = 0;
    while y + win <= h {
        let mut x = 0;
        while x + win <= w {
            let cx = x as f64 + half;
            let cy = y as f64 + half;
            if let Some(contrast) = ring_center_contrast(gray, cx, cy, inner, outer) {
                if contrast > config.ring_contrast_min {
                    out.push(Candidate {
                        x: cx,
                        y: cy,
                        score: contrast as f32,
                        source: CandidateSource::RingContrast,
                    });
                }
            }
            x += step;
        }
        y += step;
    }
    out
}

/// `ring_mean - center_mean` over concentric regions, or `None` when either
/// region has no pixels inside the image.
pub(crate) fn ring_center_contrast(
    gray: &GrayImage,
    cx: f64,
    cy: f64,
    inner: f64,
    outer: f64,
) -> Option<f64> {
    let (w, h) = gray.dimensions();
    let mut center_sum = 0.0;
    let mut center_n = 0u32;
    let mut ring_sum = 0.0;
    let mut ring_n = 0u32;

    let r_scan = outer.ceil() as i64;
    for dy in -r_scan..=r_scan {
        for dx in -r_scan..=r_scan {
            let px = cx.round() as i64 + dx;
            let py = cy.round() as i64 + dy;
            if px < 0 || py < 0 || px >= w as i64 || py >= h as i64 {
                continue;
            }
            let d = ((dx * dx + dy * dy) as f64).sqrt();
            let v = gray.get_pixel(px as u32, py as u32)[0] as f64;
            if d <= inner {
                center_sum += v;
                center_n += 1;
            } else if d <= outer {
                ring_sum += v;
                ring_n += 1;
            }
        }
    }
    if center_n == 0 || ring_n == 0 {
        return None;
    }
    Some(ring_sum / ring_n as f64 - center_sum / center_n as f64)
}

/// Windowed saturation sampler: emits positions with a saturated 7×7
/// neighborhood (colored beads on a neutral board).
fn saturation_candidates(rgba: &RgbaImage, config: &DetectorConfig) -> Vec<Candidate> {
    let (w, h) = rgba.dimensions();
    let win = config.saturation_window;
    let step = config.saturation_step.max(1);
    if w < win || h < win {
        return Vec::new();
    }

    let mut out = Vec::new();
    let mut y = 0;
    while y + win <= h {
        let mut x = 0;
        while x + win <= w {
            let cx = x + win / 2;
            let cy = y + win / 2;
            let mean_s = neighborhood_saturation(rgba, cx, cy, 3);
            if mean_s > config.saturation_min {
                out.push(Candidate {
                    x: cx as f64,
                    y: cy as f64,
                    score: mean_s as f32,
                    source: CandidateSource::Saturation,
                });
            }
            x += step;
        }
        y += step;
    }
    out
}

fn neighborhood_saturation(rgba: &RgbaImage, cx: u32, cy: u32, half: i64) -> f64 {
    let (w, h) = rgba.dimensions();
    let mut sum = 0.0;
    let mut n = 0u32;
    for dy in -half..=half {
        for dx in -half..=half {
            let px = cx as i64 + dx;
            let py = cy as i64 + dy;
            if px < 0 || py < 0 || px >= w as i64 || py >= h as i64 {
                continue;
            }
            let p = rgba.get_pixel(px as u32, py as u32);
            sum += rgb_to_hsv(Rgb8::new(p[0], p[1], p[2])).s;
            n += 1;
        }
    }
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

/// Greedy NMS over the unioned candidates: precise sources first, then
/// higher scores; later candidates within `radius` of a kept one are
/// dropped.
fn non_max_suppress(mut candidates: Vec<Candidate>, radius: f64) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        a.source
            .cmp(&b.source)
            .then(b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal))
    });
    let radius_sq = radius * radius;
    let mut kept: Vec<Candidate> = Vec::new();
    for cand in candidates {
        let suppressed = kept.iter().any(|k| {
            let dx = k.x - cand.x;
            let dy = k.y - cand.y;
            dx * dx + dy * dy < radius_sq
        });
        if !suppressed {
            kept.push(cand);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::draw_disk_lattice;
    use image::Rgba;

    #[test]
    fn circle_votes_find_disk_centers() {
        let rgba = draw_disk_lattice(128, 128, 32.0, 32.0, 32.0, 3, 3, 6.0, [40, 40, 40], None);
        let gray = image::imageops::grayscale(&rgba);
        let config = DetectorConfig::default();
        let candidates = circle_candidates(
            &gray,
            config.circle_radius_range,
            config.circle_gradient_fraction,
            &config.circle_presets,
        );
        let candidates = non_max_suppress(candidates, config.nms_radius);
        assert_eq!(candidates.len(), 9, "one candidate per disk");
        for row in 0..3 {
            for col in 0..3 {
                let (ex, ey) = (32.0 + col as f64 * 32.0, 32.0 + row as f64 * 32.0);
                let hit = candidates
                    .iter()
                    .any(|c| (c.x - ex).abs() <= 2.0 && (c.y - ey).abs() <= 2.0);
                assert!(hit, "no candidate near ({ex},{ey}): {candidates:?}");
            }
        }
    }

    #[test]
    fn ring_contrast_fires_on_annular_beads() {
        // A bright ring around a dark hole, the bead signature.
        let mut rgba = RgbaImage::from_pixel(48, 48, Rgba([80, 80, 80, 255]));
        for y in 0..48 {
            for x in 0..48 {
                let d = (((x as f64) - 24.0).powi(2) + ((y as f64) - 24.0).powi(2)).sqrt();
                if d < 2.5 {
                    rgba.put_pixel(x, y, Rgba([20, 20, 20, 255]));
                } else if d < 5.0 {
                    rgba.put_pixel(x, y, Rgba([230, 230, 230, 255]));
                }
            }
        }
        let gray = image::imageops::grayscale(&rgba);
        let candidates = ring_contrast_candidates(&gray, &DetectorConfig::default());
        assert!(
            candidates
                .iter()
                .any(|c| (c.x - 24.0).abs() <= 6.0 && (c.y - 24.0).abs() <= 6.0),
            "no ring-contrast candidate near the bead: {candidates:?}"
        );
    }

    #[test]
    fn saturation_sampler_fires_on_colored_regions() {
        let mut rgba = RgbaImage::from_pixel(64, 64, Rgba([128, 128, 128, 255]));
        for y in 16..32 {
            for x in 16..32 {
                rgba.put_pixel(x, y, Rgba([255, 0, 0, 255]));
            }
        }
        let candidates = saturation_candidates(&rgba, &DetectorConfig::default());
        assert!(!candidates.is_empty());
        assert!(candidates
            .iter()
            .all(|c| c.source == CandidateSource::Saturation));
        assert!(candidates
            .iter()
            .any(|c| c.x >= 16.0 && c.x < 32.0 && c.y >= 16.0 && c.y < 32.0));
    }

    #[test]
    fn nms_prefers_precise_sources() {
        let candidates = vec![
            Candidate {
                x: 10.0,
                y: 10.0,
                score: 500.0,
                source: CandidateSource::RingContrast,
            },
            Candidate {
                x: 12.0,
                y: 10.0,
                score: 30.0,
                source: CandidateSource::Circle,
            },
        ];
        let kept = non_max_suppress(candidates, 8.0);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].source, CandidateSource::Circle);
    }
}
