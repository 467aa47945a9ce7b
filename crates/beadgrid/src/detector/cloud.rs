//! Candidate-cloud grid estimation: pitch from nearest-neighbor spacing,
//! active bounds from coordinate percentiles, origin from the top-left
//! surviving candidate.

use crate::detector::candidates::Candidate;
use crate::detector::config::DetectorConfig;
use crate::detector::GridModel;

/// Estimate a grid model from the candidate cloud. The pitch estimate is
/// reported separately so failed detections can still be diagnosed.
pub(crate) fn estimate_from_cloud(
    candidates: &[Candidate],
    image_size: [u32; 2],
    config: &DetectorConfig,
) -> (Option<GridModel>, Option<f64>) {
    if candidates.len() < 2 {
        return (None, None);
    }

    let Some(raw_pitch) = median_neighbor_distance(candidates) else {
        return (None, None);
    };
    let pitch = raw_pitch.clamp(config.cloud_pitch_range[0], config.cloud_pitch_range[1]);

    // Candidates with too few neighbors are isolated speckle; the active
    // board area is estimated from the rest.
    let neighbor_radius = config.neighbor_radius_factor * pitch;
    let survivors: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| {
            let neighbors = candidates
                .iter()
                .filter(|o| {
                    let dx = c.x - o.x;
                    let dy = c.y - o.y;
                    let d_sq = dx * dx + dy * dy;
                    d_sq > 0.0 && d_sq <= neighbor_radius * neighbor_radius
                })
                .count();
            neighbors >= config.min_neighbors
        })
        .collect();
    if survivors.is_empty() {
        return (None, Some(pitch));
    }

    let mut xs: Vec<f64> = survivors.iter().map(|c| c.x).collect();
    let mut ys: Vec<f64> = survivors.iter().map(|c| c.y).collect();
    xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
    ys.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let inflation = config.bounds_inflation * pitch;
    let min_x = percentile(&xs, config.bounds_percentile) - inflation;
    let max_x = percentile(&xs, 1.0 - config.bounds_percentile) + inflation;
    let min_y = percentile(&ys, config.bounds_percentile) - inflation;
    let max_y = percentile(&ys, 1.0 - config.bounds_percentile) + inflation;

    // Origin: surviving candidate closest to the bounds' top-left corner.
    let Some(origin) = survivors.iter().min_by(|a, b| {
        let da = (a.x - min_x).abs() + (a.y - min_y).abs();
        let db = (b.x - min_x).abs() + (b.y - min_y).abs();
        da.partial_cmp(&db).unwrap()
    }) else {
        return (None, Some(pitch));
    };

    let rows = ((max_y - origin.y) / pitch).round() as i64 + 1;
    let cols = ((max_x - origin.x) / pitch).round() as i64 + 1;
    if rows < 1 || cols < 1 {
        return (None, Some(pitch));
    }

    let confidence =
        (candidates.len() as f64 / (0.5 * rows as f64 * cols as f64)).min(1.0) as f32;

    let model = GridModel::clamped(
        pitch,
        pitch,
        origin.x,
        origin.y,
        rows as usize,
        cols as usize,
        confidence,
        image_size,
    );
    (model, Some(pitch))
}

/// Median of per-candidate nearest-neighbor distances.
fn median_neighbor_distance(candidates: &[Candidate]) -> Option<f64> {
    let mut distances: Vec<f64> = candidates
        .iter()
        .enumerate()
        .filter_map(|(i, c)| {
            candidates
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, o)| {
                    let dx = c.x - o.x;
                    let dy = c.y - o.y;
                    (dx * dx + dy * dy).sqrt()
                })
                .min_by(|a, b| a.partial_cmp(b).unwrap())
        })
        .collect();
    if distances.is_empty() {
        return None;
    }
    distances.sort_by(|a, b| a.partial_cmp(b).unwrap());
    Some(distances[distances.len() / 2])
}

/// Nearest-rank percentile of a sorted slice, `p` in `[0, 1]`.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let idx = (p * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}
