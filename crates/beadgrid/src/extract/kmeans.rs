//! Seeded K-means over 3-D color samples with K-means++ initialization.

use rand::rngs::StdRng;
use rand::Rng;

/// Result of one K-means run.
#[derive(Debug, Clone)]
pub(crate) struct KmeansRun {
    /// Cluster centers.
    pub centers: Vec<[f64; 3]>,
    /// Sample count per cluster.
    pub sizes: Vec<usize>,
    /// Sum of squared distances of samples to their centers.
    pub inertia: f64,
}

impl KmeansRun {
    /// Index of the most populated cluster.
    pub fn largest_cluster(&self) -> usize {
        self.sizes
            .iter()
            .enumerate()
            .max_by_key(|&(_, &n)| n)
            .map(|(i, _)| i)
            .unwrap_or(0)
    }
}

fn dist_sq(a: [f64; 3], b: [f64; 3]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    dx * dx + dy * dy + dz * dz
}

/// K-means++ seeding. Stops early when every remaining sample coincides
/// with a chosen center, so duplicate-heavy data yields fewer clusters
/// instead of empty ones.
fn seed_centers(samples: &[[f64; 3]], k: usize, rng: &mut StdRng) -> Vec<[f64; 3]> {
    let mut centers = Vec::with_capacity(k);
    centers.push(samples[rng.gen_range(0..samples.len())]);

    let mut d_sq: Vec<f64> = samples
        .iter()
        .map(|&s| dist_sq(s, centers[0]))
        .collect();
    while centers.len() < k {
        let total: f64 = d_sq.iter().sum();
        if total <= 1e-12 {
            break;
        }
        let mut target = rng.gen::<f64>() * total;
        let mut chosen = samples.len() - 1;
        for (i, &d) in d_sq.iter().enumerate() {
            target -= d;
            if target <= 0.0 {
                chosen = i;
                break;
            }
        }
        let center = samples[chosen];
        centers.push(center);
        for (d, &s) in d_sq.iter_mut().zip(samples) {
            *d = d.min(dist_sq(s, center));
        }
    }
    centers
}

/// Lloyd iterations from a seeded start. Converges when no center moves
/// farther than `epsilon`.
fn lloyd(
    samples: &[[f64; 3]],
    mut centers: Vec<[f64; 3]>,
    max_iters: usize,
    epsilon: f64,
) -> KmeansRun {
    let k = centers.len();
    let mut assignment = vec![0usize; samples.len()];

    for _ in 0..max_iters {
        for (slot, &s) in assignment.iter_mut().zip(samples) {
            let mut best = 0;
            let mut best_d = f64::MAX;
            for (ci, &c) in centers.iter().enumerate() {
                let d = dist_sq(s, c);
                if d < best_d {
                    best_d = d;
                    best = ci;
                }
            }
            *slot = best;
        }

        let mut sums = vec![[0.0f64; 3]; k];
        let mut counts = vec![0usize; k];
        for (&ci, &s) in assignment.iter().zip(samples) {
            sums[ci][0] += s[0];
            sums[ci][1] += s[1];
            sums[ci][2] += s[2];
            counts[ci] += 1;
        }

        let mut max_shift = 0.0f64;
        for ci in 0..k {
            if counts[ci] == 0 {
                continue;
            }
            let n = counts[ci] as f64;
            let new_center = [sums[ci][0] / n, sums[ci][1] / n, sums[ci][2] / n];
            max_shift = max_shift.max(dist_sq(new_center, centers[ci]).sqrt());
            centers[ci] = new_center;
        }
        if max_shift < epsilon {
            break;
        }
    }

    // Final assignment against the settled centers.
    let mut sizes = vec![0usize; k];
    let mut inertia = 0.0;
    for &s in samples {
        let mut best = 0;
        let mut best_d = f64::MAX;
        for (ci, &c) in centers.iter().enumerate() {
            let d = dist_sq(s, c);
            if d < best_d {
                best_d = d;
                best = ci;
            }
        }
        sizes[best] += 1;
        inertia += best_d;
    }

    KmeansRun {
        centers,
        sizes,
        inertia,
    }
}

/// Run K-means with `restarts` independent seedings, keeping the lowest
/// inertia. Returns `None` for an empty sample set.
pub(crate) fn kmeans(
    samples: &[[f64; 3]],
    k: usize,
    max_iters: usize,
    epsilon: f64,
    restarts: usize,
    rng: &mut StdRng,
) -> Option<KmeansRun> {
    if samples.is_empty() || k == 0 {
        return None;
    }
    let k = k.min(samples.len());

    let mut best: Option<KmeansRun> = None;
    for _ in 0..restarts.max(1) {
        let centers = seed_centers(samples, k, rng);
        let run = lloyd(samples, centers, max_iters, epsilon);
        match &best {
            Some(b) if b.inertia <= run.inertia => {}
            _ => best = Some(run),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn blob(center: [f64; 3], spread: f64, n: usize, rng: &mut StdRng) -> Vec<[f64; 3]> {
        (0..n)
            .map(|_| {
                [
                    center[0] + (rng.gen::<f64>() - 0.5) * spread,
                    center[1] + (rng.gen::<f64>() - 0.5) * spread,
                    center[2] + (rng.gen::<f64>() - 0.5) * spread,
                ]
            })
            .collect()
    }

    #[test]
    fn recovers_three_separated_blobs() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut samples = blob([0.1, 0.1, 0.1], 0.02, 50, &mut rng);
        samples.extend(blob([0.9, 0.1, 0.2], 0.02, 80, &mut rng));
        samples.extend(blob([0.4, 0.8, 0.9], 0.02, 30, &mut rng));

        let run = kmeans(&samples, 3, 50, 1e-3, 3, &mut rng).unwrap();
        assert_eq!(run.centers.len(), 3);
        let mut sizes = run.sizes.clone();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![30, 50, 80]);

        let largest = run.largest_cluster();
        let c = run.centers[largest];
        assert!((c[0] - 0.9).abs() < 0.05 && (c[1] - 0.1).abs() < 0.05);
    }

    #[test]
    fn duplicate_samples_collapse_the_cluster_count() {
        // Two distinct values: seeding cannot place a third center.
        let mut samples = vec![[0.2, 0.2, 0.2]; 60];
        samples.extend(vec![[0.8, 0.8, 0.8]; 40]);
        let mut rng = StdRng::seed_from_u64(3);
        let run = kmeans(&samples, 3, 50, 1e-3, 3, &mut rng).unwrap();
        assert_eq!(run.centers.len(), 2);
        assert_eq!(run.sizes[run.largest_cluster()], 60);
        assert!(run.inertia < 1e-9);
    }

    #[test]
    fn deterministic_for_a_fixed_seed() {
        let mut rng_a = StdRng::seed_from_u64(11);
        let mut samples = blob([0.3, 0.3, 0.3], 0.1, 40, &mut rng_a);
        samples.extend(blob([0.7, 0.7, 0.7], 0.1, 40, &mut rng_a));

        let mut rng1 = StdRng::seed_from_u64(99);
        let mut rng2 = StdRng::seed_from_u64(99);
        let a = kmeans(&samples, 3, 50, 1e-3, 3, &mut rng1).unwrap();
        let b = kmeans(&samples, 3, 50, 1e-3, 3, &mut rng2).unwrap();
        assert_eq!(a.centers, b.centers);
        assert_eq!(a.sizes, b.sizes);
    }

    #[test]
    fn empty_input_is_none() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(kmeans(&[], 3, 50, 1e-3, 3, &mut rng).is_none());
    }
}
