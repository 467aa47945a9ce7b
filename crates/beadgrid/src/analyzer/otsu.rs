//! Otsu threshold over a scalar population.

/// Number of histogram bins used to discretize the population.
const BINS: usize = 256;

/// Otsu's threshold: the split maximizing inter-class variance.
///
/// Returns the population minimum for empty or constant inputs. The result
/// is a value in the population's range; samples strictly above it fall in
/// the upper class.
pub(crate) fn otsu_threshold(values: &[f64]) -> f64 {
    let Some(&first) = values.first() else {
        return 0.0;
    };
    let (min, max) = values.iter().fold((first, first), |(lo, hi), &v| {
        (lo.min(v), hi.max(v))
    });
    if max - min < 1e-12 {
        return min;
    }

    let scale = (BINS - 1) as f64 / (max - min);
    let mut hist = [0usize; BINS];
    for &v in values {
        let bin = (((v - min) * scale).round() as usize).min(BINS - 1);
        hist[bin] += 1;
    }

    let total = values.len() as f64;
    let total_mean: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &n)| i as f64 * n as f64)
        .sum::<f64>()
        / total;

    let mut best_bin = 0usize;
    let mut best_var = -1.0f64;
    let mut w0 = 0.0f64;
    let mut sum0 = 0.0f64;
    for (i, &n) in hist.iter().enumerate() {
        w0 += n as f64;
        sum0 += i as f64 * n as f64;
        let w1 = total - w0;
        if w0 == 0.0 || w1 == 0.0 {
            continue;
        }
        let mean0 = sum0 / w0;
        let mean1 = (total_mean * total - sum0) / w1;
        let between = w0 * w1 * (mean0 - mean1) * (mean0 - mean1);
        if between > best_var {
            best_var = between;
            best_bin = i;
        }
    }

    min + best_bin as f64 / scale
}

/// Mean and standard deviation of a population.
pub(crate) fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (mean, var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn separates_a_bimodal_population() {
        let mut values = vec![2.0; 40];
        values.extend(std::iter::repeat(90.0).take(60));
        let t = otsu_threshold(&values);
        assert!((2.0..90.0).contains(&t), "threshold {t}");
        // The low mode stays at or below the threshold, the high mode above.
        assert_eq!(values.iter().filter(|&&v| v > t).count(), 60);
    }

    #[test]
    fn noisy_bimodal_population_splits_between_the_modes() {
        let mut values: Vec<f64> = (0..40).map(|i| 2.0 + (i % 5) as f64).collect();
        values.extend((0..60).map(|i| 85.0 + (i % 7) as f64));
        let t = otsu_threshold(&values);
        assert!(t > 5.0 && t < 85.0, "threshold {t}");
    }

    #[test]
    fn constant_population_returns_the_value() {
        let values = vec![13.5; 10];
        assert_abs_diff_eq!(otsu_threshold(&values), 13.5, epsilon = 1e-9);
    }

    #[test]
    fn empty_population_is_zero() {
        assert_eq!(otsu_threshold(&[]), 0.0);
    }

    #[test]
    fn mean_std_basics() {
        let (mean, std) = mean_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_abs_diff_eq!(mean, 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(std, 2.0, epsilon = 1e-12);
    }
}
