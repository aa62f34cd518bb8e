//! Nan-aware robust statistics shared by the binning, ramp and
//! cross-matching stages.
//!
//! All reducers ignore NaN entries and return NaN when no finite value
//! remains. Percentiles use linear interpolation between order statistics
//! and the standard deviation is the population (not sample) definition,
//! matching the conventions of the upstream numerical stack.

use crate::types::PointSeries;

/// Finite values of a series, in ascending order.
fn sorted_clean(values: &PointSeries) -> Vec<f64> {
    let mut clean: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    clean.sort_unstable_by(|a, b| a.total_cmp(b));
    clean
}

/// Mean of the finite values.
pub fn nan_mean(values: &PointSeries) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for &v in values.iter() {
        if !v.is_nan() {
            sum += v;
            count += 1;
        }
    }
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Population standard deviation of the finite values.
pub fn nan_std(values: &PointSeries) -> f64 {
    let mean = nan_mean(values);
    if mean.is_nan() {
        return f64::NAN;
    }
    let mut sum_sq = 0.0;
    let mut count = 0usize;
    for &v in values.iter() {
        if !v.is_nan() {
            sum_sq += (v - mean) * (v - mean);
            count += 1;
        }
    }
    (sum_sq / count as f64).sqrt()
}

/// q-th percentile (0-100) of the finite values, linearly interpolated.
pub fn nan_percentile(values: &PointSeries, q: f64) -> f64 {
    let clean = sorted_clean(values);
    if clean.is_empty() {
        return f64::NAN;
    }
    let n = clean.len();
    let rank = q / 100.0 * (n - 1) as f64;
    if rank <= 0.0 {
        return clean[0];
    }
    if rank >= (n - 1) as f64 {
        return clean[n - 1];
    }
    let lo = rank.floor() as usize;
    let frac = rank - lo as f64;
    clean[lo] + (clean[lo + 1] - clean[lo]) * frac
}

/// Median of the finite values.
pub fn nan_median(values: &PointSeries) -> f64 {
    nan_percentile(values, 50.0)
}

/// Pearson correlation coefficient over pairs where both values are finite.
pub fn pearson(a: &PointSeries, b: &PointSeries) -> f64 {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b.iter())
        .filter(|(&x, &y)| !x.is_nan() && !y.is_nan())
        .map(|(&x, &y)| (x, y))
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }
    let n = pairs.len() as f64;
    let mean_a = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_b = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in pairs {
        cov += (x - mean_a) * (y - mean_b);
        var_a += (x - mean_a) * (x - mean_a);
        var_b += (y - mean_b) * (y - mean_b);
    }
    cov / (var_a.sqrt() * var_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_nan_mean_ignores_nan() {
        let values = array![1.0, f64::NAN, 3.0];
        assert_relative_eq!(nan_mean(&values), 2.0);
    }

    #[test]
    fn test_nan_mean_empty_is_nan() {
        let values = array![f64::NAN, f64::NAN];
        assert!(nan_mean(&values).is_nan());
    }

    #[test]
    fn test_nan_median_even_count() {
        let values = array![4.0, 1.0, 3.0, 2.0];
        assert_relative_eq!(nan_median(&values), 2.5);
    }

    #[test]
    fn test_nan_median_ignores_nan() {
        let values = array![1.0, f64::NAN, 3.0];
        assert_relative_eq!(nan_median(&values), 2.0);
    }

    #[test]
    fn test_percentile_linear_interpolation() {
        let values = array![1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(nan_percentile(&values, 25.0), 1.75);
        assert_relative_eq!(nan_percentile(&values, 50.0), 2.5);
        assert_relative_eq!(nan_percentile(&values, 100.0), 4.0);
        assert_relative_eq!(nan_percentile(&values, 0.0), 1.0);
    }

    #[test]
    fn test_percentile_long_series() {
        let values = PointSeries::from_iter((0..100).map(|i| i as f64));
        assert_relative_eq!(nan_percentile(&values, 95.0), 94.05);
        assert_relative_eq!(nan_percentile(&values, 5.0), 4.95);
    }

    #[test]
    fn test_nan_std_population() {
        let values = array![1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(nan_std(&values), 1.25_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_nan_std_single_value_is_zero() {
        let values = array![7.0];
        assert_relative_eq!(nan_std(&values), 0.0);
    }

    #[test]
    fn test_pearson_linear() {
        let a = array![1.0, 2.0, 3.0, 4.0];
        let b = array![2.0, 4.0, 6.0, 8.0];
        assert_relative_eq!(pearson(&a, &b), 1.0, epsilon = 1e-12);
        let c = array![8.0, 6.0, 4.0, 2.0];
        assert_relative_eq!(pearson(&a, &c), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_pearson_drops_nan_pairs() {
        let a = array![1.0, 2.0, f64::NAN, 4.0];
        let b = array![2.0, 4.0, 100.0, 8.0];
        assert_relative_eq!(pearson(&a, &b), 1.0, epsilon = 1e-12);
    }
}
