//! Descriptive statistics over replicate samples.
//!
//! All functions treat `NaN` as an ordinary value; callers drop missing
//! replicates first with [`drop_missing`] where that matters.

/// Copy of `values` without missing (`NaN`) entries.
pub fn drop_missing(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| !v.is_nan()).collect()
}

/// Arithmetic mean; `NaN` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Variance with `ddof` delta degrees of freedom; `NaN` when `n <= ddof`.
pub fn variance(values: &[f64], ddof: usize) -> f64 {
    let n = values.len();
    if n <= ddof {
        return f64::NAN;
    }
    let m = mean(values);
    values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (n - ddof) as f64
}

/// Population standard deviation (ddof = 0).
pub fn std_population(values: &[f64]) -> f64 {
    variance(values, 0).sqrt()
}

/// Median; `NaN` for an empty slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Whether every value equals the first one (true for empty and singleton slices).
pub fn all_equal(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_and_variance() {
        let x = [45.0, 52.0, 48.0];
        assert_relative_eq!(mean(&x), 48.333333333, epsilon = 1e-8);
        assert_relative_eq!(variance(&x, 1), 12.333333333, epsilon = 1e-8);
        assert_relative_eq!(std_population(&x), (74.0_f64 / 9.0).sqrt(), epsilon = 1e-10);
        assert!(mean(&[]).is_nan());
        assert!(variance(&[1.0], 1).is_nan());
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert!(median(&[]).is_nan());
    }

    #[test]
    fn test_drop_missing_and_all_equal() {
        assert_eq!(drop_missing(&[1.0, f64::NAN, 2.0]), vec![1.0, 2.0]);
        assert!(all_equal(&[5.0, 5.0, 5.0]));
        assert!(all_equal(&[7.0]));
        assert!(!all_equal(&[5.0, 6.0]));
    }
}
