use statrs::distribution::{ContinuousCDF, Normal};

/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Computes the sample standard deviation (n - 1 denominator) given a
/// pre-computed mean. Returns 0.0 when fewer than two values are present.
pub fn sample_stddev(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;

    variance.sqrt()
}

/// Median of the values; averages the two middle values for even lengths.
/// Returns 0.0 for empty input.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// `numerator / denominator`, with a zero denominator mapped to +inf when
/// the numerator is positive and 0.0 otherwise.
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        if numerator > 0.0 { f64::INFINITY } else { 0.0 }
    } else {
        numerator / denominator
    }
}

/// Two-tailed p-value under the standard normal: 2 * (1 - Phi(|z|)).
///
/// Uses the survival function so large |z| keeps precision instead of
/// rounding to zero. Infinite z gives 0.0, NaN gives NaN.
pub fn two_tailed_p_value(z: f64) -> f64 {
    if z.is_nan() {
        return f64::NAN;
    }
    match Normal::new(0.0, 1.0) {
        Ok(normal) => (2.0 * normal.sf(z.abs())).min(1.0),
        Err(_) => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), 2.0);
    }

    #[test]
    fn test_sample_stddev() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(sample_stddev(&values, mean(&values)), 2.138089935, epsilon = 1e-9);
        assert_eq!(sample_stddev(&[10.0], 10.0), 0.0);
        assert_eq!(sample_stddev(&[10.0, 10.0, 10.0, 10.0], 10.0), 0.0);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[]), 0.0);
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn test_safe_ratio() {
        assert_eq!(safe_ratio(6.0, 3.0), 2.0);
        assert_eq!(safe_ratio(1.0, 0.0), f64::INFINITY);
        assert_eq!(safe_ratio(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_two_tailed_p_value() {
        assert_relative_eq!(two_tailed_p_value(0.0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(two_tailed_p_value(1.959963985), 0.05, epsilon = 1e-6);
        assert_relative_eq!(two_tailed_p_value(-3.0), 0.0026997961, epsilon = 1e-8);
        assert_eq!(two_tailed_p_value(f64::INFINITY), 0.0);
        assert!(two_tailed_p_value(f64::NAN).is_nan());
    }

    #[test]
    fn test_p_value_keeps_precision_for_large_z() {
        let p = two_tailed_p_value(10.0);
        assert!(p > 0.0 && p < 1e-20);
    }
}
