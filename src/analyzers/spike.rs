//! Spike-period analysis: observed vs. expected outliers.

use crate::analyzers::types::SpikeAnalysis;
use crate::analyzers::utility::{mean, safe_ratio, two_tailed_p_value};
use crate::analyzers::zscore::{is_outlier, max_z_day};
use crate::config::{DEFAULT_THRESHOLD, DateRange};
use crate::series::{StarDay, in_period};

/// P(|z| > 3) under a standard normal, rounded as it is usually quoted.
pub const EXPECTED_OUTLIER_RATE: f64 = 0.0027;

/// Share of days expected beyond `threshold` standard deviations.
pub fn expected_outlier_rate(threshold: f64) -> f64 {
    if threshold == DEFAULT_THRESHOLD {
        EXPECTED_OUTLIER_RATE
    } else {
        two_tailed_p_value(threshold)
    }
}

/// Observed outliers per expected outlier. Zero expected is +inf.
pub fn outlier_ratio(observed: usize, expected: f64) -> f64 {
    if expected > 0.0 {
        observed as f64 / expected
    } else {
        f64::INFINITY
    }
}

/// Analyses the z-scored days inside `range` against the baseline mean.
///
/// Returns `None` when the period matches no rows.
pub fn analyze_spike_period(
    series: &[StarDay],
    range: &DateRange,
    baseline_mean: f64,
    threshold: f64,
) -> Option<SpikeAnalysis> {
    let days: Vec<&StarDay> = in_period(series, range).collect();
    if days.is_empty() {
        return None;
    }

    let values: Vec<f64> = days.iter().map(|d| d.stars as f64).collect();
    let spike_mean = mean(&values);

    let n_days = days.len();
    let n_outliers = days
        .iter()
        .filter(|d| d.z_score.is_some_and(|z| is_outlier(z, threshold)))
        .count();
    let expected_outliers = n_days as f64 * expected_outlier_rate(threshold);

    let max = max_z_day(days.iter().copied());

    Some(SpikeAnalysis {
        spike_mean,
        multiplier: safe_ratio(spike_mean, baseline_mean),
        n_days,
        total_stars: days.iter().map(|d| d.stars).sum(),
        n_outliers,
        expected_outliers,
        outlier_ratio: outlier_ratio(n_outliers, expected_outliers),
        max_z_score: max.map(|(_, _, z)| z),
        max_z_date: max.map(|(date, _, _)| date),
        max_z_stars: max.map(|(_, stars, _)| stars),
        max_z_p_value: max.map(|(_, _, z)| two_tailed_p_value(z)),
    })
}
