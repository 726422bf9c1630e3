use serde::{Deserialize, Serialize};

use crate::analyzers::utility::{mean, median, sample_stddev};
use crate::config::DateRange;
use crate::series::{StarDay, in_period};

/// Summary statistics of daily star counts over one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodStats {
    pub mean: f64,
    pub std: f64,
    pub median: f64,
    pub total: u64,
    pub days: usize,
    pub max: u64,
    pub min: u64,
}

impl PeriodStats {
    /// Statistics of the given daily counts, or `None` when there are none.
    pub fn from_counts(counts: &[u64]) -> Option<Self> {
        let max = *counts.iter().max()?;
        let min = *counts.iter().min()?;
        let values: Vec<f64> = counts.iter().map(|&c| c as f64).collect();
        let avg = mean(&values);

        Some(PeriodStats {
            mean: avg,
            std: sample_stddev(&values, avg),
            median: median(&values),
            total: counts.iter().sum(),
            days: counts.len(),
            max,
            min,
        })
    }
}

/// Statistics for the days of `series` inside `range`.
///
/// Returns `None` when the period matches no rows.
pub fn calculate_period_stats(series: &[StarDay], range: &DateRange) -> Option<PeriodStats> {
    let counts: Vec<u64> = in_period(series, range).map(|d| d.stars).collect();
    PeriodStats::from_counts(&counts)
}
