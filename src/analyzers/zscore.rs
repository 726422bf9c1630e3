//! Baseline z-scores and outlier selection.

use chrono::NaiveDate;

use crate::analyzers::types::Outlier;
use crate::analyzers::utility::{mean, sample_stddev};
use crate::config::DateRange;
use crate::error::AuditError;
use crate::series::{StarDay, in_period};

/// Mean and sample deviation of daily stars over the baseline period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Baseline {
    pub mean: f64,
    pub std: f64,
    pub days: usize,
}

impl Baseline {
    /// Builds a baseline from the days of `series` inside `range`.
    /// Returns `None` when the period is empty.
    pub fn from_series(series: &[StarDay], range: &DateRange) -> Option<Self> {
        let values: Vec<f64> = in_period(series, range).map(|d| d.stars as f64).collect();
        if values.is_empty() {
            return None;
        }
        let avg = mean(&values);
        Some(Baseline {
            mean: avg,
            std: sample_stddev(&values, avg),
            days: values.len(),
        })
    }

    /// `(value - mean) / std`.
    ///
    /// A flat baseline (`std == 0`) has no spread to scale by: the mean itself
    /// scores 0 and anything else scores signed infinity.
    pub fn z_score(&self, value: f64) -> f64 {
        let delta = value - self.mean;
        if self.std > 0.0 {
            delta / self.std
        } else if delta == 0.0 {
            0.0
        } else {
            f64::INFINITY.copysign(delta)
        }
    }
}

/// Computes the baseline over `range` and writes a z-score onto every day.
pub fn calculate_z_scores(series: &mut [StarDay], range: &DateRange) -> Result<Baseline, AuditError> {
    let baseline = Baseline::from_series(series, range).ok_or(AuditError::EmptyPeriod(*range))?;
    for day in series.iter_mut() {
        day.z_score = Some(baseline.z_score(day.stars as f64));
    }
    Ok(baseline)
}

pub fn is_outlier(z: f64, threshold: f64) -> bool {
    z.abs() > threshold
}

/// Every scored day with `|z| > threshold`, highest z first.
///
/// Equal scores keep series order.
pub fn identify_outliers(series: &[StarDay], threshold: f64) -> Vec<Outlier> {
    let mut outliers: Vec<Outlier> = series
        .iter()
        .filter_map(|d| {
            let z = d.z_score?;
            is_outlier(z, threshold).then_some(Outlier {
                date: d.date,
                stars: d.stars,
                z_score: z,
            })
        })
        .collect();
    outliers.sort_by(|a, b| b.z_score.total_cmp(&a.z_score));
    outliers
}

/// The scored day with the highest z-score; ties go to the earliest day.
pub fn max_z_day<'a, I>(days: I) -> Option<(NaiveDate, u64, f64)>
where
    I: IntoIterator<Item = &'a StarDay>,
{
    let mut best: Option<(NaiveDate, u64, f64)> = None;
    for day in days {
        let Some(z) = day.z_score else { continue };
        if best.is_none_or(|(_, _, best_z)| z > best_z) {
            best = Some((day.date, day.stars, z));
        }
    }
    best
}
