use chrono::{DateTime, Utc};
use tracing::info;

use crate::analyzers::spike::analyze_spike_period;
use crate::analyzers::types::{DateSpan, Outlier, OutlierSummary, SpikeAnalysis, StarReport};
use crate::analyzers::zscore::{Baseline, calculate_z_scores, identify_outliers};
use crate::config::{Config, DateRange};
use crate::error::AuditError;
use crate::series::StarDay;
use crate::stats::{PeriodStats, calculate_period_stats};

/// Number of outliers listed in the report.
pub const REPORT_TOP_OUTLIERS: usize = 20;

/// Periods and threshold for one run of the detector.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisPlan {
    pub baseline: DateRange,
    pub spike: DateRange,
    pub threshold: f64,
}

impl From<&Config> for AnalysisPlan {
    fn from(config: &Config) -> Self {
        Self {
            baseline: config.baseline,
            spike: config.spike,
            threshold: config.threshold,
        }
    }
}

/// Everything the detector produced for one series.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// The input series with a z-score on every day.
    pub series: Vec<StarDay>,
    pub baseline: Baseline,
    pub baseline_stats: Option<PeriodStats>,
    pub spike_stats: Option<PeriodStats>,
    pub spike_analysis: Option<SpikeAnalysis>,
    pub outliers: Vec<Outlier>,
}

/// Runs the baseline/spike detector over a daily series.
///
/// # Errors
///
/// [`AuditError::EmptySeries`] for an empty series and
/// [`AuditError::EmptyPeriod`] when the baseline matches no days.
pub fn analyze(mut series: Vec<StarDay>, plan: &AnalysisPlan) -> Result<Analysis, AuditError> {
    if series.is_empty() {
        return Err(AuditError::EmptySeries);
    }

    let baseline_stats = calculate_period_stats(&series, &plan.baseline);
    let spike_stats = calculate_period_stats(&series, &plan.spike);

    let baseline = calculate_z_scores(&mut series, &plan.baseline)?;
    info!(
        period = %plan.baseline,
        mean = %format!("{:.2}", baseline.mean),
        std = %format!("{:.2}", baseline.std),
        days = baseline.days,
        "Baseline statistics"
    );

    let outliers = identify_outliers(&series, plan.threshold);
    let spike_analysis =
        analyze_spike_period(&series, &plan.spike, baseline.mean, plan.threshold);

    Ok(Analysis {
        series,
        baseline,
        baseline_stats,
        spike_stats,
        spike_analysis,
        outliers,
    })
}

/// Assembles the JSON report for a completed analysis.
pub fn generate_report(analysis: &Analysis, analysis_date: DateTime<Utc>) -> StarReport {
    let series = &analysis.series;
    // analyze() rejects empty series, so first/last exist.
    let date_range = match (series.first(), series.last()) {
        (Some(first), Some(last)) => DateSpan {
            start: first.date,
            end: last.date,
        },
        _ => DateSpan {
            start: analysis_date.date_naive(),
            end: analysis_date.date_naive(),
        },
    };

    StarReport {
        analysis_date,
        total_stars: series.iter().map(|d| d.stars).sum(),
        date_range,
        baseline_period: analysis.baseline_stats.clone(),
        spike_period: analysis.spike_stats.clone(),
        spike_analysis: analysis.spike_analysis.clone(),
        outliers: OutlierSummary {
            count: analysis.outliers.len(),
            top_20: analysis
                .outliers
                .iter()
                .take(REPORT_TOP_OUTLIERS)
                .cloned()
                .collect(),
        },
    }
}
