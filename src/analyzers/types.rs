//! Data types used by the analysis pipeline and its JSON report.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::stats::PeriodStats;

/// A day whose |z-score| exceeded the threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outlier {
    pub date: NaiveDate,
    pub stars: u64,
    #[serde(serialize_with = "finite::serialize")]
    pub z_score: f64,
}

/// Outlier behaviour inside the suspected spike period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpikeAnalysis {
    pub spike_mean: f64,
    #[serde(serialize_with = "finite::serialize")]
    pub multiplier: f64,
    pub n_days: usize,
    pub total_stars: u64,
    pub n_outliers: usize,
    pub expected_outliers: f64,
    #[serde(serialize_with = "finite::serialize")]
    pub outlier_ratio: f64,
    #[serde(serialize_with = "finite::serialize_opt")]
    pub max_z_score: Option<f64>,
    pub max_z_date: Option<NaiveDate>,
    pub max_z_stars: Option<u64>,
    #[serde(serialize_with = "finite::serialize_opt")]
    pub max_z_p_value: Option<f64>,
}

/// First and last day of the analysed series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierSummary {
    pub count: usize,
    pub top_20: Vec<Outlier>,
}

/// Complete analysis result, written as `star_analysis_report.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StarReport {
    pub analysis_date: DateTime<Utc>,
    pub total_stars: u64,
    pub date_range: DateSpan,
    pub baseline_period: Option<PeriodStats>,
    pub spike_period: Option<PeriodStats>,
    pub spike_analysis: Option<SpikeAnalysis>,
    pub outliers: OutlierSummary,
}

/// JSON has no literal for infinity; non-finite values are written as the
/// strings `"Infinity"`, `"-Infinity"` and `"NaN"`.
pub(crate) mod finite {
    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if value.is_sign_positive() {
            serializer.serialize_str("Infinity")
        } else {
            serializer.serialize_str("-Infinity")
        }
    }

    pub fn serialize_opt<S: Serializer>(
        value: &Option<f64>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serialize(v, serializer),
            None => serializer.serialize_none(),
        }
    }
}
