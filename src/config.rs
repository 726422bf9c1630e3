//! Project and analysis-period configuration.
//!
//! Values come from the environment (a `.env` file is loaded by `main`),
//! falling back to the defaults for the DSPy investigation. CLI flags are
//! applied on top with [`Config::with_overrides`].

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::error::AuditError;

const DEFAULT_OWNER: &str = "stanfordnlp";
const DEFAULT_REPO: &str = "dspy";
const DEFAULT_PYPI_PACKAGE: &str = "dspy-ai";
const DEFAULT_BASELINE: &str = "2023-01-23..2023-08-23";
const DEFAULT_SPIKE: &str = "2023-08-24..2023-09-14";
const DEFAULT_GITHUB_API: &str = "https://api.github.com";
const DEFAULT_PYPISTATS_API: &str = "https://pypistats.org";

/// Outlier threshold in standard deviations.
pub const DEFAULT_THRESHOLD: f64 = 3.0;

/// An inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, AuditError> {
        if end < start {
            return Err(AuditError::InvalidDateRange {
                input: format!("{start}..{end}"),
                reason: "end is before start".to_string(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

impl FromStr for DateRange {
    type Err = AuditError;

    /// Parses `YYYY-MM-DD..YYYY-MM-DD`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| AuditError::InvalidDateRange {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let (start, end) = s
            .trim()
            .split_once("..")
            .ok_or_else(|| invalid("expected START..END"))?;
        let start = NaiveDate::parse_from_str(start.trim(), "%Y-%m-%d")
            .map_err(|e| invalid(&format!("bad start date: {e}")))?;
        let end = NaiveDate::parse_from_str(end.trim(), "%Y-%m-%d")
            .map_err(|e| invalid(&format!("bad end date: {e}")))?;

        DateRange::new(start, end).map_err(|_| invalid("end is before start"))
    }
}

/// A dated annotation drawn as a vertical marker on the daily chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartEvent {
    pub date: NaiveDate,
    pub label: String,
}

/// Runtime configuration for a single project audit.
#[derive(Debug, Clone)]
pub struct Config {
    pub owner: String,
    pub repo: String,
    pub pypi_package: String,
    pub output_dir: PathBuf,
    pub baseline: DateRange,
    pub spike: DateRange,
    pub threshold: f64,
    pub github_api_url: String,
    pub pypistats_api_url: String,
    pub events: Vec<ChartEvent>,
}

/// Optional CLI overrides applied on top of the environment.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub pypi_package: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub baseline: Option<DateRange>,
    pub spike: Option<DateRange>,
    pub threshold: Option<f64>,
}

impl Config {
    /// Reads configuration from process environment variables.
    pub fn from_env() -> Result<Self, AuditError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AuditError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let baseline: DateRange = get("STAR_AUDIT_BASELINE", DEFAULT_BASELINE).parse()?;
        let spike: DateRange = get("STAR_AUDIT_SPIKE", DEFAULT_SPIKE).parse()?;

        let threshold = match lookup("STAR_AUDIT_THRESHOLD") {
            Some(raw) => raw.trim().parse::<f64>().map_err(|_| AuditError::InvalidConfig {
                key: "STAR_AUDIT_THRESHOLD".to_string(),
                value: raw.clone(),
            })?,
            None => DEFAULT_THRESHOLD,
        };

        let config = Config {
            owner: get("STAR_AUDIT_OWNER", DEFAULT_OWNER),
            repo: get("STAR_AUDIT_REPO", DEFAULT_REPO),
            pypi_package: get("STAR_AUDIT_PYPI_PACKAGE", DEFAULT_PYPI_PACKAGE),
            output_dir: PathBuf::from(get("STAR_AUDIT_OUTPUT_DIR", ".")),
            baseline,
            spike,
            threshold,
            github_api_url: get("GITHUB_API_URL", DEFAULT_GITHUB_API),
            pypistats_api_url: get("PYPISTATS_API_URL", DEFAULT_PYPISTATS_API),
            events: default_events(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Applies CLI overrides and re-validates.
    pub fn with_overrides(mut self, overrides: Overrides) -> Result<Self, AuditError> {
        if let Some(owner) = overrides.owner {
            self.owner = owner;
        }
        if let Some(repo) = overrides.repo {
            self.repo = repo;
        }
        if let Some(pkg) = overrides.pypi_package {
            self.pypi_package = pkg;
        }
        if let Some(dir) = overrides.output_dir {
            self.output_dir = dir;
        }
        if let Some(baseline) = overrides.baseline {
            self.baseline = baseline;
        }
        if let Some(spike) = overrides.spike {
            self.spike = spike;
        }
        if let Some(threshold) = overrides.threshold {
            self.threshold = threshold;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), AuditError> {
        if !(self.threshold.is_finite() && self.threshold > 0.0) {
            return Err(AuditError::InvalidConfig {
                key: "threshold".to_string(),
                value: self.threshold.to_string(),
            });
        }
        if self.baseline.overlaps(&self.spike) {
            return Err(AuditError::InvalidConfig {
                key: "spike".to_string(),
                value: format!("{} overlaps baseline {}", self.spike, self.baseline),
            });
        }
        Ok(())
    }

    /// File name prefix for fetched artifacts, e.g. `dspy`.
    pub fn file_prefix(&self) -> String {
        self.repo.to_lowercase()
    }

    /// Resolves `name` inside the output directory.
    pub fn output_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }

    pub fn raw_stars_path(&self) -> PathBuf {
        self.output_path(&format!("{}_stars_raw.json", self.file_prefix()))
    }

    pub fn daily_json_path(&self) -> PathBuf {
        self.output_path(&format!("{}_stars_daily.json", self.file_prefix()))
    }

    pub fn daily_csv_path(&self) -> PathBuf {
        self.output_path(&format!("{}_stars_daily.csv", self.file_prefix()))
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.output_path(&format!("{}_metadata.json", self.file_prefix()))
    }

    pub fn downloads_path(&self) -> PathBuf {
        self.output_path(&format!("{}_pypi_downloads.json", self.file_prefix()))
    }

    pub fn report_path(&self) -> PathBuf {
        self.output_path("star_analysis_report.json")
    }

    pub fn analysis_chart_path(&self) -> PathBuf {
        self.output_path(&format!("{}_star_analysis.svg", self.file_prefix()))
    }

    pub fn comparison_chart_path(&self) -> PathBuf {
        self.output_path("ratio_comparison.svg")
    }
}

fn default_events() -> Vec<ChartEvent> {
    [
        (2023, 9, 14, "Databricks $43B Announcement"),
        (2023, 10, 5, "DSPy Paper Published"),
    ]
    .into_iter()
    .filter_map(|(y, m, d, label)| {
        NaiveDate::from_ymd_opt(y, m, d).map(|date| ChartEvent {
            date,
            label: label.to_string(),
        })
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_date_range() {
        let range: DateRange = "2023-01-23..2023-08-23".parse().unwrap();
        assert_eq!(range.start, date(2023, 1, 23));
        assert_eq!(range.end, date(2023, 8, 23));
        assert_eq!(range.to_string(), "2023-01-23..2023-08-23");
    }

    #[test]
    fn test_parse_date_range_rejects_reversed() {
        let err = "2023-02-01..2023-01-01".parse::<DateRange>().unwrap_err();
        assert!(matches!(err, AuditError::InvalidDateRange { .. }));
    }

    #[test]
    fn test_parse_date_range_rejects_garbage() {
        assert!("2023-01-01".parse::<DateRange>().is_err());
        assert!("2023-13-01..2023-12-31".parse::<DateRange>().is_err());
    }

    #[test]
    fn test_range_contains_is_inclusive() {
        let range = DateRange::new(date(2023, 1, 1), date(2023, 1, 3)).unwrap();
        assert!(range.contains(date(2023, 1, 1)));
        assert!(range.contains(date(2023, 1, 3)));
        assert!(!range.contains(date(2023, 1, 4)));
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.owner, "stanfordnlp");
        assert_eq!(config.repo, "dspy");
        assert_eq!(config.pypi_package, "dspy-ai");
        assert_eq!(config.threshold, 3.0);
        assert_eq!(config.spike.start, date(2023, 8, 24));
        assert_eq!(config.events.len(), 2);
        assert!(config.daily_csv_path().ends_with("dspy_stars_daily.csv"));
    }

    #[test]
    fn test_lookup_values_win() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("STAR_AUDIT_OWNER", "acme"),
            ("STAR_AUDIT_REPO", "Rocket"),
            ("STAR_AUDIT_THRESHOLD", "2.5"),
        ]);
        let config = Config::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.owner, "acme");
        assert_eq!(config.file_prefix(), "rocket");
        assert_eq!(config.threshold, 2.5);
    }

    #[test]
    fn test_bad_threshold() {
        let err = Config::from_lookup(|k| (k == "STAR_AUDIT_THRESHOLD").then(|| "abc".into()))
            .unwrap_err();
        assert!(matches!(err, AuditError::InvalidConfig { .. }));
    }

    #[test]
    fn test_overrides_reject_overlapping_periods() {
        let config = Config::from_lookup(|_| None).unwrap();
        let overrides = Overrides {
            spike: Some("2023-08-01..2023-09-01".parse().unwrap()),
            ..Default::default()
        };
        assert!(config.with_overrides(overrides).is_err());
    }
}
