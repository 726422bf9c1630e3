//! Error types for star auditing.

use thiserror::Error;

use crate::config::DateRange;

/// Domain failures that callers may want to match on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuditError {
    /// The loaded series has no rows at all.
    #[error("star series is empty")]
    EmptySeries,

    /// A required period matched no days in the series.
    #[error("no data in period {0}")]
    EmptyPeriod(DateRange),

    /// A date range could not be parsed or is reversed.
    #[error("invalid date range '{input}': {reason}")]
    InvalidDateRange { input: String, reason: String },

    /// A configuration value could not be parsed.
    #[error("invalid config value for {key}: {value}")]
    InvalidConfig { key: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn error_messages_are_descriptive() {
        assert_eq!(AuditError::EmptySeries.to_string(), "star series is empty");

        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 1, 31).unwrap(),
        )
        .unwrap();
        assert_eq!(
            AuditError::EmptyPeriod(range).to_string(),
            "no data in period 2023-01-01..2023-01-31"
        );
    }
}
