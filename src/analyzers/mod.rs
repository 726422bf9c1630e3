//! Baseline-vs-spike anomaly detection.
//!
//! A baseline period fixes the mean and sample deviation of daily stars;
//! every day is then z-scored against it, days beyond the threshold are
//! flagged as outliers, and the spike period's outlier count is compared
//! with what a normal distribution would produce.

pub mod analyzer;
pub mod spike;
pub mod types;
pub mod utility;
pub mod zscore;
