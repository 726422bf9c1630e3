//! Concrete data sources.
//!
//! [`GitHubClient`] implements [`StarSource`](crate::services::StarSource)
//! against the GitHub REST API; [`PypiStatsClient`] implements
//! [`DownloadSource`](crate::services::DownloadSource) against pypistats.org.

pub mod github;
pub mod pypistats;

pub use github::GitHubClient;
pub use pypistats::PypiStatsClient;
