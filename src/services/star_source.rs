//! Traits and types for the data sources behind `fetch`.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::series::StarEvent;

/// Current repository statistics, as saved to `*_metadata.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoMetadata {
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub stars: u64,
    pub forks: u64,
    pub watchers: u64,
    pub open_issues: u64,
    pub language: Option<String>,
    pub last_updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_timestamp: Option<DateTime<Utc>>,
}

/// Raw pypistats payloads; either half may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadStats {
    pub recent: Option<serde_json::Value>,
    pub overall: Option<serde_json::Value>,
}

impl DownloadStats {
    /// `data.last_month` from the recent-downloads payload.
    pub fn last_month(&self) -> Option<u64> {
        self.recent.as_ref()?.get("data")?.get("last_month")?.as_u64()
    }
}

/// Source of stargazer history and repository metadata (e.g. GitHub).
#[async_trait::async_trait]
pub trait StarSource {
    /// Every stargazer with the time they starred, oldest first.
    async fn fetch_stargazers(&self) -> Result<Vec<StarEvent>>;

    /// Current repository statistics, or `None` if unavailable.
    async fn fetch_repo_metadata(&self) -> Result<Option<RepoMetadata>>;
}

/// Source of package download counts (e.g. pypistats.org).
#[async_trait::async_trait]
pub trait DownloadSource {
    async fn fetch_downloads(&self) -> Result<DownloadStats>;
}
