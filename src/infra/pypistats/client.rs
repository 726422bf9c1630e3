use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

use crate::fetch::{HttpClient, fetch_json};
use crate::services::{DownloadSource, DownloadStats};

/// pypistats.org client for one package.
pub struct PypiStatsClient<C> {
    http: C,
    base_url: String,
    package: String,
}

impl<C: HttpClient> PypiStatsClient<C> {
    pub fn new(http: C, base_url: &str, package: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            package: package.to_string(),
        }
    }

    /// Fetches one endpoint; any failure is logged and reported as `None`.
    async fn endpoint(&self, name: &str) -> Option<serde_json::Value> {
        let url = format!("{}/api/packages/{}/{}", self.base_url, self.package, name);
        match fetch_json(&self.http, &url).await {
            Ok(Some(value)) => Some(value),
            Ok(None) => {
                warn!(endpoint = name, "pypistats returned a non-success status");
                None
            }
            Err(e) => {
                warn!(endpoint = name, error = %e, "pypistats request failed");
                None
            }
        }
    }
}

#[async_trait]
impl<C: HttpClient> DownloadSource for PypiStatsClient<C> {
    #[tracing::instrument(skip(self), fields(package = %self.package))]
    async fn fetch_downloads(&self) -> Result<DownloadStats> {
        Ok(DownloadStats {
            recent: self.endpoint("recent").await,
            overall: self.endpoint("overall").await,
        })
    }
}
