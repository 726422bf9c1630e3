use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::fetch::{HttpClient, get_request};
use crate::parser::star_events_from_value;
use crate::series::StarEvent;
use crate::services::{RepoMetadata, StarSource};

/// Media type that makes the stargazers endpoint include `starred_at`.
const STAR_MEDIA_TYPE: &str = "application/vnd.github.v3.star+json";
const PER_PAGE: &str = "100";
/// Below this many remaining requests we wait for the window to reset.
const RATE_LIMIT_FLOOR: u64 = 10;
const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(100);

#[derive(Deserialize)]
struct RepoResponse {
    full_name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    stargazers_count: u64,
    forks_count: u64,
    watchers_count: u64,
    open_issues_count: u64,
    language: Option<String>,
    updated_at: DateTime<Utc>,
}

impl From<RepoResponse> for RepoMetadata {
    fn from(r: RepoResponse) -> Self {
        RepoMetadata {
            name: r.full_name,
            description: r.description,
            created_at: r.created_at,
            stars: r.stargazers_count,
            forks: r.forks_count,
            watchers: r.watchers_count,
            open_issues: r.open_issues_count,
            language: r.language,
            last_updated: r.updated_at,
            fetch_timestamp: None,
        }
    }
}

/// GitHub REST client for one repository.
pub struct GitHubClient<C> {
    http: C,
    base_url: String,
    owner: String,
    repo: String,
    page_delay: Duration,
}

impl<C: HttpClient> GitHubClient<C> {
    pub fn new(http: C, base_url: &str, owner: &str, repo: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            page_delay: DEFAULT_PAGE_DELAY,
        }
    }

    /// Overrides the pause between stargazer pages.
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    fn repo_url(&self) -> String {
        format!("{}/repos/{}/{}", self.base_url, self.owner, self.repo)
    }
}

/// How long to pause after a response, based on GitHub's rate-limit headers.
///
/// Returns `max(reset - now, 0) + 1` seconds once fewer than ten requests
/// remain, `None` otherwise. A response without `X-RateLimit-Remaining`
/// (an unauthenticated proxy or a mock server) is treated as unlimited and
/// never waits; a missing `X-RateLimit-Reset` counts as already passed.
pub fn rate_limit_wait(headers: &HeaderMap, now: i64) -> Option<Duration> {
    let header_num = |name: &str| -> Option<i64> {
        headers.get(name)?.to_str().ok()?.trim().parse().ok()
    };

    let remaining = header_num("x-ratelimit-remaining")?;
    if remaining >= RATE_LIMIT_FLOOR as i64 {
        return None;
    }
    let reset = header_num("x-ratelimit-reset").unwrap_or(0);
    Some(Duration::from_secs((reset - now).max(0) as u64 + 1))
}

#[async_trait]
impl<C: HttpClient> StarSource for GitHubClient<C> {
    #[tracing::instrument(skip(self), fields(owner = %self.owner, repo = %self.repo))]
    async fn fetch_stargazers(&self) -> Result<Vec<StarEvent>> {
        let url = format!("{}/stargazers", self.repo_url());
        let mut stars = Vec::new();
        let mut page: u32 = 1;

        loop {
            let page_param = page.to_string();
            let mut req = get_request(&url, &[("page", page_param.as_str()), ("per_page", PER_PAGE)])?;
            req.headers_mut()
                .insert(ACCEPT, HeaderValue::from_static(STAR_MEDIA_TYPE));

            let resp = self
                .http
                .execute(req)
                .await
                .with_context(|| format!("requesting stargazer page {page}"))?;

            match resp.status() {
                StatusCode::OK => {
                    let wait = rate_limit_wait(resp.headers(), Utc::now().timestamp());
                    let items: Vec<serde_json::Value> = match resp.json().await {
                        Ok(items) => items,
                        Err(e) => {
                            error!(page, error = %e, "Stargazer page is not a JSON array");
                            break;
                        }
                    };
                    if items.is_empty() {
                        break;
                    }

                    match star_events_from_value(serde_json::Value::Array(items)) {
                        Ok(events) => stars.extend(events),
                        Err(e) => {
                            error!(page, error = %e, "Malformed stargazer page");
                            break;
                        }
                    }
                    info!(page, total = stars.len(), "Fetched stargazer page");

                    if let Some(wait) = wait {
                        warn!(wait_secs = wait.as_secs(), "Rate limit low, waiting for reset");
                        tokio::time::sleep(wait).await;
                    }

                    page += 1;
                    if !self.page_delay.is_zero() {
                        tokio::time::sleep(self.page_delay).await;
                    }
                }
                StatusCode::FORBIDDEN => {
                    error!(page, headers = ?resp.headers(), "Rate limit exceeded");
                    break;
                }
                status => {
                    let body = resp.text().await.unwrap_or_default();
                    error!(page, status = %status, body = %body, "Stargazer request failed");
                    break;
                }
            }
        }

        Ok(stars)
    }

    #[tracing::instrument(skip(self), fields(owner = %self.owner, repo = %self.repo))]
    async fn fetch_repo_metadata(&self) -> Result<Option<RepoMetadata>> {
        let resp = self
            .http
            .execute(get_request(&self.repo_url(), &[])?)
            .await
            .context("requesting repository metadata")?;

        if resp.status() != StatusCode::OK {
            warn!(status = %resp.status(), "Repository metadata unavailable");
            return Ok(None);
        }

        let repo: RepoResponse = resp.json().await?;
        Ok(Some(repo.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Serves canned responses in order and records request URLs.
    struct MockHttp {
        responses: Mutex<Vec<http::Response<String>>>,
        requests: Mutex<Vec<(String, Option<String>, Instant)>>,
    }

    impl MockHttp {
        fn new(mut responses: Vec<http::Response<String>>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HttpClient for MockHttp {
        async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            let accept = req
                .headers()
                .get(ACCEPT)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            self.requests
                .lock()
                .unwrap()
                .push((req.url().to_string(), accept, Instant::now()));
            let resp = self
                .responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| json_response(200, json!([])));
            Ok(reqwest::Response::from(resp))
        }
    }

    fn json_response(status: u16, body: serde_json::Value) -> http::Response<String> {
        http::Response::builder()
            .status(status)
            .header("x-ratelimit-remaining", "4999")
            .body(body.to_string())
            .unwrap()
    }

    fn star(ts: &str, login: &str) -> serde_json::Value {
        json!({"starred_at": ts, "user": {"login": login}})
    }

    fn client(mock: MockHttp) -> GitHubClient<MockHttp> {
        GitHubClient::new(mock, "https://api.github.test/", "acme", "rocket")
            .with_page_delay(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_paginates_until_empty_page() {
        let mock = MockHttp::new(vec![
            json_response(200, json!([star("2023-01-01T00:00:00Z", "a"), star("2023-01-01T05:00:00Z", "b")])),
            json_response(200, json!([star("2023-01-02T00:00:00Z", "c")])),
            json_response(200, json!([])),
        ]);
        let gh = client(mock);

        let stars = gh.fetch_stargazers().await.unwrap();
        assert_eq!(stars.len(), 3);
        assert_eq!(stars[2].user, "c");

        let requests = gh.http.requests.lock().unwrap();
        assert_eq!(requests.len(), 3);
        assert_eq!(
            requests[0].0,
            "https://api.github.test/repos/acme/rocket/stargazers?page=1&per_page=100"
        );
        assert!(requests[2].0.contains("page=3"));
        assert_eq!(requests[0].1.as_deref(), Some(STAR_MEDIA_TYPE));
    }

    #[tokio::test]
    async fn test_forbidden_keeps_partial_results() {
        let mock = MockHttp::new(vec![
            json_response(200, json!([star("2023-01-01T00:00:00Z", "a")])),
            json_response(403, json!({"message": "API rate limit exceeded"})),
        ]);
        let stars = client(mock).fetch_stargazers().await.unwrap();
        assert_eq!(stars.len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_page_keeps_earlier_pages() {
        let mock = MockHttp::new(vec![
            json_response(200, json!([star("2023-01-01T00:00:00Z", "a")])),
            json_response(200, json!([{"starred_at": "2023-01-02T00:00:00Z", "user": {"id": 5}}])),
        ]);
        let gh = client(mock);
        let stars = gh.fetch_stargazers().await.unwrap();
        assert_eq!(stars.len(), 1);
        assert_eq!(stars[0].user, "a");
        assert_eq!(gh.http.requests.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_non_json_page_keeps_earlier_pages() {
        let page_two = http::Response::builder()
            .status(200)
            .body("<html>oops</html>".to_string())
            .unwrap();
        let mock = MockHttp::new(vec![
            json_response(200, json!([star("2023-01-01T00:00:00Z", "a")])),
            page_two,
        ]);
        let stars = client(mock).fetch_stargazers().await.unwrap();
        assert_eq!(stars.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_low_rate_limit_waits_for_reset() {
        let reset = Utc::now().timestamp() + 30;
        let low = http::Response::builder()
            .status(200)
            .header("x-ratelimit-remaining", "5")
            .header("x-ratelimit-reset", reset.to_string())
            .body(json!([star("2023-01-01T00:00:00Z", "a")]).to_string())
            .unwrap();
        let mock = MockHttp::new(vec![low, json_response(200, json!([]))]);
        let gh = client(mock);

        let stars = gh.fetch_stargazers().await.unwrap();
        assert_eq!(stars.len(), 1);

        let requests = gh.http.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        let waited = requests[1].2 - requests[0].2;
        // Wall-clock seconds may tick between the header and the check.
        assert!(waited >= Duration::from_secs(30), "waited {waited:?}");
        assert!(waited <= Duration::from_secs(32), "waited {waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_healthy_rate_limit_only_uses_page_delay() {
        let mock = MockHttp::new(vec![
            json_response(200, json!([star("2023-01-01T00:00:00Z", "a")])),
            json_response(200, json!([])),
        ]);
        let gh = GitHubClient::new(mock, "https://api.github.test", "acme", "rocket");

        gh.fetch_stargazers().await.unwrap();

        let requests = gh.http.requests.lock().unwrap();
        assert_eq!(requests[1].2 - requests[0].2, DEFAULT_PAGE_DELAY);
    }

    #[tokio::test]
    async fn test_server_error_stops() {
        let mock = MockHttp::new(vec![json_response(500, json!({"message": "boom"}))]);
        let gh = client(mock);
        assert!(gh.fetch_stargazers().await.unwrap().is_empty());
        assert_eq!(gh.http.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_repo_metadata() {
        let mock = MockHttp::new(vec![json_response(
            200,
            json!({
                "full_name": "acme/rocket",
                "description": "Fast things",
                "created_at": "2023-01-09T19:00:00Z",
                "stargazers_count": 20512,
                "forks_count": 1500,
                "watchers_count": 20512,
                "open_issues_count": 250,
                "language": "Python",
                "updated_at": "2024-06-01T00:00:00Z"
            }),
        )]);
        let meta = client(mock).fetch_repo_metadata().await.unwrap().unwrap();
        assert_eq!(meta.name, "acme/rocket");
        assert_eq!(meta.stars, 20512);
        assert_eq!(meta.language.as_deref(), Some("Python"));
        assert!(meta.fetch_timestamp.is_none());
    }

    #[tokio::test]
    async fn test_repo_metadata_not_found() {
        let mock = MockHttp::new(vec![json_response(404, json!({"message": "Not Found"}))]);
        assert!(client(mock).fetch_repo_metadata().await.unwrap().is_none());
    }

    #[test]
    fn test_rate_limit_wait() {
        let mut headers = HeaderMap::new();
        assert_eq!(rate_limit_wait(&headers, 1_000), None);

        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("10"));
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("1060"));
        assert_eq!(rate_limit_wait(&headers, 1_000), None);

        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("9"));
        assert_eq!(rate_limit_wait(&headers, 1_000), Some(Duration::from_secs(61)));

        // Reset already passed.
        assert_eq!(rate_limit_wait(&headers, 2_000), Some(Duration::from_secs(1)));
    }
}
