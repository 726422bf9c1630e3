mod client;
mod basic;
pub mod auth;

pub use client::HttpClient;
pub use basic::BasicClient;

use anyhow::Result;
use reqwest::{Method, Request, Url};
use tracing::debug;

/// Builds a GET request with the given query parameters appended.
pub fn get_request(url: &str, query: &[(&str, &str)]) -> Result<Request> {
    let mut url: Url = url.parse()?;
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(Request::new(Method::GET, url))
}

/// GETs `url` and decodes the body as JSON when the status is 2xx.
///
/// Non-success statuses yield `Ok(None)`; transport and decode failures are
/// errors.
pub async fn fetch_json<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
) -> Result<Option<serde_json::Value>> {
    let resp = client.execute(get_request(url, &[])?).await?;
    let status = resp.status();
    if !status.is_success() {
        debug!(url, status = %status, "Non-success response");
        return Ok(None);
    }
    Ok(Some(resp.json().await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_request_appends_query() {
        let req = get_request("https://example.com/items", &[("page", "2"), ("per_page", "100")])
            .unwrap();
        assert_eq!(req.method(), Method::GET);
        assert_eq!(req.url().as_str(), "https://example.com/items?page=2&per_page=100");
    }

    #[test]
    fn test_get_request_rejects_bad_url() {
        assert!(get_request("not a url", &[]).is_err());
    }
}
