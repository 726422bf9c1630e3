//! JSON parser for stargazer records.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::series::StarEvent;

/// GitHub shows deleted accounts as this login.
const GHOST_USER: &str = "ghost";

#[derive(Deserialize)]
#[serde(untagged)]
enum UserField {
    Login(String),
    Object { login: String },
}

#[derive(Deserialize)]
struct RawStar {
    starred_at: Option<DateTime<Utc>>,
    #[serde(default)]
    user: Option<UserField>,
}

/// Decodes a JSON array of stargazer records into [`StarEvent`]s.
///
/// Accepts both the API shape (`"user": {"login": ..}`) and the flattened
/// shape written to `*_stars_raw.json` (`"user": ".."`). Records without a
/// `starred_at` timestamp are skipped.
///
/// # Errors
///
/// Returns an error if the bytes are not a JSON array of objects or a
/// timestamp is not RFC 3339.
pub fn parse_star_events(bytes: &[u8]) -> Result<Vec<StarEvent>> {
    let raw: Vec<RawStar> = serde_json::from_slice(bytes)?;
    Ok(raw.into_iter().filter_map(into_event).collect())
}

/// Decodes a single page of API results already parsed as JSON.
pub fn star_events_from_value(value: serde_json::Value) -> Result<Vec<StarEvent>> {
    let raw: Vec<RawStar> = serde_json::from_value(value)?;
    Ok(raw.into_iter().filter_map(into_event).collect())
}

fn into_event(raw: RawStar) -> Option<StarEvent> {
    let starred_at = raw.starred_at?;
    let user = match raw.user {
        Some(UserField::Login(login)) | Some(UserField::Object { login }) => login,
        None => GHOST_USER.to_string(),
    };
    Some(StarEvent { starred_at, user })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_api_shape() {
        let json = br#"[
            {"starred_at": "2023-08-24T10:15:00Z", "user": {"login": "alice", "id": 1}},
            {"starred_at": "2023-08-25T00:00:01Z", "user": {"login": "bob", "id": 2}}
        ]"#;
        let events = parse_star_events(json).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].user, "alice");
        assert_eq!(events[1].starred_at.to_rfc3339(), "2023-08-25T00:00:01+00:00");
    }

    #[test]
    fn test_parse_saved_shape() {
        let json = br#"[{"starred_at": "2023-08-24T10:15:00Z", "user": "carol"}]"#;
        let events = parse_star_events(json).unwrap();
        assert_eq!(events[0].user, "carol");
    }

    #[test]
    fn test_skips_records_without_timestamp() {
        let json = br#"[{"user": "dave"}, {"starred_at": "2023-01-01T00:00:00Z", "user": null}]"#;
        let events = parse_star_events(json).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].user, GHOST_USER);
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(parse_star_events(b"{not json").is_err());
        assert!(parse_star_events(br#"{"starred_at": "x"}"#).is_err());
    }

    #[test]
    fn test_parse_empty_array() {
        assert!(parse_star_events(b"[]").unwrap().is_empty());
    }
}
