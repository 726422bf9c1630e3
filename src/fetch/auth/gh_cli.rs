use tokio::process::Command;
use tracing::{debug, warn};

/// Asks the GitHub CLI for its stored token (`gh auth token`).
///
/// Any failure (binary missing, not logged in, empty output) yields `None`;
/// callers fall back to unauthenticated requests.
#[tracing::instrument]
pub async fn get_github_token() -> Option<String> {
    token_from_command("gh", &["auth", "token"]).await
}

pub(crate) async fn token_from_command(program: &str, args: &[&str]) -> Option<String> {
    let output = match Command::new(program).args(args).output().await {
        Ok(output) => output,
        Err(e) => {
            debug!(program, error = %e, "Token command could not be started");
            return None;
        }
    };

    if !output.status.success() {
        warn!(program, status = %output.status, "Token command failed");
        return None;
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() { None } else { Some(token) }
}
