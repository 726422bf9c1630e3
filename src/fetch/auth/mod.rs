//! Credentials for outgoing requests.

mod api_key;
mod gh_cli;

pub use api_key::ApiKey;
pub use gh_cli::get_github_token;
