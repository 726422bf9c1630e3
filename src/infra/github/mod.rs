pub mod client;

pub use client::{GitHubClient, rate_limit_wait};
