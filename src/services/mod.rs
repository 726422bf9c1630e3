pub mod star_source;

pub use star_source::{DownloadSource, DownloadStats, RepoMetadata, StarSource};
