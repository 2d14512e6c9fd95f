use std::path::PathBuf;
use thiserror::Error;

/// Fatal problems detected before any target is scanned.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no target given: use --target <HOST> or --file <PATH>")]
    MissingTarget,

    #[error("the injected Host header value must not be empty")]
    EmptyHost,

    #[error("invalid concurrency limit: {0} (must be >= 1)")]
    InvalidConcurrency(usize),

    #[error("invalid timeout: {0}s (must be >= 1)")]
    InvalidTimeout(u64),

    #[error("cannot create output directory '{}': {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot open target file '{}': {source}", .path.display())]
    TargetFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
