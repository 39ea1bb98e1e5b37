use std::time::Duration;

use thiserror::Error;

/// Failure of a single provider request. Always contained by the search loop.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    #[error("routing provider unavailable: {0}")]
    Unavailable(String),
    #[error("routing provider timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecommendError {
    #[error(
        "no routes available ({attempted} candidates tried, {failed} failed, {rejected} banned or duplicate)"
    )]
    NoRoutesFound {
        attempted: usize,
        failed: usize,
        rejected: usize,
    },
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("failed to bind listener: {0}")]
    Io(#[from] std::io::Error),
}
