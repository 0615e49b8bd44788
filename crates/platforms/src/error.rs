use thiserror::Error;

/// Errors surfaced by platform live-status clients.
///
/// All variants are recoverable from the caller's point of view: a failed
/// check is skipped and retried on the next poll cycle.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{endpoint} returned status {status}")]
    Status {
        endpoint: &'static str,
        status: reqwest::StatusCode,
    },
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),
    #[error("other: {0}")]
    Other(String),
}
