//! The live-status client seam.

use async_trait::async_trait;

use crate::error::PlatformError;
use crate::platform::Platform;

/// Result of a single live-status check.
///
/// Ephemeral: recomputed on every poll, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveCheck {
    /// Whether the channel is currently live.
    pub is_live: bool,
    /// URL to watch the stream, or the channel page when offline.
    pub url: String,
    /// Stream title, when the platform reports one.
    pub title: Option<String>,
}

/// A client that can query one platform for a channel's live status.
#[async_trait]
pub trait LiveStatusClient: Send + Sync {
    /// The platform this client talks to.
    fn platform(&self) -> Platform;

    /// Query the platform API for the channel's current live status.
    async fn check_live(&self, channel: &str) -> Result<LiveCheck, PlatformError>;
}
