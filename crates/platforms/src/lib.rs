//! Live-status clients for external streaming platforms.
//!
//! Each client answers one question: is this channel live right now? The
//! answer is normalized into [`LiveCheck`] regardless of platform, and
//! platform-specific authentication (Twitch app access tokens, YouTube API
//! keys) stays inside the client that needs it.

pub mod client;
pub mod error;
pub mod http;
pub mod platform;
pub mod twitch;
pub mod youtube;

pub use client::{LiveCheck, LiveStatusClient};
pub use error::PlatformError;
pub use http::{DEFAULT_UA, default_client, install_rustls_provider};
pub use platform::Platform;
pub use twitch::TwitchClient;
pub use youtube::YouTubeClient;
