//! Supported platform identifiers.

use std::fmt;

use crate::error::PlatformError;

/// A live-streaming platform this crate can query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Twitch,
    YouTube,
}

impl Platform {
    /// Parse a platform name as written in configuration.
    ///
    /// Matching is case-insensitive and tolerates surrounding whitespace;
    /// anything else is an [`PlatformError::UnsupportedPlatform`].
    pub fn parse(value: &str) -> Result<Self, PlatformError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "twitch" => Ok(Self::Twitch),
            "youtube" => Ok(Self::YouTube),
            _ => Err(PlatformError::UnsupportedPlatform(value.trim().to_string())),
        }
    }

    /// Lowercase platform name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Twitch => "twitch",
            Self::YouTube => "youtube",
        }
    }

    /// Canonical channel URL, valid whether or not the channel is live.
    ///
    /// For YouTube this is the channel's `/live` page; a live check may
    /// resolve a more specific watch URL.
    pub fn channel_url(&self, channel: &str) -> String {
        match self {
            Self::Twitch => format!("https://www.twitch.tv/{channel}"),
            Self::YouTube => format!("https://www.youtube.com/channel/{channel}/live"),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
