//! Twitch live-status client.
//!
//! Uses the Helix streams endpoint with an app access token obtained via the
//! client-credentials grant. The token is cached in memory; a 401 from Helix
//! invalidates it and the query is retried exactly once with a fresh token.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::client::{LiveCheck, LiveStatusClient};
use crate::error::PlatformError;
use crate::platform::Platform;

const TOKEN_ENDPOINT: &str = "https://id.twitch.tv/oauth2/token";
const STREAMS_ENDPOINT: &str = "https://api.twitch.tv/helix/streams";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct StreamsResponse {
    #[serde(default)]
    data: Vec<StreamEntry>,
}

#[derive(Debug, Deserialize)]
struct StreamEntry {
    #[serde(default)]
    title: Option<String>,
}

/// Client for the Twitch Helix API.
pub struct TwitchClient {
    client: Client,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<String>>,
}

impl TwitchClient {
    pub fn new(
        client: Client,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token: Mutex::new(None),
        }
    }

    /// Return the cached app access token, fetching one if needed.
    async fn ensure_token(&self) -> Result<String, PlatformError> {
        let mut token = self.token.lock().await;
        if let Some(token) = token.as_ref() {
            return Ok(token.clone());
        }

        let response = self
            .client
            .post(TOKEN_ENDPOINT)
            .query(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PlatformError::Status {
                endpoint: "oauth2/token",
                status: response.status(),
            });
        }

        let payload: TokenResponse = response.json().await?;
        debug!("Fetched new Twitch app access token");
        *token = Some(payload.access_token.clone());
        Ok(payload.access_token)
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    async fn query_streams(
        &self,
        channel: &str,
        token: &str,
    ) -> Result<reqwest::Response, PlatformError> {
        Ok(self
            .client
            .get(STREAMS_ENDPOINT)
            .query(&[("user_login", channel)])
            .header("Client-Id", &self.client_id)
            .bearer_auth(token)
            .send()
            .await?)
    }
}

#[async_trait]
impl LiveStatusClient for TwitchClient {
    fn platform(&self) -> Platform {
        Platform::Twitch
    }

    async fn check_live(&self, channel: &str) -> Result<LiveCheck, PlatformError> {
        let token = self.ensure_token().await?;
        let mut response = self.query_streams(channel, &token).await?;

        // App tokens expire server-side; refresh and retry once.
        if response.status() == StatusCode::UNAUTHORIZED {
            debug!("Twitch app token rejected; refreshing");
            self.invalidate_token().await;
            let token = self.ensure_token().await?;
            response = self.query_streams(channel, &token).await?;
        }

        if !response.status().is_success() {
            return Err(PlatformError::Status {
                endpoint: "helix/streams",
                status: response.status(),
            });
        }

        let payload: StreamsResponse = response.json().await?;
        let url = Platform::Twitch.channel_url(channel);
        match payload.data.into_iter().next() {
            Some(stream) => Ok(LiveCheck {
                is_live: true,
                url,
                title: stream.title,
            }),
            None => Ok(LiveCheck {
                is_live: false,
                url,
                title: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_streams_response_live() {
        let json = r#"{
            "data": [
                {
                    "id": "123",
                    "user_login": "foo",
                    "title": "Speedrunning all night",
                    "viewer_count": 420,
                    "started_at": "2024-01-01T00:00:00Z"
                }
            ],
            "pagination": {}
        }"#;

        let payload: StreamsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(payload.data.len(), 1);
        assert_eq!(
            payload.data[0].title.as_deref(),
            Some("Speedrunning all night")
        );
    }

    #[test]
    fn test_streams_response_offline() {
        let payload: StreamsResponse = serde_json::from_str(r#"{"data": [], "pagination": {}}"#).unwrap();
        assert!(payload.data.is_empty());

        // Helix omits the field entirely in some error shapes.
        let payload: StreamsResponse = serde_json::from_str("{}").unwrap();
        assert!(payload.data.is_empty());
    }

    #[test]
    fn test_token_response() {
        let json = r#"{"access_token": "abc123", "expires_in": 5011271, "token_type": "bearer"}"#;
        let payload: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(payload.access_token, "abc123");
    }

    #[tokio::test]
    async fn test_cached_token_is_reused() {
        crate::http::install_rustls_provider();
        let client = TwitchClient::new(Client::new(), "id", "secret");
        *client.token.lock().await = Some("cached".to_string());
        assert_eq!(client.ensure_token().await.unwrap(), "cached");
    }

    #[tokio::test]
    async fn test_invalidate_clears_cached_token() {
        crate::http::install_rustls_provider();
        let client = TwitchClient::new(Client::new(), "id", "secret");
        *client.token.lock().await = Some("cached".to_string());
        client.invalidate_token().await;
        assert!(client.token.lock().await.is_none());
    }
}
