//! YouTube live-status client.
//!
//! Uses the Data API v3 search endpoint filtered to live video events for a
//! channel id. When a live video id is resolvable the check carries the
//! specific watch URL; otherwise it falls back to the channel's `/live` page.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::client::{LiveCheck, LiveStatusClient};
use crate::error::PlatformError;
use crate::platform::Platform;

const SEARCH_ENDPOINT: &str = "https://www.googleapis.com/youtube/v3/search";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    id: SearchItemId,
    #[serde(default)]
    snippet: Snippet,
}

#[derive(Debug, Default, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Snippet {
    title: Option<String>,
}

/// Client for the YouTube Data API v3.
pub struct YouTubeClient {
    client: Client,
    api_key: String,
}

impl YouTubeClient {
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl LiveStatusClient for YouTubeClient {
    fn platform(&self) -> Platform {
        Platform::YouTube
    }

    async fn check_live(&self, channel: &str) -> Result<LiveCheck, PlatformError> {
        let response = self
            .client
            .get(SEARCH_ENDPOINT)
            .query(&[
                ("part", "snippet"),
                ("channelId", channel),
                ("eventType", "live"),
                ("type", "video"),
                ("maxResults", "1"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PlatformError::Status {
                endpoint: "youtube/v3/search",
                status: response.status(),
            });
        }

        let payload: SearchResponse = response.json().await?;
        let fallback_url = Platform::YouTube.channel_url(channel);

        match payload.items.into_iter().next() {
            Some(item) => {
                let url = match item.id.video_id {
                    Some(video_id) => format!("https://www.youtube.com/watch?v={video_id}"),
                    None => fallback_url,
                };
                Ok(LiveCheck {
                    is_live: true,
                    url,
                    title: item.snippet.title,
                })
            }
            None => Ok(LiveCheck {
                is_live: false,
                url: fallback_url,
                title: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_response_live_with_video_id() {
        let json = r#"{
            "kind": "youtube#searchListResponse",
            "items": [
                {
                    "id": {"kind": "youtube#video", "videoId": "dQw4w9WgXcQ"},
                    "snippet": {"title": "24/7 lofi radio", "channelId": "UCabc"}
                }
            ]
        }"#;

        let payload: SearchResponse = serde_json::from_str(json).unwrap();
        let item = &payload.items[0];
        assert_eq!(item.id.video_id.as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(item.snippet.title.as_deref(), Some("24/7 lofi radio"));
    }

    #[test]
    fn test_search_response_live_without_video_id() {
        let json = r#"{"items": [{"id": {"kind": "youtube#channel"}, "snippet": {"title": "x"}}]}"#;
        let payload: SearchResponse = serde_json::from_str(json).unwrap();
        assert!(payload.items[0].id.video_id.is_none());
    }

    #[test]
    fn test_search_response_offline() {
        let payload: SearchResponse = serde_json::from_str(r#"{"items": []}"#).unwrap();
        assert!(payload.items.is_empty());

        let payload: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(payload.items.is_empty());
    }
}
