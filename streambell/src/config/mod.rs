//! Application configuration.
//!
//! Configuration is a single JSON document, loadable from a local file or a
//! remote URL (see [`ConfigSource`]). Everything below `telegram` is
//! optional and defaulted so a minimal config stays minimal.

mod source;

pub use source::{ConfigAuth, ConfigSource};

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};
use crate::notify::MessageTemplate;

/// Target chat for notifications and the bot command surface.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// Telegram Bot API token.
    pub bot_token: String,
    /// Target chat id. Accepts a JSON number or string.
    #[serde(deserialize_with = "deserialize_chat_id")]
    pub chat_id: String,
    /// Optional topic/thread inside the chat.
    #[serde(default)]
    pub message_thread_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TwitchConfig {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YouTubeConfig {
    pub api_key: String,
}

/// Remote source that dynamic-command `file:` tokens are fetched from.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourcesConfig {
    pub base_url: String,
    #[serde(default)]
    pub bearer_token: Option<String>,
}

/// One monitored channel.
#[derive(Debug, Clone, Deserialize)]
pub struct Subscription {
    /// Stable id, unique across the subscription list.
    pub id: String,
    /// Platform name as written in config. Parsed per poll cycle so a typo
    /// fails only this subscription, never the whole config.
    pub platform: String,
    /// Platform-specific channel identifier.
    pub channel: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub live_message: Option<MessageTemplate>,
    #[serde(default)]
    pub offline_message: Option<MessageTemplate>,
}

impl Subscription {
    /// Human label shown in notifications and reports.
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.channel)
    }

    /// Template for the given transition direction, if configured.
    pub fn template_for(&self, is_live: bool) -> Option<&MessageTemplate> {
        if is_live {
            self.live_message.as_ref()
        } else {
            self.offline_message.as_ref()
        }
    }

    /// Config key of the template for the given direction.
    pub fn template_key(is_live: bool) -> &'static str {
        if is_live { "live_message" } else { "offline_message" }
    }
}

fn default_poll_interval() -> u64 {
    60
}

fn default_state_file() -> PathBuf {
    PathBuf::from("state.json")
}

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub twitch: Option<TwitchConfig>,
    #[serde(default)]
    pub youtube: Option<YouTubeConfig>,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
    /// Announce the state observed on the very first poll of a subscription
    /// instead of silently adopting it.
    #[serde(default)]
    pub notify_on_startup: bool,
    /// Log per-cycle summaries at info instead of debug.
    #[serde(default)]
    pub verbose_polling: bool,
    #[serde(default)]
    pub subscriptions: Vec<Subscription>,
    /// Dynamic chat commands: name (without the slash) to reply template.
    #[serde(default)]
    pub commands: BTreeMap<String, MessageTemplate>,
    #[serde(default)]
    pub resources: Option<ResourcesConfig>,
}

impl AppConfig {
    /// Parse and validate configuration from raw JSON bytes.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let config: AppConfig = serde_json::from_slice(bytes)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(Error::config("telegram.bot_token must not be empty"));
        }
        if self.telegram.chat_id.trim().is_empty() {
            return Err(Error::config("telegram.chat_id must not be empty"));
        }
        if self.poll_interval_seconds == 0 {
            return Err(Error::config("poll_interval_seconds must be at least 1"));
        }

        let mut seen = std::collections::BTreeSet::new();
        for sub in &self.subscriptions {
            if sub.id.trim().is_empty() {
                return Err(Error::config("subscription id must not be empty"));
            }
            if !seen.insert(sub.id.as_str()) {
                return Err(Error::config(format!(
                    "duplicate subscription id: {}",
                    sub.id
                )));
            }
        }
        Ok(())
    }

    pub fn find_subscription(&self, id: &str) -> Option<&Subscription> {
        self.subscriptions.iter().find(|sub| sub.id == id)
    }
}

/// Chat ids arrive as numbers or strings depending on who wrote the config.
fn deserialize_chat_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ChatId {
        Number(i64),
        Text(String),
    }

    Ok(match ChatId::deserialize(deserializer)? {
        ChatId::Number(n) => n.to_string(),
        ChatId::Text(s) => s.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_json() -> &'static str {
        r#"{
            "telegram": {"bot_token": "123:ABC", "chat_id": -100123456},
            "subscriptions": []
        }"#
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config = AppConfig::from_json(minimal_json().as_bytes()).unwrap();
        assert_eq!(config.telegram.chat_id, "-100123456");
        assert_eq!(config.telegram.message_thread_id, None);
        assert_eq!(config.poll_interval_seconds, 60);
        assert_eq!(config.state_file, PathBuf::from("state.json"));
        assert!(!config.notify_on_startup);
        assert!(!config.verbose_polling);
        assert!(config.subscriptions.is_empty());
        assert!(config.commands.is_empty());
        assert!(config.resources.is_none());
    }

    #[test]
    fn test_full_config() {
        let json = r#"{
            "telegram": {"bot_token": "123:ABC", "chat_id": " 42 ", "message_thread_id": 7},
            "twitch": {"client_id": "id", "client_secret": "secret"},
            "youtube": {"api_key": "key"},
            "poll_interval_seconds": 30,
            "state_file": "/var/lib/streambell/state.json",
            "notify_on_startup": true,
            "verbose_polling": true,
            "subscriptions": [
                {
                    "id": "a",
                    "platform": "twitch",
                    "channel": "foo",
                    "display_name": "Foo",
                    "live_message": "{display_name} is live! {url}",
                    "offline_message": ["A {status}", "B {status}"]
                }
            ],
            "commands": {"rules": "Be excellent to each other."},
            "resources": {"base_url": "https://example.com/assets/", "bearer_token": "tok"}
        }"#;

        let config = AppConfig::from_json(json.as_bytes()).unwrap();
        assert_eq!(config.telegram.chat_id, "42");
        assert_eq!(config.telegram.message_thread_id, Some(7));
        assert_eq!(config.poll_interval_seconds, 30);
        assert!(config.notify_on_startup);

        let sub = &config.subscriptions[0];
        assert_eq!(sub.display_name(), "Foo");
        assert!(matches!(
            sub.live_message,
            Some(MessageTemplate::Single(_))
        ));
        assert!(matches!(
            sub.offline_message,
            Some(MessageTemplate::Choices(ref options)) if options.len() == 2
        ));
        assert_eq!(
            config.resources.as_ref().unwrap().base_url,
            "https://example.com/assets/"
        );
    }

    #[test]
    fn test_display_name_falls_back_to_channel() {
        let sub = Subscription {
            id: "a".into(),
            platform: "twitch".into(),
            channel: "foo".into(),
            display_name: None,
            live_message: None,
            offline_message: None,
        };
        assert_eq!(sub.display_name(), "foo");
    }

    #[test]
    fn test_rejects_empty_bot_token() {
        let json = r#"{"telegram": {"bot_token": " ", "chat_id": "42"}}"#;
        let err = AppConfig::from_json(json.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("bot_token"));
    }

    #[test]
    fn test_rejects_duplicate_subscription_ids() {
        let json = r#"{
            "telegram": {"bot_token": "t", "chat_id": "42"},
            "subscriptions": [
                {"id": "a", "platform": "twitch", "channel": "x"},
                {"id": "a", "platform": "youtube", "channel": "y"}
            ]
        }"#;
        let err = AppConfig::from_json(json.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("duplicate subscription id"));
    }

    #[test]
    fn test_rejects_zero_poll_interval() {
        let json = r#"{
            "telegram": {"bot_token": "t", "chat_id": "42"},
            "poll_interval_seconds": 0
        }"#;
        assert!(AppConfig::from_json(json.as_bytes()).is_err());
    }

    #[test]
    fn test_find_subscription() {
        let json = r#"{
            "telegram": {"bot_token": "t", "chat_id": "42"},
            "subscriptions": [{"id": "a", "platform": "twitch", "channel": "x"}]
        }"#;
        let config = AppConfig::from_json(json.as_bytes()).unwrap();
        assert!(config.find_subscription("a").is_some());
        assert!(config.find_subscription("b").is_none());
    }
}
