//! Where configuration comes from.
//!
//! A source is resolved once at startup and re-read on every reload, so
//! edits to a local file or changes behind a remote URL take effect without
//! a restart.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::AppConfig;
use crate::error::{Error, Result};

/// Environment variable naming the config path or URL.
pub const CONFIG_ENV: &str = "STREAMBELL_CONFIG";
/// Bearer token used when fetching remote configuration.
pub const CONFIG_BEARER_ENV: &str = "STREAMBELL_CONFIG_BEARER";
/// Basic-auth username used when fetching remote configuration.
pub const CONFIG_USER_ENV: &str = "STREAMBELL_CONFIG_USER";
/// Basic-auth password used when fetching remote configuration.
pub const CONFIG_PASSWORD_ENV: &str = "STREAMBELL_CONFIG_PASSWORD";

/// Default config file looked up in the working directory.
const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Authentication for remote config fetches.
#[derive(Debug, Clone)]
pub enum ConfigAuth {
    Bearer { token: String },
    Basic { username: String, password: String },
}

/// A resolved configuration source, re-readable for reloads.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    File(PathBuf),
    Remote {
        url: String,
        auth: Option<ConfigAuth>,
    },
}

impl ConfigSource {
    /// Resolve the source: explicit CLI value, then `STREAMBELL_CONFIG`,
    /// then `config.json` in the working directory.
    ///
    /// Finding no source at all is fatal; there is nothing meaningful to
    /// run without configuration.
    pub fn resolve(cli_value: Option<&str>) -> Result<Self> {
        if let Some(value) = cli_value {
            return Ok(Self::from_value(value.trim()));
        }

        if let Ok(value) = std::env::var(CONFIG_ENV)
            && !value.trim().is_empty()
        {
            return Ok(Self::from_value(value.trim()));
        }

        let fallback = Path::new(DEFAULT_CONFIG_FILE);
        if fallback.exists() {
            return Ok(Self::File(fallback.to_path_buf()));
        }

        Err(Error::config(
            "no configuration source: pass --config, set STREAMBELL_CONFIG, or provide config.json",
        ))
    }

    fn from_value(value: &str) -> Self {
        if value.starts_with("http://") || value.starts_with("https://") {
            Self::Remote {
                url: value.to_string(),
                auth: auth_from_env(),
            }
        } else {
            Self::File(PathBuf::from(value))
        }
    }

    /// Load and parse the configuration from this source.
    pub async fn load(&self, client: &reqwest::Client) -> Result<AppConfig> {
        let bytes = match self {
            Self::File(path) => tokio::fs::read(path)
                .await
                .map_err(|e| Error::io_path("reading config file", path, e))?,
            Self::Remote { url, auth } => {
                debug!(url = %url, "Fetching remote configuration");
                let mut request = client.get(url);
                match auth {
                    Some(ConfigAuth::Bearer { token }) => {
                        request = request.bearer_auth(token);
                    }
                    Some(ConfigAuth::Basic { username, password }) => {
                        request = request.basic_auth(username, Some(password));
                    }
                    None => {}
                }

                let response = request.send().await?;
                if !response.status().is_success() {
                    return Err(Error::config(format!(
                        "config fetch from {} returned status {}",
                        url,
                        response.status()
                    )));
                }
                response.bytes().await?.to_vec()
            }
        };

        let config = AppConfig::from_json(&bytes)?;
        info!(
            subscriptions = config.subscriptions.len(),
            commands = config.commands.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Human-readable description for logs.
    pub fn describe(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Remote { url, .. } => url.clone(),
        }
    }
}

fn auth_from_env() -> Option<ConfigAuth> {
    if let Ok(token) = std::env::var(CONFIG_BEARER_ENV)
        && !token.trim().is_empty()
    {
        return Some(ConfigAuth::Bearer {
            token: token.trim().to_string(),
        });
    }

    if let (Ok(username), Ok(password)) = (
        std::env::var(CONFIG_USER_ENV),
        std::env::var(CONFIG_PASSWORD_ENV),
    ) && !username.is_empty()
    {
        return Some(ConfigAuth::Basic { username, password });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url_value() {
        let source = ConfigSource::resolve(Some("https://example.com/bot.json")).unwrap();
        assert!(matches!(
            source,
            ConfigSource::Remote { ref url, .. } if url == "https://example.com/bot.json"
        ));
    }

    #[test]
    fn test_resolve_path_value() {
        let source = ConfigSource::resolve(Some("/etc/streambell/config.json")).unwrap();
        assert!(matches!(
            source,
            ConfigSource::File(ref path) if path == Path::new("/etc/streambell/config.json")
        ));
    }

    #[test]
    fn test_describe() {
        let source = ConfigSource::File(PathBuf::from("config.json"));
        assert_eq!(source.describe(), "config.json");
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"telegram": {"bot_token": "t", "chat_id": "42"}}"#,
        )
        .unwrap();

        platforms_live::install_rustls_provider();
        let client = reqwest::Client::new();
        let config = ConfigSource::File(path).load(&client).await.unwrap();
        assert_eq!(config.telegram.chat_id, "42");
    }

    #[tokio::test]
    async fn test_load_missing_file_fails() {
        platforms_live::install_rustls_provider();
        let client = reqwest::Client::new();
        let result = ConfigSource::File(PathBuf::from("/nonexistent/config.json"))
            .load(&client)
            .await;
        assert!(result.is_err());
    }
}
