//! Remote resource fetching for dynamic command attachments.

use bytes::Bytes;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::config::ResourcesConfig;
use crate::error::{Error, Result};

/// Fetches `file:<path>` payloads relative to a configured base URL.
pub struct ResourceFetcher {
    client: Client,
    base_url: Url,
    bearer_token: Option<String>,
}

impl ResourceFetcher {
    pub fn new(client: Client, config: &ResourcesConfig) -> Result<Self> {
        // Url::join treats a base without a trailing slash as a file and
        // would drop its last segment, so normalize before parsing.
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|error| Error::config(format!("invalid resources.base_url: {error}")))?;

        Ok(Self {
            client,
            base_url,
            bearer_token: config.bearer_token.clone(),
        })
    }

    /// Fetch a resource path, returning the payload and a filename derived
    /// from the last path segment.
    pub async fn fetch(&self, path: &str) -> Result<(Bytes, String)> {
        let url = self
            .base_url
            .join(path)
            .map_err(|error| Error::config(format!("invalid resource path {path}: {error}")))?;

        debug!(url = %url, "Fetching resource");

        let mut request = self.client.get(url.clone());
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(Error::Other(format!(
                "resource fetch from {url} returned status {}",
                response.status()
            )));
        }

        let bytes = response.bytes().await?;
        Ok((bytes, filename_for(path)))
    }
}

/// Derive an attachment filename from a resource path.
fn filename_for(path: &str) -> String {
    path.split(['?', '#'])
        .next()
        .unwrap_or("")
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or("file")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher(base_url: &str) -> Result<ResourceFetcher> {
        platforms_live::install_rustls_provider();
        ResourceFetcher::new(
            Client::new(),
            &ResourcesConfig {
                base_url: base_url.to_string(),
                bearer_token: None,
            },
        )
    }

    #[test]
    fn test_filename_for() {
        assert_eq!(filename_for("handbook.pdf"), "handbook.pdf");
        assert_eq!(filename_for("docs/guide.pdf"), "guide.pdf");
        assert_eq!(filename_for("docs/subdir/"), "subdir");
        assert_eq!(filename_for("image.png?v=2"), "image.png");
        assert_eq!(filename_for("notes.txt#section"), "notes.txt");
        assert_eq!(filename_for(""), "file");
        assert_eq!(filename_for("/"), "file");
    }

    #[test]
    fn test_new_normalizes_base_url() {
        let fetcher = fetcher("https://example.com/assets").unwrap();
        assert_eq!(fetcher.base_url.as_str(), "https://example.com/assets/");
        assert_eq!(
            fetcher.base_url.join("rules.pdf").unwrap().as_str(),
            "https://example.com/assets/rules.pdf"
        );
    }

    #[test]
    fn test_new_keeps_trailing_slash() {
        let fetcher = fetcher("https://example.com/assets/").unwrap();
        assert_eq!(fetcher.base_url.as_str(), "https://example.com/assets/");
    }

    #[test]
    fn test_new_rejects_invalid_base_url() {
        assert!(fetcher("not a url").is_err());
    }
}
