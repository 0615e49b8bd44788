//! Telegram delivery transport.
//!
//! Talks to the Bot API directly over reqwest: `sendMessage` for text and
//! `sendDocument` multipart for attachments. Rate-limited requests are
//! retried a bounded number of times, honoring the `parameters.retry_after`
//! hint from the response body.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use super::api_url;
use crate::config::TelegramConfig;
use crate::error::{Error, Result};
use crate::notify::Transport;

/// Attempts per request before a 429 becomes an error.
const MAX_RATE_LIMIT_ATTEMPTS: u32 = 3;

/// Bot API `sendMessage` text limit in characters.
const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

/// Transport backed by the Telegram Bot API, bound to one chat.
pub struct TelegramTransport {
    client: Client,
    bot_token: String,
    chat_id: String,
    message_thread_id: Option<i64>,
}

impl TelegramTransport {
    pub fn new(client: Client, config: &TelegramConfig) -> Self {
        Self {
            client,
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
            message_thread_id: config.message_thread_id,
        }
    }

    fn message_payload(&self, text: &str) -> serde_json::Value {
        let mut payload = json!({
            "chat_id": self.chat_id,
            "text": truncate_message(text, TELEGRAM_MESSAGE_LIMIT),
        });
        if let Some(thread_id) = self.message_thread_id {
            payload["message_thread_id"] = json!(thread_id);
        }
        payload
    }

    /// Send a request, sleeping and retrying on 429 up to the attempt cap.
    ///
    /// The builder closure is re-invoked per attempt because multipart
    /// bodies cannot be cloned.
    async fn send_with_retry<F>(&self, method: &'static str, build: F) -> Result<()>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut attempts = 0;

        loop {
            attempts += 1;

            let response = build()
                .send()
                .await
                .map_err(|error| Error::transport(format!("Telegram request failed: {error}")))?;
            let status = response.status();

            if status.is_success() {
                return Ok(());
            }

            if status.as_u16() == 429 {
                let body: serde_json::Value = response.json().await.unwrap_or_default();
                let retry_after = body
                    .get("parameters")
                    .and_then(|params| params.get("retry_after"))
                    .and_then(|value| value.as_u64())
                    .map(Duration::from_secs);

                if attempts >= MAX_RATE_LIMIT_ATTEMPTS {
                    return Err(Error::transport(format!(
                        "Telegram rate limit on {method} persisted through {attempts} attempts"
                    )));
                }

                let wait = retry_after.unwrap_or(Duration::from_secs(1));
                debug!(
                    method,
                    wait_secs = wait.as_secs(),
                    attempt = attempts,
                    "Telegram rate limited; waiting before retry"
                );
                tokio::time::sleep(wait).await;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            warn!(method, %status, body = %body, "Telegram request rejected");
            return Err(Error::transport(format!(
                "Telegram {method} failed with status {status}"
            )));
        }
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send_text(&self, text: &str) -> Result<()> {
        let url = api_url(&self.bot_token, "sendMessage");
        let payload = self.message_payload(text);

        self.send_with_retry("sendMessage", || self.client.post(&url).json(&payload))
            .await?;
        debug!(chars = text.chars().count(), "Telegram message sent");
        Ok(())
    }

    async fn send_file(&self, bytes: Bytes, filename: &str) -> Result<()> {
        let url = api_url(&self.bot_token, "sendDocument");

        self.send_with_retry("sendDocument", || {
            let part = reqwest::multipart::Part::bytes(bytes.to_vec())
                .file_name(filename.to_string());
            let mut form = reqwest::multipart::Form::new()
                .text("chat_id", self.chat_id.clone())
                .part("document", part);
            if let Some(thread_id) = self.message_thread_id {
                form = form.text("message_thread_id", thread_id.to_string());
            }
            self.client.post(&url).multipart(form)
        })
        .await?;
        debug!(filename, size = bytes.len(), "Telegram document sent");
        Ok(())
    }
}

/// Truncate a message to the Bot API character limit, marking the cut.
fn truncate_message(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let suffix = "\n\n[truncated]";
    let truncated: String = text.chars().take(limit - suffix.len()).collect();
    format!("{truncated}{suffix}")
}
