//! Telegram update polling and command intake.
//!
//! Long-polls `getUpdates` in its own task, tracks the update offset, and
//! forwards slash commands from the configured chat to the command router.
//! Commands from any other chat get a short rejection reply; commands
//! addressed to a different bot (`/name@otherbot`) are ignored.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::api_url;
use crate::commands::CommandAction;
use crate::error::{Error, Result};
use crate::runtime::BotRuntime;

/// Long-poll window requested from Telegram.
const LONG_POLL_TIMEOUT_SECS: u64 = 30;

/// Pause after a failed getUpdates call before polling again.
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct UpdatesResponse {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    result: Vec<Update>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    #[serde(default)]
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct MeResponse {
    #[serde(default)]
    result: Option<BotUser>,
}

#[derive(Debug, Deserialize)]
struct BotUser {
    #[serde(default)]
    username: Option<String>,
}

/// Long-polling consumer of Telegram updates.
pub struct UpdatePoller {
    client: Client,
    bot_token: String,
    runtime: Arc<BotRuntime>,
}

impl UpdatePoller {
    pub fn new(client: Client, bot_token: String, runtime: Arc<BotRuntime>) -> Self {
        Self {
            client,
            bot_token,
            runtime,
        }
    }

    /// Run the update loop until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        let bot_username = self.fetch_bot_username().await;
        match &bot_username {
            Some(username) => info!(username = %username, "Listening for Telegram commands"),
            None => info!("Listening for Telegram commands (bot username unknown)"),
        }

        let mut offset: i64 = 0;

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("Update poller shutting down");
                    break;
                }
                result = self.poll_updates(offset) => match result {
                    Ok(updates) => {
                        for update in updates {
                            if update.update_id >= offset {
                                offset = update.update_id + 1;
                            }
                            if let Some(message) = update.message {
                                self.handle_message(message, bot_username.as_deref()).await;
                            }
                        }
                    }
                    Err(error) => {
                        warn!(error = %error, "getUpdates failed; backing off");
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => break,
                            _ = tokio::time::sleep(POLL_ERROR_BACKOFF) => {}
                        }
                    }
                }
            }
        }
    }

    async fn poll_updates(&self, offset: i64) -> Result<Vec<Update>> {
        let payload = json!({
            "timeout": LONG_POLL_TIMEOUT_SECS,
            "offset": offset,
            "allowed_updates": ["message"],
        });

        let response = self
            .client
            .post(api_url(&self.bot_token, "getUpdates"))
            // The long poll must outlive the shared client's request timeout.
            .timeout(Duration::from_secs(LONG_POLL_TIMEOUT_SECS + 10))
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::transport(format!(
                "getUpdates returned status {}",
                response.status()
            )));
        }

        let payload: UpdatesResponse = response.json().await?;
        if !payload.ok {
            return Err(Error::transport("getUpdates returned ok=false"));
        }
        Ok(payload.result)
    }

    /// Ask Telegram for the bot's username, used to filter `@` mentions.
    /// Failure is tolerated; mention filtering is then skipped.
    async fn fetch_bot_username(&self) -> Option<String> {
        let result = self
            .client
            .get(api_url(&self.bot_token, "getMe"))
            .send()
            .await;

        match result {
            Ok(response) => match response.json::<MeResponse>().await {
                Ok(me) => me.result.and_then(|user| user.username),
                Err(error) => {
                    warn!(error = %error, "Could not parse getMe response");
                    None
                }
            },
            Err(error) => {
                warn!(error = %error, "Could not fetch bot identity");
                None
            }
        }
    }

    async fn handle_message(&self, message: Message, bot_username: Option<&str>) {
        let Some(text) = message.text.as_deref() else {
            return;
        };
        let Some(token) = parse_command(text) else {
            return;
        };
        let (name, mention) = split_mention(token);

        if let (Some(mention), Some(username)) = (mention, bot_username)
            && !mention.eq_ignore_ascii_case(username)
        {
            debug!(command = name, mention, "Command addressed to another bot");
            return;
        }

        let name = name.to_ascii_lowercase();

        if message.chat.id.to_string() != self.runtime.chat_id().await {
            debug!(
                chat_id = message.chat.id,
                command = %name,
                "Command from outside the configured chat"
            );
            self.plain_sender()
                .send(message.chat.id, "This command is not allowed in this chat.")
                .await;
            return;
        }

        // Dispatch off the update loop so a slow status sweep or a reload
        // never stalls polling.
        let router = self.runtime.router().await;
        let runtime = self.runtime.clone();
        let sender = self.plain_sender();
        let chat_id = message.chat.id;
        tokio::spawn(async move {
            if router.dispatch(&name).await == CommandAction::ReloadRequested {
                let reply = match runtime.reload().await {
                    Ok(()) => "Configuration reloaded.".to_string(),
                    Err(error) => format!("Reload failed: {error}"),
                };
                sender.send(chat_id, &reply).await;
            }
        });
    }

    fn plain_sender(&self) -> PlainSender {
        PlainSender {
            client: self.client.clone(),
            bot_token: self.bot_token.clone(),
        }
    }
}

/// Best-effort `sendMessage` to an arbitrary chat, outside the transport's
/// single-target contract. Used for replies that must reach the chat a
/// command came from.
#[derive(Clone)]
struct PlainSender {
    client: Client,
    bot_token: String,
}

impl PlainSender {
    async fn send(&self, chat_id: i64, text: &str) {
        let payload = json!({ "chat_id": chat_id, "text": text });
        let result = self
            .client
            .post(api_url(&self.bot_token, "sendMessage"))
            .json(&payload)
            .send()
            .await;

        match result {
            Ok(response) if !response.status().is_success() => {
                warn!(chat_id, status = %response.status(), "Reply rejected by Telegram");
            }
            Err(error) => warn!(chat_id, error = %error, "Failed to send reply"),
            Ok(_) => {}
        }
    }
}

/// Extract the command token from a message, without the leading slash.
fn parse_command(text: &str) -> Option<&str> {
    let rest = text.trim().strip_prefix('/')?;
    let token = rest.split(char::is_whitespace).next().unwrap_or("");
    if token.is_empty() { None } else { Some(token) }
}

/// Split an optional `@botname` mention off a command token.
fn split_mention(token: &str) -> (&str, Option<&str>) {
    match token.split_once('@') {
        Some((name, mention)) => (name, Some(mention)),
        None => (token, None),
    }
}
