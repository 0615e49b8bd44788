//! Chat command routing.
//!
//! Built-in commands are handled here or deferred to the runtime; every
//! other name is looked up in the configured dynamic command table. Dynamic
//! replies may embed `file:<path>` tokens, which are fetched through the
//! resource fetcher and delivered as document attachments ahead of the
//! remaining text.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::monitor::SubscriptionTracker;
use crate::notify::{MessageTemplate, Transport};
use crate::resources::ResourceFetcher;

/// What the caller should do after a command was routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAction {
    /// The command was fully handled here.
    Handled,
    /// A configuration reload was requested; the runtime must perform it.
    ReloadRequested,
    /// The name matched nothing and was dropped.
    Ignored,
}

/// Routes command names to built-in handlers or dynamic templates.
pub struct CommandRouter {
    config: Arc<AppConfig>,
    tracker: Arc<SubscriptionTracker>,
    transport: Arc<dyn Transport>,
    resources: Option<ResourceFetcher>,
}

impl CommandRouter {
    pub fn new(
        config: Arc<AppConfig>,
        tracker: Arc<SubscriptionTracker>,
        transport: Arc<dyn Transport>,
        resources: Option<ResourceFetcher>,
    ) -> Self {
        Self {
            config,
            tracker,
            transport,
            resources,
        }
    }

    /// Route one command name. Built-ins shadow dynamic commands with the
    /// same name.
    pub async fn dispatch(&self, name: &str) -> CommandAction {
        match name {
            "status" => {
                self.handle_status().await;
                CommandAction::Handled
            }
            "reload" => CommandAction::ReloadRequested,
            _ => {
                if let Some(template) = self.config.commands.get(name) {
                    self.handle_dynamic(name, template).await;
                    CommandAction::Handled
                } else {
                    debug!(command = name, "Ignoring unknown command");
                    CommandAction::Ignored
                }
            }
        }
    }

    /// Acknowledge, run a fresh sweep, and send the report.
    async fn handle_status(&self) {
        if let Err(error) = self
            .transport
            .send_text("Checking subscription status...")
            .await
        {
            warn!(error = %error, "Failed to send status acknowledgement");
        }

        let report = self.tracker.build_status_report().await;
        if let Err(error) = self.transport.send_text(&report).await {
            warn!(error = %error, "Failed to send status report");
        }
    }

    /// Deliver one dynamic command reply: attachments first, in token
    /// order, then whatever text remains. A failed fetch degrades to an
    /// inline note in the attachment's position rather than aborting.
    async fn handle_dynamic(&self, name: &str, template: &MessageTemplate) {
        let Some(variant) = template.pick() else {
            debug!(command = name, "Dynamic command has no non-blank variant");
            return;
        };

        let (text, files) = extract_file_tokens(variant);

        for path in &files {
            match self.fetch_resource(path).await {
                Ok((bytes, filename)) => {
                    if let Err(error) = self.transport.send_file(bytes, &filename).await {
                        warn!(command = name, path, error = %error, "Failed to send attachment");
                    }
                }
                Err(error) => {
                    warn!(command = name, path, error = %error, "Failed to fetch attachment");
                    let note = format!("Could not fetch {path}.");
                    if let Err(error) = self.transport.send_text(&note).await {
                        warn!(command = name, error = %error, "Failed to send fetch-failure note");
                    }
                }
            }
        }

        if !text.is_empty() {
            if let Err(error) = self.transport.send_text(&text).await {
                warn!(command = name, error = %error, "Failed to send command reply");
            }
        }
    }

    async fn fetch_resource(&self, path: &str) -> Result<(Bytes, String)> {
        match &self.resources {
            Some(fetcher) => fetcher.fetch(path).await,
            None => Err(Error::config("resources.base_url is not configured")),
        }
    }
}

/// Split `file:<path>` tokens out of a command reply.
///
/// Tokens are whitespace-delimited; the remaining words are re-joined with
/// single spaces. A bare `file:` with no path stays in the text.
fn extract_file_tokens(variant: &str) -> (String, Vec<String>) {
    let mut words = Vec::new();
    let mut files = Vec::new();

    for word in variant.split_whitespace() {
        match word.strip_prefix("file:") {
            Some(path) if !path.is_empty() => files.push(path.to_string()),
            _ => words.push(word),
        }
    }

    (words.join(" "), files)
}
