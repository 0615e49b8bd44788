//! Runtime wiring: builds the tracker from configuration, owns its poll
//! task, and serializes configuration reloads.

use std::sync::Arc;

use platforms_live::{LiveStatusClient, TwitchClient, YouTubeClient, default_client};
use reqwest::Client;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::commands::CommandRouter;
use crate::config::{AppConfig, ConfigSource};
use crate::error::Result;
use crate::monitor::{StatusStore, SubscriptionTracker};
use crate::notify::Transport;
use crate::resources::ResourceFetcher;
use crate::telegram::{TelegramTransport, UpdatePoller};

/// Everything that gets rebuilt when configuration reloads.
struct RuntimeState {
    config: Arc<AppConfig>,
    router: Arc<CommandRouter>,
    poll_cancel: CancellationToken,
    poll_task: JoinHandle<()>,
}

/// The running bot: poll task, command router, and the reload guard.
pub struct BotRuntime {
    http: Client,
    source: ConfigSource,
    bot_token: String,
    shutdown: CancellationToken,
    state: Mutex<RuntimeState>,
}

impl BotRuntime {
    /// Load configuration from the source and start the poll task.
    pub async fn start(source: ConfigSource) -> Result<Arc<Self>> {
        let http = default_client();
        let config = Arc::new(source.load(&http).await?);
        let shutdown = CancellationToken::new();

        // The update poller binds to this token for the process lifetime;
        // changing telegram.bot_token requires a restart.
        let bot_token = config.telegram.bot_token.clone();

        let state = Self::activate(&http, config, &shutdown);

        Ok(Arc::new(Self {
            http,
            source,
            bot_token,
            shutdown,
            state: Mutex::new(state),
        }))
    }

    /// Build a fresh tracker and router from config, spawn the poll task.
    fn activate(
        http: &Client,
        config: Arc<AppConfig>,
        shutdown: &CancellationToken,
    ) -> RuntimeState {
        let transport: Arc<dyn Transport> =
            Arc::new(TelegramTransport::new(http.clone(), &config.telegram));

        let store = StatusStore::load(&config.state_file);
        let tracker = Arc::new(SubscriptionTracker::new(
            config.clone(),
            build_clients(http, &config),
            transport.clone(),
            store,
        ));

        let resources = config.resources.as_ref().and_then(|resources| {
            match ResourceFetcher::new(http.clone(), resources) {
                Ok(fetcher) => Some(fetcher),
                Err(error) => {
                    warn!(error = %error, "Invalid resources configuration; file tokens will fail");
                    None
                }
            }
        });

        let router = Arc::new(CommandRouter::new(
            config.clone(),
            tracker.clone(),
            transport,
            resources,
        ));

        let poll_cancel = shutdown.child_token();
        let poll_task = tokio::spawn({
            let tracker = tracker.clone();
            let cancel = poll_cancel.clone();
            async move { tracker.run(cancel).await }
        });

        RuntimeState {
            config,
            router,
            poll_cancel,
            poll_task,
        }
    }

    /// Run the Telegram update loop until the shutdown token fires, then
    /// stop the poll task.
    pub async fn run_until_shutdown(self: Arc<Self>) {
        let poller = UpdatePoller::new(self.http.clone(), self.bot_token.clone(), self.clone());
        poller.run(self.shutdown.clone()).await;
        self.stop().await;
    }

    /// Re-read configuration and swap in a fresh tracker.
    ///
    /// Serialized by the state lock, so concurrent requests queue up. The
    /// old poll task is cancelled and awaited before the new tracker
    /// starts; two trackers never race on the same state file. A failed
    /// config read leaves the running tracker untouched.
    pub async fn reload(&self) -> Result<()> {
        let mut state = self.state.lock().await;

        let config = Arc::new(self.source.load(&self.http).await?);

        state.poll_cancel.cancel();
        if let Err(error) = (&mut state.poll_task).await {
            warn!(error = %error, "Previous monitor task ended abnormally");
        }

        *state = Self::activate(&self.http, config, &self.shutdown);
        info!(source = %self.source.describe(), "Configuration reloaded");
        Ok(())
    }

    /// Cancel the poll task and wait for it to finish.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        state.poll_cancel.cancel();
        if let Err(error) = (&mut state.poll_task).await {
            warn!(error = %error, "Monitor task ended abnormally");
        }
        info!("Runtime stopped");
    }

    /// Token observed by every background task; cancel it to shut down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Chat id commands are currently accepted from.
    pub async fn chat_id(&self) -> String {
        self.state.lock().await.config.telegram.chat_id.clone()
    }

    /// The current command router (replaced on reload).
    pub async fn router(&self) -> Arc<CommandRouter> {
        self.state.lock().await.router.clone()
    }

    /// One-shot wiring for the simulate subcommands: load config, deliver
    /// the forced transition, and return the confirmation line.
    pub async fn simulate_once(
        source: ConfigSource,
        subscription_id: &str,
        is_live: bool,
    ) -> Result<String> {
        let http = default_client();
        let config = Arc::new(source.load(&http).await?);

        let transport: Arc<dyn Transport> =
            Arc::new(TelegramTransport::new(http.clone(), &config.telegram));
        let store = StatusStore::load(&config.state_file);
        let tracker = SubscriptionTracker::new(
            config.clone(),
            build_clients(&http, &config),
            transport,
            store,
        );

        tracker.simulate_event(subscription_id, is_live).await
    }
}

/// One live-status client per configured platform credential set.
fn build_clients(http: &Client, config: &AppConfig) -> Vec<Arc<dyn LiveStatusClient>> {
    let mut clients: Vec<Arc<dyn LiveStatusClient>> = Vec::new();

    if let Some(twitch) = &config.twitch {
        clients.push(Arc::new(TwitchClient::new(
            http.clone(),
            twitch.client_id.clone(),
            twitch.client_secret.clone(),
        )));
    }
    if let Some(youtube) = &config.youtube {
        clients.push(Arc::new(YouTubeClient::new(
            http.clone(),
            youtube.api_key.clone(),
        )));
    }

    clients
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("config.json");
        let state_file = dir.path().join("state.json");
        let config = serde_json::json!({
            "telegram": {"bot_token": "123:ABC", "chat_id": "42"},
            "state_file": state_file,
            "subscriptions": [],
        });
        std::fs::write(&path, serde_json::to_vec_pretty(&config).unwrap()).unwrap();
        path
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir);

        let runtime = BotRuntime::start(ConfigSource::File(path)).await.unwrap();
        assert_eq!(runtime.chat_id().await, "42");
        runtime.stop().await;
    }

    #[tokio::test]
    async fn test_reload_swaps_tracker() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir);

        let runtime = BotRuntime::start(ConfigSource::File(path)).await.unwrap();
        runtime.reload().await.unwrap();
        runtime.stop().await;
    }

    #[tokio::test]
    async fn test_reload_failure_keeps_old_wiring() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir);

        let runtime = BotRuntime::start(ConfigSource::File(path.clone()))
            .await
            .unwrap();

        std::fs::remove_file(&path).unwrap();
        assert!(runtime.reload().await.is_err());

        // The original wiring is still in place and can be shut down.
        assert_eq!(runtime.chat_id().await, "42");
        runtime.stop().await;
    }

    #[tokio::test]
    async fn test_shutdown_token_cancels_poll_task() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir);

        let runtime = BotRuntime::start(ConfigSource::File(path)).await.unwrap();
        runtime.shutdown_token().cancel();

        // The poll task observes the parent token, so stop() returns
        // promptly.
        tokio::time::timeout(std::time::Duration::from_secs(1), runtime.stop())
            .await
            .expect("runtime did not stop after shutdown");
    }
}
