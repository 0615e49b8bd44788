//! The subscription tracker: the poll-cycle state machine.
//!
//! Each cycle checks every configured subscription against its platform,
//! compares the observed live state with the persisted notified-live flag,
//! and fires a notification when the two disagree. The flag advances only
//! after a notification was delivered, so a failed send is retried on the
//! next cycle instead of being dropped, and an unchanged state never sends
//! twice.

use std::sync::Arc;
use std::time::Duration;

use platforms_live::{LiveCheck, LiveStatusClient, Platform};
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, Subscription};
use crate::error::{Error, Result};
use crate::monitor::StatusStore;
use crate::notify::{Notifier, Transport};

/// Outcome of processing one subscription in one poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleAction {
    /// A transition notification was delivered and the flag advanced.
    Notified { is_live: bool },
    /// First sighting; the observed state was recorded without notifying.
    Adopted { is_live: bool },
    /// Observed state matches the stored flag; nothing to do.
    Steady,
}

/// Tracks live/offline transitions for all configured subscriptions.
pub struct SubscriptionTracker {
    config: Arc<AppConfig>,
    clients: Vec<Arc<dyn LiveStatusClient>>,
    notifier: Notifier,
    store: Mutex<StatusStore>,
}

impl SubscriptionTracker {
    pub fn new(
        config: Arc<AppConfig>,
        clients: Vec<Arc<dyn LiveStatusClient>>,
        transport: Arc<dyn Transport>,
        store: StatusStore,
    ) -> Self {
        Self {
            config,
            clients,
            notifier: Notifier::new(transport),
            store: Mutex::new(store),
        }
    }

    /// Run the poll loop until cancelled.
    ///
    /// The first cycle runs immediately; later cycles follow the configured
    /// interval. Cancellation interrupts the wait and ends the task cleanly.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            subscriptions = self.config.subscriptions.len(),
            interval_seconds = self.config.poll_interval_seconds,
            "Starting subscription monitor"
        );

        let mut ticker =
            tokio::time::interval(Duration::from_secs(self.config.poll_interval_seconds));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("Monitor task cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
            }
        }
    }

    /// One poll cycle over all subscriptions.
    ///
    /// Subscriptions are processed independently: a failure is logged and
    /// counted but never stops the rest of the batch.
    async fn run_cycle(&self) {
        let mut notified = 0usize;
        let mut errors = 0usize;

        for sub in &self.config.subscriptions {
            match self.process_subscription(sub).await {
                Ok(CycleAction::Notified { is_live }) => {
                    notified += 1;
                    info!(
                        id = %sub.id,
                        status = if is_live { "live" } else { "offline" },
                        "Sent transition notification"
                    );
                }
                Ok(CycleAction::Adopted { is_live }) => {
                    debug!(id = %sub.id, is_live, "Recorded initial state without notifying");
                }
                Ok(CycleAction::Steady) => {}
                Err(error @ (Error::Template(_) | Error::Transport(_))) => {
                    errors += 1;
                    warn!(
                        id = %sub.id,
                        error = %error,
                        "Notification failed; transition will retry next cycle"
                    );
                }
                Err(error) => {
                    errors += 1;
                    warn!(id = %sub.id, error = %error, "Failed to check stream status");
                }
            }
        }

        if self.config.verbose_polling {
            info!(
                subscriptions = self.config.subscriptions.len(),
                notified, errors, "Poll cycle complete"
            );
        } else {
            debug!(
                subscriptions = self.config.subscriptions.len(),
                notified, errors, "Poll cycle complete"
            );
        }
    }

    async fn process_subscription(&self, sub: &Subscription) -> Result<CycleAction> {
        let (platform, check) = self.check_subscription(sub).await?;

        let mut store = self.store.lock().await;
        let stored = store.get(&sub.id);
        let notified_live = stored.unwrap_or(false);

        if stored.is_none() && !self.config.notify_on_startup {
            // First sighting: adopt the observed state without announcing it.
            store.set(&sub.id, check.is_live)?;
            return Ok(CycleAction::Adopted {
                is_live: check.is_live,
            });
        }

        if check.is_live == notified_live {
            if stored.is_none() {
                store.set(&sub.id, check.is_live)?;
            }
            return Ok(CycleAction::Steady);
        }

        // Transition. The flag is written only after the notification went
        // out, so a failed send leaves the disagreement in place and the
        // next cycle retries it.
        self.notifier.notify_transition(sub, platform, &check).await?;
        store.set(&sub.id, check.is_live)?;

        Ok(CycleAction::Notified {
            is_live: check.is_live,
        })
    }

    async fn check_subscription(&self, sub: &Subscription) -> Result<(Platform, LiveCheck)> {
        let platform = Platform::parse(&sub.platform)?;
        let client = self.client_for(platform)?;
        let check = client.check_live(&sub.channel).await?;
        Ok((platform, check))
    }

    fn client_for(&self, platform: Platform) -> Result<&dyn LiveStatusClient> {
        self.clients
            .iter()
            .find(|client| client.platform() == platform)
            .map(|client| client.as_ref())
            .ok_or_else(|| {
                Error::config(format!(
                    "{platform} subscription found but no {platform} credentials are configured"
                ))
            })
    }

    /// Build the human-readable status report.
    ///
    /// Runs a fresh check for every subscription and never touches the
    /// persisted notification state.
    pub async fn build_status_report(&self) -> String {
        if self.config.subscriptions.is_empty() {
            return "No subscriptions configured.".to_string();
        }

        let mut live = 0usize;
        let mut offline = 0usize;
        let mut errors = 0usize;
        let mut lines = Vec::with_capacity(self.config.subscriptions.len());

        for sub in &self.config.subscriptions {
            let display_name = sub.display_name();
            let platform = sub.platform.trim().to_ascii_lowercase();

            match self.check_subscription(sub).await {
                Ok((_, check)) if check.is_live => {
                    live += 1;
                    let title_segment = check
                        .title
                        .as_deref()
                        .map(|title| format!(" | {title}"))
                        .unwrap_or_default();
                    lines.push(format!(
                        "- {display_name} ({platform}) [{}]: LIVE{title_segment} | {}",
                        sub.id, check.url
                    ));
                }
                Ok((_, check)) => {
                    offline += 1;
                    lines.push(format!(
                        "- {display_name} ({platform}) [{}]: OFFLINE | {}",
                        sub.id, check.url
                    ));
                }
                Err(error) => {
                    errors += 1;
                    lines.push(format!(
                        "- {display_name} ({platform}) [{}]: ERROR - {error}",
                        sub.id
                    ));
                }
            }
        }

        let mut report =
            format!("Status check complete: {live} live, {offline} offline, {errors} errors.");
        for line in lines {
            report.push('\n');
            report.push_str(&line);
        }
        report
    }

    /// Force a transition for one subscription, bypassing the live check.
    ///
    /// Delivers the matching notification with a synthetic title and the
    /// platform's canonical channel URL, then overwrites the stored flag
    /// unconditionally. Unknown ids and missing templates fail without
    /// touching the store; so does a rejected delivery.
    pub async fn simulate_event(&self, subscription_id: &str, is_live: bool) -> Result<String> {
        let sub = self
            .config
            .find_subscription(subscription_id)
            .ok_or_else(|| Error::not_found("subscription", subscription_id))?;
        let platform = Platform::parse(&sub.platform)?;

        let check = LiveCheck {
            is_live,
            url: platform.channel_url(&sub.channel),
            title: Some("Simulated event".to_string()),
        };

        self.notifier.notify_transition(sub, platform, &check).await?;
        self.store.lock().await.set(&sub.id, is_live)?;

        Ok(format!(
            "Simulated {} event for {}.",
            if is_live { "online" } else { "offline" },
            sub.id
        ))
    }
}
