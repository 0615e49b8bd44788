//! Notification rendering and delivery.

mod template;

pub use template::{MessageTemplate, RenderContext, render};

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use platforms_live::{LiveCheck, Platform};
use tracing::debug;

use crate::config::Subscription;
use crate::error::{Error, Result};

/// Message delivery seam.
///
/// The core needs exactly two primitives, both aimed at the single
/// configured chat target; Telegram is the production implementation.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver a text message.
    async fn send_text(&self, text: &str) -> Result<()>;

    /// Deliver a byte payload as a file attachment.
    async fn send_file(&self, bytes: Bytes, filename: &str) -> Result<()>;
}

/// Renders transition messages and pushes them through the transport.
pub struct Notifier {
    transport: Arc<dyn Transport>,
}

impl Notifier {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Render and deliver a transition notification for a subscription.
    ///
    /// A live transition sends the bare URL first, then the rendered text,
    /// as two messages so the link preview stays separate from the caption.
    /// An offline transition sends the rendered text only.
    ///
    /// Fails without sending when no usable template is configured for the
    /// transition direction; fails after partial delivery when the transport
    /// rejects a message. Either way the caller decides whether state may
    /// advance.
    pub async fn notify_transition(
        &self,
        sub: &Subscription,
        platform: Platform,
        check: &LiveCheck,
    ) -> Result<()> {
        let template = sub
            .template_for(check.is_live)
            .and_then(|template| template.pick())
            .ok_or_else(|| {
                Error::template(format!(
                    "No {} configured for {}",
                    Subscription::template_key(check.is_live),
                    sub.id
                ))
            })?;

        let text = render(
            template,
            &RenderContext {
                platform,
                display_name: sub.display_name(),
                channel: &sub.channel,
                title: check.title.as_deref(),
                url: &check.url,
                is_live: check.is_live,
            },
        );

        if check.is_live {
            self.transport.send_text(&check.url).await?;
        }
        self.transport.send_text(&text).await?;

        debug!(id = %sub.id, is_live = check.is_live, "Notification delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<String>>,
        fail: AtomicBool,
    }

    impl RecordingTransport {
        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send_text(&self, text: &str) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::transport("wire down"));
            }
            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }

        async fn send_file(&self, _bytes: Bytes, filename: &str) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::transport("wire down"));
            }
            self.sent.lock().unwrap().push(format!("file:{filename}"));
            Ok(())
        }
    }

    fn subscription() -> Subscription {
        Subscription {
            id: "a".to_string(),
            platform: "twitch".to_string(),
            channel: "foo".to_string(),
            display_name: Some("Foo".to_string()),
            live_message: Some(MessageTemplate::Single(
                "{display_name} is live! {url}".to_string(),
            )),
            offline_message: Some(MessageTemplate::Single(
                "{display_name} went offline.".to_string(),
            )),
        }
    }

    fn live_check() -> LiveCheck {
        LiveCheck {
            is_live: true,
            url: "https://www.twitch.tv/foo".to_string(),
            title: Some("Speedruns".to_string()),
        }
    }

    #[tokio::test]
    async fn test_live_sends_url_then_text() {
        let transport = Arc::new(RecordingTransport::default());
        let notifier = Notifier::new(transport.clone());

        notifier
            .notify_transition(&subscription(), Platform::Twitch, &live_check())
            .await
            .unwrap();

        assert_eq!(
            transport.sent(),
            vec![
                "https://www.twitch.tv/foo".to_string(),
                "Foo is live! https://www.twitch.tv/foo".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_offline_sends_text_only() {
        let transport = Arc::new(RecordingTransport::default());
        let notifier = Notifier::new(transport.clone());

        let check = LiveCheck {
            is_live: false,
            url: "https://www.twitch.tv/foo".to_string(),
            title: None,
        };
        notifier
            .notify_transition(&subscription(), Platform::Twitch, &check)
            .await
            .unwrap();

        assert_eq!(transport.sent(), vec!["Foo went offline.".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_template_is_an_error() {
        let transport = Arc::new(RecordingTransport::default());
        let notifier = Notifier::new(transport.clone());

        let mut sub = subscription();
        sub.live_message = None;

        let err = notifier
            .notify_transition(&sub, Platform::Twitch, &live_check())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("live_message"));
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_template_list_renders_one_option() {
        let transport = Arc::new(RecordingTransport::default());
        let notifier = Notifier::new(transport.clone());

        let mut sub = subscription();
        sub.live_message = Some(MessageTemplate::Choices(vec![
            "A {status}".to_string(),
            "B {status}".to_string(),
        ]));

        notifier
            .notify_transition(&sub, Platform::Twitch, &live_check())
            .await
            .unwrap();

        let text = transport.sent().pop().unwrap();
        assert!(text == "A live" || text == "B live", "unexpected: {text}");
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let transport = Arc::new(RecordingTransport::default());
        transport.fail.store(true, Ordering::SeqCst);
        let notifier = Notifier::new(transport.clone());

        let err = notifier
            .notify_transition(&subscription(), Platform::Twitch, &live_check())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }
}
