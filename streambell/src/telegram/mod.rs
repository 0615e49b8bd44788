//! Telegram Bot API integration: the delivery transport and the update
//! long-poll loop that feeds chat commands to the router.

mod transport;
mod updates;

pub use transport::TelegramTransport;
pub use updates::UpdatePoller;

/// Build a Bot API method URL for the given token.
fn api_url(bot_token: &str, method: &str) -> String {
    format!("https://api.telegram.org/bot{bot_token}/{method}")
}
