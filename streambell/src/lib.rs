//! streambell library crate.
//!
//! Polls Twitch and YouTube for channel live status on an interval, keeps
//! each subscription's last-notified state across restarts, and announces
//! transitions into a single Telegram chat. Chat commands provide on-demand
//! status reports, configuration reloads, and configurable template replies
//! with optional file attachments.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod notify;
pub mod resources;
pub mod runtime;
pub mod telegram;

pub use error::{Error, Result};
