//! Command-line interface.

use clap::{Parser, Subcommand};

/// Live-stream notification bot for Telegram.
#[derive(Debug, Parser)]
#[command(name = "streambell", version, about)]
pub struct Args {
    /// Configuration file path or http(s) URL.
    ///
    /// Falls back to the STREAMBELL_CONFIG environment variable, then to
    /// config.json in the working directory.
    #[arg(long, global = true, value_name = "PATH_OR_URL")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the bot (the default when no subcommand is given).
    Run,
    /// Send a simulated online notification for a subscription id.
    Online { subscription_id: String },
    /// Send a simulated offline notification for a subscription id.
    Offline { subscription_id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_run() {
        let args = Args::parse_from(["streambell"]);
        assert!(args.command.is_none());
        assert!(args.config.is_none());
    }

    #[test]
    fn test_online_subcommand() {
        let args = Args::parse_from(["streambell", "online", "a"]);
        assert!(matches!(
            args.command,
            Some(Command::Online { ref subscription_id }) if subscription_id == "a"
        ));
    }

    #[test]
    fn test_global_config_flag() {
        let args = Args::parse_from(["streambell", "--config", "bot.json", "offline", "a"]);
        assert_eq!(args.config.as_deref(), Some("bot.json"));

        // Global flags are accepted after the subcommand too.
        let args = Args::parse_from(["streambell", "offline", "a", "--config", "bot.json"]);
        assert_eq!(args.config.as_deref(), Some("bot.json"));
        assert!(matches!(args.command, Some(Command::Offline { .. })));
    }
}
