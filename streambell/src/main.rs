use clap::Parser;
use tracing::info;

use streambell::cli::{Args, Command};
use streambell::config::ConfigSource;
use streambell::logging;
use streambell::runtime::BotRuntime;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let _guard = logging::init_logging()?;

    let source = ConfigSource::resolve(args.config.as_deref())?;
    info!(source = %source.describe(), "Using configuration source");

    match args.command.unwrap_or(Command::Run) {
        Command::Run => run_bot(source).await?,
        Command::Online { subscription_id } => {
            let confirmation = BotRuntime::simulate_once(source, &subscription_id, true).await?;
            println!("{confirmation}");
        }
        Command::Offline { subscription_id } => {
            let confirmation = BotRuntime::simulate_once(source, &subscription_id, false).await?;
            println!("{confirmation}");
        }
    }

    Ok(())
}

async fn run_bot(source: ConfigSource) -> anyhow::Result<()> {
    let runtime = BotRuntime::start(source).await?;

    let shutdown = runtime.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            shutdown.cancel();
        }
    });

    runtime.run_until_shutdown().await;
    Ok(())
}
