//! Fleetgate CLI entry point.

use clap::Parser;
use fleetgate_cli::{log_filter, run, Cli};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging. RUST_LOG wins; otherwise -v flags, then the
    // config file's logging.level.
    let config_level = fleetgate_core::Config::load_or_default(cli.config.as_deref())
        .map(|config| config.logging.level)
        .unwrap_or_else(|_| "fleetgate=info".to_string());
    let default_filter = log_filter(cli.verbose, &config_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Run the command
    run(cli).await
}
