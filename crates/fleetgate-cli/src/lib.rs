//! Fleetgate command-line interface.

pub mod commands;

use clap::{Parser, Subcommand};

/// Fleetgate - streaming tool gateway for a device fleet
#[derive(Parser)]
#[command(name = "fleetgate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to config file
    #[arg(short, long, env = "FLEETGATE_CONFIG")]
    pub config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start the gateway server
    Run(commands::RunArgs),

    /// Show version information
    Version,
}

/// Resolve the default log filter: `-v` flags override the configured level.
pub fn log_filter(verbose: u8, config_level: &str) -> String {
    match verbose {
        0 => config_level.to_string(),
        1 => "fleetgate=debug".to_string(),
        _ => "fleetgate=trace".to_string(),
    }
}

/// Run the CLI with the given arguments.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => commands::run_gateway(cli.config.as_deref(), args).await,
        Commands::Version => {
            println!("fleetgate {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
