//! Packyard - package registry that builds on demand
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use packyard::cli::{Cli, Commands};
use packyard::config::ConfigManager;
use packyard::error::PackyardResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> PackyardResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };
    let config = config_manager.load().await?;

    // Initialize logging: 0 = warn (spinners only), 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("packyard=warn"),
        1 => EnvFilter::new("packyard=info"),
        _ => EnvFilter::new("packyard=debug"),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if config.general.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
    debug!("Loaded config from {}", config_manager.path().display());

    // Dispatch to command
    match cli.command {
        Commands::Serve(args) => packyard::cli::commands::serve(args, &config).await,
        Commands::Build(args) => packyard::cli::commands::build(args, &config).await,
        Commands::Fetch(args) => packyard::cli::commands::fetch(args, &config).await,
        Commands::Tags => packyard::cli::commands::tags(&config).await,
        Commands::Packages(args) => packyard::cli::commands::packages(args, &config).await,
        Commands::Config(args) => {
            packyard::cli::commands::config(args, &config_manager, &config).await
        }
    }
}
