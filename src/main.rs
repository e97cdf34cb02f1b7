mod cli;
mod config;
mod deserialise;
mod download;
mod error;
mod reading;
mod report;
mod table;

use anyhow::{Error, Result};
use clap::Parser;
use cli::{command, Cli, Commands};
use config::{CollectConfig, ReportConfig};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let cli = Cli::parse();
    setup_tracing(&cli);

    let result = match cli.command {
        Commands::Collect(args) => command::collect(args.into_config()).await,
        Commands::Report(args) => command::report(args.into_config()),
        Commands::All {} => command::all(CollectConfig::default(), ReportConfig::default()).await,
    };

    match result {
        Ok(path) => info!("File saved to `{}`", path.display()),
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}

fn setup_tracing(cli: &Cli) {
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
