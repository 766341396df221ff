//! ue-config - command line front end for Ultra Ethernet dual-stack configuration
//!
//! Writes UE_* records to CONFIG_DB for uemgrd to pick up, and shows counters
//! and detected capabilities.

use anyhow::Context;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use sonic_uemgrd::cli::{execute, Cli};
use sonic_uemgrd::{UeMgrdConfig, UeStores};

fn init_logging(level: &str) {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(level))
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("ue-config: failed to set tracing subscriber: {}", e);
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match run(&cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<bool> {
    let config = UeMgrdConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    let stores = UeStores::connect(&config.database)
        .await
        .context("connecting to Redis")?;

    let output = execute(&cli.command, &stores, &config.daemon.notification_channel).await?;
    println!("{}", output.text);
    Ok(output.success)
}
