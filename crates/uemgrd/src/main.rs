//! uemgrd - Ultra Ethernet Dual-Stack Configuration Manager Daemon
//!
//! Entry point for the uemgrd daemon.

use anyhow::{bail, Context};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use sonic_cfgmgr_common::DbId;
use sonic_uemgrd::daemon::{run_event_loop, LoopExit};
use sonic_uemgrd::subscriber::KeyspaceSubscriber;
use sonic_uemgrd::{UeMgr, UeMgrdConfig, UeStores, DEFAULT_CONFIG_PATH};

/// Capacity of the change event channel
const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Parser)]
#[command(name = "uemgrd", version, about = "Ultra Ethernet dual-stack configuration manager")]
struct Args {
    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log filter; overrides RUST_LOG
    #[arg(long)]
    log_level: Option<String>,

    /// Apply the current configuration once and exit
    #[arg(long)]
    once: bool,
}

/// Initializes tracing/logging subsystem
fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("uemgrd: failed to set tracing subscriber: {}", e);
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.log_level.as_deref());

    info!("--- Starting uemgrd ---");

    match run(args).await {
        Ok(()) => {
            info!("uemgrd exiting normally");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %format!("{:#}", e), "uemgrd failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = UeMgrdConfig::load_or_default(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    let stores = UeStores::connect(&config.database)
        .await
        .context("connecting to Redis")?;

    let cancel = CancellationToken::new();
    let mut mgr = UeMgr::new(stores, config.daemon.notification_channel.clone())
        .with_cancellation(cancel.clone());

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown requested"),
            Err(e) => error!(error = %e, "Failed to listen for shutdown signal"),
        }
        shutdown.cancel();
    });

    // Subscribe before the initial load; changes made meanwhile are queued
    // and trigger one more run.
    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let events = if args.once {
        None
    } else {
        let subscriber = KeyspaceSubscriber::new(
            config.database.endpoint(DbId::ConfigDb),
            config.daemon.subscribe_tables.clone(),
        );
        let handle = subscriber
            .spawn(tx, cancel.clone())
            .await
            .context("subscribing to CONFIG_DB changes")?;
        Some(handle)
    };

    let report = mgr.run().await.context("initial configuration run")?;
    if report.cancelled {
        info!("Initial configuration run cancelled");
    } else if report.is_clean() {
        info!(applied = report.apply.applied, "Initial configuration applied");
    } else {
        for err in report.errors() {
            warn!(error = %err, "Initial configuration error");
        }
    }

    let Some(events) = events else {
        return Ok(());
    };

    let exit = run_event_loop(&mut mgr, rx, config.debounce(), cancel.clone()).await;
    cancel.cancel();
    if let Err(e) = events.await {
        warn!(error = %e, "Subscriber task ended abnormally");
    }

    match exit {
        LoopExit::Shutdown => Ok(()),
        LoopExit::ChannelClosed => bail!("CONFIG_DB subscription lost"),
    }
}
