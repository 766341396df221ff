//! Daemon event loop
//!
//! Change events arrive as table names over an mpsc channel. The loop owns
//! the manager, so runs never overlap; a burst of events within the debounce
//! window collapses into a single run.

use std::collections::BTreeSet;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use sonic_cfgmgr_common::CfgMgr;

/// Why [`run_event_loop`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// Cancellation was requested
    Shutdown,
    /// Every event sender went away
    ChannelClosed,
}

/// Waits for the next event, then collects everything that arrives within
/// `debounce`. Returns `None` once the channel is closed and empty.
pub async fn next_batch(
    rx: &mut mpsc::Receiver<String>,
    debounce: Duration,
) -> Option<BTreeSet<String>> {
    let first = rx.recv().await?;
    let mut batch = BTreeSet::from([first]);

    if !debounce.is_zero() {
        tokio::time::sleep(debounce).await;
    }
    while let Ok(table) = rx.try_recv() {
        batch.insert(table);
    }
    Some(batch)
}

/// Drives `mgr` from change events until cancelled or the channel closes.
///
/// Batches that touch none of the manager's tables are ignored. A run that
/// has started is always awaited to completion.
pub async fn run_event_loop<M>(
    mgr: &mut M,
    mut rx: mpsc::Receiver<String>,
    debounce: Duration,
    cancel: CancellationToken,
) -> LoopExit
where
    M: CfgMgr + ?Sized,
{
    info!(daemon = mgr.daemon_name(), "Listening for configuration changes");

    loop {
        let batch = tokio::select! {
            _ = cancel.cancelled() => {
                info!(daemon = mgr.daemon_name(), "Received shutdown signal");
                return LoopExit::Shutdown;
            }
            batch = next_batch(&mut rx, debounce) => batch,
        };

        let Some(tables) = batch else {
            warn!(daemon = mgr.daemon_name(), "Change event channel closed");
            return LoopExit::ChannelClosed;
        };

        let relevant = tables
            .iter()
            .any(|table| mgr.config_table_names().contains(&table.as_str()));
        if !relevant {
            debug!(?tables, "Ignoring changes to unrelated tables");
            continue;
        }

        debug!(?tables, "Configuration changed");
        mgr.do_task().await;
    }
}
