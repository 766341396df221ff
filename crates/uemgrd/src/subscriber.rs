//! CONFIG_DB change subscription via Redis keyspace notifications
//!
//! Every write to `<TABLE>|<key>` in CONFIG_DB is published by Redis on
//! `__keyspace@<db>__:<TABLE>|<key>`. The subscriber forwards the table
//! name of each event to the daemon loop.

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use sonic_cfgmgr_common::{CfgMgrError, CfgMgrResult, RedisEndpoint};

/// Keyspace and keyevent notifications for all commands, as SONiC configures them
const KEYSPACE_EVENTS: &str = "AKE";

/// Pattern matching every record of `table` in database `db_number`
pub fn keyspace_pattern(db_number: u32, table: &str) -> String {
    format!("__keyspace@{}__:{}|*", db_number, table)
}

/// Extracts the table name from a keyspace channel name
pub fn table_from_channel(channel: &str) -> Option<&str> {
    let (_, key) = channel.split_once("__:")?;
    let (table, _) = key.split_once('|')?;
    Some(table)
}

/// Subscribes to changes of a set of CONFIG_DB tables
pub struct KeyspaceSubscriber {
    endpoint: RedisEndpoint,
    tables: Vec<String>,
}

impl KeyspaceSubscriber {
    pub fn new(endpoint: RedisEndpoint, tables: Vec<String>) -> Self {
        Self { endpoint, tables }
    }

    /// Subscribes and spawns a task forwarding table names to `tx`.
    ///
    /// The task ends when `cancel` fires, the receiver is dropped, or the
    /// subscription stream closes.
    pub async fn spawn(
        self,
        tx: mpsc::Sender<String>,
        cancel: CancellationToken,
    ) -> CfgMgrResult<JoinHandle<()>> {
        let uri = self.endpoint.uri();
        let client =
            redis::Client::open(uri.as_str()).map_err(|e| CfgMgrError::connection(uri.as_str(), e))?;

        self.enable_keyspace_events(&client).await;

        let mut pubsub = client
            .get_async_pubsub()
            .await
            .map_err(|e| CfgMgrError::connection(uri.as_str(), e))?;

        for table in &self.tables {
            let pattern = keyspace_pattern(self.endpoint.db_number, table);
            pubsub
                .psubscribe(&pattern)
                .await
                .map_err(|e| CfgMgrError::database("psubscribe", e.to_string()))?;
            debug!(pattern = %pattern, "Subscribed to keyspace events");
        }
        info!(tables = ?self.tables, "Subscribed to CONFIG_DB changes");

        Ok(tokio::spawn(async move {
            let mut messages = pubsub.on_message();
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    message = messages.next() => {
                        let Some(message) = message else {
                            warn!("Keyspace subscription closed");
                            break;
                        };
                        let Some(table) = table_from_channel(message.get_channel_name()) else {
                            continue;
                        };
                        if tx.send(table.to_string()).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }))
    }

    /// Keyspace events are off by default in Redis; failing to enable them
    /// is not fatal since the server may already be configured.
    async fn enable_keyspace_events(&self, client: &redis::Client) {
        let result = async {
            let mut conn = client.get_multiplexed_async_connection().await?;
            redis::cmd("CONFIG")
                .arg("SET")
                .arg("notify-keyspace-events")
                .arg(KEYSPACE_EVENTS)
                .query_async::<()>(&mut conn)
                .await
        }
        .await;

        if let Err(e) = result {
            warn!(error = %e, "Could not enable keyspace notifications");
        }
    }
}
