//! Key-value store abstraction over the SONiC Redis databases.
//!
//! Managers never talk to Redis directly; they go through
//! [`KeyValueStore`], which has a production implementation
//! ([`RedisStore`](crate::RedisStore), behind the `redis` feature) and an
//! in-memory one ([`MemoryStore`]) used by tests and dry runs.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{CfgMgrError, CfgMgrResult};
use crate::manager::{DbId, FieldValue, FieldValues};

/// Hash-oriented operations on one logical database.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns which database this store is bound to.
    fn db(&self) -> DbId;

    /// Reads every field of a hash, sorted by field name.
    ///
    /// A missing key yields an empty collection.
    async fn hgetall(&self, key: &str) -> CfgMgrResult<FieldValues>;

    /// Reads a single hash field.
    async fn hget(&self, key: &str, field: &str) -> CfgMgrResult<Option<String>>;

    /// Sets hash fields, leaving other fields of the hash untouched.
    async fn hset(&self, key: &str, fvs: &[FieldValue]) -> CfgMgrResult<()>;

    /// Deletes a key.
    async fn del(&self, key: &str) -> CfgMgrResult<()>;

    /// Lists keys matching a glob pattern (`*` or a trailing-`*` prefix).
    async fn keys(&self, pattern: &str) -> CfgMgrResult<Vec<String>>;

    /// Publishes a message on a pub/sub channel.
    async fn publish(&self, channel: &str, message: &str) -> CfgMgrResult<()>;

    /// Replaces a hash with exactly `fvs`.
    async fn replace(&self, key: &str, fvs: &[FieldValue]) -> CfgMgrResult<()> {
        self.del(key).await?;
        if fvs.is_empty() {
            return Ok(());
        }
        self.hset(key, fvs).await
    }
}

/// Builds the full store key for a record of `table`.
pub fn table_key(db: DbId, table: &str, key: &str) -> String {
    format!("{}{}{}", table, db.separator(), key)
}

/// Reads every record of a table as `(record_key, fields)` pairs.
///
/// Records are returned in the store's key enumeration order. Keys that
/// vanish between enumeration and read are skipped.
pub async fn get_table(
    store: &dyn KeyValueStore,
    table: &str,
) -> CfgMgrResult<Vec<(String, FieldValues)>> {
    let prefix = format!("{}{}", table, store.db().separator());
    let keys = store.keys(&format!("{}*", prefix)).await?;

    let mut records = Vec::with_capacity(keys.len());
    for key in keys {
        let Some(record_key) = key.strip_prefix(&prefix) else {
            continue;
        };
        let fvs = store.hgetall(&key).await?;
        if fvs.is_empty() {
            debug!(key = %key, "Record vanished during table read");
            continue;
        }
        records.push((record_key.to_string(), fvs));
    }

    debug!(table, db = store.db().name(), count = records.len(), "Read table");
    Ok(records)
}

/// Replaces one record of a table with `fvs`.
pub async fn set_entry(
    store: &dyn KeyValueStore,
    table: &str,
    key: &str,
    fvs: &[FieldValue],
) -> CfgMgrResult<()> {
    store.replace(&table_key(store.db(), table, key), fvs).await
}

/// Returns true if `key` matches a `*` / trailing-`*` glob.
fn glob_match(pattern: &str, key: &str) -> bool {
    if pattern == "*" {
        true
    } else if let Some(prefix) = pattern.strip_suffix('*') {
        key.starts_with(prefix)
    } else {
        key == pattern
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    data: BTreeMap<String, BTreeMap<String, String>>,
    published: Vec<(String, String)>,
    unavailable: bool,
    failing_keys: BTreeSet<String>,
}

impl MemoryInner {
    fn check(&self, operation: &str, key: &str) -> CfgMgrResult<()> {
        if self.unavailable {
            return Err(CfgMgrError::database(operation, "store unavailable"));
        }
        if self.failing_keys.contains(key) {
            return Err(CfgMgrError::database(
                operation,
                format!("injected failure for {}", key),
            ));
        }
        Ok(())
    }
}

/// In-memory [`KeyValueStore`].
///
/// Clones share the same data. Keys enumerate in sorted order. The store
/// can be switched unavailable, or made to fail for individual keys, to
/// exercise error paths.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    db: DbId,
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    /// Creates an empty store bound to `db`.
    pub fn new(db: DbId) -> Self {
        Self {
            db,
            inner: Arc::new(Mutex::new(MemoryInner::default())),
        }
    }

    /// Makes every operation fail (or succeed again).
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.inner.lock().await.unavailable = unavailable;
    }

    /// Makes every operation on `key` fail.
    pub async fn fail_on_key(&self, key: impl Into<String>) {
        self.inner.lock().await.failing_keys.insert(key.into());
    }

    /// Returns a copy of one hash, if present.
    pub async fn record(&self, key: &str) -> Option<BTreeMap<String, String>> {
        self.inner.lock().await.data.get(key).cloned()
    }

    /// Returns a copy of every hash in the store.
    pub async fn dump(&self) -> BTreeMap<String, BTreeMap<String, String>> {
        self.inner.lock().await.data.clone()
    }

    /// Returns every `(channel, message)` published so far.
    pub async fn published(&self) -> Vec<(String, String)> {
        self.inner.lock().await.published.clone()
    }

    /// Forgets published messages.
    pub async fn clear_published(&self) {
        self.inner.lock().await.published.clear();
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    fn db(&self) -> DbId {
        self.db
    }

    async fn hgetall(&self, key: &str) -> CfgMgrResult<FieldValues> {
        let inner = self.inner.lock().await;
        inner.check("hgetall", key)?;
        Ok(inner
            .data
            .get(key)
            .map(|fields| {
                fields
                    .iter()
                    .map(|(f, v)| (f.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn hget(&self, key: &str, field: &str) -> CfgMgrResult<Option<String>> {
        let inner = self.inner.lock().await;
        inner.check("hget", key)?;
        Ok(inner.data.get(key).and_then(|fields| fields.get(field).cloned()))
    }

    async fn hset(&self, key: &str, fvs: &[FieldValue]) -> CfgMgrResult<()> {
        let mut inner = self.inner.lock().await;
        inner.check("hset", key)?;
        let entry = inner.data.entry(key.to_string()).or_default();
        for (field, value) in fvs {
            entry.insert(field.clone(), value.clone());
        }
        Ok(())
    }

    async fn del(&self, key: &str) -> CfgMgrResult<()> {
        let mut inner = self.inner.lock().await;
        inner.check("del", key)?;
        inner.data.remove(key);
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> CfgMgrResult<Vec<String>> {
        let inner = self.inner.lock().await;
        inner.check("keys", pattern)?;
        Ok(inner
            .data
            .keys()
            .filter(|k| glob_match(pattern, k))
            .cloned()
            .collect())
    }

    async fn publish(&self, channel: &str, message: &str) -> CfgMgrResult<()> {
        let mut inner = self.inner.lock().await;
        inner.check("publish", channel)?;
        inner
            .published
            .push((channel.to_string(), message.to_string()));
        Ok(())
    }
}
