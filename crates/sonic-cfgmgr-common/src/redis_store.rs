//! Redis-backed [`KeyValueStore`].
//!
//! One `RedisStore` is bound to one logical database (CONFIG_DB, APPL_DB or
//! STATE_DB). The connection is a `ConnectionManager`, which reconnects on
//! its own. A failed connect is [`CfgMgrError::Connection`]; a failed
//! command is [`CfgMgrError::Database`].

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use tracing::info;

use crate::error::{CfgMgrError, CfgMgrResult};
use crate::manager::{DbId, FieldValue, FieldValues};
use crate::store::KeyValueStore;

/// Connection parameters for one Redis database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisEndpoint {
    /// Redis server hostname or IP
    pub host: String,
    /// Redis server port
    pub port: u16,
    /// Database number
    pub db_number: u32,
}

impl RedisEndpoint {
    /// Creates a new endpoint.
    pub fn new(host: impl Into<String>, port: u16, db_number: u32) -> Self {
        Self {
            host: host.into(),
            port,
            db_number,
        }
    }

    /// Returns the Redis connection URI.
    pub fn uri(&self) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, self.db_number)
    }
}

/// Redis-backed store for one database.
#[derive(Clone)]
pub struct RedisStore {
    db: DbId,
    endpoint: RedisEndpoint,
    connection: ConnectionManager,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("db", &self.db)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

fn db_err(operation: &str) -> impl FnOnce(redis::RedisError) -> CfgMgrError + '_ {
    move |e| CfgMgrError::database(operation, e.to_string())
}

impl RedisStore {
    /// Connects to `endpoint` and binds the store to `db`.
    pub async fn connect(db: DbId, endpoint: RedisEndpoint) -> CfgMgrResult<Self> {
        let uri = endpoint.uri();
        let client = redis::Client::open(uri.as_str())
            .map_err(|e| CfgMgrError::connection(uri.as_str(), e))?;

        let connection = client
            .get_connection_manager()
            .await
            .map_err(|e| CfgMgrError::connection(uri.as_str(), e))?;

        info!(
            db = db.name(),
            host = %endpoint.host,
            port = endpoint.port,
            db_number = endpoint.db_number,
            "Connected to Redis"
        );

        Ok(Self {
            db,
            endpoint,
            connection,
        })
    }

    /// Returns the endpoint this store is connected to.
    pub fn endpoint(&self) -> &RedisEndpoint {
        &self.endpoint
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    fn db(&self) -> DbId {
        self.db
    }

    async fn hgetall(&self, key: &str) -> CfgMgrResult<FieldValues> {
        let mut conn = self.connection.clone();
        let fields: HashMap<String, String> =
            conn.hgetall(key).await.map_err(db_err("hgetall"))?;

        let mut fvs: FieldValues = fields.into_iter().collect();
        fvs.sort();
        Ok(fvs)
    }

    async fn hget(&self, key: &str, field: &str) -> CfgMgrResult<Option<String>> {
        let mut conn = self.connection.clone();
        conn.hget(key, field).await.map_err(db_err("hget"))
    }

    async fn hset(&self, key: &str, fvs: &[FieldValue]) -> CfgMgrResult<()> {
        if fvs.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection.clone();
        conn.hset_multiple::<_, _, _, ()>(key, fvs)
            .await
            .map_err(db_err("hset"))
    }

    async fn del(&self, key: &str) -> CfgMgrResult<()> {
        let mut conn = self.connection.clone();
        conn.del::<_, ()>(key).await.map_err(db_err("del"))
    }

    async fn keys(&self, pattern: &str) -> CfgMgrResult<Vec<String>> {
        let mut conn = self.connection.clone();
        conn.keys(pattern).await.map_err(db_err("keys"))
    }

    async fn publish(&self, channel: &str, message: &str) -> CfgMgrResult<()> {
        let mut conn = self.connection.clone();
        conn.publish::<_, _, ()>(channel, message)
            .await
            .map_err(db_err("publish"))
    }

    /// Deletes and rewrites the hash in one MULTI/EXEC transaction.
    async fn replace(&self, key: &str, fvs: &[FieldValue]) -> CfgMgrResult<()> {
        let mut conn = self.connection.clone();
        let mut pipe = redis::pipe();
        pipe.atomic().del(key).ignore();
        if !fvs.is_empty() {
            pipe.hset_multiple(key, fvs).ignore();
        }
        pipe.query_async::<()>(&mut conn)
            .await
            .map_err(db_err("replace"))
    }
}
