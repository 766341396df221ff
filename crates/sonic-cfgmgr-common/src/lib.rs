//! Common infrastructure for SONiC configuration manager daemons.
//!
//! This crate provides shared functionality for cfgmgr daemons:
//!
//! - [`CfgMgr`]: Base trait for config managers driven by a daemon loop
//! - [`KeyValueStore`]: Database seam, with [`RedisStore`] and [`MemoryStore`]
//! - [`error`]: Error types for cfgmgr operations
//!
//! # Architecture
//!
//! Configuration managers follow this pattern:
//!
//! 1. Subscribe to CONFIG_DB tables for configuration changes
//! 2. Read and validate the configuration
//! 3. Write derived configuration to APPL_DB for the data-plane agents
//! 4. Read STATE_DB for operational state and counters
//!
//! # Example
//!
//! ```ignore
//! use sonic_cfgmgr_common::{get_table, DbId, KeyValueStore, MemoryStore};
//!
//! let config_db = MemoryStore::new(DbId::ConfigDb);
//! let records = get_table(&config_db, "UE_INTERFACE").await?;
//! ```

pub mod error;
pub mod manager;
#[cfg(feature = "redis")]
pub mod redis_store;
pub mod store;

// Re-export commonly used items at crate root
pub use error::{CfgMgrError, CfgMgrResult};
pub use manager::{defaults, CfgMgr, DbId, FieldValue, FieldValues, FieldValuesExt};
#[cfg(feature = "redis")]
pub use redis_store::{RedisEndpoint, RedisStore};
pub use store::{get_table, set_entry, table_key, KeyValueStore, MemoryStore};
