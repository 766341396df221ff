//! Configuration file support for uemgrd
//!
//! Loads and validates daemon configuration from TOML files.
//! Default location: /etc/sonic/uemgrd.conf

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use sonic_cfgmgr_common::{defaults as common_defaults, CfgMgrError, CfgMgrResult, DbId, RedisEndpoint};

use crate::tables::{CFG_UE_TABLE_NAMES, UE_DUAL_STACK_CONFIG_CHANNEL};

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "/etc/sonic/uemgrd.conf";

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Redis host
    #[serde(default = "default_redis_host")]
    pub redis_host: String,

    /// Redis port
    #[serde(default = "default_redis_port")]
    pub redis_port: u16,

    /// Redis database number for CONFIG_DB
    #[serde(default = "default_config_db_number")]
    pub config_db_number: u32,

    /// Redis database number for APPL_DB
    #[serde(default = "default_appl_db_number")]
    pub appl_db_number: u32,

    /// Redis database number for STATE_DB
    #[serde(default = "default_state_db_number")]
    pub state_db_number: u32,
}

/// Daemon behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Channel the data-plane agent listens on
    #[serde(default = "default_notification_channel")]
    pub notification_channel: String,

    /// CONFIG_DB tables whose changes trigger a pipeline run
    #[serde(default = "default_subscribe_tables")]
    pub subscribe_tables: Vec<String>,

    /// Quiet period used to coalesce bursts of changes
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

/// Complete uemgrd configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UeMgrdConfig {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub daemon: DaemonConfig,
}

fn default_redis_host() -> String {
    common_defaults::REDIS_HOST.to_string()
}

fn default_redis_port() -> u16 {
    common_defaults::REDIS_PORT
}

fn default_config_db_number() -> u32 {
    DbId::ConfigDb.id()
}

fn default_appl_db_number() -> u32 {
    DbId::ApplDb.id()
}

fn default_state_db_number() -> u32 {
    DbId::StateDb.id()
}

fn default_notification_channel() -> String {
    UE_DUAL_STACK_CONFIG_CHANNEL.to_string()
}

fn default_subscribe_tables() -> Vec<String> {
    CFG_UE_TABLE_NAMES.iter().map(|t| t.to_string()).collect()
}

fn default_debounce_ms() -> u64 {
    200
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            redis_host: default_redis_host(),
            redis_port: default_redis_port(),
            config_db_number: default_config_db_number(),
            appl_db_number: default_appl_db_number(),
            state_db_number: default_state_db_number(),
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            notification_channel: default_notification_channel(),
            subscribe_tables: default_subscribe_tables(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl DatabaseConfig {
    /// Returns the configured database number of `db`
    pub fn db_number(&self, db: DbId) -> u32 {
        match db {
            DbId::ConfigDb => self.config_db_number,
            DbId::ApplDb => self.appl_db_number,
            DbId::StateDb => self.state_db_number,
        }
    }

    /// Returns the Redis endpoint of `db`
    pub fn endpoint(&self, db: DbId) -> RedisEndpoint {
        RedisEndpoint::new(self.redis_host.clone(), self.redis_port, self.db_number(db))
    }
}

impl UeMgrdConfig {
    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> CfgMgrResult<Self> {
        let path = path.as_ref();

        let config: Self = match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                CfgMgrError::invalid_config(
                    path.display().to_string(),
                    format!("Failed to parse config file: {}", e),
                )
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "Config file not found, using defaults");
                Self::default()
            }
            Err(e) => {
                return Err(CfgMgrError::invalid_config(
                    path.display().to_string(),
                    e.to_string(),
                ))
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Load from default location or defaults
    pub fn load() -> CfgMgrResult<Self> {
        Self::load_or_default(DEFAULT_CONFIG_PATH)
    }

    /// Get debounce window as Duration
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.daemon.debounce_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> CfgMgrResult<()> {
        if self.database.redis_host.is_empty() {
            return Err(CfgMgrError::invalid_config(
                "database.redis_host",
                "must not be empty",
            ));
        }

        if self.database.redis_port == 0 {
            return Err(CfgMgrError::invalid_config(
                "database.redis_port",
                "must be > 0",
            ));
        }

        if self.daemon.notification_channel.is_empty() {
            return Err(CfgMgrError::invalid_config(
                "daemon.notification_channel",
                "must not be empty",
            ));
        }

        if self.daemon.subscribe_tables.is_empty() {
            return Err(CfgMgrError::invalid_config(
                "daemon.subscribe_tables",
                "at least one table is required",
            ));
        }

        Ok(())
    }
}
