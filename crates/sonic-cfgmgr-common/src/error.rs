//! Store and daemon configuration errors shared by cfgmgr daemons.

use thiserror::Error;

pub type CfgMgrResult<T> = Result<T, CfgMgrError>;

/// Failure of a store round trip or of the daemon's own settings.
///
/// Data problems inside the managed tables are not represented here;
/// each manager reports those with its own types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CfgMgrError {
    /// A command sent to an open store failed
    #[error("{operation} failed: {message}")]
    Database { operation: String, message: String },

    /// No usable connection to the store
    #[error("cannot reach {endpoint}: {message}")]
    Connection { endpoint: String, message: String },

    /// Daemon settings rejected at startup
    #[error("invalid {field}: {message}")]
    InvalidConfig { field: String, message: String },
}

impl CfgMgrError {
    pub fn database(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Database {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn connection(endpoint: impl Into<String>, message: impl ToString) -> Self {
        Self::Connection {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }

    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// True when the store, not the data, is at fault.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, Self::Database { .. } | Self::Connection { .. })
    }
}
