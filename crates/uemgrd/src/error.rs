//! Error types for uemgrd
//!
//! Errors are values: the pipeline collects them per entity and hands them
//! back in a [`RunReport`](crate::RunReport). Only a failed initial load
//! aborts a run.

use sonic_cfgmgr_common::CfgMgrError;
use sonic_types::AddressFamily;
use std::fmt;
use thiserror::Error;

/// Result type for uemgrd operations
pub type Result<T> = std::result::Result<T, UeError>;

/// Configuration scope an entity belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    Global,
    AddressFamily,
    Interface,
    Ecmp,
    Rdma,
}

impl Scope {
    /// Returns the scope name used in logs
    pub const fn as_str(&self) -> &'static str {
        match self {
            Scope::Global => "global",
            Scope::AddressFamily => "address_family",
            Scope::Interface => "interface",
            Scope::Ecmp => "ecmp",
            Scope::Rdma => "rdma",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An entity that failed validation and is excluded from the apply phase
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{scope} {key}: {message}")]
pub struct ValidationError {
    /// Scope of the offending entity
    pub scope: Scope,
    /// Record key of the offending entity
    pub key: String,
    /// Human-readable reason
    pub message: String,
}

impl ValidationError {
    pub fn new(scope: Scope, key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            scope,
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Errors reported by the dual-stack pipeline
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UeError {
    /// I/O against CONFIG_DB, APPL_DB or STATE_DB failed
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] CfgMgrError),

    /// An entity failed an invariant
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// An ECMP group prefix does not parse as a network of its family
    #[error("Malformed {family} prefix {prefix:?} in ECMP group {group}: {reason}")]
    MalformedPrefix {
        family: AddressFamily,
        group: String,
        prefix: String,
        reason: String,
    },

    /// A collaborator outside the UE tables could not be read
    #[error("{collaborator} unreachable: {message}")]
    UnreachableCollaborator {
        collaborator: String,
        message: String,
    },
}

impl UeError {
    /// Creates a malformed prefix error
    pub fn malformed_prefix(
        family: AddressFamily,
        group: impl Into<String>,
        prefix: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self::MalformedPrefix {
            family,
            group: group.into(),
            prefix: prefix.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates an unreachable collaborator error
    pub fn unreachable(collaborator: impl Into<String>, message: impl ToString) -> Self {
        Self::UnreachableCollaborator {
            collaborator: collaborator.into(),
            message: message.to_string(),
        }
    }

    /// Returns true for store connectivity failures
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, UeError::StoreUnavailable(_))
    }
}
