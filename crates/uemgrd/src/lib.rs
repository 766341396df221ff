//! # uemgrd - Ultra Ethernet Dual-Stack Configuration Manager
//!
//! This crate implements the Ultra Ethernet dual-stack manager for SONiC.
//! It translates the UE configuration tables of CONFIG_DB into APPL_DB
//! records and notifies the data-plane agent of per-interface changes.
//!
//! ## Responsibilities
//! - Global enable/disable and IP version selection
//! - Per address family transport settings (UDP port, entropy fields)
//! - Per-interface dual-stack configuration and capability detection
//! - ECMP group resolution, each prefix checked against its group's family
//! - RDMA settings pass-through
//! - Reading per-interface dual-stack counters from STATE_DB
//!
//! ## Configuration Sources
//! - `UE_GLOBAL` table: Global configuration (`global` key)
//! - `UE_ADDRESS_FAMILY` table: `ipv4` / `ipv6` keys
//! - `UE_INTERFACE` table: Per-interface configuration
//! - `UE_ECMP_CONFIG` table: `ipv4_groups|<group>` / `ipv6_groups|<group>`
//! - `UE_RDMA_CONFIG` table: RDMA settings (`global` key)
//! - `INTERFACE` table: Interface addresses, for capability detection
//!
//! ## Pipeline
//! Every run loads a full snapshot, validates it, resolves derived state
//! and writes it. Invalid entities are reported and skipped; the rest of
//! the snapshot is still applied.

mod capability;
pub mod cli;
mod config_file;
pub mod daemon;
mod error;
mod loader;
mod resolver;
mod stats;
pub mod subscriber;
mod tables;
mod types;
mod ue_mgr;
mod validator;
mod writer;

pub use capability::{address_family_of, CapabilityDetector};
pub use config_file::{DaemonConfig, DatabaseConfig, UeMgrdConfig, DEFAULT_CONFIG_PATH};
pub use error::{Result, Scope, UeError, ValidationError};
pub use loader::{ConfigLoader, RawConfigSnapshot, RawTable};
pub use resolver::{resolve, DerivedState, Resolution};
pub use stats::{FamilyStats, InterfaceStats, StatsReader};
pub use tables::*;
pub use types::*;
pub use ue_mgr::{RunReport, UeMgr, UeStores};
pub use validator::{validate, validate_snapshot, ValidatedConfig, Validation};
pub use writer::{encode, AppRecord, ApplyError, ApplyReport, StateWriter};
