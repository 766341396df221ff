//! Config Loader - reads the raw UE tables from CONFIG_DB

use std::sync::Arc;
use tracing::{debug, error, instrument};

use sonic_cfgmgr_common::{get_table, FieldValues, KeyValueStore};

use crate::error::Result;
use crate::tables::{
    CFG_UE_ADDRESS_FAMILY_TABLE_NAME, CFG_UE_ECMP_CONFIG_TABLE_NAME, CFG_UE_GLOBAL_TABLE_NAME,
    CFG_UE_INTERFACE_TABLE_NAME, CFG_UE_RDMA_CONFIG_TABLE_NAME,
};

/// Records of one table in enumeration order, as `(record_key, fields)`
pub type RawTable = Vec<(String, FieldValues)>;

/// The five UE tables as read in one load.
///
/// Entries keep store enumeration order; a key may appear more than once
/// when the snapshot was assembled by hand, and the validator resolves that
/// with last-write-wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawConfigSnapshot {
    pub global: RawTable,
    pub address_families: RawTable,
    pub interfaces: RawTable,
    pub ecmp: RawTable,
    pub rdma: RawTable,
}

impl RawConfigSnapshot {
    /// Total number of raw records
    pub fn len(&self) -> usize {
        self.global.len()
            + self.address_families.len()
            + self.interfaces.len()
            + self.ecmp.len()
            + self.rdma.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reads [`RawConfigSnapshot`]s from CONFIG_DB
#[derive(Clone)]
pub struct ConfigLoader {
    config_db: Arc<dyn KeyValueStore>,
}

impl ConfigLoader {
    pub fn new(config_db: Arc<dyn KeyValueStore>) -> Self {
        Self { config_db }
    }

    /// Reads all five tables.
    ///
    /// The reads are independent and run concurrently. Any store failure
    /// fails the whole load; there is no partial snapshot.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<RawConfigSnapshot> {
        let store = self.config_db.as_ref();
        let loaded = tokio::try_join!(
            get_table(store, CFG_UE_GLOBAL_TABLE_NAME),
            get_table(store, CFG_UE_ADDRESS_FAMILY_TABLE_NAME),
            get_table(store, CFG_UE_INTERFACE_TABLE_NAME),
            get_table(store, CFG_UE_ECMP_CONFIG_TABLE_NAME),
            get_table(store, CFG_UE_RDMA_CONFIG_TABLE_NAME),
        );

        let (global, address_families, interfaces, ecmp, rdma) = loaded.map_err(|e| {
            error!(error = %e, "UE dual-stack config load failed");
            e
        })?;

        let snapshot = RawConfigSnapshot {
            global,
            address_families,
            interfaces,
            ecmp,
            rdma,
        };
        debug!(records = snapshot.len(), "Loaded UE config snapshot");
        Ok(snapshot)
    }
}
