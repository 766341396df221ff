//! Shared fixtures for uemgrd integration tests
//!
//! Every fixture runs against in-memory CONFIG_DB, APPL_DB and STATE_DB
//! stores; the handles kept here share data with the ones given to the
//! manager.

#![allow(dead_code)]

use std::sync::Arc;

use sonic_cfgmgr_common::{set_entry, DbId, FieldValues, MemoryStore};
use sonic_uemgrd::{UeMgr, UeStores, UE_DUAL_STACK_CONFIG_CHANNEL};

/// In-memory databases plus a manager wired to them
pub struct TestBed {
    pub config_db: MemoryStore,
    pub appl_db: MemoryStore,
    pub state_db: MemoryStore,
    pub mgr: UeMgr,
}

impl TestBed {
    pub fn new() -> Self {
        let config_db = MemoryStore::new(DbId::ConfigDb);
        let appl_db = MemoryStore::new(DbId::ApplDb);
        let state_db = MemoryStore::new(DbId::StateDb);
        let mgr = UeMgr::new(
            stores(&config_db, &appl_db, &state_db),
            UE_DUAL_STACK_CONFIG_CHANNEL,
        );
        Self {
            config_db,
            appl_db,
            state_db,
            mgr,
        }
    }

    pub fn stores(&self) -> UeStores {
        stores(&self.config_db, &self.appl_db, &self.state_db)
    }

    /// Writes a CONFIG_DB record
    pub async fn config(&self, table: &str, key: &str, fvs: FieldValues) {
        set_entry(&self.config_db, table, key, &fvs)
            .await
            .expect("config write");
    }

    /// Writes a STATE_DB record under its literal key
    pub async fn state(&self, key: &str, fvs: FieldValues) {
        use sonic_cfgmgr_common::KeyValueStore;
        self.state_db.hset(key, &fvs).await.expect("state write");
    }

    /// Reads an APPL_DB record field
    pub async fn app_field(&self, key: &str, field: &str) -> Option<String> {
        self.appl_db.record(key).await?.get(field).cloned()
    }
}

fn stores(config_db: &MemoryStore, appl_db: &MemoryStore, state_db: &MemoryStore) -> UeStores {
    UeStores {
        config_db: Arc::new(config_db.clone()),
        appl_db: Arc::new(appl_db.clone()),
        state_db: Arc::new(state_db.clone()),
    }
}

/// UE_INTERFACE record of the reference dual-stack interface
pub fn dual_stack_interface() -> FieldValues {
    sonic_cfgmgr_common::field_values! {
        "ue_enable" => "true",
        "ip_versions" => "4,6",
        "max_paths_v4" => "4",
        "max_paths_v6" => "2",
        "load_balance_mode" => "ecmp",
        "prefer_version" => "4",
    }
}

/// UE_GLOBAL record enabling the feature for `ip_versions`
pub fn enabled_global(ip_versions: &str) -> FieldValues {
    sonic_cfgmgr_common::field_values! {
        "enable" => "true",
        "ip_versions" => ip_versions,
    }
}
