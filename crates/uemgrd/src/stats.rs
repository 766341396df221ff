//! Statistics Reader - per-interface dual-stack counters from STATE_DB
//!
//! Counter hashes are keyed `UE_INTERFACE_STATS_V4:<ifname>` and
//! `UE_INTERFACE_STATS_V6:<ifname>`.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{instrument, warn};

use sonic_cfgmgr_common::{FieldValuesExt, KeyValueStore};
use sonic_types::AddressFamily;

use crate::error::Result;
use crate::tables::{
    fields, STATE_UE_INTERFACE_STATS_V4_TABLE_NAME, STATE_UE_INTERFACE_STATS_V6_TABLE_NAME,
};

/// Counters for one address family
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyStats {
    pub packets_sprayed: u64,
    pub active_paths: u64,
    pub connections: u64,
}

/// Counters for both families of one interface
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceStats {
    pub ipv4: FamilyStats,
    pub ipv6: FamilyStats,
}

/// Read-only accessor for STATE_DB counters
#[derive(Clone)]
pub struct StatsReader {
    state_db: Arc<dyn KeyValueStore>,
}

impl StatsReader {
    pub fn new(state_db: Arc<dyn KeyValueStore>) -> Self {
        Self { state_db }
    }

    /// Reads the counters of `interface`. Missing counters read as zero.
    #[instrument(skip(self))]
    pub async fn get_stats(&self, interface: &str) -> Result<InterfaceStats> {
        Ok(InterfaceStats {
            ipv4: self.family_stats(interface, AddressFamily::Ipv4).await?,
            ipv6: self.family_stats(interface, AddressFamily::Ipv6).await?,
        })
    }

    async fn family_stats(&self, interface: &str, family: AddressFamily) -> Result<FamilyStats> {
        let table = match family {
            AddressFamily::Ipv4 => STATE_UE_INTERFACE_STATS_V4_TABLE_NAME,
            AddressFamily::Ipv6 => STATE_UE_INTERFACE_STATS_V6_TABLE_NAME,
        };
        let key = format!("{}:{}", table, interface);
        let fvs = self.state_db.hgetall(&key).await?;

        let counter = |field: &str| -> u64 {
            match fvs.get_field(field) {
                None => 0,
                Some(value) => value.trim().parse().unwrap_or_else(|_| {
                    warn!(key = %key, field, value, "Unparseable counter, reading as 0");
                    0
                }),
            }
        };

        Ok(FamilyStats {
            packets_sprayed: counter(fields::PACKETS_SPRAYED),
            active_paths: counter(fields::ACTIVE_PATHS),
            connections: counter(fields::ACTIVE_CONNECTIONS),
        })
    }
}
