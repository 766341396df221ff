//! Capability Detector - infers interface IP capabilities from CONFIG_DB
//!
//! Address entries live in the INTERFACE table as
//! `INTERFACE|<ifname>|<address>/<len>`. The address part is parsed, so an
//! entry counts for the family of its address regardless of how the key is
//! spelled.

use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use sonic_cfgmgr_common::{table_key, KeyValueStore};
use sonic_types::AddressFamily;

use crate::error::{Result, UeError};
use crate::tables::CFG_INTERFACE_TABLE_NAME;
use crate::types::InterfaceCapabilities;

/// Reads the INTERFACE table to find which families an interface carries
#[derive(Clone)]
pub struct CapabilityDetector {
    config_db: Arc<dyn KeyValueStore>,
}

/// Returns the family of an `<address>/<len>` key suffix.
pub fn address_family_of(entry: &str) -> Option<AddressFamily> {
    let address = entry.split_once('/').map_or(entry, |(address, _)| address);
    address.parse::<IpAddr>().ok().map(|addr| AddressFamily::of(&addr))
}

impl CapabilityDetector {
    pub fn new(config_db: Arc<dyn KeyValueStore>) -> Self {
        Self { config_db }
    }

    /// Detects capabilities, reporting store failures as errors.
    #[instrument(skip(self))]
    pub async fn try_detect(&self, interface: &str) -> Result<InterfaceCapabilities> {
        let prefix = table_key(
            self.config_db.db(),
            CFG_INTERFACE_TABLE_NAME,
            &format!("{}{}", interface, self.config_db.db().separator()),
        );

        let keys = self
            .config_db
            .keys(&format!("{}*", prefix))
            .await
            .map_err(|e| UeError::unreachable(CFG_INTERFACE_TABLE_NAME, e))?;

        let mut capabilities = InterfaceCapabilities::default();
        for key in &keys {
            let Some(entry) = key.strip_prefix(&prefix) else {
                continue;
            };
            match address_family_of(entry) {
                Some(AddressFamily::Ipv4) => capabilities.ipv4 = true,
                Some(AddressFamily::Ipv6) => capabilities.ipv6 = true,
                None => debug!(key = %key, "Ignoring non-address INTERFACE entry"),
            }
        }

        debug!(
            interface,
            ipv4 = capabilities.ipv4,
            ipv6 = capabilities.ipv6,
            "Detected interface capabilities"
        );
        Ok(capabilities)
    }

    /// Detects capabilities; a store failure is logged and yields none.
    pub async fn detect(&self, interface: &str) -> InterfaceCapabilities {
        match self.try_detect(interface).await {
            Ok(capabilities) => capabilities,
            Err(e) => {
                warn!(interface, error = %e, "Failed to detect IP capabilities");
                InterfaceCapabilities::default()
            }
        }
    }
}
