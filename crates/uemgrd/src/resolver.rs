//! Scope Resolvers - derive normalized state from validated config
//!
//! Resolution runs in a fixed order: global, address family, interface,
//! ECMP, RDMA. A disabled global record does not stop the later scopes from
//! running; it only forces their enable flags off.

use std::collections::BTreeMap;
use tracing::{error, info, instrument};

use sonic_types::{AddressFamily, IpNetwork};

use crate::error::UeError;
use crate::types::{
    AddressFamilyState, CapabilityTable, ChangeNotification, EcmpGroupState, GlobalState,
    InterfaceCapabilities, InterfaceState, RdmaConfig,
};
use crate::validator::ValidatedConfig;

/// State derived by one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedState {
    /// `None` when no global record is configured
    pub global: Option<GlobalState>,
    pub address_families: BTreeMap<AddressFamily, AddressFamilyState>,
    pub interfaces: BTreeMap<String, InterfaceState>,
    pub ecmp_groups: BTreeMap<(AddressFamily, String), EcmpGroupState>,
    pub rdma: Option<RdmaConfig>,
    /// Capabilities of every resolved interface, owned by this run
    pub capabilities: CapabilityTable,
    /// One notification per resolved interface
    pub notifications: BTreeMap<String, ChangeNotification>,
}

impl DerivedState {
    /// Whether dependent scopes are meaningful for this run
    pub fn feature_enabled(&self) -> bool {
        self.global.as_ref().map_or(true, GlobalState::is_enabled)
    }

    /// Number of derived records
    pub fn record_count(&self) -> usize {
        let global = match &self.global {
            None => 0,
            Some(GlobalState::Disabled) => 1,
            Some(GlobalState::Enabled { .. }) => 4,
        };
        global
            + self.address_families.len()
            + self.interfaces.len()
            + self.ecmp_groups.len()
            + usize::from(self.rdma.is_some())
    }
}

/// Output of [`resolve`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub state: DerivedState,
    /// Entities dropped during resolution
    pub errors: Vec<UeError>,
}

/// Runs every resolver over `config`, in dependency order.
#[instrument(skip(config))]
pub fn resolve(config: &ValidatedConfig) -> Resolution {
    let mut resolution = Resolution::default();

    resolve_global(config, &mut resolution.state);
    resolve_address_families(config, &mut resolution.state);
    resolve_interfaces(config, &mut resolution.state);
    resolve_ecmp_groups(config, &mut resolution);
    resolve_rdma(config, &mut resolution.state);

    resolution
}

fn resolve_global(config: &ValidatedConfig, state: &mut DerivedState) {
    let Some(global) = &config.global else {
        return;
    };

    if global.enabled {
        let ipv4_enabled = global.ip_versions.contains(AddressFamily::Ipv4);
        let ipv6_enabled = global.ip_versions.contains(AddressFamily::Ipv6);
        info!(
            ipv4_enabled,
            ipv6_enabled,
            transport_mode = %global.transport_mode,
            "Ultra Ethernet enabled globally"
        );
        state.global = Some(GlobalState::Enabled {
            ipv4_enabled,
            ipv6_enabled,
            transport_mode: global.transport_mode.clone(),
            dual_stack_mode: global.dual_stack_mode.clone(),
            congestion_control: global.congestion_control,
        });
    } else {
        info!("Ultra Ethernet disabled globally");
        state.global = Some(GlobalState::Disabled);
    }
}

fn resolve_address_families(config: &ValidatedConfig, state: &mut DerivedState) {
    let feature_enabled = state.feature_enabled();

    for (family, af) in &config.address_families {
        let derived = if af.enabled && feature_enabled {
            AddressFamilyState::Enabled {
                udp_port: af.udp_port,
                entropy_fields: af.entropy_fields.clone(),
            }
        } else {
            AddressFamilyState::Disabled
        };
        state.address_families.insert(*family, derived);
    }
}

fn resolve_interfaces(config: &ValidatedConfig, state: &mut DerivedState) {
    let feature_enabled = state.feature_enabled();

    for (name, intf) in &config.interfaces {
        let ipv4_enabled = feature_enabled && intf.ip_versions.contains(AddressFamily::Ipv4);
        let ipv6_enabled = feature_enabled && intf.ip_versions.contains(AddressFamily::Ipv6);

        let capabilities = InterfaceCapabilities::new(ipv4_enabled, ipv6_enabled);
        state.capabilities.insert(name.clone(), capabilities);

        state.interfaces.insert(
            name.clone(),
            InterfaceState {
                enabled: feature_enabled,
                ipv4_enabled,
                ipv6_enabled,
                max_paths_v4: intf.max_paths_v4.filter(|_| ipv4_enabled),
                max_paths_v6: intf.max_paths_v6.filter(|_| ipv6_enabled),
                load_balance_mode: intf.load_balance_mode.clone(),
                prefer_version: intf.prefer_version,
            },
        );

        state.notifications.insert(
            name.clone(),
            ChangeNotification::set_dual_stack(
                name.clone(),
                intf.raw.clone(),
                state.capabilities.get(name),
            ),
        );
    }
}

fn resolve_ecmp_groups(config: &ValidatedConfig, resolution: &mut Resolution) {
    for ((family, name), group) in &config.ecmp_groups {
        let network = match IpNetwork::parse_for(*family, &group.prefix) {
            Ok(network) => network,
            Err(e) => {
                let err = UeError::malformed_prefix(*family, name.clone(), group.prefix.clone(), e);
                error!(family = %family, group = %name, "Skipping ECMP group: {}", err);
                resolution.errors.push(err);
                continue;
            }
        };

        resolution.state.ecmp_groups.insert(
            (*family, name.clone()),
            EcmpGroupState {
                network,
                prefix: group.prefix.clone(),
                max_paths: group.max_paths,
                hash_algorithm: group.hash_algorithm.clone(),
            },
        );
    }
}

fn resolve_rdma(config: &ValidatedConfig, state: &mut DerivedState) {
    state.rdma = config.rdma.clone();
}
