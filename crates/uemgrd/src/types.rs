//! Type definitions for uemgrd
//!
//! Raw CONFIG_DB records are decoded into these types by the validator and
//! encoded back to strings by the state writer. Nothing in between sees the
//! string wire format.

use serde::{Deserialize, Serialize};
use sonic_types::{AddressFamily, IpNetwork, ParseError};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::tables::constants;

/// A value outside a closed enumeration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} {value:?}")]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: String,
}

/// Enumeration that rejects unknown values.
macro_rules! closed_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)+
        }

        impl $name {
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownValue;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok($name::$variant),)+
                    other => Err(UnknownValue {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// Enumeration that passes unknown values through unchanged.
macro_rules! open_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)+
            Other(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $($name::$variant => $value,)+
                    $name::Other(value) => value.as_str(),
                }
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                match s {
                    $($value => $name::$variant,)+
                    other => $name::Other(other.to_string()),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

closed_enum! {
    /// Congestion control placement
    CongestionControl, "congestion_control" {
        Sender => "sender",
        Receiver => "receiver",
        Hybrid => "hybrid",
    }
}

closed_enum! {
    /// RDMA connection lifetime
    ConnectionMode, "connection_mode" {
        Ephemeral => "ephemeral",
        Persistent => "persistent",
    }
}

open_enum! {
    /// Transport protocol mode
    TransportMode {
        Uet => "uet",
    }
}

open_enum! {
    /// How IPv4 and IPv6 traffic share the transport
    DualStackMode {
        Concurrent => "concurrent",
    }
}

open_enum! {
    /// Per-interface load balancing mode
    LoadBalanceMode {
        Ecmp => "ecmp",
        EntropySpray => "entropy_spray",
    }
}

open_enum! {
    /// ECMP hash algorithm
    HashAlgorithm {
        Crc32 => "crc32",
    }
}

/// Decodes a wire boolean. Only `"true"` is true.
pub fn parse_bool(value: &str) -> bool {
    value == constants::TRUE
}

/// Encodes a boolean for the wire.
pub fn bool_str(value: bool) -> &'static str {
    if value {
        constants::TRUE
    } else {
        constants::FALSE
    }
}

/// Set of enabled IP versions, spelled `4,6` on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct IpVersions {
    pub ipv4: bool,
    pub ipv6: bool,
}

impl IpVersions {
    /// IPv4 and IPv6
    pub const BOTH: IpVersions = IpVersions {
        ipv4: true,
        ipv6: true,
    };

    /// Parses a comma-separated version list. Every token must be 4 or 6.
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        let mut versions = IpVersions::default();
        for token in s.split(',') {
            match AddressFamily::from_version(token)? {
                AddressFamily::Ipv4 => versions.ipv4 = true,
                AddressFamily::Ipv6 => versions.ipv6 = true,
            }
        }
        Ok(versions)
    }

    /// Builds the set from individual flags.
    pub fn from_flags(ipv4: bool, ipv6: bool) -> Self {
        Self { ipv4, ipv6 }
    }

    pub fn contains(&self, family: AddressFamily) -> bool {
        match family {
            AddressFamily::Ipv4 => self.ipv4,
            AddressFamily::Ipv6 => self.ipv6,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.ipv4 && !self.ipv6
    }
}

impl fmt::Display for IpVersions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let versions: Vec<String> = AddressFamily::ALL
            .iter()
            .filter(|family| self.contains(**family))
            .map(|family| family.version().to_string())
            .collect();
        f.write_str(&versions.join(","))
    }
}

/// UE_GLOBAL|global
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalConfig {
    pub enabled: bool,
    pub ip_versions: IpVersions,
    pub transport_mode: TransportMode,
    pub dual_stack_mode: DualStackMode,
    pub congestion_control: CongestionControl,
}

/// UE_ADDRESS_FAMILY|<family>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressFamilyConfig {
    pub family: AddressFamily,
    pub enabled: bool,
    pub udp_port: u16,
    pub entropy_fields: Vec<String>,
}

/// UE_INTERFACE|<ifname>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceConfig {
    pub name: String,
    pub ue_enabled: bool,
    pub ip_versions: IpVersions,
    /// Present iff IPv4 is in `ip_versions`
    pub max_paths_v4: Option<u32>,
    /// Present iff IPv6 is in `ip_versions`
    pub max_paths_v6: Option<u32>,
    pub load_balance_mode: LoadBalanceMode,
    pub prefer_version: AddressFamily,
    /// Raw operator fields, forwarded in change notifications
    pub raw: BTreeMap<String, String>,
}

/// UE_ECMP_CONFIG|<family>_groups|<group>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcmpGroup {
    pub family: AddressFamily,
    pub name: String,
    /// CIDR text as configured; re-checked against `family` on resolution
    pub prefix: String,
    pub max_paths: u32,
    pub hash_algorithm: HashAlgorithm,
}

/// UE_RDMA_CONFIG|global
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RdmaConfig {
    pub max_connections_v4: u32,
    pub max_connections_v6: u32,
    pub connection_mode: ConnectionMode,
    pub connection_timeout_secs: u32,
}

/// Derived global state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlobalState {
    Disabled,
    Enabled {
        ipv4_enabled: bool,
        ipv6_enabled: bool,
        transport_mode: TransportMode,
        dual_stack_mode: DualStackMode,
        congestion_control: CongestionControl,
    },
}

impl GlobalState {
    pub fn is_enabled(&self) -> bool {
        matches!(self, GlobalState::Enabled { .. })
    }
}

/// Derived per-family state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressFamilyState {
    Disabled,
    Enabled {
        udp_port: u16,
        entropy_fields: Vec<String>,
    },
}

/// Derived per-interface state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceState {
    pub enabled: bool,
    pub ipv4_enabled: bool,
    pub ipv6_enabled: bool,
    pub max_paths_v4: Option<u32>,
    pub max_paths_v6: Option<u32>,
    pub load_balance_mode: LoadBalanceMode,
    pub prefer_version: AddressFamily,
}

/// Derived ECMP group state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcmpGroupState {
    pub network: IpNetwork,
    pub prefix: String,
    pub max_paths: u32,
    pub hash_algorithm: HashAlgorithm,
}

/// IP capabilities of one interface
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceCapabilities {
    pub ipv4: bool,
    pub ipv6: bool,
}

impl InterfaceCapabilities {
    pub fn new(ipv4: bool, ipv6: bool) -> Self {
        Self { ipv4, ipv6 }
    }
}

/// Capabilities derived during one pipeline run, keyed by interface
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityTable {
    entries: BTreeMap<String, InterfaceCapabilities>,
}

impl CapabilityTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, interface: impl Into<String>, capabilities: InterfaceCapabilities) {
        self.entries.insert(interface.into(), capabilities);
    }

    /// Returns the capabilities of `interface`, all false if unknown.
    pub fn get(&self, interface: &str) -> InterfaceCapabilities {
        self.entries.get(interface).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &InterfaceCapabilities)> {
        self.entries.iter()
    }
}

/// Message published to the data-plane agent for each applied interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeNotification {
    pub interface: String,
    pub operation: String,
    pub config: BTreeMap<String, String>,
    pub capabilities: InterfaceCapabilities,
}

impl ChangeNotification {
    /// Builds a `SET_DUAL_STACK` notification
    pub fn set_dual_stack(
        interface: impl Into<String>,
        config: BTreeMap<String, String>,
        capabilities: InterfaceCapabilities,
    ) -> Self {
        Self {
            interface: interface.into(),
            operation: constants::SET_DUAL_STACK_OPERATION.to_string(),
            config,
            capabilities,
        }
    }

    /// Encodes the notification as the JSON published on the channel
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
