//! Validator - decodes a raw snapshot and checks every entity's invariants
//!
//! Validation is best-effort: an offending entity is reported and left out
//! of [`ValidatedConfig`], everything else is kept.

use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{debug, instrument, warn};

use sonic_cfgmgr_common::{FieldValues, FieldValuesExt};
use sonic_types::{AddressFamily, IpNetwork};

use crate::error::{Scope, ValidationError};
use crate::loader::{RawConfigSnapshot, RawTable};
use crate::tables::{constants, defaults, fields};
use crate::types::{
    parse_bool, AddressFamilyConfig, CongestionControl, ConnectionMode, DualStackMode, EcmpGroup,
    GlobalConfig, HashAlgorithm, InterfaceConfig, IpVersions, LoadBalanceMode, RdmaConfig,
    TransportMode,
};

/// Decoded entities that passed validation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedConfig {
    pub global: Option<GlobalConfig>,
    pub address_families: BTreeMap<AddressFamily, AddressFamilyConfig>,
    /// Only interfaces with `ue_enable=true`
    pub interfaces: BTreeMap<String, InterfaceConfig>,
    pub ecmp_groups: BTreeMap<(AddressFamily, String), EcmpGroup>,
    pub rdma: Option<RdmaConfig>,
}

/// Outcome of validating one snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validation {
    pub config: ValidatedConfig,
    pub errors: Vec<ValidationError>,
}

/// Returns every validation error in `snapshot`. Pure.
pub fn validate(snapshot: &RawConfigSnapshot) -> Vec<ValidationError> {
    validate_snapshot(snapshot).errors
}

/// Decodes `snapshot`, splitting it into valid entities and errors.
#[instrument(skip(snapshot), fields(records = snapshot.len()))]
pub fn validate_snapshot(snapshot: &RawConfigSnapshot) -> Validation {
    let mut validation = Validation::default();

    for (key, fvs) in dedup(&snapshot.global) {
        match parse_global(key, fvs) {
            Ok((global, errors)) => {
                validation.config.global = Some(global);
                validation.errors.extend(errors);
            }
            Err(e) => validation.errors.push(e),
        }
    }

    for (key, fvs) in dedup(&snapshot.address_families) {
        match parse_address_family(key, fvs) {
            Ok(af) => {
                validation.config.address_families.insert(af.family, af);
            }
            Err(e) => validation.errors.push(e),
        }
    }

    for (key, fvs) in dedup(&snapshot.interfaces) {
        match parse_interface(key, fvs) {
            Ok(Some(intf)) => {
                validation.config.interfaces.insert(intf.name.clone(), intf);
            }
            Ok(None) => debug!(interface = key, "UE disabled on interface"),
            Err(e) => validation.errors.push(e),
        }
    }

    for (key, fvs) in dedup(&snapshot.ecmp) {
        match parse_ecmp_group(key, fvs) {
            Ok(group) => {
                validation
                    .config
                    .ecmp_groups
                    .insert((group.family, group.name.clone()), group);
            }
            Err(e) => validation.errors.push(e),
        }
    }

    for (key, fvs) in dedup(&snapshot.rdma) {
        match parse_rdma(key, fvs) {
            Ok(rdma) => validation.config.rdma = Some(rdma),
            Err(e) => validation.errors.push(e),
        }
    }

    for error in &validation.errors {
        warn!(scope = %error.scope, key = %error.key, "Invalid UE config: {}", error.message);
    }

    validation
}

/// Collapses duplicate keys, keeping the last occurrence.
fn dedup(table: &RawTable) -> BTreeMap<&str, &FieldValues> {
    table
        .iter()
        .map(|(key, fvs)| (key.as_str(), fvs))
        .collect()
}

fn parse_number<T: FromStr>(
    scope: Scope,
    key: &str,
    fvs: &FieldValues,
    field: &str,
) -> Result<Option<T>, ValidationError> {
    match fvs.get_field(field) {
        None => Ok(None),
        Some(value) => value.trim().parse::<T>().map(Some).map_err(|_| {
            ValidationError::new(scope, key, format!("{} {:?} is not a valid number", field, value))
        }),
    }
}

fn parse_ip_versions(scope: Scope, key: &str, fvs: &FieldValues) -> Result<IpVersions, ValidationError> {
    let raw = fvs.get_field_or(fields::IP_VERSIONS, defaults::IP_VERSIONS);
    IpVersions::parse(raw)
        .map_err(|e| ValidationError::new(scope, key, format!("{}: {}", fields::IP_VERSIONS, e)))
}

fn expect_global_key(scope: Scope, key: &str) -> Result<(), ValidationError> {
    if key == constants::GLOBAL_KEY {
        Ok(())
    } else {
        Err(ValidationError::new(
            scope,
            key,
            format!("unexpected record, only {:?} is read", constants::GLOBAL_KEY),
        ))
    }
}

/// Decodes the global record. Only a foreign key is rejected outright.
///
/// Bad fields are reported alongside a record that is always usable for
/// gating: when `enable` is not `"true"`, or any field is invalid, the
/// feature is disabled.
fn parse_global(
    key: &str,
    fvs: &FieldValues,
) -> Result<(GlobalConfig, Vec<ValidationError>), ValidationError> {
    expect_global_key(Scope::Global, key)?;

    let requested = fvs.get_field(fields::ENABLE).is_some_and(parse_bool);
    let mut errors = Vec::new();

    let ip_versions = parse_ip_versions(Scope::Global, key, fvs).unwrap_or_else(|e| {
        errors.push(e);
        IpVersions::BOTH
    });

    let congestion_control = CongestionControl::from_str(
        fvs.get_field_or(fields::CONGESTION_CONTROL, defaults::CONGESTION_CONTROL),
    )
    .unwrap_or_else(|e| {
        errors.push(ValidationError::new(Scope::Global, key, e.to_string()));
        CongestionControl::Hybrid
    });

    if requested && !errors.is_empty() {
        warn!(key, "Invalid global record, Ultra Ethernet stays disabled");
    }

    let global = GlobalConfig {
        enabled: requested && errors.is_empty(),
        ip_versions,
        transport_mode: TransportMode::from(
            fvs.get_field_or(fields::TRANSPORT_MODE, defaults::TRANSPORT_MODE),
        ),
        dual_stack_mode: DualStackMode::from(
            fvs.get_field_or(fields::DUAL_STACK_MODE, defaults::DUAL_STACK_MODE),
        ),
        congestion_control,
    };
    Ok((global, errors))
}

fn parse_address_family(key: &str, fvs: &FieldValues) -> Result<AddressFamilyConfig, ValidationError> {
    let family = AddressFamily::from_str(key)
        .map_err(|e| ValidationError::new(Scope::AddressFamily, key, e.to_string()))?;

    let udp_port = parse_number::<u16>(Scope::AddressFamily, key, fvs, fields::UDP_PORT)?
        .unwrap_or(defaults::UDP_PORT);

    let entropy_fields = fvs
        .get_field(fields::ENTROPY_FIELDS)
        .map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|field| !field.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(AddressFamilyConfig {
        family,
        enabled: fvs.get_field(fields::ENABLED).is_some_and(parse_bool),
        udp_port,
        entropy_fields,
    })
}

/// Returns `Ok(None)` for interfaces with UE disabled; those are not checked.
fn parse_interface(key: &str, fvs: &FieldValues) -> Result<Option<InterfaceConfig>, ValidationError> {
    if !fvs.get_field(fields::UE_ENABLE).is_some_and(parse_bool) {
        return Ok(None);
    }

    let ip_versions = parse_ip_versions(Scope::Interface, key, fvs)?;

    let max_paths_v4 = required_max_paths(key, fvs, ip_versions, AddressFamily::Ipv4)?;
    let max_paths_v6 = required_max_paths(key, fvs, ip_versions, AddressFamily::Ipv6)?;

    let prefer_version = AddressFamily::from_version(
        fvs.get_field_or(fields::PREFER_VERSION, defaults::PREFER_VERSION),
    )
    .map_err(|e| {
        ValidationError::new(Scope::Interface, key, format!("{}: {}", fields::PREFER_VERSION, e))
    })?;

    Ok(Some(InterfaceConfig {
        name: key.to_string(),
        ue_enabled: true,
        ip_versions,
        max_paths_v4,
        max_paths_v6,
        load_balance_mode: LoadBalanceMode::from(
            fvs.get_field_or(fields::LOAD_BALANCE_MODE, defaults::LOAD_BALANCE_MODE),
        ),
        prefer_version,
        raw: fvs.iter().cloned().collect(),
    }))
}

/// `max_paths_vN` is required iff N is enabled; otherwise it is ignored.
fn required_max_paths(
    key: &str,
    fvs: &FieldValues,
    ip_versions: IpVersions,
    family: AddressFamily,
) -> Result<Option<u32>, ValidationError> {
    if !ip_versions.contains(family) {
        return Ok(None);
    }

    let field = match family {
        AddressFamily::Ipv4 => fields::MAX_PATHS_V4,
        AddressFamily::Ipv6 => fields::MAX_PATHS_V6,
    };

    match parse_number::<u32>(Scope::Interface, key, fvs, field)? {
        Some(max_paths) => Ok(Some(max_paths)),
        None => Err(ValidationError::new(
            Scope::Interface,
            key,
            format!(
                "{} required when IPv{} enabled",
                field,
                family.version()
            ),
        )),
    }
}

fn ecmp_container_family(container: &str) -> Option<AddressFamily> {
    match container {
        constants::IPV4_GROUPS => Some(AddressFamily::Ipv4),
        constants::IPV6_GROUPS => Some(AddressFamily::Ipv6),
        _ => None,
    }
}

fn parse_ecmp_group(key: &str, fvs: &FieldValues) -> Result<EcmpGroup, ValidationError> {
    let Some((container, name)) = key.split_once('|') else {
        return Err(ValidationError::new(
            Scope::Ecmp,
            key,
            "expected <ipv4_groups|ipv6_groups>|<group>",
        ));
    };

    let family = ecmp_container_family(container).ok_or_else(|| {
        ValidationError::new(Scope::Ecmp, key, format!("unknown ECMP container {:?}", container))
    })?;

    let prefix = fvs.get_field_or(fields::PREFIX, "").to_string();
    IpNetwork::parse_for(family, &prefix).map_err(|_| {
        ValidationError::new(
            Scope::Ecmp,
            key,
            format!("Invalid IPv{} prefix {:?} in group {}", family.version(), prefix, name),
        )
    })?;

    let max_paths =
        parse_number::<u32>(Scope::Ecmp, key, fvs, fields::MAX_PATHS)?.unwrap_or(defaults::ECMP_MAX_PATHS);

    Ok(EcmpGroup {
        family,
        name: name.to_string(),
        prefix,
        max_paths,
        hash_algorithm: HashAlgorithm::from(
            fvs.get_field_or(fields::HASH_ALGORITHM, defaults::HASH_ALGORITHM),
        ),
    })
}

fn parse_rdma(key: &str, fvs: &FieldValues) -> Result<RdmaConfig, ValidationError> {
    expect_global_key(Scope::Rdma, key)?;

    let max_connections_v4 = parse_number::<u32>(Scope::Rdma, key, fvs, fields::MAX_CONNECTIONS_V4)?
        .unwrap_or(defaults::MAX_CONNECTIONS);
    let max_connections_v6 = parse_number::<u32>(Scope::Rdma, key, fvs, fields::MAX_CONNECTIONS_V6)?
        .unwrap_or(defaults::MAX_CONNECTIONS);
    let connection_timeout_secs =
        parse_number::<u32>(Scope::Rdma, key, fvs, fields::CONNECTION_TIMEOUT)?
            .unwrap_or(defaults::CONNECTION_TIMEOUT_SECS);

    let connection_mode = ConnectionMode::from_str(
        fvs.get_field_or(fields::CONNECTION_MODE, defaults::CONNECTION_MODE),
    )
    .map_err(|e| ValidationError::new(Scope::Rdma, key, e.to_string()))?;

    Ok(RdmaConfig {
        max_connections_v4,
        max_connections_v6,
        connection_mode,
        connection_timeout_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sonic_cfgmgr_common::field_values;

    fn snapshot_with_interfaces(interfaces: RawTable) -> RawConfigSnapshot {
        RawConfigSnapshot {
            interfaces,
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_interface() {
        let snapshot = snapshot_with_interfaces(vec![(
            "Ethernet0".to_string(),
            field_values! {
                "ue_enable" => "true",
                "ip_versions" => "4,6",
                "max_paths_v4" => "4",
                "max_paths_v6" => "2",
                "load_balance_mode" => "ecmp",
                "prefer_version" => "4",
            },
        )]);

        let validation = validate_snapshot(&snapshot);
        assert!(validation.errors.is_empty());

        let intf = &validation.config.interfaces["Ethernet0"];
        assert_eq!(intf.max_paths_v4, Some(4));
        assert_eq!(intf.max_paths_v6, Some(2));
        assert_eq!(intf.prefer_version, AddressFamily::Ipv4);
        assert_eq!(intf.raw.len(), 6);
    }

    #[test]
    fn test_missing_max_paths_v4() {
        let snapshot = snapshot_with_interfaces(vec![(
            "Ethernet0".to_string(),
            field_values! { "ue_enable" => "true", "ip_versions" => "4", "max_paths_v6" => "2" },
        )]);

        let errors = validate(&snapshot);
        assert_eq!(
            errors,
            vec![ValidationError::new(
                Scope::Interface,
                "Ethernet0",
                "max_paths_v4 required when IPv4 enabled"
            )]
        );
    }

    #[test]
    fn test_max_paths_ignored_for_disabled_version() {
        let snapshot = snapshot_with_interfaces(vec![(
            "Ethernet0".to_string(),
            field_values! { "ue_enable" => "true", "ip_versions" => "6", "max_paths_v6" => "8", "max_paths_v4" => "junk" },
        )]);

        let validation = validate_snapshot(&snapshot);
        assert!(validation.errors.is_empty());
        assert_eq!(validation.config.interfaces["Ethernet0"].max_paths_v4, None);
    }

    #[test]
    fn test_disabled_interface_not_validated() {
        let snapshot = snapshot_with_interfaces(vec![(
            "Ethernet8".to_string(),
            field_values! { "ue_enable" => "false", "ip_versions" => "7" },
        )]);

        let validation = validate_snapshot(&snapshot);
        assert!(validation.errors.is_empty());
        assert!(validation.config.interfaces.is_empty());
    }

    #[test]
    fn test_duplicate_resolved_before_validation() {
        let snapshot = snapshot_with_interfaces(vec![
            (
                "Ethernet0".to_string(),
                field_values! { "ue_enable" => "true", "ip_versions" => "4" },
            ),
            (
                "Ethernet0".to_string(),
                field_values! { "ue_enable" => "true", "ip_versions" => "4", "max_paths_v4" => "16" },
            ),
        ]);

        let validation = validate_snapshot(&snapshot);
        assert!(validation.errors.is_empty());
        assert_eq!(validation.config.interfaces["Ethernet0"].max_paths_v4, Some(16));
    }

    #[test]
    fn test_invalid_prefer_version() {
        let snapshot = snapshot_with_interfaces(vec![(
            "Ethernet0".to_string(),
            field_values! { "ue_enable" => "true", "ip_versions" => "4", "max_paths_v4" => "4", "prefer_version" => "5" },
        )]);

        let errors = validate(&snapshot);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("prefer_version"));
    }

    #[test]
    fn test_global_invalid_ip_version() {
        let snapshot = RawConfigSnapshot {
            global: vec![(
                "global".to_string(),
                field_values! { "enable" => "true", "ip_versions" => "4,8" },
            )],
            ..Default::default()
        };

        let validation = validate_snapshot(&snapshot);
        let global = validation.config.global.unwrap();
        assert!(!global.enabled);
        assert_eq!(validation.errors.len(), 1);
        assert_eq!(validation.errors[0].scope, Scope::Global);
        assert!(validation.errors[0].message.contains("8"));
    }

    #[test]
    fn test_disabled_global_with_bad_field_still_gates() {
        let snapshot = RawConfigSnapshot {
            global: vec![(
                "global".to_string(),
                field_values! { "enable" => "false", "congestion_control" => "bogus" },
            )],
            ..Default::default()
        };

        let validation = validate_snapshot(&snapshot);
        assert_eq!(validation.errors.len(), 1);
        assert!(validation.errors[0].message.contains("bogus"));
        assert!(!validation.config.global.unwrap().enabled);
    }

    #[test]
    fn test_global_defaults() {
        let snapshot = RawConfigSnapshot {
            global: vec![("global".to_string(), field_values! { "enable" => "true" })],
            ..Default::default()
        };

        let global = validate_snapshot(&snapshot).config.global.unwrap();
        assert!(global.enabled);
        assert_eq!(global.ip_versions, IpVersions::BOTH);
        assert_eq!(global.transport_mode, TransportMode::Uet);
        assert_eq!(global.dual_stack_mode, DualStackMode::Concurrent);
        assert_eq!(global.congestion_control, CongestionControl::Hybrid);
    }

    #[test]
    fn test_global_unknown_congestion_control() {
        let snapshot = RawConfigSnapshot {
            global: vec![(
                "global".to_string(),
                field_values! { "enable" => "true", "congestion_control" => "bbr" },
            )],
            ..Default::default()
        };

        let validation = validate_snapshot(&snapshot);
        assert_eq!(validation.errors.len(), 1);
        assert!(validation.errors[0].message.contains("bbr"));
        assert!(!validation.config.global.unwrap().enabled);
    }

    #[test]
    fn test_address_family_parsing() {
        let snapshot = RawConfigSnapshot {
            address_families: vec![
                (
                    "ipv4".to_string(),
                    field_values! { "enabled" => "true", "entropy_fields" => "src_port, dst_port" },
                ),
                ("ipv6".to_string(), field_values! { "enabled" => "true", "udp_port" => "5000" }),
                ("ipx".to_string(), field_values! { "enabled" => "true" }),
            ],
            ..Default::default()
        };

        let validation = validate_snapshot(&snapshot);
        let v4 = &validation.config.address_families[&AddressFamily::Ipv4];
        assert_eq!(v4.udp_port, 4791);
        assert_eq!(v4.entropy_fields, vec!["src_port", "dst_port"]);

        let v6 = &validation.config.address_families[&AddressFamily::Ipv6];
        assert_eq!(v6.udp_port, 5000);
        assert!(v6.entropy_fields.is_empty());

        assert_eq!(validation.errors.len(), 1);
        assert_eq!(validation.errors[0].key, "ipx");
    }

    #[test]
    fn test_address_family_bad_port() {
        let snapshot = RawConfigSnapshot {
            address_families: vec![(
                "ipv4".to_string(),
                field_values! { "enabled" => "true", "udp_port" => "70000" },
            )],
            ..Default::default()
        };

        assert_eq!(validate(&snapshot).len(), 1);
    }

    #[test]
    fn test_ecmp_groups() {
        let snapshot = RawConfigSnapshot {
            ecmp: vec![
                (
                    "ipv4_groups|g1".to_string(),
                    field_values! { "prefix" => "10.0.0.0/24" },
                ),
                (
                    "ipv6_groups|g1".to_string(),
                    field_values! { "prefix" => "10.0.0.0/24" },
                ),
                (
                    "ipv6_groups|g2".to_string(),
                    field_values! { "prefix" => "2001:db8::/64", "max_paths" => "8", "hash_algorithm" => "xor" },
                ),
                (
                    "ipv5_groups|g3".to_string(),
                    field_values! { "prefix" => "10.0.0.0/24" },
                ),
            ],
            ..Default::default()
        };

        let validation = validate_snapshot(&snapshot);
        let groups = &validation.config.ecmp_groups;
        assert_eq!(groups.len(), 2);

        let g1 = &groups[&(AddressFamily::Ipv4, "g1".to_string())];
        assert_eq!(g1.max_paths, 4);
        assert_eq!(g1.hash_algorithm, HashAlgorithm::Crc32);

        let g2 = &groups[&(AddressFamily::Ipv6, "g2".to_string())];
        assert_eq!(g2.max_paths, 8);
        assert_eq!(g2.hash_algorithm, HashAlgorithm::Other("xor".to_string()));

        let keys: Vec<&str> = validation.errors.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["ipv5_groups|g3", "ipv6_groups|g1"]);
    }

    #[test]
    fn test_ecmp_missing_prefix() {
        let snapshot = RawConfigSnapshot {
            ecmp: vec![("ipv4_groups|g1".to_string(), field_values! { "max_paths" => "4" })],
            ..Default::default()
        };

        let errors = validate(&snapshot);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Invalid IPv4 prefix \"\" in group g1");
    }

    #[test]
    fn test_rdma_defaults_and_errors() {
        let snapshot = RawConfigSnapshot {
            rdma: vec![("global".to_string(), field_values! { "max_connections_v6" => "1000" })],
            ..Default::default()
        };
        let rdma = validate_snapshot(&snapshot).config.rdma.unwrap();
        assert_eq!(rdma.max_connections_v4, 500_000);
        assert_eq!(rdma.max_connections_v6, 1000);
        assert_eq!(rdma.connection_mode, ConnectionMode::Ephemeral);
        assert_eq!(rdma.connection_timeout_secs, 30);

        let snapshot = RawConfigSnapshot {
            rdma: vec![("global".to_string(), field_values! { "connection_mode" => "sticky" })],
            ..Default::default()
        };
        assert_eq!(validate(&snapshot).len(), 1);
    }
}
