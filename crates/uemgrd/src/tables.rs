//! Table, key and field names for uemgrd

/// CONFIG_DB UE_GLOBAL table (single record `global`)
pub const CFG_UE_GLOBAL_TABLE_NAME: &str = "UE_GLOBAL";

/// CONFIG_DB UE_ADDRESS_FAMILY table (records `ipv4`, `ipv6`)
pub const CFG_UE_ADDRESS_FAMILY_TABLE_NAME: &str = "UE_ADDRESS_FAMILY";

/// CONFIG_DB UE_INTERFACE table (keyed by interface name)
pub const CFG_UE_INTERFACE_TABLE_NAME: &str = "UE_INTERFACE";

/// CONFIG_DB UE_ECMP_CONFIG table (keys `<container>|<group>`)
pub const CFG_UE_ECMP_CONFIG_TABLE_NAME: &str = "UE_ECMP_CONFIG";

/// CONFIG_DB UE_RDMA_CONFIG table (single record `global`)
pub const CFG_UE_RDMA_CONFIG_TABLE_NAME: &str = "UE_RDMA_CONFIG";

/// CONFIG_DB UE_CONGESTION table (single record `GLOBAL`)
pub const CFG_UE_CONGESTION_TABLE_NAME: &str = "UE_CONGESTION";

/// CONFIG_DB INTERFACE table (address entries `<ifname>|<addr>/<len>`)
pub const CFG_INTERFACE_TABLE_NAME: &str = "INTERFACE";

/// Tables the pipeline reads, in load order
pub const CFG_UE_TABLE_NAMES: [&str; 5] = [
    CFG_UE_GLOBAL_TABLE_NAME,
    CFG_UE_ADDRESS_FAMILY_TABLE_NAME,
    CFG_UE_INTERFACE_TABLE_NAME,
    CFG_UE_ECMP_CONFIG_TABLE_NAME,
    CFG_UE_RDMA_CONFIG_TABLE_NAME,
];

/// APPL_DB global state record
pub const APP_UE_GLOBAL_STATE_KEY: &str = "UE_GLOBAL_STATE";

/// APPL_DB transport mode record
pub const APP_UE_TRANSPORT_MODE_KEY: &str = "UE_TRANSPORT_MODE";

/// APPL_DB dual-stack mode record
pub const APP_UE_DUAL_STACK_KEY: &str = "UE_DUAL_STACK";

/// APPL_DB congestion control record
pub const APP_UE_CONGESTION_CONTROL_KEY: &str = "UE_CONGESTION_CONTROL";

/// APPL_DB IPv4 address-family record
pub const APP_UE_IPV4_CONFIG_KEY: &str = "UE_IPV4_CONFIG";

/// APPL_DB IPv6 address-family record
pub const APP_UE_IPV6_CONFIG_KEY: &str = "UE_IPV6_CONFIG";

/// APPL_DB UE_INTERFACE_CONFIG table (`UE_INTERFACE_CONFIG:<ifname>`)
pub const APP_UE_INTERFACE_CONFIG_TABLE_NAME: &str = "UE_INTERFACE_CONFIG";

/// APPL_DB UE_ECMP_GROUP table (`UE_ECMP_GROUP:<family>:<group>`)
pub const APP_UE_ECMP_GROUP_TABLE_NAME: &str = "UE_ECMP_GROUP";

/// APPL_DB RDMA record
pub const APP_UE_RDMA_CONFIG_KEY: &str = "UE_RDMA_CONFIG";

/// STATE_DB IPv4 per-interface counters
pub const STATE_UE_INTERFACE_STATS_V4_TABLE_NAME: &str = "UE_INTERFACE_STATS_V4";

/// STATE_DB IPv6 per-interface counters
pub const STATE_UE_INTERFACE_STATS_V6_TABLE_NAME: &str = "UE_INTERFACE_STATS_V6";

/// APPL_DB pub/sub channel consumed by the data-plane agent
pub const UE_DUAL_STACK_CONFIG_CHANNEL: &str = "UE_DUAL_STACK_CONFIG_CHANNEL";

/// Field names used in UE tables
pub mod fields {
    pub const ENABLE: &str = "enable";
    pub const ENABLED: &str = "enabled";
    pub const UE_ENABLE: &str = "ue_enable";
    pub const IP_VERSIONS: &str = "ip_versions";
    pub const IPV4_ENABLED: &str = "ipv4_enabled";
    pub const IPV6_ENABLED: &str = "ipv6_enabled";
    pub const TRANSPORT_MODE: &str = "transport_mode";
    pub const DUAL_STACK_MODE: &str = "dual_stack_mode";
    pub const CONGESTION_CONTROL: &str = "congestion_control";
    pub const PACKET_SPRAYING: &str = "packet_spraying";
    pub const MODE: &str = "mode";
    pub const ALGORITHM: &str = "algorithm";
    pub const UDP_PORT: &str = "udp_port";
    pub const ENTROPY_FIELDS: &str = "entropy_fields";
    pub const MAX_PATHS_V4: &str = "max_paths_v4";
    pub const MAX_PATHS_V6: &str = "max_paths_v6";
    pub const LOAD_BALANCE_MODE: &str = "load_balance_mode";
    pub const PREFER_VERSION: &str = "prefer_version";
    pub const PREFIX: &str = "prefix";
    pub const MAX_PATHS: &str = "max_paths";
    pub const HASH_ALGORITHM: &str = "hash_algorithm";
    pub const IP_VERSION: &str = "ip_version";
    pub const MAX_CONNECTIONS_V4: &str = "max_connections_v4";
    pub const MAX_CONNECTIONS_V6: &str = "max_connections_v6";
    pub const CONNECTION_MODE: &str = "connection_mode";
    pub const CONNECTION_TIMEOUT: &str = "connection_timeout";
    pub const ECN_ENABLE: &str = "ecn_enable";
    pub const SELECTIVE_ACK: &str = "selective_ack";
    pub const PACKETS_SPRAYED: &str = "packets_sprayed";
    pub const ACTIVE_PATHS: &str = "active_paths";
    pub const ACTIVE_CONNECTIONS: &str = "active_connections";
}

/// Special keys and values
pub mod constants {
    /// Record key of the UE_GLOBAL and UE_RDMA_CONFIG tables
    pub const GLOBAL_KEY: &str = "global";

    /// Record key of the UE_CONGESTION table
    pub const CONGESTION_KEY: &str = "GLOBAL";

    /// ECMP container holding IPv4 groups
    pub const IPV4_GROUPS: &str = "ipv4_groups";

    /// ECMP container holding IPv6 groups
    pub const IPV6_GROUPS: &str = "ipv6_groups";

    /// Notification operation for interface updates
    pub const SET_DUAL_STACK_OPERATION: &str = "SET_DUAL_STACK";

    /// Boolean wire values
    pub const TRUE: &str = "true";
    pub const FALSE: &str = "false";

    /// Congestion algorithm written by `ue-config congestion`
    pub const CONGESTION_ALGORITHM: &str = "ue_cubic";
}

/// Defaults applied when a raw field is absent
pub mod defaults {
    pub const IP_VERSIONS: &str = "4,6";
    pub const TRANSPORT_MODE: &str = "uet";
    pub const DUAL_STACK_MODE: &str = "concurrent";
    pub const CONGESTION_CONTROL: &str = "hybrid";
    pub const UDP_PORT: u16 = 4791;
    pub const LOAD_BALANCE_MODE: &str = "ecmp";
    pub const PREFER_VERSION: &str = "4";
    pub const ECMP_MAX_PATHS: u32 = 4;
    pub const HASH_ALGORITHM: &str = "crc32";
    pub const MAX_CONNECTIONS: u32 = 500_000;
    pub const CONNECTION_MODE: &str = "ephemeral";
    pub const CONNECTION_TIMEOUT_SECS: u32 = 30;

    /// `load_balance_mode` written by `ue-config interface`
    pub const CLI_LOAD_BALANCE_MODE: &str = "entropy_spray";
}
