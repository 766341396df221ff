//! Operator CLI (`ue-config`)
//!
//! Write subcommands only touch CONFIG_DB. The daemon picks the change up on
//! its next run, so a successful write says nothing about validity; use
//! `ue-config validate` for that.

use clap::{Args, Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;

use sonic_cfgmgr_common::{set_entry, FieldValues};

use crate::capability::CapabilityDetector;
use crate::config_file::DEFAULT_CONFIG_PATH;
use crate::error::Result;
use crate::stats::StatsReader;
use crate::tables::{
    constants, defaults, fields, CFG_UE_CONGESTION_TABLE_NAME, CFG_UE_GLOBAL_TABLE_NAME,
    CFG_UE_INTERFACE_TABLE_NAME,
};
use crate::types::{bool_str, IpVersions};
use crate::ue_mgr::{UeMgr, UeStores};

const CONGESTION_MODES: [&str; 3] = ["sender", "receiver", "hybrid"];

/// Ultra Ethernet dual-stack configuration tool
#[derive(Debug, Parser)]
#[command(name = "ue-config", version, about)]
pub struct Cli {
    /// Daemon configuration file (database location)
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Log filter, e.g. "debug" or "sonic_uemgrd=trace"
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure global dual-stack settings (UE_GLOBAL|global)
    Global(GlobalArgs),
    /// Configure dual-stack on an interface (UE_INTERFACE|<interface>)
    Interface(InterfaceArgs),
    /// Configure system-wide congestion control (UE_CONGESTION|GLOBAL)
    Congestion(CongestionArgs),
    /// Show dual-stack counters of an interface
    Stats {
        #[arg(long)]
        interface: String,
    },
    /// Show IP capabilities detected from interface addresses
    Capabilities {
        #[arg(long)]
        interface: String,
    },
    /// Validate the current configuration without applying it
    Validate,
}

#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Enable Ultra Ethernet
    #[arg(long)]
    pub enable: bool,
    /// Enable IPv4
    #[arg(long)]
    pub ipv4: bool,
    /// Enable IPv6
    #[arg(long)]
    pub ipv6: bool,
    /// Transport mode
    #[arg(long, default_value = defaults::TRANSPORT_MODE)]
    pub mode: String,
    /// Congestion control placement
    #[arg(long, default_value = defaults::CONGESTION_CONTROL, value_parser = CONGESTION_MODES)]
    pub congestion_control: String,
}

#[derive(Debug, Clone, Args)]
pub struct InterfaceArgs {
    #[arg(long)]
    pub interface: String,
    /// Enable Ultra Ethernet on the interface
    #[arg(long)]
    pub enable: bool,
    /// Enable IPv4
    #[arg(long)]
    pub ipv4: bool,
    /// Enable IPv6
    #[arg(long)]
    pub ipv6: bool,
    #[arg(long, default_value_t = defaults::ECMP_MAX_PATHS)]
    pub max_paths_v4: u32,
    #[arg(long, default_value_t = defaults::ECMP_MAX_PATHS)]
    pub max_paths_v6: u32,
    /// Preferred IP version
    #[arg(long, default_value = defaults::PREFER_VERSION, value_parser = ["4", "6"])]
    pub prefer_version: String,
}

#[derive(Debug, Clone, Args)]
pub struct CongestionArgs {
    /// Congestion control placement
    #[arg(long, default_value = defaults::CONGESTION_CONTROL, value_parser = CONGESTION_MODES)]
    pub mode: String,
    /// Disable ECN
    #[arg(long)]
    pub no_ecn: bool,
    /// Disable selective acknowledgement
    #[arg(long)]
    pub no_selective_ack: bool,
}

/// Result of one CLI command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub text: String,
    pub success: bool,
}

impl CommandOutput {
    fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            success: true,
        }
    }
}

/// Neither flag means both versions.
pub fn ip_versions_from_flags(ipv4: bool, ipv6: bool) -> IpVersions {
    if !ipv4 && !ipv6 {
        IpVersions::BOTH
    } else {
        IpVersions::from_flags(ipv4, ipv6)
    }
}

fn fv(field: &str, value: impl ToString) -> (String, String) {
    (field.to_string(), value.to_string())
}

/// Builds the UE_GLOBAL|global record
pub fn global_record(args: &GlobalArgs) -> FieldValues {
    vec![
        fv(fields::ENABLE, bool_str(args.enable)),
        fv(fields::TRANSPORT_MODE, &args.mode),
        fv(fields::CONGESTION_CONTROL, &args.congestion_control),
        fv(fields::PACKET_SPRAYING, bool_str(args.enable)),
        fv(fields::IP_VERSIONS, ip_versions_from_flags(args.ipv4, args.ipv6)),
        fv(fields::DUAL_STACK_MODE, defaults::DUAL_STACK_MODE),
    ]
}

/// Builds the UE_INTERFACE|<interface> record
///
/// `max_paths_vN` is written for every enabled version, including the
/// implicit both-versions default.
pub fn interface_record(args: &InterfaceArgs) -> FieldValues {
    let versions = ip_versions_from_flags(args.ipv4, args.ipv6);

    let mut record = vec![
        fv(fields::UE_ENABLE, bool_str(args.enable)),
        fv(fields::IP_VERSIONS, versions),
        fv(fields::LOAD_BALANCE_MODE, defaults::CLI_LOAD_BALANCE_MODE),
        fv(fields::PREFER_VERSION, &args.prefer_version),
    ];
    if versions.ipv4 {
        record.push(fv(fields::MAX_PATHS_V4, args.max_paths_v4));
    }
    if versions.ipv6 {
        record.push(fv(fields::MAX_PATHS_V6, args.max_paths_v6));
    }
    record
}

/// Builds the UE_CONGESTION|GLOBAL record
pub fn congestion_record(args: &CongestionArgs) -> FieldValues {
    vec![
        fv(fields::MODE, &args.mode),
        fv(fields::ALGORITHM, constants::CONGESTION_ALGORITHM),
        fv(fields::ECN_ENABLE, bool_str(!args.no_ecn)),
        fv(fields::SELECTIVE_ACK, bool_str(!args.no_selective_ack)),
    ]
}

fn record_json(record: &FieldValues) -> String {
    let map: BTreeMap<&str, &str> = record
        .iter()
        .map(|(f, v)| (f.as_str(), v.as_str()))
        .collect();
    serde_json::to_string(&map).unwrap_or_default()
}

fn pretty_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

/// Runs `command` against `stores`.
///
/// Errors are store failures of the command's own reads and writes.
pub async fn execute(command: &Command, stores: &UeStores, channel: &str) -> Result<CommandOutput> {
    let config_db = stores.config_db.as_ref();

    match command {
        Command::Global(args) => {
            let record = global_record(args);
            set_entry(config_db, CFG_UE_GLOBAL_TABLE_NAME, constants::GLOBAL_KEY, &record).await?;
            Ok(CommandOutput::ok(format!(
                "Ultra Ethernet dual-stack global config updated: {}",
                record_json(&record)
            )))
        }
        Command::Interface(args) => {
            let record = interface_record(args);
            set_entry(config_db, CFG_UE_INTERFACE_TABLE_NAME, &args.interface, &record).await?;
            Ok(CommandOutput::ok(format!(
                "Ultra Ethernet dual-stack config for {}: {}",
                args.interface,
                record_json(&record)
            )))
        }
        Command::Congestion(args) => {
            let record = congestion_record(args);
            set_entry(config_db, CFG_UE_CONGESTION_TABLE_NAME, constants::CONGESTION_KEY, &record)
                .await?;
            Ok(CommandOutput::ok(format!(
                "Ultra Ethernet congestion control updated: {}",
                record_json(&record)
            )))
        }
        Command::Stats { interface } => {
            let stats = StatsReader::new(stores.state_db.clone()).get_stats(interface).await?;
            Ok(CommandOutput::ok(pretty_json(&stats)))
        }
        Command::Capabilities { interface } => {
            let capabilities = CapabilityDetector::new(stores.config_db.clone())
                .detect(interface)
                .await;
            Ok(CommandOutput::ok(pretty_json(&capabilities)))
        }
        Command::Validate => {
            let errors = UeMgr::new(stores.clone(), channel).check().await?;
            if errors.is_empty() {
                return Ok(CommandOutput::ok("Configuration is valid"));
            }
            let text = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n");
            Ok(CommandOutput {
                text,
                success: false,
            })
        }
    }
}
