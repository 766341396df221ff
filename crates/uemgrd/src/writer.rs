//! State Writer + Notifier - persists derived state to APPL_DB
//!
//! Every record is written with replace semantics and independently of the
//! others: a failed record is reported and the batch carries on, without
//! rolling back what was already written. Interface records are followed by
//! a fire-and-forget notification on the dual-stack channel.

use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use sonic_cfgmgr_common::{table_key, DbId, FieldValues, KeyValueStore};
use sonic_types::AddressFamily;

use crate::error::{Scope, UeError};
use crate::resolver::DerivedState;
use crate::tables::{
    fields, APP_UE_CONGESTION_CONTROL_KEY, APP_UE_DUAL_STACK_KEY, APP_UE_ECMP_GROUP_TABLE_NAME,
    APP_UE_GLOBAL_STATE_KEY, APP_UE_INTERFACE_CONFIG_TABLE_NAME, APP_UE_IPV4_CONFIG_KEY,
    APP_UE_IPV6_CONFIG_KEY, APP_UE_RDMA_CONFIG_KEY, APP_UE_TRANSPORT_MODE_KEY,
};
use crate::types::{bool_str, AddressFamilyState, GlobalState};

/// One APPL_DB hash produced from derived state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppRecord {
    pub scope: Scope,
    /// Entity the record belongs to (interface name, `ipv4:g1`, ...)
    pub name: String,
    /// Full APPL_DB key
    pub key: String,
    pub fields: FieldValues,
}

impl AppRecord {
    fn new(scope: Scope, name: impl Into<String>, key: impl Into<String>, fields: FieldValues) -> Self {
        Self {
            scope,
            name: name.into(),
            key: key.into(),
            fields,
        }
    }
}

/// A record the writer could not persist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyError {
    pub key: String,
    pub error: UeError,
}

/// Outcome of [`StateWriter::apply`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Records written
    pub applied: usize,
    /// Records that failed to write
    pub errors: Vec<ApplyError>,
    /// Notifications published
    pub published: usize,
    /// Notifications that could not be encoded or published
    pub publish_failures: usize,
}

impl ApplyReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.publish_failures == 0
    }
}

fn fv(field: &str, value: impl ToString) -> (String, String) {
    (field.to_string(), value.to_string())
}

fn address_family_key(family: AddressFamily) -> &'static str {
    match family {
        AddressFamily::Ipv4 => APP_UE_IPV4_CONFIG_KEY,
        AddressFamily::Ipv6 => APP_UE_IPV6_CONFIG_KEY,
    }
}

/// Encodes derived state into APPL_DB records, in scope order.
///
/// This is the only place derived state is turned into wire strings:
/// booleans become `"true"`/`"false"` and lists become JSON text.
pub fn encode(state: &DerivedState) -> Vec<AppRecord> {
    let mut records = Vec::with_capacity(state.record_count());

    match &state.global {
        None => {}
        Some(GlobalState::Disabled) => records.push(AppRecord::new(
            Scope::Global,
            APP_UE_GLOBAL_STATE_KEY,
            APP_UE_GLOBAL_STATE_KEY,
            vec![fv(fields::ENABLED, bool_str(false))],
        )),
        Some(GlobalState::Enabled {
            ipv4_enabled,
            ipv6_enabled,
            transport_mode,
            dual_stack_mode,
            congestion_control,
        }) => {
            records.push(AppRecord::new(
                Scope::Global,
                APP_UE_GLOBAL_STATE_KEY,
                APP_UE_GLOBAL_STATE_KEY,
                vec![
                    fv(fields::ENABLED, bool_str(true)),
                    fv(fields::IPV4_ENABLED, bool_str(*ipv4_enabled)),
                    fv(fields::IPV6_ENABLED, bool_str(*ipv6_enabled)),
                ],
            ));
            records.push(AppRecord::new(
                Scope::Global,
                APP_UE_TRANSPORT_MODE_KEY,
                APP_UE_TRANSPORT_MODE_KEY,
                vec![fv(fields::MODE, transport_mode)],
            ));
            records.push(AppRecord::new(
                Scope::Global,
                APP_UE_DUAL_STACK_KEY,
                APP_UE_DUAL_STACK_KEY,
                vec![fv(fields::MODE, dual_stack_mode)],
            ));
            records.push(AppRecord::new(
                Scope::Global,
                APP_UE_CONGESTION_CONTROL_KEY,
                APP_UE_CONGESTION_CONTROL_KEY,
                vec![fv(fields::ALGORITHM, congestion_control)],
            ));
        }
    }

    for (family, af) in &state.address_families {
        let fvs = match af {
            AddressFamilyState::Disabled => vec![fv(fields::ENABLED, bool_str(false))],
            AddressFamilyState::Enabled {
                udp_port,
                entropy_fields,
            } => vec![
                fv(fields::ENABLED, bool_str(true)),
                fv(fields::UDP_PORT, udp_port),
                fv(
                    fields::ENTROPY_FIELDS,
                    serde_json::Value::from(entropy_fields.clone()),
                ),
            ],
        };
        records.push(AppRecord::new(
            Scope::AddressFamily,
            family.as_str(),
            address_family_key(*family),
            fvs,
        ));
    }

    for (name, intf) in &state.interfaces {
        let mut fvs = vec![
            fv(fields::ENABLED, bool_str(intf.enabled)),
            fv(fields::IPV4_ENABLED, bool_str(intf.ipv4_enabled)),
            fv(fields::IPV6_ENABLED, bool_str(intf.ipv6_enabled)),
        ];
        if let Some(max_paths) = intf.max_paths_v4 {
            fvs.push(fv(fields::MAX_PATHS_V4, max_paths));
        }
        if let Some(max_paths) = intf.max_paths_v6 {
            fvs.push(fv(fields::MAX_PATHS_V6, max_paths));
        }
        fvs.push(fv(fields::LOAD_BALANCE_MODE, &intf.load_balance_mode));
        fvs.push(fv(fields::PREFER_VERSION, intf.prefer_version.version()));

        records.push(AppRecord::new(
            Scope::Interface,
            name.clone(),
            table_key(DbId::ApplDb, APP_UE_INTERFACE_CONFIG_TABLE_NAME, name),
            fvs,
        ));
    }

    for ((family, group), ecmp) in &state.ecmp_groups {
        let name = format!("{}:{}", family, group);
        records.push(AppRecord::new(
            Scope::Ecmp,
            name.clone(),
            table_key(DbId::ApplDb, APP_UE_ECMP_GROUP_TABLE_NAME, &name),
            vec![
                fv(fields::PREFIX, &ecmp.prefix),
                fv(fields::MAX_PATHS, ecmp.max_paths),
                fv(fields::HASH_ALGORITHM, &ecmp.hash_algorithm),
                fv(fields::IP_VERSION, family),
            ],
        ));
    }

    if let Some(rdma) = &state.rdma {
        records.push(AppRecord::new(
            Scope::Rdma,
            APP_UE_RDMA_CONFIG_KEY,
            APP_UE_RDMA_CONFIG_KEY,
            vec![
                fv(fields::MAX_CONNECTIONS_V4, rdma.max_connections_v4),
                fv(fields::MAX_CONNECTIONS_V6, rdma.max_connections_v6),
                fv(fields::CONNECTION_MODE, rdma.connection_mode),
                fv(fields::CONNECTION_TIMEOUT, rdma.connection_timeout_secs),
            ],
        ));
    }

    records
}

/// Writes derived state to APPL_DB and publishes interface notifications
#[derive(Clone)]
pub struct StateWriter {
    appl_db: Arc<dyn KeyValueStore>,
    channel: String,
}

impl StateWriter {
    pub fn new(appl_db: Arc<dyn KeyValueStore>, channel: impl Into<String>) -> Self {
        Self {
            appl_db,
            channel: channel.into(),
        }
    }

    /// Returns the notification channel name
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Writes every derived record, then notifies for written interfaces.
    ///
    /// A notification is only sent when its interface record was written.
    #[instrument(skip(self, state), fields(records = state.record_count()))]
    pub async fn apply(&self, state: &DerivedState) -> ApplyReport {
        let mut report = ApplyReport::default();

        for record in encode(state) {
            let written = self.appl_db.replace(&record.key, &record.fields).await;
            if let Err(e) = written {
                error!(key = %record.key, error = %e, "Failed to write UE state");
                report.errors.push(ApplyError {
                    key: record.key,
                    error: e.into(),
                });
                continue;
            }

            debug!(key = %record.key, scope = %record.scope, "Wrote UE state");
            report.applied += 1;

            if record.scope == Scope::Interface {
                self.notify(state, &record.name, &mut report).await;
            }
        }

        info!(
            applied = report.applied,
            failed = report.errors.len(),
            published = report.published,
            "Applied UE dual-stack state"
        );
        report
    }

    async fn notify(&self, state: &DerivedState, interface: &str, report: &mut ApplyReport) {
        let Some(notification) = state.notifications.get(interface) else {
            return;
        };

        let message = match notification.to_json() {
            Ok(message) => message,
            Err(e) => {
                warn!(interface, error = %e, "Failed to encode dual-stack notification");
                report.publish_failures += 1;
                return;
            }
        };

        match self.appl_db.publish(&self.channel, &message).await {
            Ok(()) => report.published += 1,
            Err(e) => {
                warn!(interface, channel = %self.channel, error = %e, "Failed to publish dual-stack notification");
                report.publish_failures += 1;
            }
        }
    }
}
