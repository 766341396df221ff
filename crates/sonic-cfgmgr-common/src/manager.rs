//! Manager trait, database identities and field-value helpers.

use async_trait::async_trait;

/// The SONiC Redis databases a cfgmgr daemon touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DbId {
    /// Operator configuration, read by the managers
    ConfigDb,
    /// Derived state consumed by the data-plane agents
    ApplDb,
    /// Operational state and counters
    StateDb,
}

impl DbId {
    pub fn name(&self) -> &'static str {
        match self {
            DbId::ConfigDb => "CONFIG_DB",
            DbId::ApplDb => "APPL_DB",
            DbId::StateDb => "STATE_DB",
        }
    }

    /// Redis database number in a stock SONiC database_config.json
    pub fn id(&self) -> u32 {
        match self {
            DbId::ApplDb => 0,
            DbId::ConfigDb => 4,
            DbId::StateDb => 6,
        }
    }

    /// Separator between table name and record key.
    ///
    /// APPL_DB keys are `TABLE:key`; CONFIG_DB and STATE_DB keys are `TABLE|key`.
    pub fn separator(&self) -> char {
        match self {
            DbId::ApplDb => ':',
            DbId::ConfigDb | DbId::StateDb => '|',
        }
    }
}

/// Connection defaults used when a daemon has no config file.
pub mod defaults {
    pub const REDIS_HOST: &str = "127.0.0.1";
    pub const REDIS_PORT: u16 = 6379;
}

/// A configuration manager driven by a daemon loop.
///
/// The loop owns the manager and calls [`CfgMgr::do_task`] after changes to
/// any of [`CfgMgr::config_table_names`]. Holding `&mut self` for the whole
/// call keeps runs from overlapping.
///
/// ```ignore
/// #[async_trait]
/// impl CfgMgr for UeMgr {
///     fn daemon_name(&self) -> &str { "uemgrd" }
///     fn config_table_names(&self) -> &[&str] { &CFG_UE_TABLE_NAMES }
///     async fn do_task(&mut self) { self.run().await; }
/// }
/// ```
#[async_trait]
pub trait CfgMgr: Send + Sync {
    /// Name used in log records
    fn daemon_name(&self) -> &str;

    /// CONFIG_DB tables whose changes trigger [`CfgMgr::do_task`]
    fn config_table_names(&self) -> &[&str];

    /// STATE_DB tables the manager reads, if any
    fn state_table_names(&self) -> &[&str] {
        &[]
    }

    /// Reconciles the managed tables. Errors are logged by the manager.
    async fn do_task(&mut self);
}

/// One `(field, value)` pair of a Redis hash
pub type FieldValue = (String, String);

/// The fields of one record, in store order
pub type FieldValues = Vec<FieldValue>;

/// Lookups over [`FieldValues`]
pub trait FieldValuesExt {
    /// Value of `field`; a repeated field resolves to its last value.
    fn get_field(&self, field: &str) -> Option<&str>;

    fn get_field_or<'a>(&'a self, field: &str, default: &'a str) -> &'a str;

    fn has_field(&self, field: &str) -> bool;
}

impl FieldValuesExt for [FieldValue] {
    fn get_field(&self, field: &str) -> Option<&str> {
        self.iter()
            .rfind(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
    }

    fn get_field_or<'a>(&'a self, field: &str, default: &'a str) -> &'a str {
        self.get_field(field).unwrap_or(default)
    }

    fn has_field(&self, field: &str) -> bool {
        self.get_field(field).is_some()
    }
}

/// `field_values! { "enable" => "true", "max_paths" => 4 }`
#[macro_export]
macro_rules! field_values {
    ($($field:expr => $value:expr),* $(,)?) => {
        vec![
            $(($field.to_string(), $value.to_string()),)*
        ]
    };
}
