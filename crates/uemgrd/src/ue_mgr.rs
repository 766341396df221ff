//! UeMgr - owner of the load, validate, resolve, apply pipeline

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use sonic_cfgmgr_common::{CfgMgr, CfgMgrResult, DbId, KeyValueStore, RedisStore};

use crate::capability::CapabilityDetector;
use crate::config_file::DatabaseConfig;
use crate::error::{Result, UeError, ValidationError};
use crate::loader::ConfigLoader;
use crate::resolver::resolve;
use crate::stats::StatsReader;
use crate::tables::{
    CFG_UE_TABLE_NAMES, STATE_UE_INTERFACE_STATS_V4_TABLE_NAME,
    STATE_UE_INTERFACE_STATS_V6_TABLE_NAME,
};
use crate::validator::{validate, validate_snapshot};
use crate::writer::{ApplyReport, StateWriter};

const STATE_TABLE_NAMES: [&str; 2] = [
    STATE_UE_INTERFACE_STATS_V4_TABLE_NAME,
    STATE_UE_INTERFACE_STATS_V6_TABLE_NAME,
];

/// The three databases the manager works against
#[derive(Clone)]
pub struct UeStores {
    pub config_db: Arc<dyn KeyValueStore>,
    pub appl_db: Arc<dyn KeyValueStore>,
    pub state_db: Arc<dyn KeyValueStore>,
}

impl UeStores {
    /// Connects to CONFIG_DB, APPL_DB and STATE_DB
    pub async fn connect(config: &DatabaseConfig) -> CfgMgrResult<Self> {
        let (config_db, appl_db, state_db) = tokio::try_join!(
            RedisStore::connect(DbId::ConfigDb, config.endpoint(DbId::ConfigDb)),
            RedisStore::connect(DbId::ApplDb, config.endpoint(DbId::ApplDb)),
            RedisStore::connect(DbId::StateDb, config.endpoint(DbId::StateDb)),
        )?;

        Ok(Self {
            config_db: Arc::new(config_db),
            appl_db: Arc::new(appl_db),
            state_db: Arc::new(state_db),
        })
    }
}

/// Everything one pipeline run reported
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Entities excluded by the validator
    pub validation_errors: Vec<ValidationError>,
    /// Entities dropped by the resolvers
    pub resolve_errors: Vec<UeError>,
    /// Writer outcome; empty when the run was cancelled
    pub apply: ApplyReport,
    /// The run stopped before any store mutation
    pub cancelled: bool,
}

impl RunReport {
    fn cancelled() -> Self {
        Self {
            cancelled: true,
            ..Default::default()
        }
    }

    /// All reported errors as [`UeError`]s
    pub fn errors(&self) -> Vec<UeError> {
        self.validation_errors
            .iter()
            .cloned()
            .map(UeError::from)
            .chain(self.resolve_errors.iter().cloned())
            .chain(self.apply.errors.iter().map(|e| e.error.clone()))
            .collect()
    }

    pub fn is_clean(&self) -> bool {
        self.validation_errors.is_empty() && self.resolve_errors.is_empty() && self.apply.is_clean()
    }
}

/// UeMgr manages Ultra Ethernet dual-stack configuration
///
/// Configuration flow:
/// 1. Load: UE_GLOBAL, UE_ADDRESS_FAMILY, UE_INTERFACE, UE_ECMP_CONFIG,
///    UE_RDMA_CONFIG from CONFIG_DB
/// 2. Validate: drop entities that break an invariant
/// 3. Resolve: global → address family → interface → ECMP → RDMA
/// 4. Apply: write APPL_DB records, notify per interface
///
/// Runs are serialized by `&mut self`.
pub struct UeMgr {
    loader: ConfigLoader,
    writer: StateWriter,
    detector: CapabilityDetector,
    stats: StatsReader,
    cancel: CancellationToken,
    run_count: u64,
    last_report: Option<RunReport>,
}

impl UeMgr {
    /// Creates a manager publishing notifications on `channel`
    pub fn new(stores: UeStores, channel: impl Into<String>) -> Self {
        Self {
            loader: ConfigLoader::new(stores.config_db.clone()),
            writer: StateWriter::new(stores.appl_db, channel),
            detector: CapabilityDetector::new(stores.config_db),
            stats: StatsReader::new(stores.state_db),
            cancel: CancellationToken::new(),
            run_count: 0,
            last_report: None,
        }
    }

    /// Uses `token` to abandon runs that have not started writing
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn capability_detector(&self) -> &CapabilityDetector {
        &self.detector
    }

    pub fn stats_reader(&self) -> &StatsReader {
        &self.stats
    }

    /// Number of runs that reached the writer
    pub fn run_count(&self) -> u64 {
        self.run_count
    }

    pub fn last_report(&self) -> Option<&RunReport> {
        self.last_report.as_ref()
    }

    /// Runs the pipeline once.
    ///
    /// Fails only when the snapshot cannot be loaded. Once the writer has
    /// started, the run completes even if cancellation is requested.
    #[instrument(skip(self), fields(run = self.run_count + 1))]
    pub async fn run(&mut self) -> Result<RunReport> {
        if self.cancel.is_cancelled() {
            return Ok(RunReport::cancelled());
        }

        let snapshot = self.loader.load().await?;
        let validation = validate_snapshot(&snapshot);
        let resolution = resolve(&validation.config);

        if self.cancel.is_cancelled() {
            info!("Run cancelled before apply, nothing written");
            return Ok(RunReport::cancelled());
        }

        let apply = self.writer.apply(&resolution.state).await;
        let report = RunReport {
            validation_errors: validation.errors,
            resolve_errors: resolution.errors,
            apply,
            cancelled: false,
        };

        self.run_count += 1;
        self.last_report = Some(report.clone());
        Ok(report)
    }

    /// Loads the current snapshot and returns its validation errors, without writing.
    pub async fn check(&self) -> Result<Vec<ValidationError>> {
        let snapshot = self.loader.load().await?;
        Ok(validate(&snapshot))
    }
}

#[async_trait]
impl CfgMgr for UeMgr {
    fn daemon_name(&self) -> &str {
        "uemgrd"
    }

    fn config_table_names(&self) -> &[&str] {
        &CFG_UE_TABLE_NAMES
    }

    fn state_table_names(&self) -> &[&str] {
        &STATE_TABLE_NAMES
    }

    async fn do_task(&mut self) {
        match self.run().await {
            Ok(report) if report.cancelled => {}
            Ok(report) if report.is_clean() => {
                info!(applied = report.apply.applied, "UE dual-stack config applied");
            }
            Ok(report) => {
                warn!(
                    applied = report.apply.applied,
                    invalid = report.validation_errors.len(),
                    dropped = report.resolve_errors.len(),
                    failed = report.apply.errors.len(),
                    publish_failures = report.apply.publish_failures,
                    "UE dual-stack config applied with errors"
                );
            }
            Err(e) => {
                error!(error = %e, "UE dual-stack config run aborted");
            }
        }
    }
}
