use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::atoms::{AppAtoms, AtomsSummary};
use crate::config::PulseConfig;
use crate::effects;
use crate::error::PulseError;
use crate::models::{ErrorRecord, PerformanceMetric, Theme, Toast, ToastLevel};
use crate::store::{
    FileStorage, HydrateOutcome, MemoryStorage, MetricAverages, SocketState, StorageBackend,
    Store,
};

/// Serializable view of everything the demo page renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub atoms: AtomsSummary,
    pub theme: Theme,
    pub online: bool,
    pub socket: SocketState,
    pub latency_ms: Option<u64>,
    pub latest_metric: Option<PerformanceMetric>,
    pub averages: Option<MetricAverages>,
    pub open_alerts: usize,
    pub security_events: usize,
    pub flags: BTreeMap<String, bool>,
    pub debug_enabled: bool,
    pub errors: usize,
}

/// Local atoms plus the persisted store, bootstrapped from one configuration.
#[derive(Clone)]
pub struct Dashboard {
    pub atoms: AppAtoms,
    pub store: Arc<Store>,
}

impl Dashboard {
    pub fn new(config: &PulseConfig, storage: Arc<dyn StorageBackend>) -> Self {
        let atoms = AppAtoms::new(&config.limits, &config.toasts);
        let store = Arc::new(Store::new(config, storage));
        Self { atoms, store }
    }

    /// Builds the dashboard and restores persisted state.
    pub fn open(config: &PulseConfig, storage: Arc<dyn StorageBackend>) -> (Self, HydrateOutcome) {
        let dashboard = Self::new(config, storage);
        let outcome = dashboard.store.hydrate();
        info!(outcome = ?outcome, "dashboard opened");
        (dashboard, outcome)
    }

    /// File-backed storage in the configured directory, or in-memory storage
    /// when no directory can be resolved.
    pub fn storage_for(config: &PulseConfig) -> Arc<dyn StorageBackend> {
        match config.storage_dir() {
            Some(dir) => Arc::new(FileStorage::new(dir)),
            None => Arc::new(MemoryStorage::new()),
        }
    }

    /// Surfaces an error to the user: it lands in `ui.errors`, in
    /// `debug.errors`, and as an error toast.
    ///
    /// Must run inside a tokio runtime, since the toast schedules its own
    /// dismissal.
    pub fn report_error(&self, err: &PulseError, source: &str) -> ErrorRecord {
        err.log();
        let record = ErrorRecord::from_error(err, source);
        self.atoms.ui.push_error(record.clone());
        self.store.record_error(record.clone());

        let message = match err.user_suggestion() {
            Some(hint) => format!("{} {}", err, hint),
            None => err.to_string(),
        };
        let toast = self
            .atoms
            .ui
            .toast(ToastLevel::Error, message)
            .with_title(record.code.clone());
        effects::show_toast(&self.atoms.ui, toast);
        record
    }

    pub fn notify(&self, toast: Toast) -> String {
        effects::show_toast(&self.atoms.ui, toast).0
    }

    pub fn summary(&self) -> DashboardSummary {
        let state = self.store.snapshot();
        DashboardSummary {
            atoms: self.atoms.summary.get(),
            theme: state.settings.theme,
            online: state.connectivity.online,
            socket: state.connectivity.socket,
            latency_ms: state.connectivity.latency_ms,
            latest_metric: state.performance.latest().cloned(),
            averages: state.performance.averages(),
            open_alerts: state.performance.unacknowledged_alerts(),
            security_events: state.security.events.len(),
            flags: state
                .feature_flags
                .iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            debug_enabled: state.debug.enabled,
            errors: state.debug.errors.len(),
        }
    }
}
