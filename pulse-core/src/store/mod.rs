//! The global dashboard store.
//!
//! A single [`Atom`] holds the whole [`DashboardState`]. Named actions clone
//! the current state into a draft, mutate it and commit the draft as the next
//! snapshot. After each commit the configured subset of fields is written to
//! the storage backend.

mod actions;
mod persist;
mod state;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub use persist::{
    FileStorage, MemoryStorage, PersistField, PersistedSnapshot, StorageBackend, PERSIST_VERSION,
};
pub use state::{
    AlertThresholds, Connectivity, DashboardState, DebugState, FeatureFlags, MetricAverages,
    PerformanceState, SecurityState, Settings, SettingsPatch, SocketState, DEFAULT_FLAGS,
    SETTING_KEYS,
};

use crate::config::{LimitsConfig, PulseConfig};
use crate::error::PulseResult;
use crate::models::{ErrorRecord, PerformanceMetric, Severity};
use crate::reactive::{Atom, Derived};

/// What [`Store::hydrate`] found in storage.
#[derive(Debug, Clone, PartialEq)]
pub enum HydrateOutcome {
    /// Nothing stored under the key.
    Empty,
    /// The persisted subset was restored.
    Restored,
    /// The blob was unreadable or from another version; defaults are kept.
    Discarded(String),
    /// Persistence is turned off in the configuration.
    Disabled,
}

#[derive(Debug, Clone)]
struct PersistOptions {
    key: String,
    enabled: bool,
    fields: Vec<PersistField>,
}

pub struct Store {
    state: Atom<DashboardState>,
    storage: Arc<dyn StorageBackend>,
    limits: LimitsConfig,
    persist: PersistOptions,
    last_persisted: Mutex<Option<Value>>,
    pub latest_metric: Derived<Option<PerformanceMetric>>,
    pub metric_averages: Derived<Option<MetricAverages>>,
    pub severity_counts: Derived<BTreeMap<Severity, usize>>,
}

impl Store {
    pub fn new(config: &PulseConfig, storage: Arc<dyn StorageBackend>) -> Self {
        let state = Atom::named("dashboard", DashboardState::new(&config.limits));
        let latest_metric =
            Derived::map(&state, |s: &DashboardState| s.performance.latest().cloned());
        let metric_averages =
            Derived::map(&state, |s: &DashboardState| s.performance.averages());
        let severity_counts =
            Derived::map(&state, |s: &DashboardState| s.security.count_by_severity());

        Self {
            state,
            storage,
            limits: config.limits.clone(),
            persist: PersistOptions {
                key: config.storage.key.clone(),
                enabled: config.persist.enabled,
                fields: config.persist.fields.clone(),
            },
            last_persisted: Mutex::new(None),
            latest_metric,
            metric_averages,
            severity_counts,
        }
    }

    /// Builds the store and restores the persisted subset.
    pub fn open(config: &PulseConfig, storage: Arc<dyn StorageBackend>) -> Self {
        let store = Self::new(config, storage);
        store.hydrate();
        store
    }

    /// Loads the persisted subset over the defaults. Any problem with the blob
    /// is logged and leaves the store at its defaults.
    pub fn hydrate(&self) -> HydrateOutcome {
        if !self.persist.enabled {
            return HydrateOutcome::Disabled;
        }

        let raw = match self.storage.get_item(&self.persist.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %self.persist.key, "no persisted dashboard state");
                return HydrateOutcome::Empty;
            }
            Err(e) => {
                warn!(key = %self.persist.key, error = %e, "failed to read persisted state");
                return HydrateOutcome::Discarded(e.to_string());
            }
        };

        let restored = PersistedSnapshot::parse(&raw).and_then(|snapshot| {
            snapshot.apply_to(DashboardState::new(&self.limits), &self.persist.fields)
        });

        match restored {
            Ok(mut state) => {
                state.apply_limits(&self.limits);
                self.remember_persisted(&state);
                self.state.set(state);
                info!(
                    key = %self.persist.key,
                    fields = ?self.persist.fields,
                    "restored persisted dashboard state"
                );
                HydrateOutcome::Restored
            }
            Err(e) => {
                warn!(
                    key = %self.persist.key,
                    code = e.error_code(),
                    error = %e,
                    "ignoring persisted dashboard state"
                );
                self.state.set(DashboardState::new(&self.limits));
                HydrateOutcome::Discarded(e.to_string())
            }
        }
    }

    pub fn snapshot(&self) -> DashboardState {
        self.state.get()
    }

    pub fn with<R>(&self, f: impl FnOnce(&DashboardState) -> R) -> R {
        self.state.with(f)
    }

    pub fn version(&self) -> u64 {
        self.state.version()
    }

    /// Runs `mutate` against a draft of the current state and commits it if
    /// anything changed. Returns whether a new snapshot was committed.
    pub fn commit(&self, name: &'static str, mutate: impl FnOnce(&mut DashboardState)) -> bool {
        let changed = self.commit_draft(name, mutate);
        if changed {
            self.persist();
        }
        changed
    }

    fn commit_draft(&self, name: &'static str, mutate: impl FnOnce(&mut DashboardState)) -> bool {
        let changed = self.state.update_if(|current| {
            let mut draft = current.clone();
            mutate(&mut draft);
            (draft != *current).then_some(draft)
        });
        debug!(action = name, changed, "store action");
        changed
    }

    /// Like [`Store::commit`], but the closure can reject the change.
    pub fn try_commit(
        &self,
        name: &'static str,
        mutate: impl FnOnce(&mut DashboardState) -> PulseResult<()>,
    ) -> PulseResult<bool> {
        let mut result = Ok(());
        let changed = self.commit_draft(name, |draft| {
            let mut attempt = draft.clone();
            match mutate(&mut attempt) {
                Ok(()) => *draft = attempt,
                Err(e) => result = Err(e),
            }
        });
        result?;
        if changed {
            self.persist();
        }
        Ok(changed)
    }

    pub fn select<R>(&self, f: impl Fn(&DashboardState) -> R + Send + Sync + 'static) -> Derived<R>
    where
        R: Clone + Send + Sync + 'static,
    {
        Derived::map(&self.state, f)
    }

    pub fn watch(&self) -> watch::Receiver<DashboardState> {
        self.state.watch()
    }

    pub fn atom(&self) -> &Atom<DashboardState> {
        &self.state
    }

    /// Restores every field to its default and persists the result.
    pub fn reset(&self) {
        let defaults = DashboardState::new(&self.limits);
        if self.state.update_if(|current| (*current != defaults).then(|| defaults.clone())) {
            info!("dashboard store reset");
            self.persist();
        }
    }

    /// Deletes the persisted blob. The in-memory state is untouched.
    pub fn clear_persisted(&self) -> PulseResult<()> {
        self.storage.remove_item(&self.persist.key)?;
        *self
            .last_persisted
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
        info!(key = %self.persist.key, "cleared persisted dashboard state");
        Ok(())
    }

    pub fn storage(&self) -> &Arc<dyn StorageBackend> {
        &self.storage
    }

    pub fn storage_key(&self) -> &str {
        &self.persist.key
    }

    pub fn persisted_fields(&self) -> &[PersistField] {
        &self.persist.fields
    }

    pub fn limits(&self) -> &LimitsConfig {
        &self.limits
    }

    /// Writes the persisted subset if it differs from the last write.
    /// Failures are recorded in `debug.errors` and never undo the commit.
    fn persist(&self) {
        if !self.persist.enabled {
            return;
        }
        if let Err(e) = self.try_persist() {
            e.log();
            let record = ErrorRecord::from_error(&e, "store.persist");
            self.commit_draft("record_persist_error", |draft| {
                draft.debug.errors.push(record);
            });
        }
    }

    // The lock is held across capture and write, so concurrent commits are
    // written in the order they captured state and the newest one lands last.
    fn try_persist(&self) -> PulseResult<()> {
        let mut last = self
            .last_persisted
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let snapshot = self.with(|s| PersistedSnapshot::capture(s, &self.persist.fields))?;
        let subset = Value::Object(snapshot.state.clone());
        if last.as_ref() == Some(&subset) {
            return Ok(());
        }
        self.storage
            .set_item(&self.persist.key, &snapshot.to_json()?)?;
        *last = Some(subset);
        Ok(())
    }

    fn remember_persisted(&self, state: &DashboardState) {
        if let Ok(snapshot) = PersistedSnapshot::capture(state, &self.persist.fields) {
            *self
                .last_persisted
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(Value::Object(snapshot.state));
        }
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("key", &self.persist.key)
            .field("storage", &self.storage.describe())
            .field("version", &self.state.version())
            .finish()
    }
}
