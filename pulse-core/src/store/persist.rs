//! Durable storage for the persisted subset of the dashboard store.
//!
//! The blob written under the store key looks like
//! `{"version": 1, "state": {"settings": {...}, "feature_flags": {...}}}`.
//! Only the fields named by the configured [`PersistField`]s are written, and
//! only those are read back.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::state::DashboardState;
use crate::error::{PulseError, PulseResult};

pub const PERSIST_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistField {
    Settings,
    FeatureFlags,
    Connectivity,
    DebugEnabled,
    SecurityEvents,
    Performance,
}

impl PersistField {
    pub const ALL: [PersistField; 6] = [
        PersistField::Settings,
        PersistField::FeatureFlags,
        PersistField::Connectivity,
        PersistField::DebugEnabled,
        PersistField::SecurityEvents,
        PersistField::Performance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PersistField::Settings => "settings",
            PersistField::FeatureFlags => "feature_flags",
            PersistField::Connectivity => "connectivity",
            PersistField::DebugEnabled => "debug_enabled",
            PersistField::SecurityEvents => "security_events",
            PersistField::Performance => "performance",
        }
    }

    fn extract(&self, state: &DashboardState) -> serde_json::Result<Value> {
        match self {
            PersistField::Settings => serde_json::to_value(&state.settings),
            PersistField::FeatureFlags => serde_json::to_value(&state.feature_flags),
            PersistField::Connectivity => serde_json::to_value(&state.connectivity),
            PersistField::DebugEnabled => Ok(Value::Bool(state.debug.enabled)),
            PersistField::SecurityEvents => serde_json::to_value(&state.security),
            PersistField::Performance => serde_json::to_value(&state.performance),
        }
    }

    fn restore(&self, state: &mut DashboardState, value: Value) -> serde_json::Result<()> {
        match self {
            PersistField::Settings => state.settings = serde_json::from_value(value)?,
            PersistField::FeatureFlags => state.feature_flags = serde_json::from_value(value)?,
            PersistField::Connectivity => state.connectivity = serde_json::from_value(value)?,
            PersistField::DebugEnabled => state.debug.enabled = serde_json::from_value(value)?,
            PersistField::SecurityEvents => state.security = serde_json::from_value(value)?,
            PersistField::Performance => state.performance = serde_json::from_value(value)?,
        }
        Ok(())
    }
}

impl std::fmt::Display for PersistField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSnapshot {
    pub version: u32,
    pub state: Map<String, Value>,
}

impl PersistedSnapshot {
    /// Selects the configured subset of `state`.
    pub fn capture(state: &DashboardState, fields: &[PersistField]) -> PulseResult<Self> {
        let mut subset = Map::new();
        for field in fields {
            subset.insert(field.as_str().to_string(), field.extract(state)?);
        }
        Ok(Self {
            version: PERSIST_VERSION,
            state: subset,
        })
    }

    pub fn to_json(&self) -> PulseResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn parse(raw: &str) -> PulseResult<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| PulseError::PersistedStateInvalid(e.to_string()))?;
        let found = value
            .get("version")
            .and_then(Value::as_u64)
            .ok_or_else(|| PulseError::PersistedStateInvalid("missing version".to_string()))?;
        if found != u64::from(PERSIST_VERSION) {
            return Err(PulseError::PersistedVersionMismatch {
                expected: PERSIST_VERSION,
                found: u32::try_from(found).unwrap_or(u32::MAX),
            });
        }
        serde_json::from_value(value).map_err(|e| PulseError::PersistedStateInvalid(e.to_string()))
    }

    /// Overlays the configured fields onto `base`. Fields present in the blob
    /// but not configured are ignored; configured fields missing from the blob
    /// keep their value in `base`.
    pub fn apply_to(
        &self,
        mut base: DashboardState,
        fields: &[PersistField],
    ) -> PulseResult<DashboardState> {
        for field in fields {
            if let Some(value) = self.state.get(field.as_str()) {
                field.restore(&mut base, value.clone()).map_err(|e| {
                    PulseError::PersistedStateInvalid(format!("{}: {}", field, e))
                })?;
            }
        }
        Ok(base)
    }
}

/// Key-value blob storage.
pub trait StorageBackend: Send + Sync {
    fn get_item(&self, key: &str) -> PulseResult<Option<String>>;

    fn set_item(&self, key: &str, value: &str) -> PulseResult<()>;

    /// Removing a missing key succeeds.
    fn remove_item(&self, key: &str) -> PulseResult<()>;

    fn describe(&self) -> String;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryStorage {
    fn get_item(&self, key: &str) -> PulseResult<Option<String>> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> PulseResult<()> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> PulseResult<()> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.remove(key);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// One `<key>.json` file per key inside `dir`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PulseResult<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(PulseError::ValidationError(format!(
                "invalid storage key '{}'",
                key
            )));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }

    fn write_atomic(&self, path: &Path, value: &str) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;

        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = self.dir.join(tmp_name);

        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(value.as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        fs::rename(&tmp_path, path)
    }
}

impl StorageBackend for FileStorage {
    fn get_item(&self, key: &str) -> PulseResult<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => Ok(None),
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PulseError::storage_read(key, e)),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> PulseResult<()> {
        let path = self.path_for(key)?;
        self.write_atomic(&path, value)
            .map_err(|e| PulseError::storage_write(key, e))?;
        debug!(path = %path.display(), bytes = value.len(), "persisted item");
        Ok(())
    }

    fn remove_item(&self, key: &str) -> PulseResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PulseError::storage_write(key, e)),
        }
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}
