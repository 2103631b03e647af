use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bounded::BoundedVec;
use crate::config::LimitsConfig;
use crate::error::{PulseError, PulseResult};
use crate::models::{
    DebugLog, ErrorRecord, PerformanceAlert, PerformanceMetric, SecurityEvent, Severity, Theme,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    pub cpu_percent: f32,
    pub memory_percent: f32,
    pub latency_ms: u64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            cpu_percent: 80.0,
            memory_percent: 85.0,
            latency_ms: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub theme: Theme,
    pub language: String,
    pub timezone: String,
    pub notifications_enabled: bool,
    pub sound_enabled: bool,
    pub auto_save: bool,
    pub refresh_interval_secs: u64,
    pub compact_mode: bool,
    pub thresholds: AlertThresholds,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::System,
            language: "en".to_string(),
            timezone: "UTC".to_string(),
            notifications_enabled: true,
            sound_enabled: false,
            auto_save: true,
            refresh_interval_secs: 30,
            compact_mode: false,
            thresholds: AlertThresholds::default(),
        }
    }
}

pub const SETTING_KEYS: &[&str] = &[
    "theme",
    "language",
    "timezone",
    "notifications_enabled",
    "sound_enabled",
    "auto_save",
    "refresh_interval_secs",
    "compact_mode",
    "thresholds.cpu_percent",
    "thresholds.memory_percent",
    "thresholds.latency_ms",
];

impl Settings {
    /// Applies a single `key = value` pair given as text. Invalid input
    /// leaves the settings unchanged.
    pub fn set_field(&mut self, key: &str, value: &str) -> PulseResult<()> {
        let mut next = self.clone();
        next.assign(key, value)?;
        next.validate()?;
        *self = next;
        Ok(())
    }

    fn assign(&mut self, key: &str, value: &str) -> PulseResult<()> {
        let invalid = || PulseError::InvalidSetting {
            key: key.to_string(),
            value: value.to_string(),
        };
        match key {
            "theme" => self.theme = value.parse().map_err(|_| invalid())?,
            "language" => self.language = value.trim().to_string(),
            "timezone" => self.timezone = value.trim().to_string(),
            "notifications_enabled" => {
                self.notifications_enabled = parse_bool(value).ok_or_else(invalid)?
            }
            "sound_enabled" => self.sound_enabled = parse_bool(value).ok_or_else(invalid)?,
            "auto_save" => self.auto_save = parse_bool(value).ok_or_else(invalid)?,
            "compact_mode" => self.compact_mode = parse_bool(value).ok_or_else(invalid)?,
            "refresh_interval_secs" => {
                self.refresh_interval_secs = value.parse().map_err(|_| invalid())?
            }
            "thresholds.cpu_percent" => {
                self.thresholds.cpu_percent = value.parse().map_err(|_| invalid())?
            }
            "thresholds.memory_percent" => {
                self.thresholds.memory_percent = value.parse().map_err(|_| invalid())?
            }
            "thresholds.latency_ms" => {
                self.thresholds.latency_ms = value.parse().map_err(|_| invalid())?
            }
            _ => return Err(invalid()),
        }
        Ok(())
    }

    /// Checks every field against its allowed range. The first offending
    /// field is reported by its key.
    pub fn validate(&self) -> PulseResult<()> {
        let reject = |key: &str, value: String| {
            Err(PulseError::InvalidSetting {
                key: key.to_string(),
                value,
            })
        };
        if self.language.trim().is_empty() {
            return reject("language", self.language.clone());
        }
        if self.timezone.trim().is_empty() {
            return reject("timezone", self.timezone.clone());
        }
        if self.refresh_interval_secs == 0 {
            return reject("refresh_interval_secs", "0".to_string());
        }
        if !is_percent(self.thresholds.cpu_percent) {
            return reject(
                "thresholds.cpu_percent",
                self.thresholds.cpu_percent.to_string(),
            );
        }
        if !is_percent(self.thresholds.memory_percent) {
            return reject(
                "thresholds.memory_percent",
                self.thresholds.memory_percent.to_string(),
            );
        }
        Ok(())
    }

    /// Flattened `(key, value)` pairs in [`SETTING_KEYS`] order.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("theme", self.theme.to_string()),
            ("language", self.language.clone()),
            ("timezone", self.timezone.clone()),
            ("notifications_enabled", self.notifications_enabled.to_string()),
            ("sound_enabled", self.sound_enabled.to_string()),
            ("auto_save", self.auto_save.to_string()),
            ("refresh_interval_secs", self.refresh_interval_secs.to_string()),
            ("compact_mode", self.compact_mode.to_string()),
            ("thresholds.cpu_percent", self.thresholds.cpu_percent.to_string()),
            (
                "thresholds.memory_percent",
                self.thresholds.memory_percent.to_string(),
            ),
            ("thresholds.latency_ms", self.thresholds.latency_ms.to_string()),
        ]
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}

// NaN fails the range check.
fn is_percent(value: f32) -> bool {
    (0.0..=100.0).contains(&value)
}

/// Partial settings update. Unset fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsPatch {
    pub theme: Option<Theme>,
    pub language: Option<String>,
    pub timezone: Option<String>,
    pub notifications_enabled: Option<bool>,
    pub sound_enabled: Option<bool>,
    pub auto_save: Option<bool>,
    pub refresh_interval_secs: Option<u64>,
    pub compact_mode: Option<bool>,
    pub thresholds: Option<AlertThresholds>,
}

impl SettingsPatch {
    /// Applies the patch only if the patched settings are valid; otherwise
    /// `settings` is left as it was.
    pub fn apply(self, settings: &mut Settings) -> PulseResult<()> {
        let mut next = settings.clone();
        self.merge_into(&mut next);
        next.validate()?;
        *settings = next;
        Ok(())
    }

    fn merge_into(self, settings: &mut Settings) {
        if let Some(theme) = self.theme {
            settings.theme = theme;
        }
        if let Some(language) = self.language {
            settings.language = language;
        }
        if let Some(timezone) = self.timezone {
            settings.timezone = timezone;
        }
        if let Some(v) = self.notifications_enabled {
            settings.notifications_enabled = v;
        }
        if let Some(v) = self.sound_enabled {
            settings.sound_enabled = v;
        }
        if let Some(v) = self.auto_save {
            settings.auto_save = v;
        }
        if let Some(v) = self.refresh_interval_secs {
            settings.refresh_interval_secs = v;
        }
        if let Some(v) = self.compact_mode {
            settings.compact_mode = v;
        }
        if let Some(thresholds) = self.thresholds {
            settings.thresholds = thresholds;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricAverages {
    pub cpu_percent: f32,
    pub memory_percent: f32,
    pub latency_ms: f64,
    pub fps: f32,
    pub samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceState {
    pub metrics: BoundedVec<PerformanceMetric>,
    pub alerts: BoundedVec<PerformanceAlert>,
}

impl PerformanceState {
    pub fn new(metrics_cap: usize, alerts_cap: usize) -> Self {
        Self {
            metrics: BoundedVec::new(metrics_cap),
            alerts: BoundedVec::new(alerts_cap),
        }
    }

    pub fn latest(&self) -> Option<&PerformanceMetric> {
        self.metrics.latest()
    }

    pub fn averages(&self) -> Option<MetricAverages> {
        let n = self.metrics.len();
        if n == 0 {
            return None;
        }
        let (cpu, mem, latency, fps) =
            self.metrics
                .iter()
                .fold((0.0f32, 0.0f32, 0u64, 0.0f32), |(c, m, l, f), x| {
                    (
                        c + x.cpu_percent,
                        m + x.memory_percent(),
                        l + x.latency_ms,
                        f + x.fps,
                    )
                });
        Some(MetricAverages {
            cpu_percent: cpu / n as f32,
            memory_percent: mem / n as f32,
            latency_ms: latency as f64 / n as f64,
            fps: fps / n as f32,
            samples: n,
        })
    }

    pub fn unacknowledged_alerts(&self) -> usize {
        self.alerts.iter().filter(|a| !a.acknowledged).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityState {
    pub events: BoundedVec<SecurityEvent>,
}

impl SecurityState {
    pub fn new(cap: usize) -> Self {
        Self {
            events: BoundedVec::new(cap),
        }
    }

    pub fn count_by_severity(&self) -> BTreeMap<Severity, usize> {
        let mut counts = BTreeMap::new();
        for event in self.events.iter() {
            *counts.entry(event.severity).or_insert(0) += 1;
        }
        counts
    }
}

pub const DEFAULT_FLAGS: &[(&str, bool)] = &[
    ("beta_dashboard", false),
    ("vnc_viewer", true),
    ("agent_streaming", true),
    ("debug_panel", false),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureFlags(BTreeMap<String, bool>);

impl FeatureFlags {
    pub fn is_enabled(&self, name: &str) -> bool {
        self.0.get(name).copied().unwrap_or(false)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Returns the previous value, if the flag existed.
    pub fn set(&mut self, name: impl Into<String>, enabled: bool) -> Option<bool> {
        self.0.insert(name.into(), enabled)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self(
            DEFAULT_FLAGS
                .iter()
                .map(|(name, enabled)| (name.to_string(), *enabled))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocketState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl std::fmt::Display for SocketState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SocketState::Disconnected => write!(f, "disconnected"),
            SocketState::Connecting => write!(f, "connecting"),
            SocketState::Connected => write!(f, "connected"),
            SocketState::Reconnecting => write!(f, "reconnecting"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Connectivity {
    pub online: bool,
    pub socket: SocketState,
    pub latency_ms: Option<u64>,
    pub last_connected_at: Option<DateTime<Utc>>,
    pub reconnect_attempts: u32,
}

impl Default for Connectivity {
    fn default() -> Self {
        Self {
            online: true,
            socket: SocketState::Disconnected,
            latency_ms: None,
            last_connected_at: None,
            reconnect_attempts: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugState {
    pub enabled: bool,
    pub logs: BoundedVec<DebugLog>,
    pub errors: BoundedVec<ErrorRecord>,
}

impl DebugState {
    pub fn new(logs_cap: usize, errors_cap: usize) -> Self {
        Self {
            enabled: false,
            logs: BoundedVec::new(logs_cap),
            errors: BoundedVec::new(errors_cap),
        }
    }
}

/// Everything the global store holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardState {
    pub settings: Settings,
    pub performance: PerformanceState,
    pub security: SecurityState,
    pub feature_flags: FeatureFlags,
    pub connectivity: Connectivity,
    pub debug: DebugState,
}

impl DashboardState {
    pub fn new(limits: &LimitsConfig) -> Self {
        Self {
            settings: Settings::default(),
            performance: PerformanceState::new(limits.metrics, limits.alerts),
            security: SecurityState::new(limits.security_events),
            feature_flags: FeatureFlags::default(),
            connectivity: Connectivity::default(),
            debug: DebugState::new(limits.debug_logs, limits.debug_errors),
        }
    }

    /// Re-applies configured capacities, e.g. after loading a snapshot written
    /// with different limits.
    pub fn apply_limits(&mut self, limits: &LimitsConfig) {
        self.performance.metrics.set_capacity(limits.metrics);
        self.performance.alerts.set_capacity(limits.alerts);
        self.security.events.set_capacity(limits.security_events);
        self.debug.logs.set_capacity(limits.debug_logs);
        self.debug.errors.set_capacity(limits.debug_errors);
    }
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new(&LimitsConfig::default())
    }
}
