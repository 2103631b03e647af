use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::store::PersistField;

/// Base URL of the dashboard backend. Named only; this crate never calls it.
pub const API_BASE_URL: &str = "http://localhost:8080/api";
/// WebSocket endpoint for live dashboard updates.
pub const WS_URL: &str = "ws://localhost:8080/ws";
/// Path of the remote desktop proxy relative to [`WS_URL`].
pub const VNC_WS_PATH: &str = "/vnc";
/// Path of the agent API relative to [`API_BASE_URL`].
pub const AGENT_API_PATH: &str = "/agents";

/// Storage key the dashboard store persists under.
pub const DEFAULT_STORAGE_KEY: &str = "pulse-dashboard-store";

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PulseConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub toasts: ToastConfig,
    #[serde(default)]
    pub persist: PersistConfig,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for file-backed storage. Empty means the platform data dir.
    #[serde(default)]
    pub dir: String,

    #[serde(default = "default_storage_key")]
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json_format: bool,
}

/// Capacities of every bounded list in the state layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_metrics_cap")]
    pub metrics: usize,

    #[serde(default = "default_alerts_cap")]
    pub alerts: usize,

    #[serde(default = "default_security_events_cap")]
    pub security_events: usize,

    #[serde(default = "default_debug_logs_cap")]
    pub debug_logs: usize,

    #[serde(default = "default_errors_cap")]
    pub debug_errors: usize,

    #[serde(default = "default_errors_cap")]
    pub ui_errors: usize,

    #[serde(default = "default_notifications_cap")]
    pub notifications: usize,

    #[serde(default = "default_conversation_cap")]
    pub conversation: usize,

    #[serde(default = "default_chat_messages_cap")]
    pub chat_messages: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToastConfig {
    #[serde(default = "default_toast_duration")]
    pub default_duration_ms: u64,

    #[serde(default = "default_max_visible")]
    pub max_visible: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_persist_fields")]
    pub fields: Vec<PersistField>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_ws_url")]
    pub ws_url: String,
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_metrics_cap() -> usize {
    100
}

fn default_alerts_cap() -> usize {
    20
}

fn default_security_events_cap() -> usize {
    100
}

fn default_debug_logs_cap() -> usize {
    200
}

fn default_errors_cap() -> usize {
    50
}

fn default_notifications_cap() -> usize {
    50
}

fn default_conversation_cap() -> usize {
    50
}

fn default_chat_messages_cap() -> usize {
    500
}

fn default_toast_duration() -> u64 {
    5000
}

fn default_max_visible() -> usize {
    5
}

fn default_true() -> bool {
    true
}

fn default_persist_fields() -> Vec<PersistField> {
    vec![PersistField::Settings, PersistField::FeatureFlags]
}

fn default_api_base_url() -> String {
    API_BASE_URL.to_string()
}

fn default_ws_url() -> String {
    WS_URL.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: String::new(),
            key: default_storage_key(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            metrics: default_metrics_cap(),
            alerts: default_alerts_cap(),
            security_events: default_security_events_cap(),
            debug_logs: default_debug_logs_cap(),
            debug_errors: default_errors_cap(),
            ui_errors: default_errors_cap(),
            notifications: default_notifications_cap(),
            conversation: default_conversation_cap(),
            chat_messages: default_chat_messages_cap(),
        }
    }
}

impl Default for ToastConfig {
    fn default() -> Self {
        Self {
            default_duration_ms: default_toast_duration(),
            max_visible: default_max_visible(),
        }
    }
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fields: default_persist_fields(),
        }
    }
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            ws_url: default_ws_url(),
        }
    }
}

impl PulseConfig {
    pub fn load() -> Result<Self, ConfigLoadError> {
        Self::load_from_paths(get_config_paths())
    }

    pub fn load_from_paths(paths: Vec<PathBuf>) -> Result<Self, ConfigLoadError> {
        load_dotenv_files();

        let mut builder = ConfigBuilder::builder();

        for path in paths {
            if path.exists() {
                builder = builder.add_source(File::from(path).required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("PULSE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut pulse_config: PulseConfig = builder.build()?.try_deserialize()?;

        if let Ok(dir) = std::env::var("PULSE_STORAGE_DIR") {
            pulse_config.storage.dir = dir;
        }

        if let Ok(level) = std::env::var("PULSE_LOG_LEVEL") {
            pulse_config.logging.level = level;
        } else if let Ok(level) = std::env::var("RUST_LOG") {
            pulse_config.logging.level = level;
        }

        pulse_config.validate()?;

        Ok(pulse_config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.storage.key.trim().is_empty() {
            return Err(ConfigLoadError::MissingRequired("storage.key".to_string()));
        }

        let caps = [
            ("limits.metrics", self.limits.metrics),
            ("limits.alerts", self.limits.alerts),
            ("limits.security_events", self.limits.security_events),
            ("limits.debug_logs", self.limits.debug_logs),
            ("limits.debug_errors", self.limits.debug_errors),
            ("limits.ui_errors", self.limits.ui_errors),
            ("limits.notifications", self.limits.notifications),
            ("limits.conversation", self.limits.conversation),
            ("limits.chat_messages", self.limits.chat_messages),
        ];
        for (key, cap) in caps {
            if cap == 0 {
                return Err(ConfigLoadError::InvalidValue {
                    key: key.to_string(),
                    message: "Must be greater than 0".to_string(),
                });
            }
        }

        if self.toasts.max_visible == 0 {
            return Err(ConfigLoadError::InvalidValue {
                key: "toasts.max_visible".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        let level_lower = self.logging.level.to_lowercase();
        if !valid_levels.contains(&level_lower.as_str()) && !level_lower.contains('=') {
            return Err(ConfigLoadError::InvalidValue {
                key: "logging.level".to_string(),
                message: format!(
                    "Invalid log level '{}'. Must be one of: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        Ok(())
    }

    /// Resolved directory for file-backed storage.
    pub fn storage_dir(&self) -> Option<PathBuf> {
        if self.storage.dir.is_empty() {
            get_data_dir()
        } else {
            Some(PathBuf::from(&self.storage.dir))
        }
    }

    pub fn log_level(&self) -> &str {
        &self.logging.level
    }
}

fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join("config").join("default.toml"));
        paths.push(cwd.join("config").join("local.toml"));
        paths.push(cwd.join("pulse.toml"));
    }

    if let Some(config_dir) = get_config_dir() {
        paths.push(config_dir.join("config.toml"));
    }

    paths
}

fn load_dotenv_files() {
    let mut paths = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(".env"));
        paths.push(cwd.join(".env.local"));
    }

    if let Some(config_dir) = get_config_dir() {
        paths.push(config_dir.join(".env"));
    }

    for path in paths {
        if path.exists() {
            let _ = dotenvy::from_path(&path);
        }
    }
}

pub fn get_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pulse"))
}

pub fn get_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("pulse"))
}

pub fn ensure_data_dir() -> Result<PathBuf, std::io::Error> {
    let data_dir = get_data_dir().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine data directory",
        )
    })?;

    if !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)?;
    }

    Ok(data_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = PulseConfig::default();

        assert_eq!(config.storage.key, "pulse-dashboard-store");
        assert!(config.storage.dir.is_empty());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.limits.metrics, 100);
        assert_eq!(config.limits.conversation, 50);
        assert_eq!(config.limits.debug_errors, 50);
        assert_eq!(config.toasts.default_duration_ms, 5000);
        assert!(config.persist.enabled);
        assert_eq!(
            config.persist.fields,
            vec![PersistField::Settings, PersistField::FeatureFlags]
        );
        assert_eq!(config.endpoints.api_base_url, API_BASE_URL);
    }

    #[test]
    fn test_validation_valid_config() {
        assert!(PulseConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validation_empty_storage_key() {
        let mut config = PulseConfig::default();
        config.storage.key = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_zero_cap() {
        let mut config = PulseConfig::default();
        config.limits.metrics = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("limits.metrics"));
    }

    #[test]
    fn test_validation_invalid_log_level() {
        let mut config = PulseConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "pulse_core=debug,warn".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("pulse.toml");
        std::fs::write(
            &path,
            r#"
[storage]
key = "custom-key"

[limits]
metrics = 10

[persist]
fields = ["settings", "connectivity"]
"#,
        )
        .unwrap();

        let config = PulseConfig::load_from_paths(vec![path]).unwrap();
        assert_eq!(config.storage.key, "custom-key");
        assert_eq!(config.limits.metrics, 10);
        assert_eq!(config.limits.alerts, 20);
        assert_eq!(
            config.persist.fields,
            vec![PersistField::Settings, PersistField::Connectivity]
        );
    }

    #[test]
    fn test_storage_dir_override() {
        let mut config = PulseConfig::default();
        config.storage.dir = "/tmp/pulse-state".to_string();
        assert_eq!(config.storage_dir(), Some(PathBuf::from("/tmp/pulse-state")));
    }
}
