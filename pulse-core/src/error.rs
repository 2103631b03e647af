//! Error types for the Pulse core library.
//!
//! Rejected mutations leave state untouched. Failures while talking to
//! durable storage or loading configuration are reported through
//! [`PulseError`] and then surfaced to the user as bounded error records
//! (see [`crate::dashboard::Dashboard::report_error`]).
//!
//! # Error Codes Reference
//!
//! | Code Range | Category | Description |
//! |------------|----------|-------------|
//! | E1001-E1099 | Storage | Durable storage reads, writes and persisted blobs |
//! | E2002-E2099 | Config | Config file parsing and validation errors |
//! | E3001-E3099 | State | Unknown entities and rejected state transitions |
//! | E9002-E9099 | General | IO, serialization, and validation errors |

use std::fmt;
use thiserror::Error;
use tracing::{error, warn};

use crate::config::ConfigLoadError;

/// The main error type for the Pulse core library.
#[derive(Debug, Error)]
pub enum PulseError {
    // ========================================================================
    // Storage Errors (E1001-E1099)
    // ========================================================================
    #[error("[E1001] Failed to read '{key}' from storage: {message}")]
    StorageReadFailed { key: String, message: String },

    #[error("[E1002] Failed to write '{key}' to storage: {message}")]
    StorageWriteFailed { key: String, message: String },

    #[error("[E1004] Persisted state is invalid: {0}")]
    PersistedStateInvalid(String),

    #[error("[E1005] Persisted state version mismatch: expected {expected}, found {found}")]
    PersistedVersionMismatch { expected: u32, found: u32 },

    // ========================================================================
    // Configuration Errors (E2001-E2099)
    // ========================================================================
    #[error("[E2002] Invalid configuration value for {key}: {message}")]
    InvalidConfig { key: String, message: String },

    #[error("[E2003] Failed to parse configuration: {0}")]
    ConfigParseError(String),

    // ========================================================================
    // State Errors (E3001-E3099)
    // ========================================================================
    #[error("[E3001] Chat session not found: {0}")]
    SessionNotFound(String),

    #[error("[E3002] Agent not found: {0}")]
    AgentNotFound(String),

    #[error("[E3003] Invalid {entity} transition from {from} to {to}")]
    InvalidTransition {
        entity: String,
        from: String,
        to: String,
    },

    #[error("[E3004] No remote desktop session is active")]
    VncNotConnected,

    #[error("[E3005] Unknown feature flag: {0}")]
    UnknownFeatureFlag(String),

    #[error("[E3006] Invalid value '{value}' for setting '{key}'")]
    InvalidSetting { key: String, value: String },

    #[error("[E3007] No user is signed in")]
    NotSignedIn,

    // ========================================================================
    // General Errors (E9001-E9099)
    // ========================================================================
    #[error("[E9002] IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("[E9003] Serialization error: {0}")]
    SerializationError(String),

    #[error("[E9004] Validation error: {0}")]
    ValidationError(String),
}

pub type PulseResult<T> = Result<T, PulseError>;

impl From<serde_json::Error> for PulseError {
    fn from(err: serde_json::Error) -> Self {
        PulseError::SerializationError(err.to_string())
    }
}

impl From<ConfigLoadError> for PulseError {
    fn from(err: ConfigLoadError) -> Self {
        match err {
            ConfigLoadError::Config(e) => PulseError::ConfigParseError(e.to_string()),
            ConfigLoadError::MissingRequired(key) => PulseError::InvalidConfig {
                key,
                message: "value not found".to_string(),
            },
            ConfigLoadError::InvalidValue { key, message } => {
                PulseError::InvalidConfig { key, message }
            }
            ConfigLoadError::Io(e) => PulseError::IoError(e),
        }
    }
}

impl PulseError {
    pub fn storage_read(key: impl Into<String>, message: impl fmt::Display) -> Self {
        PulseError::StorageReadFailed {
            key: key.into(),
            message: message.to_string(),
        }
    }

    pub fn storage_write(key: impl Into<String>, message: impl fmt::Display) -> Self {
        PulseError::StorageWriteFailed {
            key: key.into(),
            message: message.to_string(),
        }
    }

    pub fn is_storage_error(&self) -> bool {
        matches!(
            self,
            PulseError::StorageReadFailed { .. }
                | PulseError::StorageWriteFailed { .. }
                | PulseError::PersistedStateInvalid(_)
                | PulseError::PersistedVersionMismatch { .. }
        )
    }

    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            PulseError::InvalidConfig { .. } | PulseError::ConfigParseError(_)
        )
    }

    pub fn is_state_error(&self) -> bool {
        matches!(
            self,
            PulseError::SessionNotFound(_)
                | PulseError::AgentNotFound(_)
                | PulseError::InvalidTransition { .. }
                | PulseError::VncNotConnected
                | PulseError::UnknownFeatureFlag(_)
                | PulseError::InvalidSetting { .. }
                | PulseError::NotSignedIn
        )
    }

    /// Errors that may go away if the same operation is attempted again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PulseError::IoError(e) if matches!(
                e.kind(),
                std::io::ErrorKind::Interrupted | std::io::ErrorKind::WouldBlock
            )
        )
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            PulseError::StorageReadFailed { .. } => "E1001",
            PulseError::StorageWriteFailed { .. } => "E1002",
            PulseError::PersistedStateInvalid(_) => "E1004",
            PulseError::PersistedVersionMismatch { .. } => "E1005",
            PulseError::InvalidConfig { .. } => "E2002",
            PulseError::ConfigParseError(_) => "E2003",
            PulseError::SessionNotFound(_) => "E3001",
            PulseError::AgentNotFound(_) => "E3002",
            PulseError::InvalidTransition { .. } => "E3003",
            PulseError::VncNotConnected => "E3004",
            PulseError::UnknownFeatureFlag(_) => "E3005",
            PulseError::InvalidSetting { .. } => "E3006",
            PulseError::NotSignedIn => "E3007",
            PulseError::IoError(_) => "E9002",
            PulseError::SerializationError(_) => "E9003",
            PulseError::ValidationError(_) => "E9004",
        }
    }

    pub fn user_suggestion(&self) -> Option<&'static str> {
        match self {
            PulseError::StorageReadFailed { .. } | PulseError::StorageWriteFailed { .. } => {
                Some("Check that the storage directory exists and is writable (see --storage-dir).")
            }
            PulseError::PersistedStateInvalid(_) | PulseError::PersistedVersionMismatch { .. } => {
                Some("Run 'pulse store clear' to discard the saved dashboard state.")
            }
            PulseError::InvalidConfig { .. } | PulseError::ConfigParseError(_) => {
                Some("Check pulse.toml or ~/.config/pulse/config.toml for typos.")
            }
            PulseError::UnknownFeatureFlag(_) => {
                Some("Run 'pulse flags list' to see the known feature flags.")
            }
            PulseError::InvalidSetting { .. } => {
                Some("Run 'pulse settings show' to see valid setting keys.")
            }
            PulseError::VncNotConnected => Some("Connect to a remote desktop first."),
            _ => None,
        }
    }

    pub fn log(&self) {
        if self.is_transient() {
            warn!(code = self.error_code(), error = %self, "Transient error");
        } else {
            error!(code = self.error_code(), error = %self, "Error");
        }
    }
}

/// Renders a [`PulseError`] for terminal output with an optional suggestion line.
pub struct CliErrorDisplay<'a> {
    error: &'a PulseError,
    show_suggestion: bool,
}

impl<'a> CliErrorDisplay<'a> {
    pub fn new(error: &'a PulseError) -> Self {
        Self {
            error,
            show_suggestion: true,
        }
    }

    pub fn without_suggestion(mut self) -> Self {
        self.show_suggestion = false;
        self
    }
}

impl<'a> fmt::Display for CliErrorDisplay<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.error)?;

        if self.show_suggestion {
            if let Some(suggestion) = self.error.user_suggestion() {
                writeln!(f)?;
                writeln!(f, "  Suggestion: {}", suggestion)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PulseError::storage_write("pulse-dashboard-store", "disk full");
        assert!(err.to_string().contains("E1002"));
        assert!(err.to_string().contains("pulse-dashboard-store"));

        let err = PulseError::AgentNotFound("agent-1".to_string());
        assert!(err.to_string().contains("E3002"));
    }

    #[test]
    fn test_error_categorization() {
        let storage = PulseError::storage_read("pulse-dashboard-store", "locked");
        assert!(storage.is_storage_error());
        assert!(!storage.is_config_error());
        assert!(!storage.is_state_error());

        let config = PulseError::ConfigParseError("expected a table".to_string());
        assert!(config.is_config_error());

        let state = PulseError::UnknownFeatureFlag("nope".to_string());
        assert!(state.is_state_error());
    }

    #[test]
    fn test_is_transient() {
        let interrupted = std::io::Error::new(std::io::ErrorKind::Interrupted, "signal");
        assert!(PulseError::IoError(interrupted).is_transient());
        assert!(!PulseError::VncNotConnected.is_transient());
        assert!(!PulseError::PersistedStateInvalid("bad".to_string()).is_transient());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(PulseError::storage_read("k", "x").error_code(), "E1001");
        assert_eq!(
            PulseError::PersistedVersionMismatch {
                expected: 1,
                found: 2
            }
            .error_code(),
            "E1005"
        );
        assert_eq!(
            PulseError::ConfigParseError("x".to_string()).error_code(),
            "E2003"
        );
        assert_eq!(
            PulseError::SessionNotFound("s".to_string()).error_code(),
            "E3001"
        );
        assert_eq!(
            PulseError::ValidationError("x".to_string()).error_code(),
            "E9004"
        );
    }

    #[test]
    fn test_user_suggestions() {
        assert!(PulseError::UnknownFeatureFlag("x".to_string())
            .user_suggestion()
            .is_some());
        assert!(PulseError::ValidationError("x".to_string())
            .user_suggestion()
            .is_none());
    }

    #[test]
    fn test_from_config_load_error() {
        let err: PulseError = ConfigLoadError::InvalidValue {
            key: "logging.level".to_string(),
            message: "unknown level".to_string(),
        }
        .into();
        assert_eq!(err.error_code(), "E2002");
        assert!(err.is_config_error());
        assert!(err.user_suggestion().is_some());

        let err: PulseError = ConfigLoadError::MissingRequired("storage.key".to_string()).into();
        assert!(matches!(err, PulseError::InvalidConfig { ref key, .. } if key == "storage.key"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PulseError = io_err.into();
        assert!(matches!(err, PulseError::IoError(_)));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{nope").unwrap_err();
        let err: PulseError = json_err.into();
        assert!(matches!(err, PulseError::SerializationError(_)));
    }

    #[test]
    fn test_cli_error_display() {
        let err = PulseError::UnknownFeatureFlag("dark_launch".to_string());
        let output = CliErrorDisplay::new(&err).to_string();
        assert!(output.contains("dark_launch"));
        assert!(output.contains("Suggestion"));

        let output = CliErrorDisplay::new(&err).without_suggestion().to_string();
        assert!(!output.contains("Suggestion"));
    }
}
