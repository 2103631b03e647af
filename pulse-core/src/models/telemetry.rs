use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::new_id;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetric {
    pub timestamp: DateTime<Utc>,
    pub cpu_percent: f32,
    pub memory_used_mb: u64,
    pub memory_total_mb: u64,
    pub latency_ms: u64,
    pub fps: f32,
}

impl PerformanceMetric {
    pub fn new(cpu_percent: f32, memory_used_mb: u64, memory_total_mb: u64) -> Self {
        Self {
            timestamp: Utc::now(),
            cpu_percent,
            memory_used_mb,
            memory_total_mb,
            latency_ms: 0,
            fps: 60.0,
        }
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_fps(mut self, fps: f32) -> Self {
        self.fps = fps;
        self
    }

    pub fn memory_percent(&self) -> f32 {
        if self.memory_total_mb > 0 {
            (self.memory_used_mb as f32 / self.memory_total_mb as f32) * 100.0
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Cpu,
    Memory,
    Latency,
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertKind::Cpu => write!(f, "cpu"),
            AlertKind::Memory => write!(f, "memory"),
            AlertKind::Latency => write!(f, "latency"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceAlert {
    pub id: String,
    pub kind: AlertKind,
    pub value: f64,
    pub threshold: f64,
    pub acknowledged: bool,
    pub created_at: DateTime<Utc>,
}

impl PerformanceAlert {
    pub fn new(kind: AlertKind, value: f64, threshold: f64) -> Self {
        Self {
            id: new_id(),
            kind,
            value,
            threshold,
            acknowledged: false,
            created_at: Utc::now(),
        }
    }

    pub fn message(&self) -> String {
        match self.kind {
            AlertKind::Cpu => format!("CPU at {:.1}% (threshold {:.0}%)", self.value, self.threshold),
            AlertKind::Memory => format!(
                "Memory at {:.1}% (threshold {:.0}%)",
                self.value, self.threshold
            ),
            AlertKind::Latency => format!(
                "Latency at {:.0}ms (threshold {:.0}ms)",
                self.value, self.threshold
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityEventKind {
    Login,
    Logout,
    FailedLogin,
    PermissionDenied,
    SuspiciousActivity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub id: String,
    pub kind: SecurityEventKind,
    pub severity: Severity,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl SecurityEvent {
    pub fn new(kind: SecurityEventKind, severity: Severity, description: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            kind,
            severity,
            description: description.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugLog {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub target: String,
    pub message: String,
}

impl DebugLog {
    pub fn new(level: LogLevel, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            target: target.into(),
            message: message.into(),
        }
    }
}

/// An error surfaced to the user instead of being propagated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub id: String,
    pub code: String,
    pub message: String,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: new_id(),
            code: code.into(),
            message: message.into(),
            source: source.into(),
            created_at: Utc::now(),
        }
    }

    pub fn from_error(err: &crate::error::PulseError, source: impl Into<String>) -> Self {
        Self::new(err.error_code(), err.to_string(), source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PulseError;

    #[test]
    fn test_memory_percent() {
        let metric = PerformanceMetric::new(10.0, 512, 2048);
        assert_eq!(metric.memory_percent(), 25.0);
        assert_eq!(PerformanceMetric::new(10.0, 512, 0).memory_percent(), 0.0);
    }

    #[test]
    fn test_alert_message() {
        let alert = PerformanceAlert::new(AlertKind::Latency, 812.0, 500.0);
        assert_eq!(alert.message(), "Latency at 812ms (threshold 500ms)");
        assert!(!alert.acknowledged);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::Low < Severity::Medium);
    }

    #[test]
    fn test_error_record_from_error() {
        let err = PulseError::VncNotConnected;
        let record = ErrorRecord::from_error(&err, "vnc");
        assert_eq!(record.code, "E3004");
        assert_eq!(record.source, "vnc");
        assert!(record.message.contains("remote desktop"));
    }
}
