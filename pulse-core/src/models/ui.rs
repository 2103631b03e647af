use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::new_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl ToastLevel {
    pub fn icon(&self) -> &'static str {
        match self {
            ToastLevel::Info => "ℹ",
            ToastLevel::Success => "✓",
            ToastLevel::Warning => "⚠",
            ToastLevel::Error => "✗",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Toast {
    pub id: String,
    pub level: ToastLevel,
    pub title: Option<String>,
    pub message: String,
    /// `None` keeps the toast until it is dismissed explicitly.
    pub duration_ms: Option<u64>,
    pub created_at: DateTime<Utc>,
}

impl Toast {
    pub fn new(message: impl Into<String>, level: ToastLevel) -> Self {
        Self {
            id: new_id(),
            level,
            title: None,
            message: message.into(),
            duration_ms: Some(5000),
            created_at: Utc::now(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, ToastLevel::Info)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(message, ToastLevel::Success)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, ToastLevel::Warning)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, ToastLevel::Error)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn sticky(mut self) -> Self {
        self.duration_ms = None;
        self
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.duration_ms
            .map(|ms| self.created_at + Duration::milliseconds(ms as i64))
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|at| now >= at)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModalKind {
    Confirm,
    Form,
    Info,
    AgentSettings,
    VncConnect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modal {
    pub id: String,
    pub kind: ModalKind,
    pub title: String,
    pub payload: serde_json::Value,
    pub opened_at: DateTime<Utc>,
}

impl Modal {
    pub fn new(kind: ModalKind, title: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            kind,
            title: title.into(),
            payload: serde_json::Value::Null,
            opened_at: Utc::now(),
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub level: ToastLevel,
    pub title: String,
    pub body: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(level: ToastLevel, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            level,
            title: title.into(),
            body: body.into(),
            read: false,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toast_expiry() {
        let toast = Toast::info("saved").with_duration_ms(1000);
        let created = toast.created_at;

        assert!(!toast.is_expired(created));
        assert!(!toast.is_expired(created + Duration::milliseconds(999)));
        assert!(toast.is_expired(created + Duration::milliseconds(1000)));
    }

    #[test]
    fn test_sticky_toast_never_expires() {
        let toast = Toast::error("disconnected").sticky();
        assert!(toast.expires_at().is_none());
        assert!(!toast.is_expired(toast.created_at + Duration::days(365)));
    }

    #[test]
    fn test_toast_icons() {
        assert_eq!(ToastLevel::Success.icon(), "✓");
        assert_eq!(ToastLevel::Error.icon(), "✗");
    }
}
