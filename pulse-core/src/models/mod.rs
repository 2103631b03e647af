mod agent;
mod chat;
mod telemetry;
mod ui;
mod user;
mod vnc;

pub use agent::{
    AgentCapability, AgentConfig, AgentStats, AgentStatus, AiAgent, ConversationEntry,
};
pub use chat::{ChatMessage, ChatSession, ChatStatus, MessageRole, Participant, ParticipantKind};
pub use telemetry::{
    AlertKind, DebugLog, ErrorRecord, LogLevel, PerformanceAlert, PerformanceMetric,
    SecurityEvent, SecurityEventKind, Severity,
};
pub use ui::{Modal, ModalKind, Notification, Toast, ToastLevel};
pub use user::{Role, Theme, User, UserPreferences};
pub use vnc::{ConnectionState, StreamQuality, VncSession, Viewport};

/// Generates a new entity id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
