#![allow(
    clippy::derivable_impls,
    clippy::type_complexity,
    clippy::manual_range_contains,
    clippy::new_without_default
)]

pub mod atoms;
pub mod bounded;
pub mod config;
pub mod dashboard;
pub mod effects;
pub mod error;
pub mod metrics;
pub mod models;
pub mod reactive;
pub mod store;

pub use atoms::{
    AgentAction, AgentAtoms, AgentState, AppAtoms, AtomsSummary, ChatAction, ChatAtoms, ChatState,
    UiAction, UiAtoms, UiState, UserAction, UserAtoms, UserState, VncAction, VncAtoms, VncState,
};
pub use bounded::BoundedVec;
pub use config::{
    ensure_data_dir, get_config_dir, get_data_dir, ConfigLoadError, EndpointsConfig, LimitsConfig,
    LoggingConfig, PersistConfig, PulseConfig, StorageConfig, ToastConfig, AGENT_API_PATH,
    API_BASE_URL, DEFAULT_STORAGE_KEY, VNC_WS_PATH, WS_URL,
};
pub use dashboard::{Dashboard, DashboardSummary};
pub use effects::{schedule_toast_dismissal, show_toast, simulate_agent_reply, simulate_latency};
pub use error::{CliErrorDisplay, PulseError, PulseResult};
pub use metrics::{MetricsFeed, MetricsRecorder, MockMetrics, SystemSampler};
pub use models::{
    AgentCapability, AgentConfig, AgentStats, AgentStatus, AiAgent, AlertKind, ChatMessage,
    ChatSession, ChatStatus, ConnectionState, ConversationEntry, DebugLog, ErrorRecord, LogLevel,
    MessageRole, Modal, ModalKind, Notification, Participant, ParticipantKind, PerformanceAlert,
    PerformanceMetric, Role, SecurityEvent, SecurityEventKind, Severity, StreamQuality, Theme,
    Toast, ToastLevel, User, UserPreferences, Viewport, VncSession,
};
pub use reactive::{Action, Atom, Derived, Readable, Source, Subscription};
pub use store::{
    Connectivity, DashboardState, FeatureFlags, FileStorage, HydrateOutcome, MemoryStorage,
    MetricAverages, PersistField, PersistedSnapshot, SettingsPatch, Settings, SocketState,
    StorageBackend, Store,
};
