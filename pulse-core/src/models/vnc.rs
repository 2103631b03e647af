use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::new_id;

pub const MIN_SCALE: f32 = 0.25;
pub const MAX_SCALE: f32 = 4.0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "reason")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error(String),
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Error(reason) => write!(f, "error: {}", reason),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StreamQuality {
    Low,
    #[default]
    Medium,
    High,
    Lossless,
}

impl StreamQuality {
    /// JPEG quality hint sent with the stream request.
    pub fn compression_level(&self) -> u8 {
        match self {
            StreamQuality::Low => 3,
            StreamQuality::Medium => 6,
            StreamQuality::High => 8,
            StreamQuality::Lossless => 9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub scale: f32,
    pub view_only: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            scale: 1.0,
            view_only: false,
        }
    }
}

impl Viewport {
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = if scale.is_finite() {
            scale.clamp(MIN_SCALE, MAX_SCALE)
        } else {
            1.0
        };
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VncSession {
    pub id: String,
    pub host: String,
    pub port: u16,
    pub state: ConnectionState,
    pub quality: StreamQuality,
    pub viewport: Viewport,
    pub frames_received: u64,
    pub connected_at: Option<DateTime<Utc>>,
}

impl VncSession {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            id: new_id(),
            host: host.into(),
            port,
            state: ConnectionState::Connecting,
            quality: StreamQuality::default(),
            viewport: Viewport::default(),
            frames_received: 0,
            connected_at: None,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}
