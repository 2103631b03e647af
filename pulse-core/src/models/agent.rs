use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::new_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentCapability {
    Chat,
    CodeGeneration,
    WebSearch,
    ComputerUse,
    Vision,
}

impl std::fmt::Display for AgentCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentCapability::Chat => write!(f, "chat"),
            AgentCapability::CodeGeneration => write!(f, "code_generation"),
            AgentCapability::WebSearch => write!(f, "web_search"),
            AgentCapability::ComputerUse => write!(f, "computer_use"),
            AgentCapability::Vision => write!(f, "vision"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    #[default]
    Idle,
    Busy,
    Offline,
    Error,
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentStatus::Idle => write!(f, "idle"),
            AgentStatus::Busy => write!(f, "busy"),
            AgentStatus::Offline => write!(f, "offline"),
            AgentStatus::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub temperature: f32,
    pub max_tokens: u32,
    pub system_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 4096,
            system_prompt: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub avg_response_ms: f64,
    pub total_tokens: u64,
}

impl AgentStats {
    /// Folds one interaction into the running totals.
    pub fn record(&self, latency_ms: u64, tokens: u64, success: bool) -> Self {
        let total_requests = self.total_requests.saturating_add(1);
        let avg_response_ms = self.avg_response_ms
            + (latency_ms as f64 - self.avg_response_ms) / total_requests as f64;

        Self {
            total_requests,
            successful_requests: self.successful_requests.saturating_add(u64::from(success)),
            failed_requests: self.failed_requests.saturating_add(u64::from(!success)),
            avg_response_ms,
            total_tokens: self.total_tokens.saturating_add(tokens),
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 1.0;
        }
        self.successful_requests as f64 / self.total_requests as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiAgent {
    pub id: String,
    pub name: String,
    pub model: String,
    pub capabilities: Vec<AgentCapability>,
    pub config: AgentConfig,
    pub status: AgentStatus,
    pub stats: AgentStats,
    pub created_at: DateTime<Utc>,
}

impl AiAgent {
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            model: model.into(),
            capabilities: vec![AgentCapability::Chat],
            config: AgentConfig::default(),
            status: AgentStatus::Idle,
            stats: AgentStats::default(),
            created_at: Utc::now(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: Vec<AgentCapability>) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn can(&self, capability: AgentCapability) -> bool {
        self.capabilities.contains(&capability)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub id: String,
    pub agent_id: String,
    pub prompt: String,
    pub response: String,
    pub latency_ms: u64,
    pub tokens: u64,
    pub success: bool,
    pub created_at: DateTime<Utc>,
}

impl ConversationEntry {
    pub fn new(
        agent_id: impl Into<String>,
        prompt: impl Into<String>,
        response: impl Into<String>,
        latency_ms: u64,
    ) -> Self {
        let response = response.into();
        Self {
            id: new_id(),
            agent_id: agent_id.into(),
            prompt: prompt.into(),
            tokens: response.split_whitespace().count() as u64,
            response,
            latency_ms,
            success: true,
            created_at: Utc::now(),
        }
    }

    pub fn failed(mut self) -> Self {
        self.success = false;
        self
    }
}
