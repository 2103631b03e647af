use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bounded::BoundedVec;
use crate::error::{PulseError, PulseResult};
use crate::models::{AgentConfig, AgentStatus, AiAgent, ConversationEntry};
use crate::reactive::{Action, Atom, Derived};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub agents: Vec<AiAgent>,
    pub selected_agent_id: Option<String>,
    pub conversation: BoundedVec<ConversationEntry>,
    pub processing: bool,
}

impl AgentState {
    pub fn new(conversation_cap: usize) -> Self {
        Self {
            agents: Vec::new(),
            selected_agent_id: None,
            conversation: BoundedVec::new(conversation_cap),
            processing: false,
        }
    }

    pub fn agent(&self, id: &str) -> Option<&AiAgent> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn selected(&self) -> Option<&AiAgent> {
        self.selected_agent_id
            .as_deref()
            .and_then(|id| self.agent(id))
    }

    fn with_agent(&self, id: &str, f: impl FnOnce(&mut AiAgent) -> bool) -> Option<AgentState> {
        let mut next = self.clone();
        let agent = next.agents.iter_mut().find(|a| a.id == id)?;
        if !f(agent) {
            return None;
        }
        Some(next)
    }

    pub fn reduce(&self, action: AgentAction) -> Option<AgentState> {
        match action {
            AgentAction::Register(agent) => {
                if self.agent(&agent.id).is_some() {
                    return None;
                }
                let mut next = self.clone();
                next.agents.push(agent);
                Some(next)
            }
            AgentAction::Remove(id) => {
                self.agent(&id)?;
                let mut next = self.clone();
                next.agents.retain(|a| a.id != id);
                if next.selected_agent_id.as_deref() == Some(id.as_str()) {
                    next.selected_agent_id = None;
                }
                Some(next)
            }
            AgentAction::Select(id) => {
                if id == self.selected_agent_id {
                    return None;
                }
                if let Some(ref id) = id {
                    self.agent(id)?;
                }
                Some(AgentState {
                    selected_agent_id: id,
                    ..self.clone()
                })
            }
            AgentAction::UpdateConfig { agent_id, config } => {
                self.with_agent(&agent_id, |agent| {
                    if agent.config == config {
                        return false;
                    }
                    agent.config = config;
                    true
                })
            }
            AgentAction::SetStatus { agent_id, status } => {
                let mut next = self.with_agent(&agent_id, |agent| {
                    if agent.status == status {
                        return false;
                    }
                    agent.status = status;
                    true
                })?;
                next.processing = next.agents.iter().any(|a| a.status == AgentStatus::Busy);
                Some(next)
            }
            AgentAction::RecordInteraction(entry) => {
                let mut next = self.with_agent(&entry.agent_id, |agent| {
                    agent.stats = agent
                        .stats
                        .record(entry.latency_ms, entry.tokens, entry.success);
                    true
                })?;
                next.conversation.push(entry);
                Some(next)
            }
            AgentAction::ClearConversation => {
                if self.conversation.is_empty() {
                    return None;
                }
                let mut next = self.clone();
                next.conversation.clear();
                Some(next)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum AgentAction {
    Register(AiAgent),
    Remove(String),
    Select(Option<String>),
    UpdateConfig { agent_id: String, config: AgentConfig },
    SetStatus { agent_id: String, status: AgentStatus },
    RecordInteraction(ConversationEntry),
    ClearConversation,
}

#[derive(Clone)]
pub struct AgentAtoms {
    pub state: Atom<AgentState>,
    pub dispatch: Action<AgentState, AgentAction>,
    pub selected_agent: Derived<Option<AiAgent>>,
    pub busy_agents: Derived<Vec<String>>,
    pub success_rate: Derived<f64>,
}

impl AgentAtoms {
    pub fn new(conversation_cap: usize) -> Self {
        let state = Atom::named("agent", AgentState::new(conversation_cap));
        let dispatch =
            Action::filter_map("agent", &state, |s: &AgentState, a: AgentAction| s.reduce(a));
        let selected_agent = Derived::map(&state, |s: &AgentState| s.selected().cloned());
        let busy_agents = Derived::map(&state, |s: &AgentState| {
            s.agents
                .iter()
                .filter(|a| a.status == AgentStatus::Busy)
                .map(|a| a.id.clone())
                .collect()
        });
        let success_rate = Derived::map(&state, |s: &AgentState| {
            let (ok, total) = s.agents.iter().fold((0u64, 0u64), |(ok, total), a| {
                (
                    ok + a.stats.successful_requests,
                    total + a.stats.total_requests,
                )
            });
            if total == 0 {
                1.0
            } else {
                ok as f64 / total as f64
            }
        });

        Self {
            state,
            dispatch,
            selected_agent,
            busy_agents,
            success_rate,
        }
    }

    pub fn snapshot(&self) -> AgentState {
        self.state.get()
    }

    pub fn register(&self, agent: AiAgent) -> String {
        let id = agent.id.clone();
        debug!(agent_id = %id, name = %agent.name, "registering agent");
        self.dispatch.dispatch(AgentAction::Register(agent));
        id
    }

    /// Removing an unknown or already removed agent is a no-op.
    pub fn remove(&self, agent_id: &str) -> bool {
        self.dispatch
            .dispatch(AgentAction::Remove(agent_id.to_string()))
    }

    pub fn select(&self, agent_id: Option<&str>) -> PulseResult<()> {
        if let Some(id) = agent_id {
            self.require(id)?;
        }
        self.dispatch
            .dispatch(AgentAction::Select(agent_id.map(str::to_string)));
        Ok(())
    }

    pub fn update_config(&self, agent_id: &str, config: AgentConfig) -> PulseResult<()> {
        self.require(agent_id)?;
        self.dispatch.dispatch(AgentAction::UpdateConfig {
            agent_id: agent_id.to_string(),
            config,
        });
        Ok(())
    }

    pub fn set_status(&self, agent_id: &str, status: AgentStatus) -> PulseResult<()> {
        self.require(agent_id)?;
        self.dispatch.dispatch(AgentAction::SetStatus {
            agent_id: agent_id.to_string(),
            status,
        });
        Ok(())
    }

    pub fn record_interaction(&self, entry: ConversationEntry) -> PulseResult<()> {
        let agent_id = entry.agent_id.clone();
        if self.dispatch.dispatch(AgentAction::RecordInteraction(entry)) {
            Ok(())
        } else {
            Err(PulseError::AgentNotFound(agent_id))
        }
    }

    pub fn clear_conversation(&self) {
        self.dispatch.dispatch(AgentAction::ClearConversation);
    }

    fn require(&self, agent_id: &str) -> PulseResult<()> {
        if self.state.with(|s| s.agent(agent_id).is_some()) {
            Ok(())
        } else {
            Err(PulseError::AgentNotFound(agent_id.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_select() {
        let agents = AgentAtoms::new(50);
        let id = agents.register(AiAgent::new("Scout", "claude-sonnet"));

        assert!(agents.selected_agent.get().is_none());
        agents.select(Some(&id)).unwrap();
        assert_eq!(agents.selected_agent.get().map(|a| a.name), Some("Scout".into()));

        assert!(agents.select(Some("ghost")).is_err());
    }

    #[test]
    fn test_conversation_keeps_last_entries() {
        let agents = AgentAtoms::new(50);
        let id = agents.register(AiAgent::new("Scout", "claude-sonnet"));

        for i in 0..75 {
            agents
                .record_interaction(ConversationEntry::new(&id, format!("q{i}"), "a", 100))
                .unwrap();
        }

        let state = agents.snapshot();
        assert_eq!(state.conversation.len(), 50);
        assert_eq!(state.conversation.oldest().unwrap().prompt, "q25");
        assert_eq!(state.agent(&id).unwrap().stats.total_requests, 75);
    }

    #[test]
    fn test_record_interaction_for_unknown_agent() {
        let agents = AgentAtoms::new(10);
        let err = agents
            .record_interaction(ConversationEntry::new("ghost", "q", "a", 1))
            .unwrap_err();
        assert!(matches!(err, PulseError::AgentNotFound(_)));
        assert!(agents.snapshot().conversation.is_empty());
    }

    #[test]
    fn test_busy_agents_and_processing_flag() {
        let agents = AgentAtoms::new(10);
        let a = agents.register(AiAgent::new("A", "m"));
        let b = agents.register(AiAgent::new("B", "m"));

        agents.set_status(&a, AgentStatus::Busy).unwrap();
        assert_eq!(agents.busy_agents.get(), vec![a.clone()]);
        assert!(agents.snapshot().processing);

        agents.set_status(&a, AgentStatus::Idle).unwrap();
        agents.set_status(&b, AgentStatus::Offline).unwrap();
        assert!(agents.busy_agents.get().is_empty());
        assert!(!agents.snapshot().processing);
    }

    #[test]
    fn test_success_rate_across_agents() {
        let agents = AgentAtoms::new(10);
        let a = agents.register(AiAgent::new("A", "m"));
        assert_eq!(agents.success_rate.get(), 1.0);

        agents
            .record_interaction(ConversationEntry::new(&a, "q", "a", 10))
            .unwrap();
        agents
            .record_interaction(ConversationEntry::new(&a, "q", "a", 10).failed())
            .unwrap();
        assert_eq!(agents.success_rate.get(), 0.5);
    }

    #[test]
    fn test_remove_clears_selection_and_is_idempotent() {
        let agents = AgentAtoms::new(10);
        let id = agents.register(AiAgent::new("A", "m"));
        agents.select(Some(&id)).unwrap();

        assert!(agents.remove(&id));
        assert!(!agents.remove(&id));
        assert!(agents.snapshot().selected_agent_id.is_none());
    }

    #[test]
    fn test_update_config() {
        let agents = AgentAtoms::new(10);
        let id = agents.register(AiAgent::new("A", "m"));
        let config = AgentConfig {
            temperature: 0.2,
            max_tokens: 1024,
            system_prompt: Some("Be brief.".into()),
        };
        agents.update_config(&id, config.clone()).unwrap();
        assert_eq!(agents.snapshot().agent(&id).unwrap().config, config);
    }
}
