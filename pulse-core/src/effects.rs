//! Fire-and-forget asynchronous effects.
//!
//! Each effect runs on the tokio runtime and finishes with at most one atomic
//! update to a cell. Effects are never cancelled: a pending toast dismissal
//! always fires, and dismissing a toast that is already gone changes nothing.

use std::ops::Range;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::atoms::{AgentAtoms, UiAtoms};
use crate::error::{PulseError, PulseResult};
use crate::models::{AgentStatus, ConversationEntry, Toast};

pub fn schedule_toast_dismissal(ui: &UiAtoms, toast_id: String, after: Duration) -> JoinHandle<()> {
    let ui = ui.clone();
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        let removed = ui.remove_toast(&toast_id);
        debug!(toast_id = %toast_id, removed, "toast dismissal fired");
    })
}

/// Adds `toast` and, unless it is sticky, schedules its dismissal.
pub fn show_toast(ui: &UiAtoms, toast: Toast) -> (String, Option<JoinHandle<()>>) {
    let duration = toast.duration_ms.map(Duration::from_millis);
    let id = ui.add_toast(toast);
    let handle = duration.map(|after| schedule_toast_dismissal(ui, id.clone(), after));
    (id, handle)
}

/// Waits for a duration picked deterministically from `range` (milliseconds)
/// to stand in for a backend round trip. Returns the delay used.
pub async fn simulate_latency(range: Range<u64>) -> Duration {
    let span = range.end.saturating_sub(range.start).max(1);
    let jitter = u64::from(Utc::now().timestamp_subsec_millis()) % span;
    let delay = Duration::from_millis(range.start + jitter);
    tokio::time::sleep(delay).await;
    delay
}

/// Marks the agent busy, waits `delay`, records a canned reply and puts the
/// agent back to idle.
pub async fn simulate_agent_reply(
    agents: &AgentAtoms,
    agent_id: &str,
    prompt: impl Into<String>,
    delay: Duration,
) -> PulseResult<ConversationEntry> {
    let prompt = prompt.into();
    let agent = agents
        .state
        .with(|s| s.agent(agent_id).cloned())
        .ok_or_else(|| PulseError::AgentNotFound(agent_id.to_string()))?;
    if agent.status == AgentStatus::Offline {
        return Err(PulseError::InvalidTransition {
            entity: "agent".to_string(),
            from: agent.status.to_string(),
            to: AgentStatus::Busy.to_string(),
        });
    }

    agents.set_status(agent_id, AgentStatus::Busy)?;
    tokio::time::sleep(delay).await;

    let response = format!("{} ({}) received: {}", agent.name, agent.model, prompt);
    let entry = ConversationEntry::new(agent_id, prompt, response, delay.as_millis() as u64);

    let recorded = agents.record_interaction(entry.clone());
    // The agent may have been removed while we waited.
    if let Err(ref e) = recorded {
        warn!(agent_id, error = %e, "agent reply dropped");
    } else {
        agents.set_status(agent_id, AgentStatus::Idle)?;
    }
    recorded.map(|()| entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AiAgent;

    #[tokio::test(start_paused = true)]
    async fn test_toast_dismissed_after_duration() {
        let ui = UiAtoms::new(10, 10, 5);
        let (id, handle) = show_toast(&ui, Toast::success("saved").with_duration_ms(3000));

        tokio::time::sleep(Duration::from_millis(2999)).await;
        assert_eq!(ui.snapshot().toasts.len(), 1);

        handle.unwrap().await.unwrap();
        assert!(ui.snapshot().toasts.iter().all(|t| t.id != id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sticky_toast_has_no_timer() {
        let ui = UiAtoms::new(10, 10, 5);
        let (_, handle) = show_toast(&ui, Toast::error("offline").sticky());
        assert!(handle.is_none());
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(ui.snapshot().toasts.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismissal_of_removed_toast_is_noop() {
        let ui = UiAtoms::new(10, 10, 5);
        let (id, handle) = show_toast(&ui, Toast::info("hi").with_duration_ms(100));
        assert!(ui.remove_toast(&id));
        let version = ui.state.version();

        handle.unwrap().await.unwrap();
        assert_eq!(ui.state.version(), version);
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulate_latency_stays_in_range() {
        let delay = simulate_latency(100..200).await;
        assert!(delay >= Duration::from_millis(100));
        assert!(delay < Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_agent_reply_round_trip() {
        let agents = AgentAtoms::new(10);
        let id = agents.register(AiAgent::new("Scout", "claude-sonnet"));

        let task = {
            let agents = agents.clone();
            let id = id.clone();
            tokio::spawn(async move {
                simulate_agent_reply(&agents, &id, "status?", Duration::from_millis(500)).await
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(agents.busy_agents.get(), vec![id.clone()]);

        let entry = task.await.unwrap().unwrap();
        assert_eq!(entry.prompt, "status?");
        assert!(agents.busy_agents.get().is_empty());
        assert_eq!(agents.snapshot().conversation.len(), 1);
    }

    #[tokio::test]
    async fn test_agent_reply_for_offline_agent() {
        let agents = AgentAtoms::new(10);
        let id = agents.register(AiAgent::new("Scout", "m"));
        agents.set_status(&id, AgentStatus::Offline).unwrap();

        let err = simulate_agent_reply(&agents, &id, "hi", Duration::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, PulseError::InvalidTransition { .. }));
    }
}
