//! Local reactive state, one atom per slice.
//!
//! Each slice pairs a state atom with an action cell whose reducer is a pure
//! `State::reduce`, plus derived views over that state.

mod agent;
mod chat;
mod ui;
mod user;
mod vnc;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use agent::{AgentAction, AgentAtoms, AgentState};
pub use chat::{ChatAction, ChatAtoms, ChatState};
pub use ui::{UiAction, UiAtoms, UiState, DEFAULT_VIEW};
pub use user::{UserAction, UserAtoms, UserState};
pub use vnc::{VncAction, VncAtoms, VncState};

use crate::config::{LimitsConfig, ToastConfig};
use crate::models::{AgentStatus, ChatStatus};
use crate::reactive::{Derived, Source};

/// Counts shown in the dashboard header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AtomsSummary {
    pub user: Option<String>,
    pub active_chat_sessions: usize,
    pub unread_messages: usize,
    pub vnc_connected: bool,
    pub agents: usize,
    pub busy_agents: usize,
    pub unread_notifications: usize,
    pub open_modals: usize,
    pub toasts: usize,
}

#[derive(Clone)]
pub struct AppAtoms {
    pub chat: ChatAtoms,
    pub vnc: VncAtoms,
    pub agent: AgentAtoms,
    pub ui: UiAtoms,
    pub user: UserAtoms,
    pub summary: Derived<AtomsSummary>,
}

impl AppAtoms {
    pub fn new(limits: &LimitsConfig, toasts: &ToastConfig) -> Self {
        let chat = ChatAtoms::new(limits.chat_messages);
        let vnc = VncAtoms::new();
        let agent = AgentAtoms::new(limits.conversation);
        let ui = UiAtoms::new(limits.notifications, limits.ui_errors, toasts.max_visible)
            .with_default_toast_ms(toasts.default_duration_ms);
        let user = UserAtoms::new();

        let summary = {
            let sources: Vec<Arc<dyn Source>> = vec![
                Arc::new(chat.state.clone()),
                Arc::new(vnc.state.clone()),
                Arc::new(agent.state.clone()),
                Arc::new(ui.state.clone()),
                Arc::new(user.state.clone()),
            ];
            let (chat, vnc, agent, ui, user) = (
                chat.state.clone(),
                vnc.state.clone(),
                agent.state.clone(),
                ui.state.clone(),
                user.state.clone(),
            );
            Derived::from_sources(sources, move || {
                let mut summary = AtomsSummary {
                    user: user.with(|u| u.current_user.as_ref().map(|x| x.name.clone())),
                    vnc_connected: vnc
                        .with(|v| v.session.as_ref().is_some_and(|s| s.is_connected())),
                    ..AtomsSummary::default()
                };
                chat.with(|c| {
                    summary.active_chat_sessions = c
                        .sessions
                        .iter()
                        .filter(|s| s.status == ChatStatus::Active)
                        .count();
                    summary.unread_messages = c.total_unread();
                });
                agent.with(|a| {
                    summary.agents = a.agents.len();
                    summary.busy_agents = a
                        .agents
                        .iter()
                        .filter(|x| x.status == AgentStatus::Busy)
                        .count();
                });
                ui.with(|u| {
                    summary.unread_notifications = u.unread_notifications();
                    summary.open_modals = u.modals.len();
                    summary.toasts = u.toasts.len();
                });
                summary
            })
        };

        Self {
            chat,
            vnc,
            agent,
            ui,
            user,
            summary,
        }
    }
}

impl Default for AppAtoms {
    fn default() -> Self {
        Self::new(&LimitsConfig::default(), &ToastConfig::default())
    }
}
