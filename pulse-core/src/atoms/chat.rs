use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PulseError, PulseResult};
use crate::models::{ChatMessage, ChatSession, ChatStatus, MessageRole, Participant};
use crate::reactive::{Action, Atom, Derived};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatState {
    pub sessions: Vec<ChatSession>,
    pub active_session_id: Option<String>,
    pub draft: String,
    pub typing: bool,
    pub max_messages: usize,
}

impl ChatState {
    pub fn new(max_messages: usize) -> Self {
        Self {
            sessions: Vec::new(),
            active_session_id: None,
            draft: String::new(),
            typing: false,
            max_messages,
        }
    }

    pub fn session(&self, id: &str) -> Option<&ChatSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn active_session(&self) -> Option<&ChatSession> {
        self.active_session_id
            .as_deref()
            .and_then(|id| self.session(id))
    }

    pub fn total_unread(&self) -> usize {
        self.sessions.iter().map(ChatSession::unread_count).sum()
    }

    /// Pure transition function. `None` means the action changes nothing.
    pub fn reduce(&self, action: ChatAction) -> Option<ChatState> {
        match action {
            ChatAction::CreateSession(mut session) => {
                if self.session(&session.id).is_some() {
                    return None;
                }
                session.messages.set_capacity(self.max_messages);
                let mut next = self.clone();
                if next.active_session_id.is_none() {
                    next.active_session_id = Some(session.id.clone());
                }
                next.sessions.push(session);
                Some(next)
            }
            ChatAction::AddMessage(message) => {
                let mut next = self.clone();
                let session = next
                    .sessions
                    .iter_mut()
                    .find(|s| s.id == message.session_id)?;
                if session.is_closed() {
                    return None;
                }
                session.messages.push(message);
                session.status = ChatStatus::Active;
                session.updated_at = Utc::now();
                Some(next)
            }
            ChatAction::SetActiveSession(id) => {
                if id == self.active_session_id {
                    return None;
                }
                if let Some(ref id) = id {
                    self.session(id)?;
                }
                Some(ChatState {
                    active_session_id: id,
                    ..self.clone()
                })
            }
            ChatAction::SetStatus { session_id, status } => {
                let mut next = self.clone();
                let session = next.sessions.iter_mut().find(|s| s.id == session_id)?;
                if session.status == status {
                    return None;
                }
                session.status = status;
                session.updated_at = Utc::now();
                Some(next)
            }
            ChatAction::MarkRead(session_id) => {
                let session = self.session(&session_id)?;
                if session.unread_count() == 0 {
                    return None;
                }
                let mut next = self.clone();
                if let Some(session) = next.sessions.iter_mut().find(|s| s.id == session_id) {
                    for message in session.messages.iter_mut() {
                        message.read = true;
                    }
                }
                Some(next)
            }
            ChatAction::DeleteSession(session_id) => {
                self.session(&session_id)?;
                let mut next = self.clone();
                next.sessions.retain(|s| s.id != session_id);
                if next.active_session_id.as_deref() == Some(session_id.as_str()) {
                    next.active_session_id = next.sessions.first().map(|s| s.id.clone());
                }
                Some(next)
            }
            ChatAction::SetDraft(draft) => {
                if draft == self.draft {
                    return None;
                }
                Some(ChatState {
                    draft,
                    ..self.clone()
                })
            }
            ChatAction::SetTyping(typing) => {
                if typing == self.typing {
                    return None;
                }
                Some(ChatState {
                    typing,
                    ..self.clone()
                })
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum ChatAction {
    CreateSession(ChatSession),
    AddMessage(ChatMessage),
    SetActiveSession(Option<String>),
    SetStatus {
        session_id: String,
        status: ChatStatus,
    },
    MarkRead(String),
    DeleteSession(String),
    SetDraft(String),
    SetTyping(bool),
}

/// Chat slice: the state cell, its action cell and derived views.
#[derive(Clone)]
pub struct ChatAtoms {
    pub state: Atom<ChatState>,
    pub dispatch: Action<ChatState, ChatAction>,
    pub active_session: Derived<Option<ChatSession>>,
    pub unread_count: Derived<usize>,
}

impl ChatAtoms {
    pub fn new(max_messages: usize) -> Self {
        let state = Atom::named("chat", ChatState::new(max_messages));
        let dispatch =
            Action::filter_map("chat", &state, |s: &ChatState, a: ChatAction| s.reduce(a));
        let active_session =
            Derived::map(&state, |s: &ChatState| s.active_session().cloned());
        let unread_count = Derived::map(&state, ChatState::total_unread);

        Self {
            state,
            dispatch,
            active_session,
            unread_count,
        }
    }

    pub fn snapshot(&self) -> ChatState {
        self.state.get()
    }

    pub fn create_session(
        &self,
        title: impl Into<String>,
        participants: Vec<Participant>,
    ) -> String {
        let max = self.state.with(|s| s.max_messages);
        let session = ChatSession::new(title, participants, max);
        let id = session.id.clone();
        self.dispatch.dispatch(ChatAction::CreateSession(session));
        debug!(session_id = %id, "chat session created");
        id
    }

    pub fn send_message(
        &self,
        session_id: &str,
        sender: impl Into<String>,
        role: MessageRole,
        content: impl Into<String>,
    ) -> PulseResult<String> {
        let message = ChatMessage::new(session_id, sender, role, content);
        let id = message.id.clone();
        if self.dispatch.dispatch(ChatAction::AddMessage(message)) {
            return Ok(id);
        }
        match self.state.with(|s| s.session(session_id).map(|x| x.status)) {
            Some(status) => Err(PulseError::InvalidTransition {
                entity: "chat session".to_string(),
                from: status.to_string(),
                to: "message".to_string(),
            }),
            None => Err(PulseError::SessionNotFound(session_id.to_string())),
        }
    }

    pub fn set_active_session(&self, session_id: Option<&str>) -> PulseResult<()> {
        if let Some(id) = session_id {
            if self.state.with(|s| s.session(id).is_none()) {
                return Err(PulseError::SessionNotFound(id.to_string()));
            }
        }
        self.dispatch
            .dispatch(ChatAction::SetActiveSession(session_id.map(str::to_string)));
        Ok(())
    }

    /// Closed sessions are terminal.
    pub fn set_session_status(&self, session_id: &str, status: ChatStatus) -> PulseResult<()> {
        let current = self
            .state
            .with(|s| s.session(session_id).map(|x| x.status))
            .ok_or_else(|| PulseError::SessionNotFound(session_id.to_string()))?;
        if current == ChatStatus::Closed && status != ChatStatus::Closed {
            return Err(PulseError::InvalidTransition {
                entity: "chat session".to_string(),
                from: current.to_string(),
                to: status.to_string(),
            });
        }
        self.dispatch.dispatch(ChatAction::SetStatus {
            session_id: session_id.to_string(),
            status,
        });
        Ok(())
    }

    pub fn mark_session_read(&self, session_id: &str) -> bool {
        self.dispatch
            .dispatch(ChatAction::MarkRead(session_id.to_string()))
    }

    /// Removing an unknown or already removed session is a no-op.
    pub fn delete_session(&self, session_id: &str) -> bool {
        self.dispatch
            .dispatch(ChatAction::DeleteSession(session_id.to_string()))
    }

    pub fn set_draft(&self, draft: impl Into<String>) {
        self.dispatch.dispatch(ChatAction::SetDraft(draft.into()));
    }

    pub fn set_typing(&self, typing: bool) {
        self.dispatch.dispatch(ChatAction::SetTyping(typing));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat() -> ChatAtoms {
        ChatAtoms::new(3)
    }

    #[test]
    fn test_first_session_becomes_active() {
        let chat = chat();
        let first = chat.create_session("Ops", vec![]);
        let _second = chat.create_session("Dev", vec![]);

        assert_eq!(chat.snapshot().sessions.len(), 2);
        assert_eq!(chat.active_session.get().map(|s| s.id), Some(first));
    }

    #[test]
    fn test_send_message_to_unknown_session() {
        let chat = chat();
        let err = chat
            .send_message("missing", "u1", MessageRole::User, "hi")
            .unwrap_err();
        assert!(matches!(err, PulseError::SessionNotFound(_)));
    }

    #[test]
    fn test_message_history_is_bounded() {
        let chat = chat();
        let id = chat.create_session("Ops", vec![]);
        for i in 0..10 {
            chat.send_message(&id, "a1", MessageRole::Agent, format!("m{i}"))
                .unwrap();
        }

        let state = chat.snapshot();
        let session = state.session(&id).unwrap();
        assert_eq!(session.messages.len(), 3);
        assert_eq!(session.last_message().unwrap().content, "m9");
    }

    #[test]
    fn test_unread_count_derived() {
        let chat = chat();
        let id = chat.create_session("Ops", vec![]);
        chat.send_message(&id, "a1", MessageRole::Agent, "one").unwrap();
        chat.send_message(&id, "u1", MessageRole::User, "two").unwrap();
        assert_eq!(chat.unread_count.get(), 1);

        assert!(chat.mark_session_read(&id));
        assert_eq!(chat.unread_count.get(), 0);
        assert!(!chat.mark_session_read(&id));
    }

    #[test]
    fn test_closed_session_is_terminal() {
        let chat = chat();
        let id = chat.create_session("Ops", vec![]);
        chat.set_session_status(&id, ChatStatus::Closed).unwrap();

        assert!(chat.set_session_status(&id, ChatStatus::Active).is_err());
        let err = chat
            .send_message(&id, "u1", MessageRole::User, "late")
            .unwrap_err();
        assert!(matches!(err, PulseError::InvalidTransition { .. }));
    }

    #[test]
    fn test_delete_session_is_idempotent() {
        let chat = chat();
        let first = chat.create_session("Ops", vec![]);
        let second = chat.create_session("Dev", vec![]);

        assert!(chat.delete_session(&first));
        let after_once = chat.snapshot();
        assert!(!chat.delete_session(&first));
        assert_eq!(chat.snapshot(), after_once);
        assert_eq!(after_once.active_session_id, Some(second));
    }

    #[test]
    fn test_set_active_session_validates_id() {
        let chat = chat();
        assert!(chat.set_active_session(Some("nope")).is_err());
        chat.set_active_session(None).unwrap();
        assert!(chat.active_session.get().is_none());
    }

    #[test]
    fn test_draft_and_typing() {
        let chat = chat();
        chat.set_draft("hel");
        chat.set_typing(true);
        let state = chat.snapshot();
        assert_eq!(state.draft, "hel");
        assert!(state.typing);

        let version = chat.state.version();
        chat.set_typing(true);
        assert_eq!(chat.state.version(), version);
    }
}
