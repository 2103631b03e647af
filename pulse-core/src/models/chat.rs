use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::new_id;
use crate::bounded::BoundedVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantKind {
    Human,
    Agent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub name: String,
    pub kind: ParticipantKind,
}

impl Participant {
    pub fn human(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: ParticipantKind::Human,
        }
    }

    pub fn agent(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: ParticipantKind::Agent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Agent,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub session_id: String,
    pub sender: String,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

impl ChatMessage {
    pub fn new(
        session_id: impl Into<String>,
        sender: impl Into<String>,
        role: MessageRole,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: new_id(),
            session_id: session_id.into(),
            sender: sender.into(),
            role,
            content: content.into(),
            created_at: Utc::now(),
            // Messages the local user writes are read by definition.
            read: role == MessageRole::User,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatStatus {
    Active,
    Idle,
    Closed,
}

impl std::fmt::Display for ChatStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatStatus::Active => write!(f, "active"),
            ChatStatus::Idle => write!(f, "idle"),
            ChatStatus::Closed => write!(f, "closed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    pub participants: Vec<Participant>,
    pub messages: BoundedVec<ChatMessage>,
    pub status: ChatStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn new(title: impl Into<String>, participants: Vec<Participant>, max_messages: usize) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            title: title.into(),
            participants,
            messages: BoundedVec::new(max_messages),
            status: ChatStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn unread_count(&self) -> usize {
        self.messages.iter().filter(|m| !m.read).count()
    }

    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages.latest()
    }

    pub fn is_closed(&self) -> bool {
        self.status == ChatStatus::Closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages_start_read() {
        let msg = ChatMessage::new("s1", "u1", MessageRole::User, "hello");
        assert!(msg.read);

        let msg = ChatMessage::new("s1", "a1", MessageRole::Agent, "hi");
        assert!(!msg.read);
    }

    #[test]
    fn test_session_unread_count() {
        let mut session = ChatSession::new("Support", vec![Participant::human("u1", "Ada")], 10);
        let id = session.id.clone();
        session
            .messages
            .push(ChatMessage::new(&id, "a1", MessageRole::Agent, "one"));
        session
            .messages
            .push(ChatMessage::new(&id, "u1", MessageRole::User, "two"));
        session
            .messages
            .push(ChatMessage::new(&id, "a1", MessageRole::Agent, "three"));

        assert_eq!(session.unread_count(), 2);
        assert_eq!(session.last_message().map(|m| m.content.as_str()), Some("three"));
        assert_eq!(session.status, ChatStatus::Active);
    }
}
