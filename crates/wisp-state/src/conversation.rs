//! Conversation state: messages, conversations and the client state snapshot

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use wisp_client::{ConversationInfo, HistoryEntry};

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

/// One entry in a conversation's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Locally generated, unique within the conversation
    pub id: String,
    pub answer: String,
    pub role: Role,
}

impl Message {
    fn new(role: Role, answer: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            answer: answer.into(),
            role,
        }
    }

    /// Create a user message
    pub fn user(answer: impl Into<String>) -> Self {
        Self::new(Role::User, answer)
    }

    /// Create a bot message
    pub fn bot(answer: impl Into<String>) -> Self {
        Self::new(Role::Bot, answer)
    }

    /// Expand backend history into user/bot message pairs
    pub fn from_history(entries: &[HistoryEntry]) -> Vec<Message> {
        entries
            .iter()
            .flat_map(|entry| [Message::user(&entry.input), Message::bot(&entry.answer)])
            .collect()
    }
}

/// A named, ordered thread of messages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Append-only, chronological
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub locked: Option<bool>,
}

impl Conversation {
    /// An empty conversation
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_locked(mut self, locked: bool) -> Self {
        self.locked = Some(locked);
        self
    }

    pub fn is_locked(&self) -> bool {
        self.locked.unwrap_or(false)
    }
}

impl From<ConversationInfo> for Conversation {
    fn from(info: ConversationInfo) -> Self {
        Self {
            id: info.id,
            title: info.title,
            messages: vec![],
            locked: info.locked,
        }
    }
}

/// Everything a UI observes: conversations and the active pointer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientState {
    pub active_conversation_id: Option<String>,
    pub conversations: HashMap<String, Conversation>,
}

impl ClientState {
    /// The active conversation, if one is set and present
    pub fn active_conversation(&self) -> Option<&Conversation> {
        self.active_conversation_id
            .as_ref()
            .and_then(|id| self.conversations.get(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_ids_are_unique() {
        let a = Message::user("Hello");
        let b = Message::user("Hello");
        assert!(!a.id.is_empty());
        assert_ne!(a.id, b.id);
        assert_eq!(a.role, Role::User);
        assert_eq!(Message::bot("Hi").role, Role::Bot);
    }

    #[test]
    fn test_history_expands_to_pairs() {
        let entries = vec![
            HistoryEntry {
                message_id: "m1".into(),
                input: "q1".into(),
                answer: "a1".into(),
            },
            HistoryEntry {
                message_id: "m2".into(),
                input: "q2".into(),
                answer: "a2".into(),
            },
        ];
        let messages = Message::from_history(&entries);
        let flat: Vec<(Role, &str)> = messages.iter().map(|m| (m.role, m.answer.as_str())).collect();
        assert_eq!(
            flat,
            vec![
                (Role::User, "q1"),
                (Role::Bot, "a1"),
                (Role::User, "q2"),
                (Role::Bot, "a2"),
            ]
        );
    }

    #[test]
    fn test_conversation_from_info() {
        let conv: Conversation = ConversationInfo::new("c1").with_title("Test").with_locked(true).into();
        assert_eq!(conv.id, "c1");
        assert_eq!(conv.title.as_deref(), Some("Test"));
        assert!(conv.is_locked());
        assert!(conv.messages.is_empty());
        assert!(!Conversation::new("c2").is_locked());
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_value(Message::bot("Hi")).unwrap();
        assert_eq!(json["role"], "bot");
        assert_eq!(json["answer"], "Hi");
    }

    #[test]
    fn test_active_conversation_lookup() {
        let mut state = ClientState::default();
        assert!(state.active_conversation().is_none());
        state.conversations.insert("c1".into(), Conversation::new("c1"));
        state.active_conversation_id = Some("c1".into());
        assert_eq!(state.active_conversation().map(|c| c.id.as_str()), Some("c1"));
    }
}
