//! Core types exchanged with an AI backend

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Title given to conversations the backend did not name
pub const DEFAULT_CONVERSATION_TITLE: &str = "New Conversation";

/// A complete (non-streamed) answer from the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Backend-assigned message identifier
    pub message_id: String,
    /// Answer text
    pub answer: String,
    /// Conversation the answer belongs to
    pub conversation_id: String,
    /// When the answer was produced
    pub created_at: DateTime<Utc>,
    /// Backend-specific extras (sources, token counts, tool calls, ...)
    #[serde(default)]
    pub additional_attributes: serde_json::Value,
}

impl MessageResponse {
    /// Create a response with no additional attributes
    pub fn new(
        message_id: impl Into<String>,
        answer: impl Into<String>,
        conversation_id: impl Into<String>,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            answer: answer.into(),
            conversation_id: conversation_id.into(),
            created_at: Utc::now(),
            additional_attributes: serde_json::Value::Null,
        }
    }

    /// Attach backend-specific attributes
    pub fn with_attributes(mut self, attributes: serde_json::Value) -> Self {
        self.additional_attributes = attributes;
        self
    }
}

/// One incremental fragment of a streamed answer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageChunk {
    /// Message identifier, if the backend reports one
    #[serde(default)]
    pub message_id: Option<String>,
    /// Conversation identifier, if the backend reports one
    #[serde(default)]
    pub conversation_id: Option<String>,
    /// Text appended by this chunk
    #[serde(default)]
    pub delta: String,
    /// Whether the backend marked this as the final chunk
    #[serde(default)]
    pub finished: bool,
}

impl MessageChunk {
    /// Create a text chunk
    pub fn text(delta: impl Into<String>) -> Self {
        Self {
            delta: delta.into(),
            ..Default::default()
        }
    }

    /// Set the message id
    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    /// Mark as the final chunk
    pub fn finish(mut self) -> Self {
        self.finished = true;
        self
    }
}

/// Conversation metadata as known by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationInfo {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub locked: Option<bool>,
}

impl ConversationInfo {
    /// Create metadata for a conversation with the given id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            locked: None,
        }
    }

    /// A fresh, unlocked conversation with a random id and the default title
    pub fn untitled() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: Some(DEFAULT_CONVERSATION_TITLE.to_string()),
            locked: Some(false),
        }
    }

    /// Set the title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the locked flag
    pub fn with_locked(mut self, locked: bool) -> Self {
        self.locked = Some(locked);
        self
    }
}

/// Result of the client's init handshake
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitResult {
    /// Conversation the UI should start on
    pub initial_conversation_id: String,
    /// Conversations the backend already knows about
    #[serde(default)]
    pub conversations: Vec<ConversationInfo>,
}

/// One past exchange: what the user asked and what the bot answered
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub message_id: String,
    pub input: String,
    pub answer: String,
}

/// Health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Outcome of a backend health probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: HealthStatus,
    pub ready: bool,
    pub alive: bool,
    #[serde(default)]
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl HealthCheck {
    /// A healthy, ready and alive report
    pub fn healthy() -> Self {
        Self {
            status: HealthStatus::Healthy,
            ready: true,
            alive: true,
            reason: None,
            timestamp: Utc::now(),
        }
    }

    /// An unhealthy report with a reason
    pub fn unhealthy(reason: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            ready: false,
            alive: false,
            reason: Some(reason.into()),
            timestamp: Utc::now(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

/// Per-request options passed to [`crate::AiClient::send_message`]
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Ask the backend for a chunk stream instead of a single response
    pub stream: bool,
    /// Extra headers for the backend request
    pub headers: HashMap<String, String>,
    /// Cancels the in-flight request when triggered
    pub cancel: Option<CancellationToken>,
}

impl RequestOptions {
    /// Options for a streamed request
    pub fn streaming() -> Self {
        Self {
            stream: true,
            ..Default::default()
        }
    }

    /// Add a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Attach a cancellation token
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}
