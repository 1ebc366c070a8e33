//! The AI client capability

use async_trait::async_trait;

use crate::error::Result;
use crate::stream::Reply;
use crate::types::{ConversationInfo, HealthCheck, HistoryEntry, InitResult, RequestOptions};

/// A conversational backend the state coordinator can drive.
///
/// Only [`AiClient::send_message`] is mandatory. Implementations must return
/// `Err` for transport failures and non-success statuses; when
/// `options.stream` is set they should answer with [`Reply::Stream`].
#[async_trait]
pub trait AiClient: Send + Sync {
    /// Init handshake: the conversation to start on plus any known ones.
    ///
    /// The default starts a fresh conversation and reports no others.
    async fn init(&self) -> Result<InitResult> {
        Ok(InitResult {
            initial_conversation_id: uuid::Uuid::new_v4().to_string(),
            conversations: vec![],
        })
    }

    /// Send `message` to `conversation_id`
    async fn send_message(
        &self,
        conversation_id: &str,
        message: &str,
        options: &RequestOptions,
    ) -> Result<Reply>;

    /// Create a new conversation on the backend
    async fn create_new_conversation(&self) -> Result<ConversationInfo> {
        Ok(ConversationInfo::untitled())
    }

    /// Past exchanges of a conversation, oldest first
    async fn get_conversation_history(&self, conversation_id: &str) -> Result<Vec<HistoryEntry>> {
        tracing::debug!(
            conversation_id,
            "client has no history endpoint, returning empty history"
        );
        Ok(vec![])
    }

    /// Probe backend readiness and liveness
    async fn health_check(&self) -> Result<HealthCheck> {
        Ok(HealthCheck::healthy())
    }
}
