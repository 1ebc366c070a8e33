//! Streaming reply types and utilities

use std::fmt;
use std::pin::Pin;

use tokio_stream::Stream;

use crate::error::{Error, Result};
use crate::types::{MessageChunk, MessageResponse};

/// A finite, non-restartable stream of decoded chunks
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<MessageChunk>> + Send>>;

/// What a backend hands back for one sent message
pub enum Reply {
    /// The whole answer at once
    Complete(MessageResponse),
    /// The answer delivered incrementally
    Stream(ChunkStream),
}

impl Reply {
    pub fn is_stream(&self) -> bool {
        matches!(self, Reply::Stream(_))
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Complete(response) => f.debug_tuple("Complete").field(response).finish(),
            Reply::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Observer for a streamed answer.
///
/// Chunk-level UI updates belong here; the state coordinator only records the
/// final answer. All methods except `on_chunk` default to no-ops.
pub trait StreamingHandler: Send + Sync {
    /// Streaming started for `conversation_id`
    fn on_start(&self, _conversation_id: &str) {}

    /// A chunk arrived
    fn on_chunk(&self, chunk: &MessageChunk);

    /// The stream finished; `response` holds the accumulated answer
    fn on_complete(&self, _response: &MessageResponse) {}

    /// The stream failed
    fn on_error(&self, _error: &Error) {}

    /// The stream was cancelled or timed out
    fn on_abort(&self) {}
}

/// Accumulates streamed chunks into a single answer
#[derive(Debug, Default)]
pub struct AnswerBuilder {
    message_id: Option<String>,
    conversation_id: Option<String>,
    answer: String,
    chunks: usize,
    finished: bool,
}

impl AnswerBuilder {
    /// Create a new answer builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one chunk into the answer
    pub fn process_chunk(&mut self, chunk: &MessageChunk) {
        if self.message_id.is_none() {
            self.message_id = chunk.message_id.clone();
        }
        if self.conversation_id.is_none() {
            self.conversation_id = chunk.conversation_id.clone();
        }
        self.answer.push_str(&chunk.delta);
        self.chunks += 1;
        self.finished |= chunk.finished;
    }

    /// Answer text accumulated so far
    pub fn current_answer(&self) -> &str {
        &self.answer
    }

    /// Number of chunks processed
    pub fn chunk_count(&self) -> usize {
        self.chunks
    }

    /// Whether a chunk marked the stream as finished
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Build the final response.
    ///
    /// Falls back to `conversation_id` when no chunk named one, and to a
    /// random id when no chunk carried a message id.
    pub fn build(self, conversation_id: &str) -> MessageResponse {
        let message_id = self
            .message_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let conversation_id = self
            .conversation_id
            .unwrap_or_else(|| conversation_id.to_string());
        MessageResponse::new(message_id, self.answer, conversation_id)
    }
}
