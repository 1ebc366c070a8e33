//! Test doubles for driving the state coordinator without a backend

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use wisp_client::{
    AiClient, ChunkStream, ConversationInfo, Error as ClientError, HistoryEntry, InitResult,
    MessageChunk, MessageResponse, Reply, RequestOptions, Result as ClientResult,
    StreamingHandler,
};

use crate::events::{EventBus, EventKind, StateEvent};

/// What the scripted client does for one `send_message` call.
pub(crate) enum Scripted {
    /// Answer with a complete response
    Answer(String),
    /// Fail with this error
    Fail(ClientError),
    /// Stream these chunks, then end
    Chunks(Vec<ClientResult<MessageChunk>>),
    /// Never resolve
    Hang,
    /// Resolve with whatever arrives on the channel
    Wait(oneshot::Receiver<ClientResult<String>>),
}

/// An `AiClient` that replays a queue of scripted replies.
///
/// With an empty queue every send is answered with `"done"`.
#[derive(Default)]
pub(crate) struct ScriptedClient {
    replies: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<(String, String, bool)>>,
    history: Mutex<HashMap<String, Vec<HistoryEntry>>>,
    init: Mutex<Option<InitResult>>,
    counter: AtomicUsize,
    history_fetches: AtomicUsize,
}

impl ScriptedClient {
    pub(crate) fn new(replies: Vec<Scripted>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        })
    }

    /// Every `(conversation_id, message, stream)` the client was asked to send
    pub(crate) fn calls(&self) -> Vec<(String, String, bool)> {
        self.calls.lock().clone()
    }

    pub(crate) fn set_history(&self, conversation_id: &str, entries: Vec<HistoryEntry>) {
        self.history
            .lock()
            .insert(conversation_id.to_string(), entries);
    }

    pub(crate) fn history_fetches(&self) -> usize {
        self.history_fetches.load(Ordering::Relaxed)
    }

    pub(crate) fn set_init(&self, result: InitResult) {
        *self.init.lock() = Some(result);
    }

    fn complete(&self, conversation_id: &str, answer: String) -> Reply {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        Reply::Complete(MessageResponse::new(format!("bot-{n}"), answer, conversation_id))
    }
}

#[async_trait]
impl AiClient for ScriptedClient {
    async fn init(&self) -> ClientResult<InitResult> {
        let scripted = self.init.lock().clone();
        Ok(scripted.unwrap_or_else(|| InitResult {
            initial_conversation_id: "initial".to_string(),
            conversations: vec![],
        }))
    }

    async fn send_message(
        &self,
        conversation_id: &str,
        message: &str,
        options: &RequestOptions,
    ) -> ClientResult<Reply> {
        self.calls
            .lock()
            .push((conversation_id.to_string(), message.to_string(), options.stream));
        let next = self.replies.lock().pop_front();
        match next {
            None => Ok(self.complete(conversation_id, "done".to_string())),
            Some(Scripted::Answer(answer)) => Ok(self.complete(conversation_id, answer)),
            Some(Scripted::Fail(err)) => Err(err),
            Some(Scripted::Chunks(chunks)) => {
                let stream: ChunkStream = Box::pin(async_stream::stream! {
                    for chunk in chunks {
                        tokio::task::yield_now().await;
                        yield chunk;
                    }
                });
                Ok(Reply::Stream(stream))
            }
            Some(Scripted::Hang) => std::future::pending().await,
            Some(Scripted::Wait(rx)) => {
                let answer = rx
                    .await
                    .map_err(|_| ClientError::network("test sender dropped"))??;
                Ok(self.complete(conversation_id, answer))
            }
        }
    }

    async fn create_new_conversation(&self) -> ClientResult<ConversationInfo> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(ConversationInfo::new(format!("conv-{n}")).with_title("New Conversation"))
    }

    async fn get_conversation_history(
        &self,
        conversation_id: &str,
    ) -> ClientResult<Vec<HistoryEntry>> {
        self.history_fetches.fetch_add(1, Ordering::Relaxed);
        tokio::task::yield_now().await;
        Ok(self
            .history
            .lock()
            .get(conversation_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Streaming handler that records every callback as a string.
#[derive(Default)]
pub(crate) struct RecordingHandler {
    pub(crate) log: Mutex<Vec<String>>,
}

impl StreamingHandler for RecordingHandler {
    fn on_start(&self, conversation_id: &str) {
        self.log.lock().push(format!("start:{conversation_id}"));
    }

    fn on_chunk(&self, chunk: &MessageChunk) {
        self.log.lock().push(format!("chunk:{}", chunk.delta));
    }

    fn on_complete(&self, response: &MessageResponse) {
        self.log.lock().push(format!("complete:{}", response.answer));
    }

    fn on_error(&self, error: &ClientError) {
        self.log.lock().push(format!("error:{error}"));
    }

    fn on_abort(&self) {
        self.log.lock().push("abort".to_string());
    }
}

/// Subscribe to every channel and collect events in delivery order.
pub(crate) fn record_events(bus: &EventBus) -> Arc<Mutex<Vec<StateEvent>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    for kind in EventKind::ALL {
        let log = Arc::clone(&log);
        let _ = bus.subscribe(kind, move |e| log.lock().push(e.clone()));
    }
    log
}

pub(crate) fn in_progress(value: bool) -> StateEvent {
    StateEvent::InProgress { in_progress: value }
}

pub(crate) fn message_event(conversation_id: &str) -> StateEvent {
    StateEvent::Message {
        conversation_id: conversation_id.to_string(),
    }
}

pub(crate) fn active_event(conversation_id: &str) -> StateEvent {
    StateEvent::ActiveConversation {
        conversation_id: Some(conversation_id.to_string()),
    }
}
