//! One message exchange: `IDLE -> SENDING -> IDLE`
//!
//! Observable order for a successful send:
//! `InProgress(true)`, user `Message`, backend call, bot `Message`,
//! `InProgress(false)`. A failed exchange keeps the user message, appends no
//! bot message and still ends with `InProgress(false)`.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use wisp_client::{
    AiClient, AnswerBuilder, Error as ClientError, MessageResponse, Reply, RequestOptions,
    Result as ClientResult, StreamingHandler,
};

use crate::conversation::Message;
use crate::error::{Error, Result};
use crate::events::{EventBus, StateEvent};
use crate::gate::MessageGate;
use crate::store::ConversationStore;

/// Per-send options
#[derive(Clone, Default)]
pub struct SendOptions {
    /// Stream the reply; `None` uses the manager's configured default
    pub stream: Option<bool>,
    /// Receives chunk-level callbacks of a streamed reply
    pub handler: Option<Arc<dyn StreamingHandler>>,
    /// Extra headers forwarded to the client
    pub headers: HashMap<String, String>,
    /// Aborts the exchange when cancelled
    pub cancel: Option<CancellationToken>,
}

impl SendOptions {
    /// Stream the reply into `handler`
    pub fn streaming(handler: Arc<dyn StreamingHandler>) -> Self {
        Self {
            stream: Some(true),
            handler: Some(handler),
            ..Default::default()
        }
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = Some(stream);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

impl fmt::Debug for SendOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendOptions")
            .field("stream", &self.stream)
            .field("handler", &self.handler.is_some())
            .field("headers", &self.headers)
            .field("cancel", &self.cancel)
            .finish()
    }
}

/// Holds the gate for the duration of a send.
///
/// Dropping the permit frees the gate and, if `InProgress(true)` was
/// announced, emits `InProgress(false)`. This runs on every exit path,
/// including the send future being dropped mid-flight.
struct GatePermit<'a> {
    gate: &'a MessageGate,
    bus: &'a EventBus,
    announced: bool,
}

impl<'a> GatePermit<'a> {
    fn acquire(gate: &'a MessageGate, bus: &'a EventBus) -> Option<Self> {
        gate.try_acquire().then(|| Self {
            gate,
            bus,
            announced: false,
        })
    }

    fn announce(&mut self) {
        self.announced = true;
        self.bus.notify(&StateEvent::InProgress { in_progress: true });
    }
}

impl Drop for GatePermit<'_> {
    fn drop(&mut self) {
        self.gate.release();
        if self.announced {
            self.bus.notify(&StateEvent::InProgress { in_progress: false });
        }
    }
}

/// Orchestrates one exchange against the injected client
pub(crate) struct SendWorkflow<'a> {
    pub(crate) store: &'a ConversationStore,
    pub(crate) gate: &'a MessageGate,
    pub(crate) bus: &'a EventBus,
    pub(crate) client: &'a dyn AiClient,
    pub(crate) default_stream: bool,
    pub(crate) timeout: Option<Duration>,
}

impl SendWorkflow<'_> {
    /// Run the exchange.
    ///
    /// Returns the backend response for non-streamed replies and `None` for
    /// streamed ones. A send attempted while another is in flight fails with
    /// [`Error::AlreadyInProgress`] on its first poll, before any await.
    pub(crate) async fn run(
        self,
        text: &str,
        options: SendOptions,
    ) -> Result<Option<MessageResponse>> {
        let Some(mut permit) = GatePermit::acquire(self.gate, self.bus) else {
            tracing::warn!("send rejected, a message is already in progress");
            return Err(Error::AlreadyInProgress);
        };

        let conversation_id = self
            .store
            .active_conversation_id()
            .ok_or(Error::NoActiveConversation)?;
        if self
            .store
            .conversation(&conversation_id)
            .is_some_and(|c| c.is_locked())
        {
            return Err(Error::ConversationLocked(conversation_id));
        }

        permit.announce();
        self.store
            .append_message(&conversation_id, Message::user(text))?;

        let request = RequestOptions {
            stream: options.stream.unwrap_or(self.default_stream),
            headers: options.headers,
            cancel: options.cancel.clone(),
        };
        let handler = options.handler.as_deref();
        tracing::debug!(
            conversation_id = %conversation_id,
            stream = request.stream,
            "sending message"
        );

        let exchange = self.exchange(&conversation_id, text, &request, handler);
        let (answer, response) = match self.guard(options.cancel.as_ref(), exchange).await {
            Ok(done) => done,
            Err(err) => {
                tracing::debug!(conversation_id = %conversation_id, error = %err, "send failed");
                if request.stream {
                    if let Some(handler) = handler {
                        if err.is_abort() {
                            handler.on_abort();
                        } else {
                            handler.on_error(&err);
                        }
                    }
                }
                return Err(err.into());
            }
        };

        self.store
            .append_message(&conversation_id, Message::bot(answer))?;
        drop(permit);
        Ok(response)
    }

    /// Call the client and fold its reply into `(answer, response)`.
    async fn exchange(
        &self,
        conversation_id: &str,
        text: &str,
        request: &RequestOptions,
        handler: Option<&dyn StreamingHandler>,
    ) -> ClientResult<(String, Option<MessageResponse>)> {
        match self.client.send_message(conversation_id, text, request).await? {
            Reply::Complete(response) => Ok((response.answer.clone(), Some(response))),
            Reply::Stream(mut chunks) => {
                if let Some(handler) = handler {
                    handler.on_start(conversation_id);
                }
                let mut builder = AnswerBuilder::new();
                while let Some(chunk) = chunks.next().await {
                    let chunk = chunk?;
                    if let Some(handler) = handler {
                        handler.on_chunk(&chunk);
                    }
                    builder.process_chunk(&chunk);
                    if chunk.finished {
                        break;
                    }
                }
                tracing::trace!(chunks = builder.chunk_count(), "stream drained");
                let response = builder.build(conversation_id);
                if let Some(handler) = handler {
                    handler.on_complete(&response);
                }
                Ok((response.answer, None))
            }
        }
    }

    /// Apply the configured timeout and the caller's cancellation token.
    async fn guard<T>(
        &self,
        cancel: Option<&CancellationToken>,
        fut: impl Future<Output = ClientResult<T>>,
    ) -> ClientResult<T> {
        let bounded = async {
            match self.timeout {
                Some(limit) => tokio::time::timeout(limit, fut)
                    .await
                    .unwrap_or(Err(ClientError::Timeout(limit))),
                None => fut.await,
            }
        };
        match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(ClientError::Aborted),
                result = bounded => result,
            },
            None => bounded.await,
        }
    }
}
