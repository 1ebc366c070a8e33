//! The public facade a UI talks to

use std::sync::Arc;

use wisp_client::{AiClient, HealthCheck, InitResult, MessageResponse};

use crate::config::ClientStateConfig;
use crate::conversation::{ClientState, Conversation, Message};
use crate::error::{Error, Result};
use crate::events::{EventBus, EventKind, StateEvent, Subscription};
use crate::gate::MessageGate;
use crate::store::ConversationStore;
use crate::workflow::{SendOptions, SendWorkflow};

/// Composes the event bus, conversation store, message gate and send
/// workflow around an injected [`AiClient`].
///
/// Every instance owns its own state; share one across tasks with `Arc`.
pub struct ClientStateManager {
    client: Arc<dyn AiClient>,
    config: ClientStateConfig,
    bus: EventBus,
    store: ConversationStore,
    gate: MessageGate,
}

impl ClientStateManager {
    /// Create a manager with the default configuration
    pub fn new(client: Arc<dyn AiClient>) -> Self {
        Self::with_config(client, ClientStateConfig::default())
    }

    pub fn with_config(client: Arc<dyn AiClient>, config: ClientStateConfig) -> Self {
        let bus = EventBus::new();
        Self {
            client,
            config,
            store: ConversationStore::new(bus.clone()),
            bus,
            gate: MessageGate::new(),
        }
    }

    pub fn config(&self) -> &ClientStateConfig {
        &self.config
    }

    /// The injected client
    pub fn client(&self) -> &Arc<dyn AiClient> {
        &self.client
    }

    /// Run the client's init handshake.
    ///
    /// Known conversations are recorded (local messages are kept) and the
    /// initial conversation becomes active. Returns its id.
    pub async fn init(&self) -> Result<String> {
        let InitResult {
            initial_conversation_id,
            conversations,
        } = self.client.init().await?;
        tracing::info!(
            initial_conversation_id = %initial_conversation_id,
            known = conversations.len(),
            "client initialized"
        );
        for info in conversations {
            self.store.upsert_conversation(info);
        }
        self.set_active_conversation_id(&initial_conversation_id)
            .await?;
        Ok(initial_conversation_id)
    }

    /// Send `text` to the active conversation using the configured mode
    pub async fn send_message(&self, text: &str) -> Result<Option<MessageResponse>> {
        self.send_message_with(text, SendOptions::default()).await
    }

    /// Send `text` to the active conversation with per-call options
    pub async fn send_message_with(
        &self,
        text: &str,
        options: SendOptions,
    ) -> Result<Option<MessageResponse>> {
        self.workflow().run(text, options).await
    }

    /// Make `id` the active conversation, creating it if unknown.
    ///
    /// Emits `ActiveConversation`. When the conversation holds no messages
    /// and history loading is enabled, its history is fetched from the client
    /// and a `Message` event follows. Concurrent activations of the same
    /// conversation fetch it once.
    pub async fn set_active_conversation_id(&self, id: &str) -> Result<()> {
        self.store.set_active_conversation_id(id);
        if !self.config.load_history {
            return Ok(());
        }
        let Some(load) = self.store.begin_history_load(id) else {
            return Ok(());
        };

        let entries = self.client.get_conversation_history(id).await?;
        tracing::debug!(conversation_id = id, entries = entries.len(), "history loaded");
        load.finish(Message::from_history(&entries))
    }

    /// Ask the client for a new conversation and make it active
    pub async fn create_new_conversation(&self) -> Result<Conversation> {
        let info = self.client.create_new_conversation().await?;
        let id = info.id.clone();
        tracing::info!(conversation_id = %id, "new conversation created");
        self.store.upsert_conversation(info);
        self.set_active_conversation_id(&id).await?;
        self.store
            .conversation(&id)
            .ok_or(Error::ConversationNotFound(id))
    }

    /// Remove a conversation; clears the active pointer if it pointed there
    pub fn remove_conversation(&self, id: &str) -> Option<Conversation> {
        self.store.remove_conversation(id)
    }

    /// Seed a conversation, e.g. one restored by the embedding application.
    /// Replaces any conversation with the same id and emits nothing.
    pub fn insert_conversation(&self, conversation: Conversation) {
        self.store.insert_conversation(conversation);
    }

    /// Probe the backend
    pub async fn health_check(&self) -> Result<HealthCheck> {
        Ok(self.client.health_check().await?)
    }

    pub fn active_conversation_messages(&self) -> Vec<Message> {
        self.store.active_conversation_messages()
    }

    /// Whether a send is in flight
    pub fn message_in_progress(&self) -> bool {
        self.gate.is_held()
    }

    /// Snapshot of the whole client state
    pub fn state(&self) -> ClientState {
        self.store.state()
    }

    /// Register `callback` on `kind`
    pub fn subscribe(
        &self,
        kind: EventKind,
        callback: impl Fn(&StateEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.bus.subscribe(kind, callback)
    }

    /// Wait until no send is in flight
    pub async fn wait_for_idle(&self) {
        self.gate.wait_for_idle().await;
    }

    fn workflow(&self) -> SendWorkflow<'_> {
        SendWorkflow {
            store: &self.store,
            gate: &self.gate,
            bus: &self.bus,
            client: self.client.as_ref(),
            default_stream: self.config.stream,
            timeout: self.config.request_timeout(),
        }
    }
}
