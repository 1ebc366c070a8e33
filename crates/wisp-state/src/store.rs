//! In-memory conversation store with the active-conversation pointer

use std::collections::HashSet;

use parking_lot::Mutex;
use wisp_client::ConversationInfo;

use crate::conversation::{ClientState, Conversation, Message};
use crate::error::{Error, Result};
use crate::events::{EventBus, StateEvent};

/// Owns the [`ClientState`] and announces every mutation on the bus.
///
/// Events are emitted after the mutation is committed and after the state
/// lock is released, so subscribers always observe the new state.
#[derive(Debug)]
pub struct ConversationStore {
    state: Mutex<ClientState>,
    history_loading: Mutex<HashSet<String>>,
    bus: EventBus,
}

impl ConversationStore {
    pub fn new(bus: EventBus) -> Self {
        Self {
            state: Mutex::new(ClientState::default()),
            history_loading: Mutex::new(HashSet::new()),
            bus,
        }
    }

    /// Snapshot of the current state
    pub fn state(&self) -> ClientState {
        self.state.lock().clone()
    }

    pub fn active_conversation_id(&self) -> Option<String> {
        self.state.lock().active_conversation_id.clone()
    }

    /// Snapshot of one conversation
    pub fn conversation(&self, id: &str) -> Option<Conversation> {
        self.state.lock().conversations.get(id).cloned()
    }

    /// Make `id` the active conversation, creating it empty if unknown.
    ///
    /// Emits `ActiveConversation` once. Returns `true` when the conversation
    /// was created by this call.
    pub fn set_active_conversation_id(&self, id: &str) -> bool {
        let created = {
            let mut state = self.state.lock();
            let created = !state.conversations.contains_key(id);
            if created {
                state
                    .conversations
                    .insert(id.to_string(), Conversation::new(id));
            }
            state.active_conversation_id = Some(id.to_string());
            created
        };
        tracing::debug!(conversation_id = id, created, "active conversation set");
        self.bus.notify(&StateEvent::ActiveConversation {
            conversation_id: Some(id.to_string()),
        });
        created
    }

    /// Append `message` to `conversation_id` and emit `Message`
    pub fn append_message(&self, conversation_id: &str, message: Message) -> Result<()> {
        {
            let mut state = self.state.lock();
            let conversation = state
                .conversations
                .get_mut(conversation_id)
                .ok_or_else(|| Error::ConversationNotFound(conversation_id.to_string()))?;
            tracing::debug!(
                conversation_id,
                role = ?message.role,
                position = conversation.messages.len(),
                "appending message"
            );
            conversation.messages.push(message);
        }
        self.notify_messages(conversation_id);
        Ok(())
    }

    /// Messages of the active conversation, or empty when none is active
    pub fn active_conversation_messages(&self) -> Vec<Message> {
        self.state
            .lock()
            .active_conversation()
            .map(|c| c.messages.clone())
            .unwrap_or_default()
    }

    /// Insert or replace a whole conversation. Emits nothing.
    pub fn insert_conversation(&self, conversation: Conversation) {
        let mut state = self.state.lock();
        state
            .conversations
            .insert(conversation.id.clone(), conversation);
    }

    /// Record backend metadata for a conversation, keeping any local messages.
    pub fn upsert_conversation(&self, info: ConversationInfo) {
        let mut state = self.state.lock();
        match state.conversations.get_mut(&info.id) {
            Some(existing) => {
                existing.title = info.title;
                existing.locked = info.locked;
            }
            None => {
                state.conversations.insert(info.id.clone(), info.into());
            }
        }
    }

    /// Claim the history load of `conversation_id`.
    ///
    /// Returns `None` unless the conversation exists, holds no messages and
    /// no other load for it is in flight. The claim ends when the returned
    /// [`HistoryLoad`] is finished or dropped.
    pub fn begin_history_load(&self, conversation_id: &str) -> Option<HistoryLoad<'_>> {
        let state = self.state.lock();
        let empty = state
            .conversations
            .get(conversation_id)
            .is_some_and(|c| c.messages.is_empty());
        if !empty || !self.history_loading.lock().insert(conversation_id.to_string()) {
            return None;
        }
        Some(HistoryLoad {
            store: self,
            conversation_id: conversation_id.to_string(),
        })
    }

    /// Put loaded history in front of whatever the conversation already holds
    /// and emit `Message`.
    pub fn prepend_history(&self, conversation_id: &str, history: Vec<Message>) -> Result<()> {
        {
            let mut state = self.state.lock();
            let conversation = state
                .conversations
                .get_mut(conversation_id)
                .ok_or_else(|| Error::ConversationNotFound(conversation_id.to_string()))?;
            conversation.messages.splice(0..0, history);
        }
        self.notify_messages(conversation_id);
        Ok(())
    }

    /// Remove a conversation, clearing the active pointer if it pointed there.
    pub fn remove_conversation(&self, id: &str) -> Option<Conversation> {
        let (removed, cleared) = {
            let mut state = self.state.lock();
            let removed = state.conversations.remove(id);
            let cleared = removed.is_some() && state.active_conversation_id.as_deref() == Some(id);
            if cleared {
                state.active_conversation_id = None;
            }
            (removed, cleared)
        };
        if cleared {
            tracing::debug!(conversation_id = id, "active conversation removed");
            self.bus.notify(&StateEvent::ActiveConversation {
                conversation_id: None,
            });
        }
        removed
    }

    fn notify_messages(&self, conversation_id: &str) {
        self.bus.notify(&StateEvent::Message {
            conversation_id: conversation_id.to_string(),
        });
    }
}

/// An in-flight history load, see [`ConversationStore::begin_history_load`]
#[derive(Debug)]
pub struct HistoryLoad<'a> {
    store: &'a ConversationStore,
    conversation_id: String,
}

impl HistoryLoad<'_> {
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Splice `history` in front of the conversation and end the claim
    pub fn finish(self, history: Vec<Message>) -> Result<()> {
        self.store.prepend_history(&self.conversation_id, history)
    }
}

impl Drop for HistoryLoad<'_> {
    fn drop(&mut self) {
        self.store.history_loading.lock().remove(&self.conversation_id);
    }
}
