//! State events and the publish/subscribe bus that delivers them

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Event channels. Subscribers on one channel never see another's events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A conversation's message list changed
    Message,
    /// The in-flight flag changed
    InProgress,
    /// The active conversation pointer changed
    ActiveConversation,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [
        EventKind::Message,
        EventKind::InProgress,
        EventKind::ActiveConversation,
    ];
}

/// Events emitted by the state coordinator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateEvent {
    /// Messages of `conversation_id` changed
    Message { conversation_id: String },

    /// A send started (`true`) or finished (`false`)
    InProgress { in_progress: bool },

    /// The active conversation changed; `None` when it was cleared
    ActiveConversation { conversation_id: Option<String> },
}

impl StateEvent {
    /// The channel this event is delivered on
    pub fn kind(&self) -> EventKind {
        match self {
            StateEvent::Message { .. } => EventKind::Message,
            StateEvent::InProgress { .. } => EventKind::InProgress,
            StateEvent::ActiveConversation { .. } => EventKind::ActiveConversation,
        }
    }
}

type Callback = Arc<dyn Fn(&StateEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    channels: HashMap<EventKind, Vec<(u64, Callback)>>,
}

impl Registry {
    fn remove(&mut self, kind: EventKind, id: u64) -> bool {
        let Some(callbacks) = self.channels.get_mut(&kind) else {
            return false;
        };
        let before = callbacks.len();
        callbacks.retain(|(cid, _)| *cid != id);
        before != callbacks.len()
    }
}

/// Typed publish/subscribe registry keyed by [`EventKind`].
///
/// Callbacks run synchronously, in registration order, outside the registry
/// lock, so they may subscribe, unsubscribe or read state themselves. A
/// panicking callback is logged and skipped; the rest still run.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` on `kind`
    pub fn subscribe(
        &self,
        kind: EventKind,
        callback: impl Fn(&StateEvent) + Send + Sync + 'static,
    ) -> Subscription {
        let mut registry = self.registry.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry
            .channels
            .entry(kind)
            .or_default()
            .push((id, Arc::new(callback)));
        Subscription {
            kind,
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Deliver `event` to every callback registered on its channel
    pub fn notify(&self, event: &StateEvent) {
        let callbacks: Vec<Callback> = {
            let registry = self.registry.lock();
            registry
                .channels
                .get(&event.kind())
                .map(|cbs| cbs.iter().map(|(_, cb)| Arc::clone(cb)).collect())
                .unwrap_or_default()
        };

        for callback in callbacks {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| callback(event))) {
                tracing::warn!(
                    kind = ?event.kind(),
                    "event subscriber panicked: {}",
                    panic_message(payload.as_ref())
                );
            }
        }
    }

    /// Number of callbacks currently registered on `kind`
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.registry
            .lock()
            .channels
            .get(&kind)
            .map_or(0, Vec::len)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.lock();
        let mut s = f.debug_struct("EventBus");
        for kind in EventKind::ALL {
            let n = registry.channels.get(&kind).map_or(0, Vec::len);
            s.field(&format!("{kind:?}"), &n);
        }
        s.finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Handle for one registered callback.
///
/// Dropping the handle keeps the callback registered; call
/// [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    kind: EventKind,
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Remove the callback. Calling this more than once is a no-op.
    pub fn unsubscribe(&self) {
        if let Some(registry) = self.registry.upgrade() {
            if registry.lock().remove(self.kind, self.id) {
                tracing::trace!(kind = ?self.kind, id = self.id, "unsubscribed");
            }
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .finish()
    }
}
