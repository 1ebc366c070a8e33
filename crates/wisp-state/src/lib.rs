//! wisp-state: client-state coordinator for conversational AI backends
//!
//! This crate owns the conversations a UI displays, serializes message sends
//! so at most one is in flight, merges streamed or complete replies into
//! history, and notifies subscribers of every transition in a fixed order.

pub mod config;
pub mod conversation;
pub mod error;
pub mod events;
pub mod gate;
pub mod manager;
pub mod store;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

pub use config::ClientStateConfig;
pub use conversation::{ClientState, Conversation, Message, Role};
pub use error::{Error, Result};
pub use events::{EventBus, EventKind, StateEvent, Subscription};
pub use gate::MessageGate;
pub use manager::ClientStateManager;
pub use store::{ConversationStore, HistoryLoad};
pub use workflow::SendOptions;

pub use wisp_client;
