//! wisp-client: the AI client capability
//!
//! This crate defines what the wisp state coordinator needs from a
//! conversational backend: an init handshake, sending a message (either as a
//! single response or as a stream of chunks), and a few optional extras such
//! as health checks and history lookup. Concrete backends implement
//! [`AiClient`]; none live here.

pub mod client;
pub mod error;
pub mod stream;
pub mod types;

pub use client::AiClient;
pub use error::{Error, Result, ValidationDetail};
pub use stream::{AnswerBuilder, ChunkStream, Reply, StreamingHandler};
pub use types::*;
