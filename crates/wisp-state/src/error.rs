//! Error types for wisp-state

use thiserror::Error;

/// Result type alias using wisp-state Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the state coordinator
#[derive(Error, Debug)]
pub enum Error {
    /// A send was attempted with no active conversation
    #[error("No active conversation")]
    NoActiveConversation,

    /// Another send is still in flight
    #[error("A message is already being processed. Wait for it to complete before sending another message.")]
    AlreadyInProgress,

    /// A conversation vanished from the store
    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    /// The active conversation does not accept new messages
    #[error("Conversation is locked: {0}")]
    ConversationLocked(String),

    /// An error raised by the AI client
    #[error(transparent)]
    Backend(#[from] wisp_client::Error),

    /// Configuration could not be parsed
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// The underlying client error, if this is a backend failure
    pub fn as_backend(&self) -> Option<&wisp_client::Error> {
        match self {
            Error::Backend(e) => Some(e),
            _ => None,
        }
    }

    /// Check if the send was rejected before touching any state
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::NoActiveConversation | Error::AlreadyInProgress | Error::ConversationLocked(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_is_transparent() {
        let e = Error::from(wisp_client::Error::network("Network error"));
        assert_eq!(e.to_string(), "Network error: Network error");
        assert!(e.as_backend().is_some());
        assert!(!e.is_rejection());
    }

    #[test]
    fn test_rejections() {
        assert!(Error::AlreadyInProgress.is_rejection());
        assert!(Error::NoActiveConversation.is_rejection());
        assert!(Error::ConversationLocked("c1".into()).is_rejection());
        assert!(!Error::ConversationNotFound("c1".into()).is_rejection());
    }

    #[test]
    fn test_messages() {
        assert_eq!(Error::NoActiveConversation.to_string(), "No active conversation");
        assert!(
            Error::AlreadyInProgress
                .to_string()
                .starts_with("A message is already being processed")
        );
    }
}
