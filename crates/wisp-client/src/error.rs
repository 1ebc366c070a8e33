//! Error types for wisp-client

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using wisp-client Error
pub type Result<T> = std::result::Result<T, Error>;

/// One entry of a validation failure reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationDetail {
    /// Location of the offending field (e.g. `["body", "query"]`)
    #[serde(default)]
    pub loc: Vec<String>,
    /// Human-readable message
    pub msg: String,
    /// Machine-readable error type
    #[serde(rename = "type", default)]
    pub kind: String,
}

fn describe_details(details: &[ValidationDetail]) -> String {
    details
        .iter()
        .map(|d| {
            if d.loc.is_empty() {
                d.msg.clone()
            } else {
                format!("{}: {}", d.loc.join("."), d.msg)
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors an AI client may surface to the state coordinator
#[derive(Error, Debug)]
pub enum Error {
    /// The request never produced a response (DNS, connect, reset, ...)
    #[error("Network error: {0}")]
    Network(String),

    /// The backend answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Status {
        status: u16,
        status_text: String,
        message: String,
    },

    /// The backend rejected the request payload
    #[error("Validation failed: {}", describe_details(.0))]
    Validation(Vec<ValidationDetail>),

    /// A streamed response failed part-way through
    #[error("Stream error: {0}")]
    Stream(String),

    /// The caller cancelled the request
    #[error("Request aborted")]
    Aborted,

    /// The request did not finish within the configured timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Invalid client configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a status error from its parts
    pub fn status(status: u16, status_text: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            status_text: status_text.into(),
            message: message.into(),
        }
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// HTTP status code, if the backend answered at all
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Status { status, .. } => Some(*status),
            Error::Validation(_) => Some(422),
            _ => None,
        }
    }

    /// Check if the request was cut short by the caller (cancel or timeout)
    pub fn is_abort(&self) -> bool {
        matches!(self, Error::Aborted | Error::Timeout(_))
    }
}
