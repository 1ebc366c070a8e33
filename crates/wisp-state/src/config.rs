//! Configuration for the state manager

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Settings for a [`crate::ClientStateManager`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientStateConfig {
    /// Request streamed replies unless a send says otherwise
    pub stream: bool,
    /// Upper bound for one backend exchange, in seconds
    pub request_timeout_secs: Option<u64>,
    /// Fetch history when an empty conversation becomes active
    pub load_history: bool,
}

impl Default for ClientStateConfig {
    fn default() -> Self {
        Self {
            stream: false,
            request_timeout_secs: None,
            load_history: true,
        }
    }
}

impl ClientStateConfig {
    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
