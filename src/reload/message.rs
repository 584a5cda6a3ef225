//! Hot Reload Message Protocol
//!
//! Defines the JSON message format for WebSocket communication between
//! the development server and browser clients.
//!
//! # Message Types
//!
//! - `reload`: Trigger full page reload
//! - `css`: Swap stylesheet links (no page reload)
//! - `connected`: Handshake acknowledgement
//! - `error` / `clear_error`: Show or hide the notice overlay

use serde::{Deserialize, Serialize};

/// Hot reload message sent over WebSocket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HotReloadMessage {
    /// Full page reload
    Reload,

    /// Stylesheet hot swap
    Css {
        /// Stylesheet path relative to the output root (e.g. "css/main.min.css")
        target: String,
    },

    /// Connection established
    Connected {
        /// Server version for compatibility check
        version: String,
    },

    /// Notice raised by a task (display overlay, no reload)
    Error {
        /// Notice title (the task name)
        path: String,
        /// Error message
        error: String,
    },

    /// Clear error overlay (task succeeded after a notice)
    #[serde(rename = "clear_error")]
    ClearError,
}

impl HotReloadMessage {
    /// Create a stylesheet swap message
    pub fn css(target: impl Into<String>) -> Self {
        Self::Css {
            target: target.into(),
        }
    }

    /// Create a connected message
    pub fn connected() -> Self {
        Self::Connected {
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Create an error message
    pub fn error(path: impl Into<String>, error: impl Into<String>) -> Self {
        Self::Error {
            path: path.into(),
            error: error.into(),
        }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"reload"}"#.to_string())
    }
}
