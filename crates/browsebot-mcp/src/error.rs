//! Connection errors.

use thiserror::Error;

/// Anything that can go wrong between us and a tool server.
#[derive(Debug, Error)]
pub enum McpError {
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: String, secs: u64 },

    #[error("server returned error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("connection closed by server")]
    Closed,

    #[error("provider '{0}' is not ready")]
    NotReady(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl McpError {
    /// Whether the channel itself is broken, as opposed to a single
    /// request being rejected.
    pub fn is_transport(&self) -> bool {
        matches!(self, McpError::Io(_) | McpError::Closed)
    }
}
