//! Model Context Protocol client over stdio.
//!
//! One [`McpConnection`] owns one tool server child process and speaks
//! newline-delimited JSON-RPC 2.0 with it.
//!
//! - [`protocol`]: wire types and frame classification
//! - [`connection`]: spawn, handshake, `tools/list`, `tools/call`, close
//! - [`error`]: [`McpError`]

pub mod connection;
pub mod error;
pub mod protocol;

pub use connection::{ConnectionState, McpConnection};
pub use error::McpError;
pub use protocol::{CallToolResult, McpTool, ToolContent};
