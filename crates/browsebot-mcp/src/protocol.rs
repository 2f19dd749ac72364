//! MCP wire types (JSON-RPC 2.0, protocol revision 2024-11-05).
//!
//! Only the subset a tool-calling client needs: `initialize`, `tools/list`,
//! `tools/call`, plus enough of the envelope to answer server-initiated
//! requests.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const CLIENT_NAME: &str = "browsebot";
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// JSON-RPC "method not found".
pub const METHOD_NOT_FOUND: i64 = -32601;

// ─────────────────────────────────────────────
// Envelope
// ─────────────────────────────────────────────

/// Build a request frame.
pub fn request(id: u64, method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params,
    })
}

/// Build a notification frame (no id, no reply expected).
pub fn notification(method: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": method,
    })
}

/// Successful reply to a server-initiated request.
pub fn result_response(id: &Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result,
    })
}

/// Error reply to a server-initiated request.
pub fn error_response(id: &Value, code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message },
    })
}

/// Params of the `initialize` request.
pub fn initialize_params() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {},
        "clientInfo": {
            "name": CLIENT_NAME,
            "version": CLIENT_VERSION,
        },
    })
}

/// What an incoming frame is, judged by its `id` and `method` fields.
#[derive(Debug, PartialEq)]
pub enum MessageKind {
    /// Reply to one of our requests.
    Response,
    /// The server asks us something; must be answered with the same id.
    IncomingRequest { id: Value, method: String },
    /// Fire-and-forget from the server.
    Notification,
}

pub fn classify_message(frame: &Value) -> MessageKind {
    let id = frame.get("id").filter(|v| !v.is_null());
    let method = frame.get("method").and_then(Value::as_str);

    match (id, method) {
        (Some(id), Some(method)) => MessageKind::IncomingRequest {
            id: id.clone(),
            method: method.to_string(),
        },
        (Some(_), None) => MessageKind::Response,
        _ => MessageKind::Notification,
    }
}

/// The `error` member of a JSON-RPC response.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

// ─────────────────────────────────────────────
// initialize
// ─────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    #[serde(default)]
    pub server_info: Option<ServerInfo>,
    #[serde(default)]
    pub capabilities: Value,
}

// ─────────────────────────────────────────────
// tools/list
// ─────────────────────────────────────────────

/// A tool as advertised by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct McpTool {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "inputSchema", default = "empty_object_schema")]
    pub input_schema: Value,
}

fn empty_object_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListToolsResult {
    #[serde(default)]
    pub tools: Vec<McpTool>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

// ─────────────────────────────────────────────
// tools/call
// ─────────────────────────────────────────────

/// One content item of a tool result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    Text {
        text: String,
    },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    Resource {
        resource: EmbeddedResource,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddedResource {
    pub uri: String,
    #[serde(rename = "mimeType", default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<ToolContent>,
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

impl CallToolResult {
    /// Flatten the content items into text, one item per line.
    ///
    /// Binary payloads are summarised rather than inlined.
    pub fn to_text(&self) -> String {
        self.content
            .iter()
            .map(|item| match item {
                ToolContent::Text { text } => text.clone(),
                ToolContent::Image { data, mime_type } => {
                    format!("[image: {mime_type}, {} bytes base64]", data.len())
                }
                ToolContent::Resource { resource } => match &resource.text {
                    Some(text) => text.clone(),
                    None => format!("[resource: {}]", resource.uri),
                },
                ToolContent::Unsupported => "[unsupported content]".to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
