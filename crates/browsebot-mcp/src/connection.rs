//! A managed JSON-RPC channel to one MCP tool server.
//!
//! Lifecycle: `Disconnected → Connecting → Ready`, then `Failed` on a broken
//! channel or `Disconnected` again after [`McpConnection::close`]. Tools are
//! only served while `Ready`.

use std::sync::Mutex as StdMutex;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};

use browsebot_core::config::McpServerConfig;

use crate::error::McpError;
use crate::protocol::{
    self, CallToolResult, InitializeResult, ListToolsResult, McpTool, MessageKind, RpcError,
};

/// Lifecycle state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Ready,
    Failed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Ready => "ready",
            ConnectionState::Failed => "failed",
        };
        f.write_str(s)
    }
}

// ─────────────────────────────────────────────
// Channel
// ─────────────────────────────────────────────

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// The raw duplex stream plus request id counter.
struct Channel {
    server: String,
    lines: Lines<BufReader<BoxedReader>>,
    writer: BoxedWriter,
    next_id: u64,
}

impl Channel {
    fn new(server: &str, reader: BoxedReader, writer: BoxedWriter) -> Self {
        Self {
            server: server.to_string(),
            lines: BufReader::new(reader).lines(),
            writer,
            next_id: 1,
        }
    }

    async fn write_frame(&mut self, frame: &Value) -> Result<(), McpError> {
        let mut line = serde_json::to_string(frame)?;
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn notify(&mut self, method: &str) -> Result<(), McpError> {
        self.write_frame(&protocol::notification(method)).await
    }

    /// Send a request and wait for the reply carrying the same id.
    ///
    /// Server requests that arrive meanwhile are answered inline;
    /// notifications, stray responses and lines that are not JSON are
    /// skipped. Only EOF and I/O errors end the channel.
    async fn request(&mut self, method: &str, params: Value) -> Result<Value, McpError> {
        let id = self.next_id;
        self.next_id += 1;

        trace!(server = %self.server, id, method, "sending request");
        self.write_frame(&protocol::request(id, method, params)).await?;

        loop {
            let line = self.lines.next_line().await?.ok_or(McpError::Closed)?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let frame: Value = match serde_json::from_str(line) {
                Ok(frame) => frame,
                Err(e) => {
                    debug!(server = %self.server, error = %e, line = %line, "skipping non-JSON output");
                    continue;
                }
            };
            match protocol::classify_message(&frame) {
                MessageKind::Response => {
                    if frame.get("id").and_then(Value::as_u64) != Some(id) {
                        debug!(server = %self.server, "skipping response to unknown id");
                        continue;
                    }
                    if let Some(error) = frame.get("error") {
                        let error: RpcError = serde_json::from_value(error.clone())
                            .map_err(|e| McpError::Protocol(format!("bad error object: {e}")))?;
                        return Err(McpError::Rpc {
                            code: error.code,
                            message: error.message,
                        });
                    }
                    return frame
                        .get("result")
                        .cloned()
                        .ok_or_else(|| McpError::Protocol("response has neither result nor error".into()));
                }
                MessageKind::IncomingRequest { id: req_id, method } => {
                    let reply = if method == "ping" {
                        protocol::result_response(&req_id, json!({}))
                    } else {
                        debug!(server = %self.server, method = %method, "rejecting server request");
                        protocol::error_response(&req_id, protocol::METHOD_NOT_FOUND, "Method not found")
                    };
                    self.write_frame(&reply).await?;
                }
                MessageKind::Notification => {
                    trace!(server = %self.server, frame = %line, "skipping notification");
                }
            }
        }
    }
}

// ─────────────────────────────────────────────
// McpConnection
// ─────────────────────────────────────────────

/// One tool server: its channel, child process, and cached tool catalog.
pub struct McpConnection {
    name: String,
    state: StdMutex<ConnectionState>,
    /// `None` once closed or failed.
    channel: Mutex<Option<Channel>>,
    child: Mutex<Option<Child>>,
    tools: Vec<McpTool>,
}

impl std::fmt::Debug for McpConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpConnection")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("tools", &self.tools.len())
            .finish()
    }
}

impl McpConnection {
    /// Spawn the configured server and complete the handshake.
    ///
    /// Spawn, `initialize` and the full `tools/list` walk share one
    /// `startup_timeout_secs` budget. The child is killed if any of it fails.
    pub async fn connect(config: &McpServerConfig) -> Result<Self, McpError> {
        info!(server = %config.name, command = %config.command, "starting MCP server");

        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);
        // Values are never logged.
        for (key, value) in &config.env {
            debug!(server = %config.name, var = %key, "setting child env var");
            cmd.env(key, value);
        }

        let mut child = cmd.spawn().map_err(|source| McpError::Spawn {
            command: config.command.clone(),
            source,
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::Handshake("child stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::Handshake("child stdout unavailable".into()))?;
        if let Some(stderr) = child.stderr.take() {
            forward_stderr(config.name.clone(), stderr);
        }

        let secs = config.startup_timeout_secs;
        let handshake = Self::handshake(&config.name, Box::new(stdout), Box::new(stdin));
        let mut conn = match tokio::time::timeout(Duration::from_secs(secs), handshake).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(server = %config.name, secs, "MCP server startup timed out");
                return Err(McpError::Timeout {
                    operation: format!("startup of '{}'", config.name),
                    secs,
                });
            }
        };

        conn.child = Mutex::new(Some(child));
        Ok(conn)
    }

    /// Run the handshake over already-open streams.
    pub async fn from_streams<R, W>(name: &str, reader: R, writer: W) -> Result<Self, McpError>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::handshake(name, Box::new(reader), Box::new(writer)).await
    }

    async fn handshake(
        name: &str,
        reader: BoxedReader,
        writer: BoxedWriter,
    ) -> Result<Self, McpError> {
        debug!(server = %name, state = %ConnectionState::Connecting, "handshake");
        let mut channel = Channel::new(name, reader, writer);

        let init = channel
            .request("initialize", protocol::initialize_params())
            .await
            .map_err(|e| match e {
                McpError::Rpc { code, message } => {
                    McpError::Handshake(format!("initialize rejected ({code}): {message}"))
                }
                other => other,
            })?;
        let init: InitializeResult = serde_json::from_value(init)
            .map_err(|e| McpError::Handshake(format!("bad initialize result: {e}")))?;

        if init.protocol_version != protocol::PROTOCOL_VERSION {
            debug!(
                server = %name,
                version = %init.protocol_version,
                "server negotiated a different protocol version"
            );
        }

        channel.notify("notifications/initialized").await?;

        let tools = list_all_tools(&mut channel).await?;

        info!(
            server = %name,
            server_name = init.server_info.as_ref().map(|s| s.name.as_str()).unwrap_or("?"),
            tools = tools.len(),
            "MCP server ready"
        );

        Ok(Self {
            name: name.to_string(),
            state: StdMutex::new(ConnectionState::Ready),
            channel: Mutex::new(Some(channel)),
            child: Mutex::new(None),
            tools,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ConnectionState::Ready
    }

    /// Snapshot of the catalog fetched during the handshake.
    pub fn list_tools(&self) -> Result<Vec<McpTool>, McpError> {
        if !self.is_ready() {
            return Err(McpError::NotReady(self.name.clone()));
        }
        Ok(self.tools.clone())
    }

    /// Invoke `tools/call`. Calls on one connection are serialized.
    ///
    /// A result with `isError` set is returned as `Ok`; the caller decides
    /// how to present it.
    pub async fn call_tool(&self, tool: &str, arguments: Value) -> Result<CallToolResult, McpError> {
        let mut guard = self.channel.lock().await;
        if !self.is_ready() {
            return Err(McpError::NotReady(self.name.clone()));
        }
        let channel = guard
            .as_mut()
            .ok_or_else(|| McpError::NotReady(self.name.clone()))?;

        let params = json!({ "name": tool, "arguments": arguments });
        match channel.request("tools/call", params).await {
            Ok(result) => serde_json::from_value(result)
                .map_err(|e| McpError::Protocol(format!("bad tools/call result: {e}"))),
            Err(e) => {
                if e.is_transport() {
                    warn!(server = %self.name, error = %e, "MCP channel broke");
                    *guard = None;
                    self.set_state(ConnectionState::Failed);
                }
                Err(e)
            }
        }
    }

    /// Drop the channel and kill the child. Safe to call more than once.
    pub async fn close(&self) {
        self.channel.lock().await.take();
        if let Some(mut child) = self.child.lock().await.take() {
            if let Err(e) = child.kill().await {
                debug!(server = %self.name, error = %e, "kill failed; child already gone");
            }
        }
        if self.state() != ConnectionState::Disconnected {
            info!(server = %self.name, "MCP server closed");
        }
        self.set_state(ConnectionState::Disconnected);
    }
}

/// Walk `tools/list` until the server stops returning a cursor.
async fn list_all_tools(channel: &mut Channel) -> Result<Vec<McpTool>, McpError> {
    let mut tools = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let params = match &cursor {
            Some(c) => json!({ "cursor": c }),
            None => json!({}),
        };
        let page: ListToolsResult = serde_json::from_value(channel.request("tools/list", params).await?)
            .map_err(|e| McpError::Protocol(format!("bad tools/list result: {e}")))?;
        tools.extend(page.tools);

        match page.next_cursor {
            Some(next) if Some(&next) != cursor.as_ref() => cursor = Some(next),
            Some(_) => {
                warn!(server = %channel.server, "tools/list repeated its cursor; stopping");
                break;
            }
            None => break,
        }
    }

    Ok(tools)
}

/// Copy the child's stderr into the debug log, line by line.
fn forward_stderr(server: String, stderr: tokio::process::ChildStderr) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(server = %server, "{}", line);
        }
    });
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, split, AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};

    /// A scripted MCP server on the far end of a duplex pipe.
    async fn fake_server(stream: DuplexStream) {
        let (read, mut write) = split(stream);
        let mut lines = BufReader::new(read).lines();

        async fn send(write: &mut tokio::io::WriteHalf<DuplexStream>, frame: Value) {
            let mut line = frame.to_string();
            line.push('\n');
            write.write_all(line.as_bytes()).await.unwrap();
        }

        while let Ok(Some(line)) = lines.next_line().await {
            let msg: Value = serde_json::from_str(&line).unwrap();
            let Some(method) = msg["method"].as_str() else {
                continue;
            };
            let id = msg["id"].clone();

            match method {
                "initialize" => {
                    assert_eq!(msg["params"]["protocolVersion"], "2024-11-05");
                    send(
                        &mut write,
                        json!({"jsonrpc": "2.0", "id": id, "result": {
                            "protocolVersion": "2024-11-05",
                            "capabilities": {"tools": {}},
                            "serverInfo": {"name": "fake", "version": "0.0.1"}
                        }}),
                    )
                    .await;
                }
                "notifications/initialized" => {}
                "tools/list" => {
                    let result = if msg["params"]["cursor"].is_null() {
                        json!({
                            "tools": [{"name": "echo", "description": "Echo back",
                                       "inputSchema": {"type": "object"}}],
                            "nextCursor": "page-2"
                        })
                    } else {
                        json!({"tools": [{"name": "fail"}]})
                    };
                    send(&mut write, json!({"jsonrpc": "2.0", "id": id, "result": result})).await;
                }
                "tools/call" => match msg["params"]["name"].as_str().unwrap() {
                    "echo" => {
                        // Interleave noise before the real reply.
                        send(&mut write, json!({"jsonrpc": "2.0", "method": "notifications/message"})).await;
                        send(&mut write, json!({"jsonrpc": "2.0", "id": 9999, "result": {}})).await;
                        let text = msg["params"]["arguments"].to_string();
                        send(
                            &mut write,
                            json!({"jsonrpc": "2.0", "id": id,
                                   "result": {"content": [{"type": "text", "text": text}]}}),
                        )
                        .await;
                    }
                    "fail" => {
                        send(
                            &mut write,
                            json!({"jsonrpc": "2.0", "id": id, "result": {
                                "content": [{"type": "text", "text": "Element not found"}],
                                "isError": true
                            }}),
                        )
                        .await;
                    }
                    "ask" => {
                        send(&mut write, json!({"jsonrpc": "2.0", "id": "srv-1", "method": "ping"})).await;
                        send(&mut write, json!({"jsonrpc": "2.0", "id": "srv-2", "method": "sampling/createMessage"})).await;
                        let pong: Value =
                            serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
                        assert_eq!(pong, json!({"jsonrpc": "2.0", "id": "srv-1", "result": {}}));
                        let rejected: Value =
                            serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
                        assert_eq!(rejected["id"], "srv-2");
                        assert_eq!(rejected["error"]["code"], -32601);
                        send(
                            &mut write,
                            json!({"jsonrpc": "2.0", "id": id,
                                   "result": {"content": [{"type": "text", "text": "answered"}]}}),
                        )
                        .await;
                    }
                    "noisy" => {
                        write
                            .write_all(b"Debugger listening on ws://127.0.0.1:9229\n")
                            .await
                            .unwrap();
                        send(
                            &mut write,
                            json!({"jsonrpc": "2.0", "id": id,
                                   "result": {"content": [{"type": "text", "text": "after banner"}]}}),
                        )
                        .await;
                    }
                    "die" => return,
                    _ => {
                        send(
                            &mut write,
                            json!({"jsonrpc": "2.0", "id": id,
                                   "error": {"code": -32602, "message": "Unknown tool"}}),
                        )
                        .await;
                    }
                },
                other => panic!("unexpected method {other}"),
            }
        }
    }

    async fn connected() -> McpConnection {
        let (client, server) = duplex(64 * 1024);
        tokio::spawn(fake_server(server));
        let (read, write) = split(client);
        McpConnection::from_streams("fake", read, write).await.unwrap()
    }

    #[tokio::test]
    async fn test_handshake_follows_pagination() {
        let conn = connected().await;
        assert_eq!(conn.state(), ConnectionState::Ready);

        let tools = conn.list_tools().unwrap();
        let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["echo", "fail"]);
        assert_eq!(tools[0].description.as_deref(), Some("Echo back"));
    }

    #[tokio::test]
    async fn test_call_tool_skips_noise() {
        let conn = connected().await;
        let result = conn.call_tool("echo", json!({"url": "https://example.com"})).await.unwrap();
        assert!(!result.is_error);
        assert_eq!(result.to_text(), r#"{"url":"https://example.com"}"#);
    }

    #[tokio::test]
    async fn test_non_json_stdout_line_is_skipped() {
        let conn = connected().await;
        let result = conn.call_tool("noisy", json!({})).await.unwrap();
        assert_eq!(result.to_text(), "after banner");
        assert_eq!(conn.state(), ConnectionState::Ready);

        let again = conn.call_tool("echo", json!({"n": 1})).await.unwrap();
        assert_eq!(again.to_text(), r#"{"n":1}"#);
    }

    #[tokio::test]
    async fn test_call_tool_is_error_flag() {
        let conn = connected().await;
        let result = conn.call_tool("fail", json!({})).await.unwrap();
        assert!(result.is_error);
        assert_eq!(result.to_text(), "Element not found");
    }

    #[tokio::test]
    async fn test_rpc_error_keeps_connection_ready() {
        let conn = connected().await;
        let err = conn.call_tool("missing", json!({})).await.unwrap_err();
        match err {
            McpError::Rpc { code, message } => {
                assert_eq!(code, -32602);
                assert_eq!(message, "Unknown tool");
            }
            other => panic!("expected rpc error, got {other:?}"),
        }
        assert!(conn.is_ready());
        assert!(conn.call_tool("echo", json!({})).await.is_ok());
    }

    #[tokio::test]
    async fn test_server_requests_are_answered() {
        let conn = connected().await;
        let result = conn.call_tool("ask", json!({})).await.unwrap();
        assert_eq!(result.to_text(), "answered");
    }

    #[tokio::test]
    async fn test_eof_marks_connection_failed() {
        let conn = connected().await;
        let err = conn.call_tool("die", json!({})).await.unwrap_err();
        assert!(matches!(err, McpError::Closed));
        assert_eq!(conn.state(), ConnectionState::Failed);
        assert!(matches!(conn.list_tools(), Err(McpError::NotReady(_))));
        assert!(matches!(
            conn.call_tool("echo", json!({})).await,
            Err(McpError::NotReady(_))
        ));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let conn = connected().await;
        conn.close().await;
        conn.close().await;
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert!(matches!(
            conn.call_tool("echo", json!({})).await,
            Err(McpError::NotReady(_))
        ));
    }

    #[tokio::test]
    async fn test_handshake_rejected() {
        let (client, server) = duplex(4096);
        tokio::spawn(async move {
            let (read, mut write) = split(server);
            let mut lines = BufReader::new(read).lines();
            let line = lines.next_line().await.unwrap().unwrap();
            let msg: Value = serde_json::from_str(&line).unwrap();
            let reply = json!({"jsonrpc": "2.0", "id": msg["id"],
                               "error": {"code": -32600, "message": "unsupported version"}});
            write.write_all(format!("{reply}\n").as_bytes()).await.unwrap();
        });
        let (read, write) = split(client);
        let err = McpConnection::from_streams("picky", read, write).await.unwrap_err();
        assert!(matches!(err, McpError::Handshake(ref m) if m.contains("unsupported version")));
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let config = McpServerConfig {
            name: "ghost".into(),
            command: "/nonexistent/browsebot-test-server".into(),
            ..Default::default()
        };
        let err = McpConnection::connect(&config).await.unwrap_err();
        assert!(matches!(err, McpError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_startup_timeout() {
        // `sleep` never answers initialize.
        let config = McpServerConfig {
            name: "mute".into(),
            command: "sleep".into(),
            args: vec!["30".into()],
            startup_timeout_secs: 1,
            ..Default::default()
        };
        let err = McpConnection::connect(&config).await.unwrap_err();
        assert!(matches!(err, McpError::Timeout { secs: 1, .. }));
    }
}
