//! ToolProvider trait: the interface the registry and dispatcher use to reach
//! a tool server.
//!
//! [`McpConnection`] is the production implementation; tests plug in
//! in-memory providers.

use async_trait::async_trait;
use serde_json::Value;

use browsebot_mcp::McpConnection;

/// A tool as its provider advertises it, before the registry names it.
#[derive(Clone, Debug, PartialEq)]
pub struct RemoteTool {
    pub name: String,
    pub description: String,
    /// JSON Schema for the arguments object.
    pub parameters: Value,
}

/// A source of callable tools.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Unique provider name (e.g. `"playwright"`).
    fn name(&self) -> &str;

    /// Whether calls can currently be served.
    fn is_ready(&self) -> bool;

    /// The provider's current catalog.
    async fn list_tools(&self) -> anyhow::Result<Vec<RemoteTool>>;

    /// Run `tool` with an already validated arguments object.
    ///
    /// Returns the tool output as text. Provider-side execution errors come
    /// back as `Err` with the provider's message.
    async fn invoke(&self, tool: &str, arguments: Value) -> anyhow::Result<String>;

    /// Release the underlying session. Idempotent.
    async fn close(&self);
}

#[async_trait]
impl ToolProvider for McpConnection {
    fn name(&self) -> &str {
        McpConnection::name(self)
    }

    fn is_ready(&self) -> bool {
        McpConnection::is_ready(self)
    }

    async fn list_tools(&self) -> anyhow::Result<Vec<RemoteTool>> {
        let tools = McpConnection::list_tools(self)?;
        Ok(tools
            .into_iter()
            .map(|t| RemoteTool {
                description: t.description.unwrap_or_default(),
                name: t.name,
                parameters: t.input_schema,
            })
            .collect())
    }

    async fn invoke(&self, tool: &str, arguments: Value) -> anyhow::Result<String> {
        let result = self.call_tool(tool, arguments).await?;
        let text = result.to_text();
        if result.is_error {
            if text.is_empty() {
                anyhow::bail!("tool reported an error without details");
            }
            anyhow::bail!(text);
        }
        Ok(text)
    }

    async fn close(&self) {
        McpConnection::close(self).await
    }
}
