//! Dispatcher: turns model tool-call requests into tool results.
//!
//! Every request yields exactly one [`ToolCallResult`] with the same id.
//! Nothing a tool does escapes this boundary as an error: unknown names,
//! malformed arguments, schema violations, timeouts and provider failures all
//! come back as `ToolOutcome::Error` text for the model to read.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use jsonschema::JSONSchema;
use serde_json::Value;
use tracing::{debug, info, warn};

use browsebot_core::config::AgentConfig;
use browsebot_core::types::{ToolCallRequest, ToolCallResult};
use browsebot_core::utils::{preview, truncate_output, LOG_PREVIEW_LIMIT};

use crate::error::{RegistryError, ToolExecutionError};
use crate::tools::ToolRegistry;

/// Text sent back when a tool succeeds without output.
pub const EMPTY_OUTPUT: &str = "Tool returned no content.";

/// Validates, routes and bounds tool calls against a [`ToolRegistry`].
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    tool_timeout: Duration,
    max_output_chars: usize,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>, tool_timeout: Duration, max_output_chars: usize) -> Self {
        Self {
            registry,
            tool_timeout,
            max_output_chars,
        }
    }

    pub fn from_config(registry: Arc<ToolRegistry>, config: &AgentConfig) -> Self {
        Self::new(
            registry,
            Duration::from_secs(config.tool_timeout_secs),
            config.max_tool_output_chars,
        )
    }

    /// Execute one request. Always returns a result carrying `request.id`.
    pub async fn execute(&self, request: &ToolCallRequest) -> ToolCallResult {
        info!(
            tool = %request.tool_name,
            id = %request.id,
            args = %preview(&request.arguments, LOG_PREVIEW_LIMIT),
            "calling tool"
        );

        match self.try_execute(request).await {
            Ok(output) => {
                info!(
                    tool = %request.tool_name,
                    result = %preview(&output, LOG_PREVIEW_LIMIT),
                    "tool finished"
                );
                ToolCallResult::success(&request.id, output)
            }
            Err(e) => {
                warn!(tool = %request.tool_name, error = %e, "tool call failed");
                ToolCallResult::error(&request.id, format!("Error: {e}"))
            }
        }
    }

    async fn try_execute(&self, request: &ToolCallRequest) -> Result<String, ToolExecutionError> {
        let tool = self.registry.resolve(&request.tool_name)?;
        let arguments = parse_arguments(&tool.name, &request.arguments)?;
        if let Some(schema) = self.registry.validator(&tool.name) {
            validate_arguments(&tool.name, schema, &arguments)?;
        }

        // resolve() only returns tools whose owner is registered.
        let provider = self
            .registry
            .provider(&tool.owner)
            .ok_or_else(|| RegistryError::UnknownTool(tool.name.clone()))?;

        let invocation = provider.invoke(&tool.remote_name, arguments);
        let output = match tokio::time::timeout(self.tool_timeout, invocation).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                return Err(ToolExecutionError::Provider {
                    tool: tool.name.clone(),
                    source,
                })
            }
            Err(_) => {
                return Err(ToolExecutionError::Timeout {
                    tool: tool.name.clone(),
                    secs: self.tool_timeout.as_secs(),
                })
            }
        };

        if output.trim().is_empty() {
            return Ok(EMPTY_OUTPUT.to_string());
        }
        Ok(truncate_output(&output, self.max_output_chars))
    }

    /// Execute all requests of one assistant turn.
    ///
    /// Requests for different providers run concurrently; requests for the
    /// same provider run one after another in request order. Results come
    /// back in request order.
    pub async fn execute_round(&self, requests: &[ToolCallRequest]) -> Vec<ToolCallResult> {
        // (owner, request indices); unresolvable requests get a group each.
        let mut groups: Vec<(Option<String>, Vec<usize>)> = Vec::new();
        for (i, request) in requests.iter().enumerate() {
            match self.registry.resolve(&request.tool_name) {
                Ok(tool) => {
                    let owner = Some(tool.owner.clone());
                    match groups.iter_mut().find(|(o, _)| *o == owner) {
                        Some((_, members)) => members.push(i),
                        None => groups.push((owner, vec![i])),
                    }
                }
                Err(_) => groups.push((None, vec![i])),
            }
        }

        debug!(requests = requests.len(), groups = groups.len(), "executing tool round");

        let runs = groups.into_iter().map(|(_, members)| async move {
            let mut done = Vec::with_capacity(members.len());
            for i in members {
                done.push((i, self.execute(&requests[i]).await));
            }
            done
        });

        let mut results: Vec<(usize, ToolCallResult)> =
            join_all(runs).await.into_iter().flatten().collect();
        results.sort_by_key(|(i, _)| *i);
        results.into_iter().map(|(_, r)| r).collect()
    }
}

/// Parse the model's argument string into a JSON object.
///
/// An empty string means "no arguments".
fn parse_arguments(tool: &str, raw: &str) -> Result<Value, ToolExecutionError> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    let value: Value =
        serde_json::from_str(raw).map_err(|e| ToolExecutionError::InvalidArguments {
            tool: tool.to_string(),
            reason: format!("not valid JSON ({e})"),
        })?;
    if !value.is_object() {
        return Err(ToolExecutionError::InvalidArguments {
            tool: tool.to_string(),
            reason: "expected a JSON object".to_string(),
        });
    }
    Ok(value)
}

/// Check arguments against the tool's compiled JSON Schema.
fn validate_arguments(tool: &str, schema: &JSONSchema, arguments: &Value) -> Result<(), ToolExecutionError> {
    if let Err(errors) = schema.validate(arguments) {
        let violations: Vec<String> = errors
            .map(|e| {
                let path = e.instance_path.to_string();
                let path = if path.is_empty() { "/".to_string() } else { path };
                format!("{path}: {e}")
            })
            .collect();
        return Err(ToolExecutionError::SchemaViolation {
            tool: tool.to_string(),
            violations: violations.join("; "),
        });
    }
    Ok(())
}
