//! In-memory fakes shared by the unit tests of this crate.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use browsebot_core::types::{LlmResponse, Message, ToolCall, ToolDefinition};
use browsebot_providers::{LlmError, LlmProvider, LlmRequestConfig};

use crate::tools::{RemoteTool, ToolProvider};

type Handler = Box<dyn Fn(&str, &Value) -> anyhow::Result<String> + Send + Sync>;

/// A tool provider whose tools answer through a closure.
pub struct FakeProvider {
    name: String,
    tools: Vec<RemoteTool>,
    ready: AtomicBool,
    handler: Handler,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub calls: Mutex<Vec<(String, Value)>>,
    pub closed: AtomicBool,
}

impl FakeProvider {
    /// Tools with a permissive object schema that echo `<provider>:<tool>`.
    pub fn new(name: &str, tools: &[&str]) -> Self {
        let owner = name.to_string();
        Self {
            name: name.to_string(),
            tools: tools
                .iter()
                .map(|t| RemoteTool {
                    name: t.to_string(),
                    description: format!("{t} via {name}"),
                    parameters: json!({"type": "object", "properties": {}}),
                })
                .collect(),
            ready: AtomicBool::new(true),
            handler: Box::new(move |tool, _| Ok(format!("{owner}:{tool}"))),
            delay: None,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn with_schema(mut self, tool: &str, schema: Value) -> Self {
        if let Some(t) = self.tools.iter_mut().find(|t| t.name == tool) {
            t.parameters = schema;
        }
        self
    }

    pub fn with_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str, &Value) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        self.handler = Box::new(handler);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ToolProvider for FakeProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn list_tools(&self) -> anyhow::Result<Vec<RemoteTool>> {
        if !self.is_ready() {
            anyhow::bail!("provider '{}' is not ready", self.name);
        }
        Ok(self.tools.clone())
    }

    async fn invoke(&self, tool: &str, arguments: Value) -> anyhow::Result<String> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.calls
            .lock()
            .unwrap()
            .push((tool.to_string(), arguments.clone()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let out = (self.handler)(tool, &arguments);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        out
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.set_ready(false);
    }
}

/// One recorded `chat` call.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub tools: Option<Vec<ToolDefinition>>,
}

/// An LLM that replays a script, then repeats `fallback` if set.
pub struct ScriptedLlm {
    script: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    fallback: Option<LlmResponse>,
    pub requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedLlm {
    pub fn new(script: Vec<Result<LlmResponse, LlmError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn repeating(response: LlmResponse) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Some(response),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        _model: &str,
        _config: &LlmRequestConfig,
    ) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            messages: messages.to_vec(),
            tools: tools.map(|t| t.to_vec()),
        });
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(step) => step,
            None => self.fallback.clone().ok_or(LlmError::EmptyResponse),
        }
    }

    fn default_model(&self) -> &str {
        "scripted"
    }

    fn display_name(&self) -> &str {
        "scripted"
    }
}

/// Shorthand for a model response requesting the given `(id, tool, args)` calls.
pub fn tool_calls(calls: &[(&str, &str, &str)]) -> LlmResponse {
    LlmResponse::with_tool_calls(
        calls
            .iter()
            .map(|(id, name, args)| ToolCall::new(*id, *name, *args))
            .collect(),
    )
}
