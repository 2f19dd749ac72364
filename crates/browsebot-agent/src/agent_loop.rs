//! Agent loop: the LLM ↔ tool-calling main loop.
//!
//! One user turn: send history plus the tool catalog to the model, execute
//! whatever tools it asks for, feed the results back, and repeat until it
//! answers in plain text or the round limit is hit.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use browsebot_core::config::AgentConfig;
use browsebot_core::types::{Message, ToolCallRequest};
use browsebot_providers::traits::{LlmProvider, LlmRequestConfig};

use crate::conversation::Conversation;
use crate::dispatcher::Dispatcher;
use crate::error::AgentError;
use crate::tools::ToolRegistry;

/// Where a turn currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnState {
    AwaitingModel,
    ExecutingTools,
    Done,
    Aborted,
}

/// A completed turn.
#[derive(Clone, Debug, PartialEq)]
pub struct TurnOutcome {
    pub answer: String,
    /// Round trips to the model, including the final one.
    pub model_calls: u32,
    /// Tool calls executed across all rounds.
    pub tool_calls: usize,
}

/// Drives one conversation.
pub struct AgentLoop {
    provider: Arc<dyn LlmProvider>,
    registry: Arc<ToolRegistry>,
    dispatcher: Dispatcher,
    conversation: Conversation,
    model: String,
    system_prompt: String,
    request_config: LlmRequestConfig,
    max_tool_rounds: u32,
    state: TurnState,
}

impl AgentLoop {
    /// Create a loop over an already populated registry.
    ///
    /// An empty `config.model` falls back to the provider's default model.
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        registry: Arc<ToolRegistry>,
        config: &AgentConfig,
    ) -> Self {
        let model = if config.model.is_empty() {
            provider.default_model().to_string()
        } else {
            config.model.clone()
        };

        info!(
            model = %model,
            tools = registry.len(),
            max_tool_rounds = config.max_tool_rounds,
            "agent loop ready"
        );

        Self {
            dispatcher: Dispatcher::from_config(registry.clone(), config),
            provider,
            registry,
            conversation: Conversation::new(),
            model,
            system_prompt: config.system_prompt.clone(),
            request_config: LlmRequestConfig::from(config),
            max_tool_rounds: config.max_tool_rounds,
            state: TurnState::Done,
        }
    }

    /// Run one user turn to completion.
    ///
    /// On any error the conversation is restored to what it was before the
    /// call; the messages produced so far travel inside the error.
    pub async fn run_turn(
        &mut self,
        user_text: &str,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, AgentError> {
        let mark = self.conversation.len();
        self.conversation.add_user_message(user_text);

        let mut model_calls = 0u32;
        let mut tool_calls = 0usize;
        let mut rounds = 0u32;

        loop {
            self.state = TurnState::AwaitingModel;

            let messages = self.conversation.request_messages(&self.system_prompt);
            let tool_defs = self.registry.definitions();
            let tools = (!tool_defs.is_empty()).then_some(tool_defs.as_slice());

            debug!(round = rounds, messages = messages.len(), "LLM call");
            let response = match self
                .provider
                .chat(&messages, tools, &self.model, &self.request_config)
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    warn!(error = %e, "model request failed");
                    self.abort(mark);
                    return Err(AgentError::ModelTransport(e));
                }
            };
            model_calls += 1;

            if !response.has_tool_calls() {
                let answer = response.content.unwrap_or_default();
                self.conversation.add_assistant_message(answer.clone());
                self.state = TurnState::Done;
                info!(model_calls, tool_calls, "turn finished");
                return Ok(TurnOutcome {
                    answer,
                    model_calls,
                    tool_calls,
                });
            }

            let requests: Vec<ToolCallRequest> =
                response.tool_calls.iter().map(ToolCallRequest::from).collect();
            self.conversation
                .add_tool_calls(response.content, response.tool_calls);

            if rounds >= self.max_tool_rounds {
                warn!(rounds, "tool round limit reached");
                let transcript = self.abort(mark);
                return Err(AgentError::LoopBoundExceeded { rounds, transcript });
            }
            if cancel.is_cancelled() {
                info!(rounds, "turn cancelled before running tools");
                let transcript = self.abort(mark);
                return Err(AgentError::Cancelled { transcript });
            }
            rounds += 1;
            self.state = TurnState::ExecutingTools;

            let results = self.dispatcher.execute_round(&requests).await;
            tool_calls += results.len();
            for result in results {
                self.conversation.add_tool_result(result);
            }

            if cancel.is_cancelled() {
                info!(rounds, "turn cancelled");
                let transcript = self.abort(mark);
                return Err(AgentError::Cancelled { transcript });
            }
        }
    }

    /// Roll back to `mark` and return the dropped messages.
    fn abort(&mut self, mark: usize) -> Vec<Message> {
        self.state = TurnState::Aborted;
        self.conversation.rollback(mark)
    }

    /// Run a turn that cannot be cancelled and return only the answer.
    pub async fn run_once(&mut self, user_text: &str) -> Result<String, AgentError> {
        let outcome = self.run_turn(user_text, &CancellationToken::new()).await?;
        Ok(outcome.answer)
    }

    /// Forget the conversation so far.
    pub fn reset(&mut self) {
        self.conversation.clear();
        self.state = TurnState::Done;
    }

    pub fn history(&self) -> &[Message] {
        self.conversation.messages()
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
