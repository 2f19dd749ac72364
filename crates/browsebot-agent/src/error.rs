//! Error types for the registry, the dispatcher and the orchestration loop.

use browsebot_core::types::Message;
use browsebot_providers::LlmError;
use thiserror::Error;

/// Registration and lookup failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    /// `rejected` tried to expose a name `owner` already holds.
    #[error("Tool '{tool}' is already provided by '{owner}'; ignoring the one from '{rejected}'")]
    DuplicateTool {
        tool: String,
        owner: String,
        rejected: String,
    },

    #[error("Provider '{0}' is already registered")]
    DuplicateProvider(String),

    #[error("Tool '{0}' not found")]
    UnknownTool(String),

    #[error("Provider '{provider}' is unavailable: {reason}")]
    ProviderUnavailable { provider: String, reason: String },
}

/// Why a single tool call failed. Only ever rendered into a tool result.
#[derive(Debug, Error)]
pub enum ToolExecutionError {
    #[error(transparent)]
    Unresolved(#[from] RegistryError),

    #[error("Invalid arguments for '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("Arguments for '{tool}' do not match its schema: {violations}")]
    SchemaViolation { tool: String, violations: String },

    #[error("Tool '{tool}' timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },

    #[error("Tool '{tool}' failed: {source}")]
    Provider {
        tool: String,
        #[source]
        source: anyhow::Error,
    },
}

/// A turn that could not produce an answer.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    ModelTransport(#[from] LlmError),

    /// The model kept asking for tools past the round limit.
    #[error("gave up after {rounds} tool rounds without a final answer")]
    LoopBoundExceeded {
        rounds: u32,
        /// Messages produced during the aborted turn.
        transcript: Vec<Message>,
    },

    #[error("turn cancelled")]
    Cancelled { transcript: Vec<Message> },
}

impl AgentError {
    /// Partial transcript of the aborted turn, if any was kept.
    pub fn transcript(&self) -> &[Message] {
        match self {
            AgentError::LoopBoundExceeded { transcript, .. } | AgentError::Cancelled { transcript } => {
                transcript
            }
            AgentError::ModelTransport(_) => &[],
        }
    }
}
