//! LLM Provider trait: the seam between the orchestration loop and the model.
//!
//! `HttpProvider` in `http_provider.rs` covers every OpenAI-compatible API;
//! tests substitute scripted in-memory providers.

use async_trait::async_trait;
use browsebot_core::config::AgentConfig;
use browsebot_core::types::{LlmResponse, Message, ToolDefinition};

use crate::error::LlmError;

/// Configuration passed to each LLM call.
#[derive(Clone, Debug)]
pub struct LlmRequestConfig {
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
}

impl Default for LlmRequestConfig {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 0.7,
        }
    }
}

impl From<&AgentConfig> for LlmRequestConfig {
    fn from(agent: &AgentConfig) -> Self {
        Self {
            max_tokens: agent.max_tokens,
            temperature: agent.temperature,
        }
    }
}

/// Trait that all LLM providers must implement.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a chat completion request.
    ///
    /// # Arguments
    /// * `messages`: Conversation history in OpenAI format.
    /// * `tools`   : Tool definitions the model may call; `None` sends none.
    /// * `model`   : Model identifier (e.g. `"llama3.1"`, `"gpt-4o"`).
    /// * `config`  : Temperature, max_tokens.
    ///
    /// # Returns
    /// An `LlmResponse` with content and/or tool calls, or an `LlmError`
    /// when the endpoint could not be reached or answered garbage.
    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        model: &str,
        config: &LlmRequestConfig,
    ) -> Result<LlmResponse, LlmError>;

    /// The default model for this provider instance.
    fn default_model(&self) -> &str;

    /// Display name for logging.
    fn display_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_config_from_agent_config() {
        let agent = AgentConfig {
            max_tokens: 512,
            temperature: 0.1,
            ..Default::default()
        };
        let cfg = LlmRequestConfig::from(&agent);
        assert_eq!(cfg.max_tokens, 512);
        assert_eq!(cfg.temperature, 0.1);
    }
}
