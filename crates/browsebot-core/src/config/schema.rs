//! Configuration schema.
//!
//! Hierarchy: `Config` → `AgentConfig`, `LlmConfig`, `ToolsConfig`,
//! `Vec<McpServerConfig>`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.
//! We use `#[serde(rename_all = "camelCase")]` to handle the conversion.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default system prompt for the browsing agent.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a web research agent. \
Use the browser tools you are given to look things up, read pages and interact with sites \
on the user's behalf, then answer clearly and concisely in the same language the user wrote in. \
Do not close the browser or any tab (for example with browser_close) unless the user explicitly asks you to.";

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration, loaded from `~/.browsebot/config.json` + env vars.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub agent: AgentConfig,
    pub llm: LlmConfig,
    pub tools: ToolsConfig,
    pub mcp_servers: Vec<McpServerConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            agent: AgentConfig::default(),
            llm: LlmConfig::default(),
            tools: ToolsConfig::default(),
            mcp_servers: vec![McpServerConfig::playwright()],
        }
    }
}

impl Config {
    /// MCP servers that should be started.
    pub fn enabled_servers(&self) -> Vec<McpServerConfig> {
        self.mcp_servers
            .iter()
            .filter(|s| s.enabled)
            .cloned()
            .collect()
    }
}

// ─────────────────────────────────────────────
// Agent
// ─────────────────────────────────────────────

/// Orchestration loop settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentConfig {
    /// Model identifier sent with every chat completion request.
    pub model: String,
    /// Maximum tokens to generate per response.
    pub max_tokens: u32,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
    /// Maximum tool rounds per user turn before the turn is aborted.
    pub max_tool_rounds: u32,
    /// Per tool call timeout.
    pub tool_timeout_secs: u64,
    /// Tool output longer than this is truncated before it reaches the model.
    pub max_tool_output_chars: usize,
    pub system_prompt: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "llama3.1".to_string(),
            max_tokens: 4096,
            temperature: 0.7,
            max_tool_rounds: 10,
            tool_timeout_secs: 120,
            max_tool_output_chars: 8000,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

// ─────────────────────────────────────────────
// LLM endpoint
// ─────────────────────────────────────────────

/// OpenAI-compatible chat completion endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LlmConfig {
    /// Base URL; `/chat/completions` is appended.
    pub api_base: String,
    /// API key sent as a bearer token. Local servers accept any value.
    pub api_key: String,
    /// Extra HTTP headers to send with each request.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub extra_headers: HashMap<String, String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:11434/v1".to_string(),
            api_key: "ollama".to_string(),
            extra_headers: HashMap::new(),
        }
    }
}

// ─────────────────────────────────────────────
// Tools
// ─────────────────────────────────────────────

/// How the registry treats two providers exposing the same tool name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// First registration wins; the later tool is skipped and reported.
    #[default]
    Reject,
    /// Every tool is exposed as `<provider>__<tool>`.
    Prefix,
}

impl std::str::FromStr for CollisionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(CollisionPolicy::Reject),
            "prefix" => Ok(CollisionPolicy::Prefix),
            other => Err(format!("unknown collision policy '{other}'")),
        }
    }
}

/// Tool registry settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolsConfig {
    pub collision_policy: CollisionPolicy,
}

// ─────────────────────────────────────────────
// MCP servers
// ─────────────────────────────────────────────

/// One stdio MCP server to spawn at startup.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct McpServerConfig {
    /// Provider name; must be unique across servers.
    pub name: String,
    /// Executable to launch.
    pub command: String,
    pub args: Vec<String>,
    /// Extra environment for the child process.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
    pub enabled: bool,
    /// Bound on spawn + handshake + initial tool listing.
    pub startup_timeout_secs: u64,
}

impl Default for McpServerConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            command: String::new(),
            args: Vec::new(),
            env: HashMap::new(),
            enabled: true,
            startup_timeout_secs: 120,
        }
    }
}

impl McpServerConfig {
    /// Playwright MCP launched through `npx`, saving traces and sessions.
    pub fn playwright() -> Self {
        Self {
            name: "playwright".to_string(),
            command: "npx".to_string(),
            args: vec![
                "@playwright/mcp@latest".to_string(),
                "--output-dir=./playwright-artifacts".to_string(),
                "--save-trace".to_string(),
                "--save-session".to_string(),
            ],
            ..Default::default()
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
