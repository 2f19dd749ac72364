//! LLM provider layer for Browsebot.
//!
//! # Architecture
//!
//! - [`traits::LlmProvider`]: trait the orchestration loop talks to
//! - [`http_provider::HttpProvider`]: OpenAI-compatible `/chat/completions` client
//! - [`http_provider::create_provider`]: builder from the `llm` + `agent` config
//! - [`error::LlmError`]: transport failures surfaced to the loop

pub mod error;
pub mod http_provider;
pub mod traits;

pub use error::LlmError;
pub use http_provider::{create_provider, HttpProvider};
pub use traits::{LlmProvider, LlmRequestConfig};
