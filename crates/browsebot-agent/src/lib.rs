//! Browsebot agent: tool registry, dispatcher, and the tool-calling loop.
//!
//! This crate contains:
//! - **tools**: the `ToolProvider` seam (implemented by MCP connections) and
//!   the `ToolRegistry` that merges provider catalogs into one namespace
//! - **dispatcher**: validation, routing and timeouts for tool calls
//! - **conversation**: message history for one session
//! - **agent_loop**: the LLM ↔ tool-calling main loop
//! - **bootstrap**: connecting configured servers at startup

pub mod agent_loop;
pub mod bootstrap;
pub mod conversation;
pub mod dispatcher;
pub mod error;
pub mod tools;

#[cfg(test)]
mod testing;

pub use agent_loop::{AgentLoop, TurnOutcome, TurnState};
pub use bootstrap::{init_registry, RegistryInit, StartupFailure};
pub use conversation::Conversation;
pub use dispatcher::Dispatcher;
pub use error::{AgentError, RegistryError, ToolExecutionError};
pub use tools::{ToolDescriptor, ToolProvider, ToolRegistry};
