//! Browsebot core: shared message types, configuration, and helpers.
//!
//! - **types**: OpenAI chat-completion wire types plus tool-call request/result
//! - **config**: `~/.browsebot/config.json` schema, loader, env overrides
//! - **utils**: data paths and string helpers

pub mod config;
pub mod types;
pub mod utils;
