//! Errors raised while talking to the chat completion endpoint.

use thiserror::Error;

/// A failed chat completion request.
///
/// None of these are retried by the provider; the caller decides.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Connection, TLS or timeout failure.
    #[error("error calling LLM: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("error calling LLM: {status} {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The body was not a chat completion response.
    #[error("error parsing LLM response: {0}")]
    Decode(String),

    /// The response had no choices.
    #[error("LLM returned no choices")]
    EmptyResponse,
}
