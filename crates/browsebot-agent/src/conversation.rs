//! Conversation history for one agent session.
//!
//! Append-only during a turn. The system prompt is not stored here; it is
//! prepended when a request is built so it can change between sessions
//! without rewriting history.

use browsebot_core::types::{Message, ToolCall, ToolCallResult};

#[derive(Clone, Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user_message(&mut self, text: impl Into<String>) {
        self.messages.push(Message::user(text));
    }

    /// Final plain-text answer.
    pub fn add_assistant_message(&mut self, text: impl Into<String>) {
        self.messages.push(Message::assistant(text));
    }

    /// Assistant turn that requests tools. Must precede the matching results.
    pub fn add_tool_calls(&mut self, content: Option<String>, tool_calls: Vec<ToolCall>) {
        self.messages
            .push(Message::assistant_tool_calls(content, tool_calls));
    }

    pub fn add_tool_result(&mut self, result: ToolCallResult) {
        self.messages.push(result.into_message());
    }

    /// System prompt followed by the full history.
    pub fn request_messages(&self, system_prompt: &str) -> Vec<Message> {
        let mut out = Vec::with_capacity(self.messages.len() + 1);
        out.push(Message::system(system_prompt));
        out.extend(self.messages.iter().cloned());
        out
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drop everything after the first `len` messages and return it.
    pub fn rollback(&mut self, len: usize) -> Vec<Message> {
        if len >= self.messages.len() {
            return Vec::new();
        }
        self.messages.split_off(len)
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
