//! Model-call abstraction

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::{Content, Message, ToolCall};
use crate::Result;

/// A tool the model may call, as advertised in a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object
    pub parameters: Value,
}

/// A chat-completion request
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolSpec>,
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Whether a tool with this name is offered
    pub fn offers_tool(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name == name)
    }

    /// Text of the first system message, if any
    pub fn system_text(&self) -> Option<String> {
        self.messages
            .iter()
            .find(|m| m.role == crate::message::Role::System)
            .map(Message::text)
    }
}

/// A model response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub content: Content,
    pub tool_calls: Vec<ToolCall>,
}

impl Completion {
    /// A plain text answer
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: Content::text(text),
            tool_calls: Vec::new(),
        }
    }

    /// A response that only requests tools
    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            content: Content::empty(),
            tool_calls: calls,
        }
    }

    /// Convert into the assistant message to append to a transcript
    pub fn into_message(self) -> Message {
        Message::assistant_with(self.content, self.tool_calls)
    }
}

/// Trait for model backends
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Run one completion
    async fn complete(&self, request: CompletionRequest) -> Result<Completion>;

    /// Name of the model being called
    fn model_name(&self) -> &str;
}
