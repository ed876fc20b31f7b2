//! Language-model access
//!
//! [`LlmClient`] is the single seam through which every model call flows.
//! [`StructuredCompletion`] layers schema validation and bounded retry on top.

mod client;
mod openai;
mod scripted;
mod structured;

pub use client::{Completion, CompletionRequest, LlmClient, ToolSpec};
pub use openai::OpenAiClient;
pub use scripted::ScriptedClient;
pub use structured::{
    parse_structured, StructuredCompletion, StructuredOutput, DEFAULT_MAX_ATTEMPTS,
};
