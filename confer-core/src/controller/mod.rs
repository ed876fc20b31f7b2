//! Top-level controllers
//!
//! A controller drives one conversation turn: it decides whether to delegate,
//! merges the returned contexts into the conversation state and leaves the
//! final answer as the last assistant message. Three designs share the
//! [`Controller`] trait and the same [`ConversationState`].

mod router;
mod structured;
mod supervisor;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::agent::{render, Delegator, Prompt, PromptContext};
use crate::config::OrchestratorConfig;
use crate::llm::{CompletionRequest, LlmClient};
use crate::message::Message;
use crate::state::ConversationState;
use crate::Result;

pub use router::{RouterController, RouterDecision};
pub use structured::{
    DelegationRequest, NextAction, StructuredController, SupervisorDecision,
};
pub use supervisor::SupervisorController;

/// Text of the tool result given to calls left pending by a forced stop
pub const NOT_EXECUTED: &str = "Delegation not executed: iteration limit reached.";

/// Which controller design runs a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Model bound to the delegation tools
    #[default]
    Supervisor,
    /// Model that emits a validated decision object each step
    Structured,
    /// One classification, one delegation
    Router,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Supervisor => "supervisor",
            Strategy::Structured => "structured",
            Strategy::Router => "router",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "supervisor" | "tools" => Ok(Strategy::Supervisor),
            "structured" => Ok(Strategy::Structured),
            "router" | "classifier" => Ok(Strategy::Router),
            _ => Err(format!(
                "Unknown strategy '{}': expected supervisor, structured or router",
                s
            )),
        }
    }
}

/// Drives one turn over a conversation state
///
/// On success the last message of `state.message_log` is the assistant
/// answer for the turn.
#[async_trait]
pub trait Controller: Send + Sync {
    fn strategy(&self) -> Strategy;

    async fn run(&self, state: &mut ConversationState) -> Result<()>;
}

/// Build the controller for `config.strategy`
pub fn build(
    config: &OrchestratorConfig,
    llm: Arc<dyn LlmClient>,
    delegator: Arc<Delegator>,
    temperature: f32,
) -> Box<dyn Controller> {
    match config.strategy {
        Strategy::Supervisor => Box::new(
            SupervisorController::new(llm, delegator)
                .with_max_iterations(config.max_iterations)
                .with_temperature(temperature),
        ),
        Strategy::Structured => Box::new(
            StructuredController::new(llm, delegator)
                .with_max_iterations(config.max_iterations)
                .with_max_attempts(config.max_structured_attempts)
                .with_temperature(temperature),
        ),
        Strategy::Router => Box::new(
            RouterController::new(llm, delegator).with_max_attempts(config.max_structured_attempts),
        ),
    }
}

/// Render `prompt` with the state's contexts and prepend it to the log
fn with_system(prompt: Prompt, state: &ConversationState, context: PromptContext) -> Vec<Message> {
    let context = context.with_contexts(
        state.research_context.as_deref(),
        state.code_context.as_deref(),
    );
    let mut messages = Vec::with_capacity(state.message_log.len() + 1);
    messages.push(Message::system(render(prompt, &context)));
    messages.extend(state.message_log.iter().cloned());
    messages
}

/// Write the final answer with one tool-less model call
async fn compose(
    llm: &dyn LlmClient,
    state: &mut ConversationState,
    temperature: f32,
) -> Result<()> {
    let request = CompletionRequest::new(with_system(Prompt::Compose, state, PromptContext::new()))
        .with_temperature(temperature);
    let completion = llm.complete(request).await?;

    tracing::debug!(iterations = state.iteration_count, "Composed final answer");
    state.push(Message::assistant_with(completion.content, Vec::new()));
    Ok(())
}
