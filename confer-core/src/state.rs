//! Conversation state shared by the controller and sub-agents

use serde::{Deserialize, Serialize};

use crate::agent::AgentKind;
use crate::message::{Message, Role};
use crate::{Error, Result};

/// Persisted state of one conversation thread
///
/// `message_log` is the record of what happened. The two context fields are
/// derived summaries from the most recent delegation to each sub-agent and
/// may be stale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    /// Append-only transcript across all turns
    pub message_log: Vec<Message>,
    /// Text of the turn currently being handled
    pub current_user_query: String,
    /// Latest Researcher summary
    pub research_context: Option<String>,
    /// Latest DevLead summary
    pub code_context: Option<String>,
    /// Controller evaluations in the current turn; never persisted
    #[serde(skip)]
    pub iteration_count: usize,
}

impl ConversationState {
    /// Start a new turn with the user's text
    ///
    /// Overwrites the current query, resets the iteration counter and
    /// appends the user message to the log.
    pub fn begin_turn(&mut self, query: impl Into<String>) {
        let query = query.into();
        self.current_user_query = query.clone();
        self.iteration_count = 0;
        self.message_log.push(Message::user(query));
    }

    /// Append one message
    pub fn push(&mut self, message: Message) {
        self.message_log.push(message);
    }

    /// Append several messages in order
    pub fn extend(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.message_log.extend(messages);
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.message_log.last()
    }

    /// Store the context produced by a sub-agent
    pub fn set_context(&mut self, kind: AgentKind, context: String) {
        match kind {
            AgentKind::Research => self.research_context = Some(context),
            AgentKind::Dev => self.code_context = Some(context),
        }
    }

    pub fn context_for(&self, kind: AgentKind) -> Option<&str> {
        match kind {
            AgentKind::Research => self.research_context.as_deref(),
            AgentKind::Dev => self.code_context.as_deref(),
        }
    }

    /// The answer of the turn: the last message, which must be assistant text
    pub fn final_answer(&self) -> Result<String> {
        let last = self
            .message_log
            .last()
            .ok_or_else(|| Error::ContractViolation("transcript is empty".to_string()))?;

        if last.role != Role::Assistant {
            return Err(Error::ContractViolation(format!(
                "last message has role {}, expected assistant",
                last.role
            )));
        }
        if last.has_tool_calls() {
            return Err(Error::ContractViolation(
                "last assistant message still requests tools".to_string(),
            ));
        }

        Ok(last.text())
    }
}

/// Ephemeral state of one sub-agent run
///
/// Created fresh for every delegation; only the summary it produces is
/// handed back to the parent.
#[derive(Debug, Clone, Default)]
pub struct ScratchState {
    pub message_log: Vec<Message>,
    pub current_user_query: String,
    /// Read-only reference copies of the parent's contexts
    pub research_context: Option<String>,
    pub code_context: Option<String>,
}

impl ScratchState {
    /// Scratch state for a delegated task with blank contexts
    pub fn for_task(task: impl Into<String>) -> Self {
        Self {
            current_user_query: task.into(),
            ..Default::default()
        }
    }

    /// Seed reference contexts from the parent state
    pub fn with_contexts(mut self, parent: &ConversationState) -> Self {
        self.research_context = parent.research_context.clone();
        self.code_context = parent.code_context.clone();
        self
    }
}
