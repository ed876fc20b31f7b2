//! Phases of a sub-agent run

use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Where a sub-agent run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SubAgentPhase {
    /// Model call over the scratch transcript, possibly requesting tools
    #[default]
    Reason,
    /// Executing the requested tools
    DispatchTools,
    /// Reading and summarizing a file for the code reader
    DeepRead,
    /// Collapsing the scratch transcript into one context string
    Summarize,
    /// Context produced
    Done,
}

/// What the last `Reason` step produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonOutcome {
    /// Text with no tool calls
    Answer,
    /// One or more ordinary tool calls
    Tools,
    /// Tool calls including the code reader
    DeepRead,
}

impl ReasonOutcome {
    /// Classify an assistant message
    pub fn of(message: &Message, code_reader: &str) -> Self {
        if message.tool_calls.iter().any(|call| call.name == code_reader) {
            ReasonOutcome::DeepRead
        } else if message.has_tool_calls() {
            ReasonOutcome::Tools
        } else {
            ReasonOutcome::Answer
        }
    }
}

impl SubAgentPhase {
    /// Next phase after this one
    ///
    /// `outcome` only matters after `Reason`. Once `budget_spent` is set a
    /// run summarizes even if the model still asks for tools.
    pub fn next(self, outcome: ReasonOutcome, budget_spent: bool) -> SubAgentPhase {
        match self {
            SubAgentPhase::Reason => match outcome {
                ReasonOutcome::Answer => SubAgentPhase::Summarize,
                _ if budget_spent => SubAgentPhase::Summarize,
                ReasonOutcome::DeepRead => SubAgentPhase::DeepRead,
                ReasonOutcome::Tools => SubAgentPhase::DispatchTools,
            },
            SubAgentPhase::DispatchTools | SubAgentPhase::DeepRead => SubAgentPhase::Reason,
            SubAgentPhase::Summarize | SubAgentPhase::Done => SubAgentPhase::Done,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SubAgentPhase::Reason => "Reasoning over the task",
            SubAgentPhase::DispatchTools => "Running tools",
            SubAgentPhase::DeepRead => "Reading file for summary",
            SubAgentPhase::Summarize => "Summarizing findings",
            SubAgentPhase::Done => "Done",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SubAgentPhase::Done)
    }
}

impl std::fmt::Display for SubAgentPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}
