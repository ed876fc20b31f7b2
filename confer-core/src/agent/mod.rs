//! Sub-agents and delegation
//!
//! The Researcher and DevLead each run a bounded tool loop on a private
//! transcript. Controllers reach them through the [`Delegator`].

mod delegation;
pub mod prompts;
mod subagent;
mod types;

pub use delegation::{DelegationOutcome, Delegator};
pub use prompts::{render, Prompt, PromptContext};
pub use subagent::{
    find_path_token, render_transcript, CodeReader, SubAgent, CODE_READER_TOOL,
    DEFAULT_MAX_TOOL_ROUNDS,
};
pub use types::AgentKind;
