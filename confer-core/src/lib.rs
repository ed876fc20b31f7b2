//! Confer Core - Core library for Confer multi-agent conversation
//!
//! A controller answers each user turn, delegating to a Researcher (paper
//! search) and a DevLead (repository inspection) as needed. Sub-agents work
//! on private transcripts and hand back one summarized context string.

pub mod agent;
pub mod config;
pub mod context;
pub mod controller;
pub mod error;
pub mod llm;
pub mod message;
pub mod orchestrator;
pub mod state;
pub mod store;
pub mod tools;
pub mod workflow;

pub use agent::{AgentKind, Delegator, SubAgent};
pub use config::{CliOverrides, Config};
pub use context::AppContext;
pub use controller::{Controller, Strategy};
pub use error::{Error, Result};
pub use message::{Content, ContentPart, Message, Role, ToolCall};
pub use orchestrator::Orchestrator;
pub use state::{ConversationState, ScratchState};
