//! State machines behind the agent loops
//!
//! Each loop is a phase enum with a pure `next` function. The runners in
//! [`crate::agent`] and [`crate::controller`] do the I/O for each phase and
//! ask the machine where to go next.

pub mod controller;
pub mod subagent;

pub use controller::{ControllerPhase, Decision};
pub use subagent::{ReasonOutcome, SubAgentPhase};
