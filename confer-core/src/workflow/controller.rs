//! Phases of one controller turn

use serde::{Deserialize, Serialize};

/// Where a controller turn currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ControllerPhase {
    /// Model call that decides what to do next
    #[default]
    Evaluate,
    /// Running the requested delegations
    Delegate,
    /// Writing the final answer with a tool-less model call
    Compose,
    /// Final answer is in the transcript
    Finish,
}

/// What the last evaluation decided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The model answered in text
    Answer,
    /// The model asked to stop without writing the answer itself
    Finish,
    /// The model asked for one or more delegations
    Delegate,
}

impl ControllerPhase {
    /// Next phase after this one
    ///
    /// `iteration` is the number of evaluations made so far in the turn.
    /// Reaching `cap` stops delegation regardless of the decision.
    pub fn next(self, decision: Decision, iteration: usize, cap: usize) -> ControllerPhase {
        match self {
            ControllerPhase::Evaluate => match decision {
                Decision::Answer => ControllerPhase::Finish,
                Decision::Finish => ControllerPhase::Compose,
                Decision::Delegate if iteration >= cap => ControllerPhase::Compose,
                Decision::Delegate => ControllerPhase::Delegate,
            },
            ControllerPhase::Delegate => ControllerPhase::Evaluate,
            ControllerPhase::Compose | ControllerPhase::Finish => ControllerPhase::Finish,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ControllerPhase::Evaluate => "Deciding next step",
            ControllerPhase::Delegate => "Delegating to sub-agents",
            ControllerPhase::Compose => "Composing final answer",
            ControllerPhase::Finish => "Finished",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ControllerPhase::Finish)
    }
}

impl std::fmt::Display for ControllerPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_finishes() {
        assert_eq!(
            ControllerPhase::Evaluate.next(Decision::Answer, 1, 3),
            ControllerPhase::Finish
        );
    }

    #[test]
    fn test_finish_request_composes() {
        assert_eq!(
            ControllerPhase::Evaluate.next(Decision::Finish, 1, 3),
            ControllerPhase::Compose
        );
    }

    #[test]
    fn test_delegate_under_cap() {
        assert_eq!(
            ControllerPhase::Evaluate.next(Decision::Delegate, 1, 3),
            ControllerPhase::Delegate
        );
        assert_eq!(
            ControllerPhase::Evaluate.next(Decision::Delegate, 2, 3),
            ControllerPhase::Delegate
        );
    }

    #[test]
    fn test_cap_forces_compose() {
        assert_eq!(
            ControllerPhase::Evaluate.next(Decision::Delegate, 3, 3),
            ControllerPhase::Compose
        );
        assert_eq!(
            ControllerPhase::Evaluate.next(Decision::Delegate, 1, 1),
            ControllerPhase::Compose
        );
    }

    #[test]
    fn test_loop_and_terminal() {
        assert_eq!(
            ControllerPhase::Delegate.next(Decision::Answer, 1, 3),
            ControllerPhase::Evaluate
        );
        assert_eq!(
            ControllerPhase::Compose.next(Decision::Delegate, 3, 3),
            ControllerPhase::Finish
        );
        assert!(ControllerPhase::Finish.is_terminal());
        assert!(!ControllerPhase::Compose.is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(ControllerPhase::Compose.to_string(), "Composing final answer");
    }
}
