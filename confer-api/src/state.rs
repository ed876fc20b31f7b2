//! Shared state for the HTTP handlers

use confer_core::Orchestrator;

/// State handed to every request
pub struct AppState {
    pub orchestrator: Orchestrator,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }
}
