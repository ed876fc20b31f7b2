//! Classifier router
//!
//! One deterministic classification, one delegation, no loop.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{with_system, Controller, Strategy};
use crate::agent::{AgentKind, Delegator, Prompt, PromptContext};
use crate::llm::{LlmClient, StructuredCompletion, StructuredOutput, DEFAULT_MAX_ATTEMPTS};
use crate::message::Message;
use crate::state::ConversationState;
use crate::Result;

/// Which agent handles the query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterDecision {
    pub route: AgentKind,
}

impl StructuredOutput for RouterDecision {
    fn schema_hint() -> &'static str {
        r#"{"route": "DEV | RESEARCH"}"#
    }
}

pub struct RouterController {
    llm: Arc<dyn LlmClient>,
    delegator: Arc<Delegator>,
    max_attempts: usize,
}

impl RouterController {
    pub fn new(llm: Arc<dyn LlmClient>, delegator: Arc<Delegator>) -> Self {
        Self {
            llm,
            delegator,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Classify the current query
    ///
    /// Always sampled at temperature 0 so the same query and contexts give
    /// the same route.
    pub async fn classify(&self, state: &ConversationState) -> Result<AgentKind> {
        let messages = with_system(
            Prompt::Router,
            state,
            PromptContext::new().with_schema(RouterDecision::schema_hint()),
        );
        let decision: RouterDecision = StructuredCompletion::new(self.llm.as_ref())
            .with_max_attempts(self.max_attempts)
            .with_temperature(0.0)
            .complete(messages)
            .await?;
        Ok(decision.route)
    }
}

#[async_trait]
impl Controller for RouterController {
    fn strategy(&self) -> Strategy {
        Strategy::Router
    }

    async fn run(&self, state: &mut ConversationState) -> Result<()> {
        state.iteration_count += 1;

        let route = self.classify(state).await?;
        tracing::info!(route = %route, "Routed query");
        state.push(Message::assistant(format!("Route decision: {}", route)));

        let query = state.current_user_query.clone();
        let context = self.delegator.delegate(route, &query, Some(&*state)).await?;

        let answer = if context.trim().is_empty() {
            route.empty_context().to_string()
        } else {
            state.set_context(route, context.clone());
            context
        };
        state.push(Message::assistant(answer));
        Ok(())
    }
}
