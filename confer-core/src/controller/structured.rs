//! Structured-decision supervisor
//!
//! Each step the model must produce a [`SupervisorDecision`]. A `DELEGATE`
//! decision is recorded in the transcript as an assistant message carrying
//! a delegation call, followed by the call's result, so the log has the same
//! shape as under the tool-calling supervisor.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{compose, with_system, Controller, Strategy};
use crate::agent::{AgentKind, Delegator, Prompt, PromptContext};
use crate::llm::{LlmClient, StructuredCompletion, StructuredOutput, DEFAULT_MAX_ATTEMPTS};
use crate::message::{Content, Message, ToolCall};
use crate::state::ConversationState;
use crate::workflow::{ControllerPhase, Decision};
use crate::Result;

const DECISION_SCHEMA: &str = r#"{
  "reasoning": "string: why this step",
  "next_action": "DELEGATE | FINISH",
  "delegation": {
    "agent": "DEV | RESEARCH",
    "task": "string: what the agent should do"
  }
}
"delegation" is required for DELEGATE and omitted for FINISH."#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NextAction {
    Delegate,
    Finish,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegationRequest {
    pub agent: AgentKind,
    pub task: String,
}

/// One step chosen by the structured supervisor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupervisorDecision {
    #[serde(default)]
    pub reasoning: String,
    pub next_action: NextAction,
    #[serde(default)]
    pub delegation: Option<DelegationRequest>,
}

impl StructuredOutput for SupervisorDecision {
    fn schema_hint() -> &'static str {
        DECISION_SCHEMA
    }

    fn validate(&self) -> std::result::Result<(), String> {
        match (self.next_action, &self.delegation) {
            (NextAction::Delegate, None) => Err("DELEGATE requires a delegation".to_string()),
            (NextAction::Delegate, Some(d)) if d.task.trim().is_empty() => {
                Err("delegation task is empty".to_string())
            }
            _ => Ok(()),
        }
    }
}

pub struct StructuredController {
    llm: Arc<dyn LlmClient>,
    delegator: Arc<Delegator>,
    max_iterations: usize,
    max_attempts: usize,
    temperature: f32,
}

impl StructuredController {
    pub fn new(llm: Arc<dyn LlmClient>, delegator: Arc<Delegator>) -> Self {
        Self {
            llm,
            delegator,
            max_iterations: 3,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            temperature: 0.0,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    async fn decide(&self, state: &mut ConversationState) -> Result<SupervisorDecision> {
        state.iteration_count += 1;

        let messages = with_system(
            Prompt::StructuredSupervisor,
            state,
            PromptContext::new().with_schema(SupervisorDecision::schema_hint()),
        );
        let decision: SupervisorDecision = StructuredCompletion::new(self.llm.as_ref())
            .with_max_attempts(self.max_attempts)
            .with_temperature(self.temperature)
            .complete(messages)
            .await?;

        tracing::info!(
            iteration = state.iteration_count,
            action = ?decision.next_action,
            agent = ?decision.delegation.as_ref().map(|d| d.agent),
            "Structured supervisor decided"
        );
        Ok(decision)
    }

    async fn delegate(
        &self,
        state: &mut ConversationState,
        decision: &SupervisorDecision,
    ) -> Result<()> {
        let Some(request) = &decision.delegation else {
            return Ok(());
        };

        let call = ToolCall::new(
            format!("delegation_{}", state.iteration_count),
            request.agent.tool_name(),
            json!({"task": request.task}),
        );
        let payload = serde_json::to_value(decision)?;
        let content = Content::text(decision.reasoning.clone())
            .with_structured("supervisor_decision", payload);
        state.push(Message::assistant_with(content, vec![call.clone()]));

        let outcome = self.delegator.dispatch(&call).await;
        if let Some((kind, context)) = outcome.context {
            state.set_context(kind, context);
        }
        state.push(outcome.message);
        Ok(())
    }
}

#[async_trait]
impl Controller for StructuredController {
    fn strategy(&self) -> Strategy {
        Strategy::Structured
    }

    async fn run(&self, state: &mut ConversationState) -> Result<()> {
        let mut phase = ControllerPhase::Evaluate;
        let mut decision = Decision::Finish;
        let mut pending: Option<SupervisorDecision> = None;

        while !phase.is_terminal() {
            tracing::debug!(phase = %phase, iteration = state.iteration_count, "Structured step");
            match phase {
                ControllerPhase::Evaluate => {
                    let chosen = self.decide(state).await?;
                    decision = match chosen.next_action {
                        NextAction::Delegate => Decision::Delegate,
                        NextAction::Finish => Decision::Finish,
                    };
                    pending = Some(chosen);
                }
                ControllerPhase::Delegate => {
                    if let Some(chosen) = pending.take() {
                        self.delegate(state, &chosen).await?;
                    }
                }
                ControllerPhase::Compose => {
                    compose(self.llm.as_ref(), state, self.temperature).await?;
                }
                ControllerPhase::Finish => {}
            }
            phase = phase.next(decision, state.iteration_count, self.max_iterations);
        }

        Ok(())
    }
}
