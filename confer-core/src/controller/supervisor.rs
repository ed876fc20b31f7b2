//! Tool-calling supervisor
//!
//! The model sees the delegation tools and either answers in text or asks
//! for delegations. Requested delegations run one after another and their
//! results go back to the model until it answers or the iteration cap is hit.

use std::sync::Arc;

use async_trait::async_trait;

use super::{compose, with_system, Controller, Strategy, NOT_EXECUTED};
use crate::agent::{Delegator, Prompt, PromptContext};
use crate::llm::{CompletionRequest, LlmClient};
use crate::message::Message;
use crate::state::ConversationState;
use crate::workflow::{ControllerPhase, Decision};
use crate::Result;

pub struct SupervisorController {
    llm: Arc<dyn LlmClient>,
    delegator: Arc<Delegator>,
    max_iterations: usize,
    temperature: f32,
}

impl SupervisorController {
    pub fn new(llm: Arc<dyn LlmClient>, delegator: Arc<Delegator>) -> Self {
        Self {
            llm,
            delegator,
            max_iterations: 3,
            temperature: 0.0,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    async fn evaluate(&self, state: &mut ConversationState) -> Result<Decision> {
        state.iteration_count += 1;

        let request = CompletionRequest::new(with_system(
            Prompt::Supervisor,
            state,
            PromptContext::new(),
        ))
        .with_tools(self.delegator.specs())
        .with_temperature(self.temperature);

        let message = self.llm.complete(request).await?.into_message();
        let decision = if message.has_tool_calls() {
            Decision::Delegate
        } else {
            Decision::Answer
        };

        tracing::info!(
            iteration = state.iteration_count,
            delegations = message.tool_calls.len(),
            "Supervisor evaluated"
        );
        state.push(message);
        Ok(decision)
    }

    async fn delegate(&self, state: &mut ConversationState) {
        let calls = state
            .last_message()
            .map(|m| m.tool_calls.clone())
            .unwrap_or_default();

        for call in &calls {
            let outcome = self.delegator.dispatch(call).await;
            if let Some((kind, context)) = outcome.context {
                state.set_context(kind, context);
            }
            state.push(outcome.message);
        }
    }
}

/// Answer every call of the last message that has no result yet
fn close_pending_calls(state: &mut ConversationState) {
    let pending = match state.last_message() {
        Some(last) if last.has_tool_calls() => last.tool_calls.clone(),
        _ => return,
    };

    tracing::warn!(
        pending = pending.len(),
        iterations = state.iteration_count,
        "Iteration limit reached with pending delegations"
    );
    state.extend(
        pending
            .into_iter()
            .map(|call| Message::tool_result(call.id, NOT_EXECUTED)),
    );
}

#[async_trait]
impl Controller for SupervisorController {
    fn strategy(&self) -> Strategy {
        Strategy::Supervisor
    }

    async fn run(&self, state: &mut ConversationState) -> Result<()> {
        let mut phase = ControllerPhase::Evaluate;
        let mut decision = Decision::Answer;

        while !phase.is_terminal() {
            tracing::debug!(phase = %phase, iteration = state.iteration_count, "Supervisor step");
            match phase {
                ControllerPhase::Evaluate => decision = self.evaluate(state).await?,
                ControllerPhase::Delegate => self.delegate(state).await,
                ControllerPhase::Compose => {
                    close_pending_calls(state);
                    compose(self.llm.as_ref(), state, self.temperature).await?;
                }
                ControllerPhase::Finish => {}
            }
            phase = phase.next(decision, state.iteration_count, self.max_iterations);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::agent::AgentKind;
    use crate::llm::{Completion, ScriptedClient};
    use crate::message::{Role, ToolCall};
    use serde_json::json;

    fn delegation(id: &str, tool: &str, task: &str) -> Completion {
        Completion::tool_calls(vec![ToolCall::new(id, tool, json!({"task": task}))])
    }

    fn controller(client: Arc<ScriptedClient>, cap: usize) -> SupervisorController {
        SupervisorController::new(client.clone(), delegator(client)).with_max_iterations(cap)
    }

    fn evaluations(client: &ScriptedClient) -> usize {
        client
            .requests()
            .iter()
            .filter(|r| r.offers_tool("call_coder"))
            .count()
    }

    #[tokio::test]
    async fn test_direct_answer() {
        let client = Arc::new(ScriptedClient::new(vec![Completion::text("Hello!")]));
        let supervisor = controller(client.clone(), 3);

        let mut state = ConversationState::default();
        state.begin_turn("hi");
        supervisor.run(&mut state).await.unwrap();

        assert_eq!(state.final_answer().unwrap(), "Hello!");
        assert_eq!(state.iteration_count, 1);
        assert_eq!(state.message_log.len(), 2);
    }

    #[tokio::test]
    async fn test_iteration_cap_stops_after_exact_evaluations() {
        for cap in [1, 2, 3, 5] {
            let client = Arc::new(ScriptedClient::from_fn(|req| {
                if req.offers_tool("call_coder") {
                    Ok(delegation("again", "call_coder", "look again"))
                } else if is_compose(req) {
                    Ok(Completion::text("best effort answer"))
                } else if is_summary(req) {
                    Ok(Completion::text("code ctx"))
                } else {
                    Ok(Completion::text("sub-agent notes"))
                }
            }));
            let supervisor = controller(client.clone(), cap);

            let mut state = ConversationState::default();
            state.begin_turn("loop forever");
            supervisor.run(&mut state).await.unwrap();

            assert_eq!(evaluations(&client), cap, "cap {}", cap);
            assert_eq!(state.iteration_count, cap);
            assert_eq!(state.final_answer().unwrap(), "best effort answer");

            // Every call in the log has exactly one result
            let calls: usize = state.message_log.iter().map(|m| m.tool_calls.len()).sum();
            let results = state
                .message_log
                .iter()
                .filter(|m| m.role == Role::Tool)
                .count();
            assert_eq!(calls, results);
            assert!(state
                .message_log
                .iter()
                .any(|m| m.role == Role::Tool && m.text() == NOT_EXECUTED));
        }
    }

    #[tokio::test]
    async fn test_transcript_isolation() {
        let client = Arc::new(ScriptedClient::from_fn(|req| {
            if req.offers_tool("call_coder") {
                let results = req.messages.iter().filter(|m| m.role == Role::Tool).count();
                Ok(match results {
                    0 => delegation("d1", "call_researcher", "find papers on attention"),
                    1 => delegation("d2", "call_coder", "inspect the model code"),
                    _ => Completion::text("combined answer"),
                })
            } else if is_summary(req) {
                Ok(Completion::text(format!("summary of {}", req.messages[1].text().len())))
            } else if is_subagent(req) {
                // Several internal turns that must stay in the scratch log
                let turns = req.messages.len();
                if turns < 4 {
                    Ok(Completion::tool_calls(vec![ToolCall::new(
                        format!("inner{}", turns),
                        "nonexistent_tool",
                        json!({}),
                    )]))
                } else {
                    Ok(Completion::text(format!("done with {}", task_of(req))))
                }
            } else {
                Ok(Completion::text("unexpected"))
            }
        }));
        let supervisor = controller(client, 3);

        let mut state = ConversationState::default();
        state.begin_turn("How does attention work here?");
        let before = state.message_log.len();
        supervisor.run(&mut state).await.unwrap();

        // 2 delegation call/result pairs and the answer
        assert_eq!(state.message_log.len() - before, 5);
        assert!(state
            .message_log
            .iter()
            .all(|m| m.tool_calls.iter().all(|c| c.name.starts_with("call_"))));
        assert!(state.research_context.as_deref().unwrap().starts_with("summary of"));
        assert!(state.code_context.as_deref().unwrap().starts_with("summary of"));
        assert_eq!(state.final_answer().unwrap(), "combined answer");
    }

    #[tokio::test]
    async fn test_failed_delegation_keeps_context() {
        let client = Arc::new(ScriptedClient::from_fn(|req| {
            if req.offers_tool("call_coder") {
                if req.messages.iter().any(|m| m.role == Role::Tool) {
                    Ok(Completion::text("could not look"))
                } else {
                    Ok(delegation("d1", "call_coder", "read"))
                }
            } else {
                Err(crate::Error::Llm("connection refused".to_string()))
            }
        }));
        let supervisor = controller(client, 3);

        let mut state = ConversationState::default();
        state.code_context = Some("old".to_string());
        state.begin_turn("read it");
        supervisor.run(&mut state).await.unwrap();

        assert_eq!(state.code_context.as_deref(), Some("old"));
        let result = state
            .message_log
            .iter()
            .find(|m| m.role == Role::Tool)
            .unwrap();
        assert!(result.text().starts_with("Delegation to devlead failed"));
        assert_eq!(state.final_answer().unwrap(), "could not look");
    }

    #[tokio::test]
    async fn test_context_is_stored_by_agent() {
        let client = Arc::new(ScriptedClient::from_fn(|req| {
            if req.offers_tool("call_coder") {
                if req.messages.iter().any(|m| m.role == Role::Tool) {
                    Ok(Completion::text("answer"))
                } else {
                    Ok(delegation("d1", AgentKind::Research.tool_name(), "papers"))
                }
            } else if is_summary(req) {
                Ok(Completion::text("papers ctx"))
            } else {
                Ok(Completion::text("notes"))
            }
        }));
        let supervisor = controller(client.clone(), 3);

        let mut state = ConversationState::default();
        state.begin_turn("papers please");
        supervisor.run(&mut state).await.unwrap();

        assert_eq!(state.research_context.as_deref(), Some("papers ctx"));
        assert!(state.code_context.is_none());

        // The second evaluation sees the new context in its system prompt
        let second = client
            .requests()
            .into_iter()
            .filter(|r| r.offers_tool("call_coder"))
            .nth(1)
            .unwrap();
        assert!(second.system_text().unwrap().contains("papers ctx"));
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let client = Arc::new(ScriptedClient::new(Vec::new()));
        let supervisor = controller(client, 3);

        let mut state = ConversationState::default();
        state.begin_turn("hi");
        assert!(supervisor.run(&mut state).await.is_err());
    }
}
