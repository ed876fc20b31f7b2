//! Delegation to sub-agents
//!
//! To the controller a delegation looks like any other tool: it takes a
//! `task` argument and answers with text. Underneath, a sub-agent runs on a
//! fresh scratch transcript and only its summary comes back.

use serde::Deserialize;
use serde_json::json;

use super::subagent::SubAgent;
use super::types::AgentKind;
use crate::llm::ToolSpec;
use crate::message::{Message, ToolCall};
use crate::state::{ConversationState, ScratchState};
use crate::tools::parse_args;
use crate::Result;

#[derive(Deserialize)]
struct DelegationArgs {
    task: String,
}

/// Result of dispatching one delegation tool call
#[derive(Debug, Clone, PartialEq)]
pub struct DelegationOutcome {
    /// Tool result message for the controller transcript
    pub message: Message,
    /// Context to store on the parent state, if the sub-agent produced one
    pub context: Option<(AgentKind, String)>,
}

/// The Researcher and DevLead behind the delegation tools
pub struct Delegator {
    researcher: SubAgent,
    devlead: SubAgent,
}

impl Delegator {
    pub fn new(researcher: SubAgent, devlead: SubAgent) -> Self {
        Self { researcher, devlead }
    }

    pub fn agent(&self, kind: AgentKind) -> &SubAgent {
        match kind {
            AgentKind::Research => &self.researcher,
            AgentKind::Dev => &self.devlead,
        }
    }

    /// Tool specs for `call_researcher` and `call_coder`
    pub fn specs(&self) -> Vec<ToolSpec> {
        AgentKind::all()
            .iter()
            .map(|kind| ToolSpec {
                name: kind.tool_name().to_string(),
                description: kind.description().to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "task": {
                            "type": "string",
                            "description": "Clear, specific description of the task"
                        }
                    },
                    "required": ["task"]
                }),
            })
            .collect()
    }

    /// Run a sub-agent on `task` and return its context string
    ///
    /// `reference` seeds the scratch state with read-only copies of the
    /// parent's contexts. The parent is never written to here.
    pub async fn delegate(
        &self,
        kind: AgentKind,
        task: &str,
        reference: Option<&ConversationState>,
    ) -> Result<String> {
        tracing::info!(agent = kind.name(), task, "Delegating task");

        let scratch = match reference {
            Some(parent) => ScratchState::for_task(task).with_contexts(parent),
            None => ScratchState::for_task(task),
        };
        self.agent(kind).run(scratch).await
    }

    /// Answer a delegation tool call
    ///
    /// The sub-agent starts with blank contexts; only `task` crosses over.
    /// Never fails: unknown names, bad arguments and sub-agent errors become
    /// the text of the tool result.
    pub async fn dispatch(&self, call: &ToolCall) -> DelegationOutcome {
        let Some(kind) = AgentKind::from_tool_name(&call.name) else {
            tracing::warn!(tool = %call.name, "Unknown delegation tool");
            return DelegationOutcome {
                message: Message::tool_result(
                    call.id.clone(),
                    format!("Unknown tool: {}", call.name),
                ),
                context: None,
            };
        };

        let args: DelegationArgs = match parse_args(&call.name, call.arguments.clone()) {
            Ok(args) => args,
            Err(text) => {
                return DelegationOutcome {
                    message: Message::tool_result(call.id.clone(), text),
                    context: None,
                }
            }
        };

        match self.delegate(kind, &args.task, None).await {
            Ok(context) if context.trim().is_empty() => DelegationOutcome {
                message: Message::tool_result(call.id.clone(), kind.empty_context()),
                context: None,
            },
            Ok(context) => DelegationOutcome {
                message: Message::tool_result(call.id.clone(), context.clone()),
                context: Some((kind, context)),
            },
            Err(e) => {
                tracing::warn!(agent = kind.name(), error = %e, "Delegation failed");
                DelegationOutcome {
                    message: Message::tool_result(
                        call.id.clone(),
                        format!("Delegation to {} failed: {}", kind.name(), e),
                    ),
                    context: None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Completion, ScriptedClient};
    use crate::tools::ToolRegistry;
    use std::sync::Arc;

    fn delegator(client: Arc<ScriptedClient>) -> Delegator {
        Delegator::new(
            SubAgent::new(AgentKind::Research, client.clone(), ToolRegistry::new()),
            SubAgent::new(AgentKind::Dev, client, ToolRegistry::new()),
        )
    }

    #[test]
    fn test_specs_require_task() {
        let client = Arc::new(ScriptedClient::new(Vec::new()));
        let specs = delegator(client).specs();
        let names: Vec<_> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["call_coder", "call_researcher"]);
        for spec in &specs {
            assert_eq!(spec.parameters["required"], json!(["task"]));
        }
    }

    #[tokio::test]
    async fn test_dispatch_returns_context() {
        let client = Arc::new(ScriptedClient::new(vec![
            Completion::text("found it"),
            Completion::text("research summary"),
        ]));
        let delegator = delegator(client.clone());

        let call = ToolCall::new("d1", "call_researcher", json!({"task": "find papers"}));
        let outcome = delegator.dispatch(&call).await;

        assert_eq!(outcome.message.tool_call_id.as_deref(), Some("d1"));
        assert_eq!(outcome.message.text(), "research summary");
        assert_eq!(
            outcome.context,
            Some((AgentKind::Research, "research summary".to_string()))
        );
    }

    #[tokio::test]
    async fn test_dispatch_starts_with_blank_contexts() {
        let client = Arc::new(ScriptedClient::new(vec![
            Completion::text("found it"),
            Completion::text("research summary"),
        ]));
        let delegator = delegator(client.clone());

        let call = ToolCall::new("d1", "call_researcher", json!({"task": "find papers"}));
        delegator.dispatch(&call).await;

        // Only the system prompt and the task reach the sub-agent
        let first = &client.requests()[0];
        assert_eq!(first.messages.len(), 2);
        let task = first.messages[1].text();
        assert!(task.contains("Context from the last research task:\n(none)"));
        assert!(task.contains("Context from the last coding task:\n(none)"));
        assert!(task.ends_with("find papers"));
    }

    #[tokio::test]
    async fn test_delegate_with_reference_sees_parent_contexts() {
        let client = Arc::new(ScriptedClient::new(vec![
            Completion::text("found it"),
            Completion::text("code summary"),
        ]));
        let delegator = delegator(client.clone());
        let mut parent = ConversationState::default();
        parent.code_context = Some("earlier code".to_string());

        let context = delegator
            .delegate(AgentKind::Dev, "explain", Some(&parent))
            .await
            .unwrap();

        assert_eq!(context, "code summary");
        let task = client.requests()[0].messages[1].text();
        assert!(task.contains("Context from the last coding task:\nearlier code"));
        // The parent is only read
        assert_eq!(parent.code_context.as_deref(), Some("earlier code"));
    }

    #[tokio::test]
    async fn test_blank_summary_reports_empty_context() {
        let client = Arc::new(ScriptedClient::new(vec![
            Completion::text("nothing"),
            Completion::text("   "),
        ]));
        let outcome = delegator(client)
            .dispatch(&ToolCall::new("d1", "call_coder", json!({"task": "look"})))
            .await;

        assert_eq!(outcome.message.text(), "No code context found");
        assert!(outcome.context.is_none());
    }

    #[tokio::test]
    async fn test_failures_become_text() {
        let client = Arc::new(ScriptedClient::new(Vec::new()));
        let delegator = delegator(client);

        let unknown = delegator
            .dispatch(&ToolCall::new("a", "call_nobody", json!({})))
            .await;
        assert_eq!(unknown.message.text(), "Unknown tool: call_nobody");

        let missing = delegator
            .dispatch(&ToolCall::new("b", "call_coder", json!({})))
            .await;
        assert!(missing.message.text().starts_with("Invalid arguments for call_coder"));

        let failed = delegator
            .dispatch(&ToolCall::new("c", "call_coder", json!({"task": "x"})))
            .await;
        assert!(failed.message.text().starts_with("Delegation to devlead failed"));
        assert!(failed.context.is_none());
    }
}
