//! Sub-agent runner
//!
//! A sub-agent works on a private scratch transcript: it reasons, calls
//! tools, and finally collapses the transcript into one context string.
//! Only that string leaves the run.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::json;

use super::prompts::{render, Prompt, PromptContext};
use super::types::AgentKind;
use crate::llm::{CompletionRequest, LlmClient, ToolSpec};
use crate::message::{Message, Role, ToolCall};
use crate::state::ScratchState;
use crate::store::SummaryStore;
use crate::tools::{read_text, Sandbox, ToolRegistry};
use crate::workflow::{ReasonOutcome, SubAgentPhase};
use crate::Result;

/// Tool name that triggers a deep read
pub const CODE_READER_TOOL: &str = "call_code_reader";

/// Default number of tool rounds before a run must summarize
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 8;

const NOT_EXECUTED: &str = "Tool call not executed: tool budget for this task is spent.";

/// File summarizer used by the DevLead
///
/// Summaries are memoized in a [`SummaryStore`] by content hash.
#[derive(Clone)]
pub struct CodeReader {
    sandbox: Sandbox,
    summaries: Arc<dyn SummaryStore>,
}

impl CodeReader {
    pub fn new(sandbox: Sandbox, summaries: Arc<dyn SummaryStore>) -> Self {
        Self { sandbox, summaries }
    }

    /// How the code reader is advertised to the model
    pub fn spec() -> ToolSpec {
        ToolSpec {
            name: CODE_READER_TOOL.to_string(),
            description: "Read a source file and summarize what its code does.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "filepath": {
                        "type": "string",
                        "description": "Path relative to the project root"
                    }
                },
                "required": ["filepath"]
            }),
        }
    }
}

/// A Researcher or DevLead
pub struct SubAgent {
    kind: AgentKind,
    llm: Arc<dyn LlmClient>,
    tools: ToolRegistry,
    code_reader: Option<CodeReader>,
    max_tool_rounds: usize,
    temperature: f32,
}

impl SubAgent {
    pub fn new(kind: AgentKind, llm: Arc<dyn LlmClient>, tools: ToolRegistry) -> Self {
        Self {
            kind,
            llm,
            tools,
            code_reader: None,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            temperature: 0.0,
        }
    }

    /// Enable deep reads through `call_code_reader`
    pub fn with_code_reader(mut self, reader: CodeReader) -> Self {
        self.code_reader = Some(reader);
        self
    }

    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    /// Tools advertised to the model
    pub fn tool_specs(&self) -> Vec<ToolSpec> {
        let mut specs = self.tools.specs();
        if self.code_reader.is_some() {
            specs.push(CodeReader::spec());
        }
        specs
    }

    /// Run to completion and return the derived context
    ///
    /// Model failures end the run with an error; tool failures are text
    /// inside the scratch transcript.
    pub async fn run(&self, scratch: ScratchState) -> Result<String> {
        let mut scratch = scratch;
        let system = Message::system(render(Prompt::system_for(self.kind), &PromptContext::new()));
        let task = PromptContext::new()
            .with_query(scratch.current_user_query.clone())
            .with_contexts(
                scratch.research_context.as_deref(),
                scratch.code_context.as_deref(),
            );
        scratch.message_log.push(Message::user(render(Prompt::Task, &task)));

        let mut phase = SubAgentPhase::Reason;
        let mut outcome = ReasonOutcome::Answer;
        let mut rounds = 0;
        let mut context = String::new();

        while !phase.is_terminal() {
            tracing::debug!(agent = self.kind.name(), phase = %phase, rounds, "Sub-agent step");
            let budget_spent = rounds >= self.max_tool_rounds;

            match phase {
                SubAgentPhase::Reason => {
                    let mut messages = Vec::with_capacity(scratch.message_log.len() + 1);
                    messages.push(system.clone());
                    messages.extend(scratch.message_log.iter().cloned());
                    let request = CompletionRequest::new(messages)
                        .with_tools(self.tool_specs())
                        .with_temperature(self.temperature);

                    let message = self.llm.complete(request).await?.into_message();
                    outcome = ReasonOutcome::of(&message, CODE_READER_TOOL);
                    let pending = message.tool_calls.clone();
                    scratch.message_log.push(message);

                    if budget_spent && outcome != ReasonOutcome::Answer {
                        tracing::warn!(
                            agent = self.kind.name(),
                            rounds,
                            "Tool budget spent, summarizing"
                        );
                        scratch.message_log.extend(
                            pending
                                .iter()
                                .map(|call| Message::tool_result(call.id.clone(), NOT_EXECUTED)),
                        );
                    }
                }
                SubAgentPhase::DispatchTools | SubAgentPhase::DeepRead => {
                    rounds += 1;
                    let calls = scratch
                        .message_log
                        .last()
                        .map(|m| m.tool_calls.clone())
                        .unwrap_or_default();
                    for call in &calls {
                        let result = if call.name == CODE_READER_TOOL {
                            self.deep_read(call, &scratch.current_user_query).await
                        } else {
                            self.tools.dispatch(call).await
                        };
                        scratch.message_log.push(result);
                    }
                }
                SubAgentPhase::Summarize => {
                    context = self.summarize(&scratch.message_log).await?;
                }
                SubAgentPhase::Done => {}
            }

            phase = phase.next(outcome, budget_spent);
        }

        tracing::info!(
            agent = self.kind.name(),
            rounds,
            transcript = scratch.message_log.len(),
            "Sub-agent finished"
        );
        Ok(context)
    }

    /// Answer a `call_code_reader` call with a summary of the file
    async fn deep_read(&self, call: &ToolCall, query: &str) -> Message {
        let text = match &self.code_reader {
            Some(reader) => self.read_and_summarize(reader, call, query).await,
            None => format!("Unknown tool: {}", call.name),
        };
        Message::tool_result(call.id.clone(), text)
    }

    async fn read_and_summarize(
        &self,
        reader: &CodeReader,
        call: &ToolCall,
        query: &str,
    ) -> String {
        let target = call
            .str_arg("filepath")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .or_else(|| find_path_token(query));
        let Some(target) = target else {
            return "No file provided.".to_string();
        };

        let content = match read_text(&reader.sandbox, target).await {
            Ok(content) => content,
            Err(text) => return text,
        };

        match reader.summaries.get(&content).await {
            Ok(Some(summary)) => {
                tracing::debug!(path = target, "Summary cache hit");
                return summary;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(path = target, error = %e, "Summary cache lookup failed");
            }
        }

        let request = CompletionRequest::new(vec![
            Message::system(render(Prompt::CodeReader, &PromptContext::new())),
            Message::user(format!("Path: {}\n\n{}", target, content)),
        ])
        .with_temperature(self.temperature);

        let summary = match self.llm.complete(request).await {
            Ok(completion) => completion.content.answer_text(),
            Err(e) => {
                tracing::warn!(path = target, error = %e, "Code summary failed");
                return format!("Unable to summarize {}: {}", target, e);
            }
        };

        let stored_path = reader
            .sandbox
            .resolve(target)
            .map(|p| reader.sandbox.relative(&p).display().to_string())
            .unwrap_or_else(|_| target.to_string());
        if let Err(e) = reader
            .summaries
            .put(&content, &summary, Some(&stored_path))
            .await
        {
            tracing::warn!(path = target, error = %e, "Failed to cache summary");
        }

        summary
    }

    /// Collapse the scratch transcript into the context string
    async fn summarize(&self, transcript: &[Message]) -> Result<String> {
        let request = CompletionRequest::new(vec![
            Message::system(render(Prompt::summary_for(self.kind), &PromptContext::new())),
            Message::user(render_transcript(transcript)),
        ])
        .with_temperature(self.temperature);

        Ok(self.llm.complete(request).await?.content.answer_text())
    }
}

/// Plain-text rendering of a transcript for summarization
pub fn render_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|message| {
            let speaker = match message.role {
                Role::System => "System",
                Role::User => "Human",
                Role::Assistant => "AI",
                Role::Tool => "Tool",
            };
            let mut line = format!("{}: {}", speaker, message.text());
            for call in &message.tool_calls {
                line.push_str(&format!("\n[called {} with {}]", call.name, call.arguments));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Path-like token: `name.ext`, optionally with directories
static PATH_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\w./-]+\.[A-Za-z0-9]+").expect("path pattern is valid"));

/// First path-like token in `text`
pub fn find_path_token(text: &str) -> Option<&str> {
    PATH_TOKEN.find(text).map(|m| m.as_str())
}
