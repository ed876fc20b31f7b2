//! Prompt templates
//!
//! Templates are embedded markdown files with `{{VARIABLE}}` placeholders.
//! Placeholders are filled in a single pass over the template, so values
//! that themselves contain braces are inserted verbatim.

use std::collections::HashMap;

use crate::agent::AgentKind;

const SUPERVISOR_PROMPT: &str = include_str!("prompts/supervisor.md");
const STRUCTURED_SUPERVISOR_PROMPT: &str = include_str!("prompts/structured_supervisor.md");
const ROUTER_PROMPT: &str = include_str!("prompts/router.md");
const RESEARCHER_PROMPT: &str = include_str!("prompts/researcher.md");
const DEVLEAD_PROMPT: &str = include_str!("prompts/devlead.md");
const TASK_PROMPT: &str = include_str!("prompts/task.md");
const CODE_READER_PROMPT: &str = include_str!("prompts/code_reader.md");
const SUMMARIZE_RESEARCH_PROMPT: &str = include_str!("prompts/summarize_research.md");
const SUMMARIZE_CODE_PROMPT: &str = include_str!("prompts/summarize_code.md");
const COMPOSE_PROMPT: &str = include_str!("prompts/compose.md");

/// Shown for a context that has not been produced yet
const NO_CONTEXT: &str = "(none)";

/// Which template to render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    /// Tool-calling controller
    Supervisor,
    /// Controller that answers with a decision object
    StructuredSupervisor,
    /// One-shot classifier
    Router,
    /// Researcher system prompt
    Researcher,
    /// DevLead system prompt
    DevLead,
    /// First user message of a sub-agent run
    Task,
    /// File summarizer
    CodeReader,
    SummarizeResearch,
    SummarizeCode,
    /// Final answer writer
    Compose,
}

impl Prompt {
    /// Raw template text
    pub fn template(&self) -> &'static str {
        match self {
            Prompt::Supervisor => SUPERVISOR_PROMPT,
            Prompt::StructuredSupervisor => STRUCTURED_SUPERVISOR_PROMPT,
            Prompt::Router => ROUTER_PROMPT,
            Prompt::Researcher => RESEARCHER_PROMPT,
            Prompt::DevLead => DEVLEAD_PROMPT,
            Prompt::Task => TASK_PROMPT,
            Prompt::CodeReader => CODE_READER_PROMPT,
            Prompt::SummarizeResearch => SUMMARIZE_RESEARCH_PROMPT,
            Prompt::SummarizeCode => SUMMARIZE_CODE_PROMPT,
            Prompt::Compose => COMPOSE_PROMPT,
        }
    }

    /// System prompt of a sub-agent
    pub fn system_for(kind: AgentKind) -> Prompt {
        match kind {
            AgentKind::Dev => Prompt::DevLead,
            AgentKind::Research => Prompt::Researcher,
        }
    }

    /// Transcript summarization prompt of a sub-agent
    pub fn summary_for(kind: AgentKind) -> Prompt {
        match kind {
            AgentKind::Dev => Prompt::SummarizeCode,
            AgentKind::Research => Prompt::SummarizeResearch,
        }
    }
}

/// Context for rendering a prompt template
#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    variables: HashMap<String, String>,
}

impl PromptContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    /// Set a variable value (builder pattern)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn with_query(self, query: impl Into<String>) -> Self {
        self.with("USER_QUERY", query)
    }

    /// Set both context sections; missing contexts render as "(none)"
    pub fn with_contexts(self, research: Option<&str>, code: Option<&str>) -> Self {
        let show = |ctx: Option<&str>| {
            ctx.map(str::trim)
                .filter(|c| !c.is_empty())
                .unwrap_or(NO_CONTEXT)
                .to_string()
        };
        self.with("RESEARCH_CONTEXT", show(research))
            .with("CODE_CONTEXT", show(code))
    }

    /// Set the JSON shape the model must answer with
    pub fn with_schema(self, schema: impl Into<String>) -> Self {
        self.with("SCHEMA", schema)
    }
}

/// Render a prompt with the given context
pub fn render(prompt: Prompt, context: &PromptContext) -> String {
    render_template(prompt.template(), context)
}

/// Fill `{{NAME}}` placeholders; unset ones become "(not specified)"
fn render_template(template: &str, context: &PromptContext) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(len) = after.find("}}") else {
            break;
        };
        let name = &after[..len];
        result.push_str(&rest[..start]);

        if !name.is_empty() && name.chars().all(|c| c.is_ascii_uppercase() || c == '_') {
            match context.variables.get(name) {
                Some(value) => result.push_str(value),
                None => result.push_str("(not specified)"),
            }
        } else {
            result.push_str(&rest[start..start + 2 + len + 2]);
        }
        rest = &after[len + 2..];
    }

    result.push_str(rest);
    result.trim_end().to_string()
}
