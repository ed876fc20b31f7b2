//! Tools the sub-agents can call
//!
//! A tool takes JSON arguments and always answers with text. Failures inside
//! a tool (missing files, git errors, a failed search) are reported as text
//! so the next model turn can react to them; they never surface as [`Error`].
//!
//! [`Error`]: crate::Error

mod fs;
mod git;
mod papers;
mod sandbox;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::llm::ToolSpec;
use crate::message::{Message, ToolCall};

pub use fs::{read_text, ListDirectoryTool, ReadFileTool};
pub use git::{FileHistoryTool, GitHistoryTool};
pub use papers::{ArxivIndex, Paper, PaperIndex, SearchPapersTool};
pub use sandbox::{AccessDenied, Sandbox, ACCESS_DENIED};

/// A named action with a JSON argument schema and a text result
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the model uses to call this tool
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON schema of the arguments object
    fn parameters(&self) -> Value;

    /// Run the tool; never fails, failures are described in the text
    async fn call(&self, args: Value) -> String;

    /// How this tool is advertised to the model
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Deserialize tool arguments, describing the problem on failure
///
/// A missing arguments object is treated as `{}` so tools whose arguments
/// all have defaults can be called bare.
pub fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, String> {
    let args = match args {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(args).map_err(|e| format!("Invalid arguments for {}: {}", tool, e))
}

/// Tools available to one agent, looked up by name
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Tools of the Researcher: paper search
    pub fn researcher(index: Arc<dyn PaperIndex>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(SearchPapersTool::new(index)));
        registry
    }

    /// Tools of the DevLead: git history, file history, file read and listing
    pub fn devlead(sandbox: Sandbox) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(GitHistoryTool::new(sandbox.clone())));
        registry.register(Arc::new(FileHistoryTool::new(sandbox.clone())));
        registry.register(Arc::new(ReadFileTool::new(sandbox.clone())));
        registry.register(Arc::new(ListDirectoryTool::new(sandbox)));
        registry
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Registered tool names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Specs of every registered tool, sorted by name
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.values().map(|tool| tool.spec()).collect()
    }

    /// Run the tool a call names and wrap its text as the call's result
    pub async fn dispatch(&self, call: &ToolCall) -> Message {
        let text = match self.get(&call.name) {
            Some(tool) => {
                tracing::debug!(tool = %call.name, call_id = %call.id, "Dispatching tool");
                tool.call(call.arguments.clone()).await
            }
            None => {
                tracing::warn!(tool = %call.name, "Model requested an unknown tool");
                format!("Unknown tool: {}", call.name)
            }
        };
        Message::tool_result(call.id.clone(), text)
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
