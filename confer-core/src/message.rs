//! Role-tagged conversation messages
//!
//! Model responses arrive either as a plain string or as a list of mixed
//! parts. Both are captured by [`Content`], and [`Content::to_text`] is the
//! single place where content is flattened back into a string.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instruction injected by the orchestrator
    System,
    /// End-user input
    User,
    /// Model output
    Assistant,
    /// Result of a tool invocation
    Tool,
}

impl Role {
    /// Wire name used by chat-completion APIs
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One piece of message content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Plain text
    Text { text: String },
    /// Anything else the provider sent (reasoning blocks, images, decisions)
    Structured { kind: String, payload: Value },
}

/// Message content as an ordered list of parts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Content(Vec<ContentPart>);

impl Content {
    /// Content made of a single text part
    pub fn text(text: impl Into<String>) -> Self {
        Self(vec![ContentPart::Text { text: text.into() }])
    }

    /// Content with no parts
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build content from parts
    pub fn from_parts(parts: Vec<ContentPart>) -> Self {
        Self(parts)
    }

    /// Append a structured part
    pub fn with_structured(mut self, kind: impl Into<String>, payload: Value) -> Self {
        self.0.push(ContentPart::Structured {
            kind: kind.into(),
            payload,
        });
        self
    }

    /// Interpret the `content` field of a chat-completion response
    ///
    /// Strings become one text part. Arrays are read element by element:
    /// strings and objects carrying `text` become text parts, everything
    /// else is kept as a structured part tagged with its `type`.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::empty(),
            Value::String(s) => Self::text(s.clone()),
            Value::Array(items) => Self(items.iter().map(part_from_json).collect()),
            other => Self(vec![part_from_json(other)]),
        }
    }

    /// The parts of this content
    pub fn parts(&self) -> &[ContentPart] {
        &self.0
    }

    /// Whether no text is present
    pub fn is_blank(&self) -> bool {
        self.to_text().trim().is_empty()
    }

    /// Flatten to a plain string
    ///
    /// Text parts are concatenated in order and structured parts are skipped.
    pub fn to_text(&self) -> String {
        self.0
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                ContentPart::Structured { .. } => None,
            })
            .collect()
    }

    /// Flatten model output to its answer
    ///
    /// Like [`Content::to_text`], but if the text wraps the answer in
    /// `<response>...</response>` (some providers prepend reasoning), only
    /// the wrapped answer is returned.
    pub fn answer_text(&self) -> String {
        let joined = self.to_text();
        match unwrap_envelope(&joined) {
            Some(inner) => inner.trim().to_string(),
            None => joined,
        }
    }
}

fn part_from_json(value: &Value) -> ContentPart {
    match value {
        Value::String(s) => ContentPart::Text { text: s.clone() },
        Value::Object(map) => {
            let kind = map.get("type").and_then(Value::as_str);
            let text = map.get("text").and_then(Value::as_str);
            match (kind, text) {
                (Some("text") | None, Some(text)) => ContentPart::Text {
                    text: text.to_string(),
                },
                _ => ContentPart::Structured {
                    kind: kind.unwrap_or("unknown").to_string(),
                    payload: value.clone(),
                },
            }
        }
        other => ContentPart::Structured {
            kind: "unknown".to_string(),
            payload: other.clone(),
        },
    }
}

fn unwrap_envelope(text: &str) -> Option<&str> {
    const OPEN: &str = "<response>";
    const CLOSE: &str = "</response>";

    let start = text.find(OPEN)? + OPEN.len();
    let len = text[start..].find(CLOSE)?;
    Some(&text[start..start + len])
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned id, echoed back in the result message
    pub id: String,
    /// Tool name
    pub name: String,
    /// Parsed JSON arguments
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// String argument by name
    pub fn str_arg(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(Value::as_str)
    }
}

/// A single entry in a transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Content,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn new(role: Role, content: Content) -> Self {
        Self {
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, Content::text(text))
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, Content::text(text))
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, Content::text(text))
    }

    /// Assistant message with arbitrary content and tool calls
    pub fn assistant_with(content: Content, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::new(Role::Assistant, content)
        }
    }

    /// Result of the tool call with the given id
    pub fn tool_result(tool_call_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::new(Role::Tool, Content::text(text))
        }
    }

    /// Normalized text of this message
    ///
    /// Only assistant content has its `<response>` envelope removed.
    pub fn text(&self) -> String {
        match self.role {
            Role::Assistant => self.content.answer_text(),
            _ => self.content.to_text(),
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Whether this is an assistant answer (no pending tool calls)
    pub fn is_final_answer(&self) -> bool {
        self.role == Role::Assistant && !self.has_tool_calls()
    }
}
