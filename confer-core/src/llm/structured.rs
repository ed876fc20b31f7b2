//! Schema-validated completions with bounded retry
//!
//! Models do not always honor output-format instructions. Some wrap JSON in
//! code fences or put reasoning before it. The adapter first parses the raw
//! text as is, then a cleaned slice of it, and re-asks the model when both
//! attempts fail.

use serde::de::DeserializeOwned;

use super::client::{CompletionRequest, LlmClient};
use crate::message::Message;
use crate::{Error, Result};

/// Default number of model calls per structured completion
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// A result type the model must produce as JSON
pub trait StructuredOutput: DeserializeOwned + Send {
    /// JSON shape shown to the model in instructions
    fn schema_hint() -> &'static str;

    /// Checks that serde cannot express
    fn validate(&self) -> std::result::Result<(), String> {
        Ok(())
    }
}

/// Wraps an [`LlmClient`] to produce typed results
pub struct StructuredCompletion<'a> {
    client: &'a dyn LlmClient,
    max_attempts: usize,
    temperature: Option<f32>,
}

impl<'a> StructuredCompletion<'a> {
    pub fn new(client: &'a dyn LlmClient) -> Self {
        Self {
            client,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            temperature: None,
        }
    }

    /// Set the number of model calls before giving up (at least one)
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Ask the model until its answer parses as `T`
    ///
    /// Fails with [`Error::MalformedModelOutput`] after `max_attempts`
    /// calls. A failed call counts as an attempt.
    pub async fn complete<T: StructuredOutput>(&self, messages: Vec<Message>) -> Result<T> {
        let mut last_raw = String::new();

        for attempt in 1..=self.max_attempts {
            let mut request = CompletionRequest::new(messages.clone());
            request.temperature = self.temperature;

            match self.client.complete(request).await {
                Ok(completion) => {
                    let raw = completion.content.answer_text();
                    match parse_structured::<T>(&raw) {
                        Ok(value) => {
                            if attempt > 1 {
                                tracing::debug!(attempt, "Structured output parsed after retry");
                            }
                            return Ok(value);
                        }
                        Err(reason) => {
                            tracing::warn!(attempt, %reason, "Model output did not match schema");
                            last_raw = raw;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "Structured completion call failed");
                    last_raw = e.to_string();
                }
            }
        }

        Err(Error::MalformedModelOutput {
            attempts: self.max_attempts,
            raw: last_raw,
        })
    }
}

/// Parse model text into `T`, trying the raw text then a cleaned slice
pub fn parse_structured<T: StructuredOutput>(raw: &str) -> std::result::Result<T, String> {
    let first_error = match parse_and_validate::<T>(raw.trim()) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let cleaned = clean_json(raw);
    if cleaned == raw.trim() {
        return Err(first_error);
    }
    parse_and_validate::<T>(cleaned)
}

fn parse_and_validate<T: StructuredOutput>(text: &str) -> std::result::Result<T, String> {
    let value: T = serde_json::from_str(text).map_err(|e| e.to_string())?;
    value.validate()?;
    Ok(value)
}

/// Drop code fences and keep the outermost `{...}` span
fn clean_json(raw: &str) -> &str {
    let text = raw.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text).trim();

    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Completion, ScriptedClient};
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Pick {
        choice: String,
    }

    impl StructuredOutput for Pick {
        fn schema_hint() -> &'static str {
            r#"{"choice": "A" | "B"}"#
        }

        fn validate(&self) -> std::result::Result<(), String> {
            match self.choice.as_str() {
                "A" | "B" => Ok(()),
                other => Err(format!("unknown choice {}", other)),
            }
        }
    }

    fn ask() -> Vec<Message> {
        vec![Message::user("pick one")]
    }

    #[test]
    fn test_parse_plain_json() {
        let pick: Pick = parse_structured(r#"{"choice": "A"}"#).unwrap();
        assert_eq!(pick.choice, "A");
    }

    #[test]
    fn test_parse_fenced_json_with_chatter() {
        let raw = "Sure, here it is:\n```json\n{\"choice\": \"B\"}\n```\nHope that helps";
        let pick: Pick = parse_structured(raw).unwrap();
        assert_eq!(pick.choice, "B");
    }

    #[test]
    fn test_parse_rejects_invalid_value() {
        assert!(parse_structured::<Pick>(r#"{"choice": "C"}"#).is_err());
        assert!(parse_structured::<Pick>("no json here").is_err());
    }

    #[tokio::test]
    async fn test_valid_on_third_attempt() {
        let client = ScriptedClient::new(vec![
            Completion::text("not json"),
            Completion::text("{\"choice\": "),
            Completion::text(r#"{"choice": "A"}"#),
        ]);

        let pick: Pick = StructuredCompletion::new(&client)
            .complete(ask())
            .await
            .unwrap();

        assert_eq!(pick, Pick { choice: "A".into() });
        assert_eq!(client.call_count(), 3);
    }

    #[tokio::test]
    async fn test_always_invalid_fails_after_exactly_three_attempts() {
        let client = ScriptedClient::from_fn(|_| Ok(Completion::text("still not json")));

        let err = StructuredCompletion::new(&client)
            .complete::<Pick>(ask())
            .await
            .unwrap_err();

        match err {
            Error::MalformedModelOutput { attempts, raw } => {
                assert_eq!(attempts, 3);
                assert_eq!(raw, "still not json");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(client.call_count(), 3);
    }

    #[tokio::test]
    async fn test_call_failures_consume_attempts() {
        let client = ScriptedClient::from_results(vec![
            Err(Error::Llm("connection refused".into())),
            Ok(Completion::text(r#"{"choice": "B"}"#)),
        ]);

        let pick: Pick = StructuredCompletion::new(&client)
            .with_max_attempts(2)
            .complete(ask())
            .await
            .unwrap();
        assert_eq!(pick.choice, "B");
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_temperature_is_forwarded() {
        let client = ScriptedClient::new(vec![Completion::text(r#"{"choice": "A"}"#)]);
        let _: Pick = StructuredCompletion::new(&client)
            .with_temperature(0.0)
            .complete(ask())
            .await
            .unwrap();
        assert_eq!(client.requests()[0].temperature, Some(0.0));
    }
}
