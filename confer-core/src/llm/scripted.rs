//! Deterministic model stand-in
//!
//! Replays a fixed script of completions, or answers through a closure that
//! sees each request. Every request is recorded so callers can assert on
//! what was sent.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::client::{Completion, CompletionRequest, LlmClient};
use crate::{Error, Result};

type Responder = Box<dyn Fn(&CompletionRequest) -> Result<Completion> + Send + Sync>;

enum Script {
    Queue(Mutex<VecDeque<Result<Completion>>>),
    Responder(Responder),
}

/// An [`LlmClient`] driven by a script
pub struct ScriptedClient {
    script: Script,
    requests: Mutex<Vec<CompletionRequest>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ScriptedClient {
    /// Answer successive requests with `responses`, in order
    pub fn new(responses: Vec<Completion>) -> Self {
        Self::from_results(responses.into_iter().map(Ok).collect())
    }

    /// Like [`ScriptedClient::new`] but entries may be errors
    pub fn from_results(results: Vec<Result<Completion>>) -> Self {
        Self {
            script: Script::Queue(Mutex::new(results.into())),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer every request by calling `responder`
    pub fn from_fn<F>(responder: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Result<Completion> + Send + Sync + 'static,
    {
        Self {
            script: Script::Responder(Box::new(responder)),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        lock(&self.requests).clone()
    }

    /// Number of requests received so far
    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        let result = match &self.script {
            Script::Queue(queue) => lock(queue)
                .pop_front()
                .unwrap_or_else(|| Err(Error::Llm("script exhausted".to_string()))),
            Script::Responder(responder) => responder(&request),
        };
        lock(&self.requests).push(request);
        result
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
