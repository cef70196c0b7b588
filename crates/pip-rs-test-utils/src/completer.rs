//! Completer fakes with scripted answers.

use async_trait::async_trait;
use parking_lot::Mutex;
use pip_rs_protocol::{Completer, CompletionRequest, ServiceError};
use std::sync::Arc;

/// Answers by the first rule whose needle appears in the system prompt or
/// the user prompt, falling back to a default. Every request is recorded.
#[derive(Debug, Clone, Default)]
pub struct ScriptedCompleter {
    rules: Vec<(String, String)>,
    fallback: String,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl ScriptedCompleter {
    /// A completer that answers everything with an empty string.
    pub fn new() -> Self {
        Self::default()
    }

    /// A completer that answers everything with `text`.
    pub fn fixed(text: impl Into<String>) -> Self {
        Self {
            fallback: text.into(),
            ..Self::default()
        }
    }

    /// Answer `response` whenever `needle` appears in the request.
    pub fn on(mut self, needle: impl Into<String>, response: impl Into<String>) -> Self {
        self.rules.push((needle.into(), response.into()));
        self
    }

    /// Requests seen so far, oldest first.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl Completer for ScriptedCompleter {
    async fn complete(&self, request: CompletionRequest) -> Result<String, ServiceError> {
        let answer = self
            .rules
            .iter()
            .find(|(needle, _)| request.system.contains(needle) || request.prompt.contains(needle))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| self.fallback.clone());
        self.requests.lock().push(request);
        Ok(answer)
    }
}

/// Fails every request as unavailable.
#[derive(Debug, Clone)]
pub struct FailingCompleter {
    message: String,
}

impl FailingCompleter {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl Completer for FailingCompleter {
    async fn complete(&self, _request: CompletionRequest) -> Result<String, ServiceError> {
        Err(ServiceError::Unavailable(self.message.clone()))
    }
}
