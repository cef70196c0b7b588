//! Adapters from an autoagents LLM provider to the completer and embedder seams.

use async_trait::async_trait;
use autoagents_llm::LLMProvider;
use autoagents_llm::chat::{ChatMessage, ChatRole, MessageType};
use log::debug;
use pip_rs_knowledge::{Embedder, KnowledgeError};
use pip_rs_protocol::{Completer, CompletionRequest, ServiceError};
use std::sync::Arc;

/// Runs completion requests as a two-message chat (system, user).
#[derive(Clone)]
pub struct LlmCompleter {
    provider: Arc<dyn LLMProvider>,
}

impl LlmCompleter {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Completer for LlmCompleter {
    async fn complete(&self, request: CompletionRequest) -> Result<String, ServiceError> {
        let mut messages = Vec::with_capacity(2);
        if !request.system.trim().is_empty() {
            messages.push(ChatMessage {
                role: ChatRole::System,
                message_type: MessageType::Text,
                content: request.system,
            });
        }
        messages.push(ChatMessage {
            role: ChatRole::User,
            message_type: MessageType::Text,
            content: request.prompt,
        });
        let response = self
            .provider
            .chat_with_tools(&messages, None, None)
            .await
            .map_err(|err| ServiceError::Unavailable(err.to_string()))?;
        let text = response.text().unwrap_or_default();
        if text.trim().is_empty() {
            return Err(ServiceError::InvalidResponse("empty completion".to_string()));
        }
        debug!("completion finished (chars={})", text.len());
        Ok(text)
    }
}

/// Embeds text through the provider's embedding endpoint.
#[derive(Clone)]
pub struct LlmEmbedder {
    provider: Arc<dyn LLMProvider>,
}

impl LlmEmbedder {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Embedder for LlmEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, KnowledgeError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| KnowledgeError::Embedding("provider returned no vectors".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, KnowledgeError> {
        let vectors = self
            .provider
            .embed(texts.to_vec())
            .await
            .map_err(|err| KnowledgeError::Embedding(err.to_string()))?;
        if vectors.len() != texts.len() {
            return Err(KnowledgeError::Embedding(format!(
                "expected {} vectors, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pip_rs_test_utils::{FailingLLM, FixedLLM};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn completer_sends_system_and_user_messages() {
        let provider = Arc::new(FixedLLM::new("a crisp white"));
        let completer = LlmCompleter::new(provider.clone());
        let text = completer
            .complete(CompletionRequest::new("be brief", "what goes with oysters?"))
            .await
            .expect("completion");
        assert_eq!(text, "a crisp white");

        let captured = provider.last_messages.lock().clone();
        assert_eq!(captured.len(), 2);
        assert_eq!(captured[0].role, ChatRole::System);
        assert_eq!(captured[1].content, "what goes with oysters?");
    }

    #[tokio::test]
    async fn completer_maps_provider_failures() {
        let completer = LlmCompleter::new(Arc::new(FailingLLM::new("down")));
        let err = completer
            .complete(CompletionRequest::new("", "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unavailable(message) if message.contains("down")));

        let silent = LlmCompleter::new(Arc::new(FixedLLM::silent()));
        let err = silent
            .complete(CompletionRequest::new("", "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn embedder_returns_provider_vectors() {
        let embedder = LlmEmbedder::new(Arc::new(FixedLLM::new("").with_embedding(vec![0.5, 0.5])));
        assert_eq!(embedder.embed("rioja").await.expect("embed"), vec![0.5, 0.5]);

        let failing = LlmEmbedder::new(Arc::new(FailingLLM::new("no embeddings")));
        assert!(matches!(
            failing.embed("rioja").await.unwrap_err(),
            KnowledgeError::Embedding(_)
        ));
    }
}
