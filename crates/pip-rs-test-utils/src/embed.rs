//! Deterministic embedders.

use async_trait::async_trait;
use pip_rs_knowledge::{Embedder, KnowledgeError};

const DIMENSIONS: usize = 256;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "the", "of", "for", "with", "to", "in", "on", "is", "it", "me", "my", "i",
    "that", "this", "wine", "wines",
];

/// Hashed bag-of-words embedder: texts sharing words land close together.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordEmbedder;

impl KeywordEmbedder {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous form, handy for building fixtures.
    pub fn vector(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; DIMENSIONS];
        for token in text
            .to_lowercase()
            .split(|ch: char| !ch.is_alphanumeric())
            .filter(|token| !token.is_empty() && !STOPWORDS.contains(token))
        {
            let stem = token
                .strip_suffix('s')
                .filter(|stem| stem.len() > 3)
                .unwrap_or(token);
            vector[bucket(stem)] += 1.0;
        }
        vector
    }
}

fn bucket(token: &str) -> usize {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in token.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    (hash % DIMENSIONS as u64) as usize
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, KnowledgeError> {
        Ok(Self::vector(text))
    }
}

/// Fails every embedding call.
#[derive(Debug, Clone, Default)]
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, KnowledgeError> {
        Err(KnowledgeError::Embedding("embedding service offline".to_string()))
    }
}
