//! Stored retrieval entries and scored results.

use pip_rs_protocol::Wine;
use serde::{Deserialize, Serialize};

/// A passage from the education knowledge base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    pub id: String,
    #[serde(default)]
    pub heading: String,
    pub text: String,
    #[serde(default)]
    pub embedding: Vec<f32>,
}

impl KnowledgeChunk {
    pub fn new(id: impl Into<String>, heading: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            heading: heading.into(),
            text: text.into(),
            embedding: Vec::new(),
        }
    }

    /// Heading and text, used both for embedding and for prompts.
    pub fn render(&self) -> String {
        if self.heading.trim().is_empty() {
            self.text.clone()
        } else {
            format!("{}: {}", self.heading, self.text)
        }
    }
}

/// A knowledge chunk with its similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: KnowledgeChunk,
    pub score: f32,
}

/// A catalog wine with its stored embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(flatten)]
    pub wine: Wine,
    #[serde(default)]
    pub embedding: Vec<f32>,
}

/// A catalog wine with its similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredWine {
    pub wine: Wine,
    pub score: f32,
}
