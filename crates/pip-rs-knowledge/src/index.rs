//! Index interfaces and in-memory implementations backed by JSONL files.

use crate::embed::{Embedder, cosine_similarity};
use crate::error::KnowledgeError;
use crate::filter::CatalogFilter;
use crate::model::{CatalogEntry, KnowledgeChunk, ScoredChunk, ScoredWine};
use async_trait::async_trait;
use log::{debug, info};
use pip_rs_protocol::Wine;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Nearest-neighbour search over education passages.
#[async_trait]
pub trait KnowledgeIndex: Send + Sync {
    /// Return up to `top_k` chunks, most similar first.
    async fn search(
        &self,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, KnowledgeError>;
}

/// Nearest-neighbour search over the wine catalog.
#[async_trait]
pub trait CatalogIndex: Send + Sync {
    /// Return up to `top_k` wines passing `filter`, most similar first.
    async fn search(
        &self,
        embedding: &[f32],
        filter: &CatalogFilter,
        top_k: usize,
    ) -> Result<Vec<ScoredWine>, KnowledgeError>;

    /// Look up a wine by catalog id.
    async fn get(&self, wine_id: &str) -> Result<Option<Wine>, KnowledgeError>;

    /// Best name match: exact (case-insensitive) first, then the longest contained name.
    async fn find_by_name(&self, name: &str) -> Result<Option<Wine>, KnowledgeError>;
}

/// Knowledge chunks held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryKnowledgeIndex {
    chunks: Vec<KnowledgeChunk>,
}

impl InMemoryKnowledgeIndex {
    /// Wrap chunks that already carry embeddings.
    pub fn new(chunks: Vec<KnowledgeChunk>) -> Self {
        Self { chunks }
    }

    /// Embed every chunk lacking a vector, then build the index.
    pub async fn embedded(
        mut chunks: Vec<KnowledgeChunk>,
        embedder: &dyn Embedder,
    ) -> Result<Self, KnowledgeError> {
        for chunk in chunks.iter_mut().filter(|chunk| chunk.embedding.is_empty()) {
            chunk.embedding = embedder.embed(&chunk.render()).await?;
        }
        info!("built knowledge index (chunks={})", chunks.len());
        Ok(Self { chunks })
    }

    /// Load chunks from a JSONL file and embed any without vectors.
    pub async fn load_jsonl(
        path: impl AsRef<Path>,
        embedder: &dyn Embedder,
    ) -> Result<Self, KnowledgeError> {
        let chunks = read_jsonl::<KnowledgeChunk>(path.as_ref())?;
        Self::embedded(chunks, embedder).await
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

#[async_trait]
impl KnowledgeIndex for InMemoryKnowledgeIndex {
    async fn search(
        &self,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, KnowledgeError> {
        let mut scored = Vec::new();
        for chunk in &self.chunks {
            if chunk.embedding.is_empty() {
                continue;
            }
            let score = cosine_similarity(embedding, &chunk.embedding)?;
            scored.push(ScoredChunk {
                chunk: chunk.clone(),
                score,
            });
        }
        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.chunk.id.cmp(&b.chunk.id))
        });
        scored.truncate(top_k);
        debug!("knowledge search (returned={})", scored.len());
        Ok(scored)
    }
}

/// Catalog entries held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalogIndex {
    entries: Vec<CatalogEntry>,
}

impl InMemoryCatalogIndex {
    /// Wrap entries that already carry embeddings.
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// Embed each wine's descriptive text and build the index.
    pub async fn from_wines(
        wines: Vec<Wine>,
        embedder: &dyn Embedder,
    ) -> Result<Self, KnowledgeError> {
        let entries = wines
            .into_iter()
            .map(|wine| CatalogEntry {
                wine,
                embedding: Vec::new(),
            })
            .collect();
        Self::embedded(entries, embedder).await
    }

    /// Embed every entry lacking a vector, then build the index.
    pub async fn embedded(
        mut entries: Vec<CatalogEntry>,
        embedder: &dyn Embedder,
    ) -> Result<Self, KnowledgeError> {
        for entry in entries.iter_mut().filter(|entry| entry.embedding.is_empty()) {
            entry.embedding = embedder.embed(&entry.wine.embedding_text()).await?;
        }
        info!("built catalog index (wines={})", entries.len());
        Ok(Self { entries })
    }

    /// Load wines from a JSONL file and embed any without vectors.
    pub async fn load_jsonl(
        path: impl AsRef<Path>,
        embedder: &dyn Embedder,
    ) -> Result<Self, KnowledgeError> {
        let entries = read_jsonl::<CatalogEntry>(path.as_ref())?;
        Self::embedded(entries, embedder).await
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CatalogIndex for InMemoryCatalogIndex {
    async fn search(
        &self,
        embedding: &[f32],
        filter: &CatalogFilter,
        top_k: usize,
    ) -> Result<Vec<ScoredWine>, KnowledgeError> {
        let mut scored = Vec::new();
        for entry in &self.entries {
            if entry.embedding.is_empty() || !filter.matches(&entry.wine) {
                continue;
            }
            let score = cosine_similarity(embedding, &entry.embedding)?;
            scored.push(ScoredWine {
                wine: entry.wine.clone(),
                score,
            });
        }
        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.wine.id.cmp(&b.wine.id))
        });
        scored.truncate(top_k);
        debug!(
            "catalog search (filtered={}, returned={})",
            !filter.is_empty(),
            scored.len()
        );
        Ok(scored)
    }

    async fn get(&self, wine_id: &str) -> Result<Option<Wine>, KnowledgeError> {
        Ok(self
            .entries
            .iter()
            .find(|entry| entry.wine.id == wine_id)
            .map(|entry| entry.wine.clone()))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Wine>, KnowledgeError> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(None);
        }
        if let Some(entry) = self.entries.iter().find(|entry| {
            entry.wine.name.to_lowercase() == needle
                || entry.wine.display_name().to_lowercase() == needle
        }) {
            return Ok(Some(entry.wine.clone()));
        }
        let best = self
            .entries
            .iter()
            .filter(|entry| {
                let candidate = entry.wine.name.to_lowercase();
                needle.contains(&candidate) || candidate.contains(&needle)
            })
            .max_by_key(|entry| entry.wine.name.len());
        Ok(best.map(|entry| entry.wine.clone()))
    }
}

/// Read one JSON record per non-empty line.
fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, KnowledgeError> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|err| KnowledgeError::InvalidRecord {
            path: path.display().to_string(),
            line: idx + 1,
            message: err.to_string(),
        })?;
        records.push(record);
    }
    debug!(
        "read jsonl records (path={}, count={})",
        path.display(),
        records.len()
    );
    Ok(records)
}
