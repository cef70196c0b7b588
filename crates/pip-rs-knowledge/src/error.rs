//! Error types for retrieval operations.

/// Errors returned by embedders and indexes.
#[derive(Debug, thiserror::Error)]
pub enum KnowledgeError {
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// A data file line could not be decoded.
    #[error("invalid record at {path}:{line}: {message}")]
    InvalidRecord {
        path: String,
        line: usize,
        message: String,
    },
    /// The embedding backend failed.
    #[error("embedding failed: {0}")]
    Embedding(String),
    /// Query and stored vectors disagree on dimension.
    #[error("embedding dimension mismatch (expected={expected}, actual={actual})")]
    DimensionMismatch { expected: usize, actual: usize },
    /// The index backend could not be reached.
    #[error("index unavailable: {0}")]
    Unavailable(String),
}
