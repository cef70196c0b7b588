//! Retrieval support for Pip: embeddings, the wine catalog, and the
//! education knowledge base.

pub mod embed;
pub mod error;
pub mod filter;
pub mod index;
pub mod model;

/// Embedding interface.
pub use embed::{Embedder, cosine_similarity};
/// Knowledge error type.
pub use error::KnowledgeError;
/// Hard catalog filters.
pub use filter::CatalogFilter;
/// Index interfaces and in-memory implementations.
pub use index::{CatalogIndex, InMemoryCatalogIndex, InMemoryKnowledgeIndex, KnowledgeIndex};
/// Stored entries and scored results.
pub use model::{CatalogEntry, KnowledgeChunk, ScoredChunk, ScoredWine};
