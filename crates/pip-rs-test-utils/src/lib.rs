//! Test helpers shared across Pip crates.

pub mod catalog;
pub mod completer;
pub mod embed;
pub mod history;
pub mod llm;
pub mod vision;

pub use catalog::{
    FailingCatalog, FailingKnowledge, StubKnowledge, sample_catalog, sample_wine, sample_wines,
};
pub use completer::{FailingCompleter, ScriptedCompleter};
pub use embed::{FailingEmbedder, KeywordEmbedder};
pub use history::{assistant_with_cellar, assistant_with_wines, wine_cards};
pub use llm::{FailingLLM, FixedChatResponse, FixedLLM};
pub use vision::{FailingVision, StubVision};
