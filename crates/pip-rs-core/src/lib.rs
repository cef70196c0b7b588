//! Core of the Pip wine assistant.
//!
//! This crate owns intent classification, the two-stage recommendation
//! pipeline (preference interpreter and wine searcher), cellar and profile
//! handling, and the orchestrator that routes one message per call.

pub mod classifier;
pub mod decide;
pub mod entities;
pub mod error;
pub mod explain;
pub mod history;
pub mod interpreter;
pub mod json;
pub mod lexicon;
pub mod llm;
pub mod orchestrator;
mod phrasing;
pub mod profile;
pub mod prompts;
pub mod searcher;
pub mod store;

/// Intent classification.
pub use classifier::{IntentClassifier, NEW_OR_CELLAR_QUESTION};
/// Bottle choice from the user's cellar.
pub use decide::{DecideOutcome, DecidePick, DecideRequest, decide};
/// Core error type.
pub use error::PipCoreError;
/// Deterministic recommendation explanations.
pub use explain::{Explanation, explain};
pub use history::ConversationWindow;
/// Agent 1: request to search query.
pub use interpreter::{Interpretation, PreferenceInterpreter};
/// Adapters from autoagents providers.
pub use llm::{LlmCompleter, LlmEmbedder};
/// Orchestrator facade.
pub use orchestrator::{Orchestrator, OrchestratorBuilder};
/// Agent 2: catalog search with relaxation.
pub use searcher::{Relaxation, SearchOutcome, WineSearcher, relax};
/// Cellar and profile persistence.
pub use store::{
    CellarStore, FileStore, InMemoryCellarStore, InMemoryProfileStore, ProfileStore, StoreError,
};
