//! Error types for the assistant core.

use crate::store::StoreError;
use pip_rs_knowledge::KnowledgeError;
use pip_rs_protocol::{IntentKind, PipelineState, ServiceError};
use thiserror::Error;

/// Errors raised while handling a turn.
///
/// These never reach the caller as-is: the orchestrator logs them and
/// answers with a generic message.
#[derive(Debug, Error)]
pub enum PipCoreError {
    /// Catalog or knowledge retrieval failed.
    #[error("retrieval error: {0}")]
    Retrieval(#[from] KnowledgeError),
    /// Completer or vision service failed.
    #[error("service error: {0}")]
    Service(#[from] ServiceError),
    /// Cellar or profile persistence failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    /// The turn state machine was driven out of order.
    #[error("invalid pipeline transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: PipelineState,
        to: PipelineState,
    },
    /// A per-user intent reached a handler without a user id.
    #[error("intent {0} requires a signed-in user")]
    Unauthenticated(IntentKind),
    /// A required collaborator was not supplied to the builder.
    #[error("missing component: {0}")]
    MissingComponent(&'static str),
    /// Model output or stored data could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),
}
