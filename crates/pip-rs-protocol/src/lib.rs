//! Shared data model for Pip: messages, cards, intents, wines, and turn envelopes.

mod card;
mod cellar;
mod exchange;
mod intent;
mod service;
mod wine;

pub use card::{Action, ActionKind, Card, CellarCard, ProfileCard, WineCard};
pub use cellar::{BottleStatus, CellarBottle, PriceComfort, StoredPreferences, UserProfile};
pub use exchange::{
    Attachment, ConfirmationAction, ConfirmationRequest, PendingClarification, PipelineState,
    ProcessRequest, ProcessResponse, RecordedAction,
};
pub use intent::{
    AmbiguityReason, CorrectionMode, Entities, Intent, IntentKind, ResolvedReference,
};
pub use service::{
    Completer, CompletionRequest, LabelAnalysis, LabelAttributes, ServiceError, VisionService,
};
pub use wine::{PriceRange, Provenance, SearchQuery, Wine, WineRecommendation, WineType};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Speaker of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// Immutable conversation entry supplied by the caller as history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(default)]
    pub actions: Vec<Action>,
    /// Intent that produced an assistant message.
    #[serde(default)]
    pub intent: Option<IntentKind>,
    /// Mutation performed by an assistant message, used for undo and amend.
    #[serde(default)]
    pub recorded_action: Option<RecordedAction>,
    /// Clarification asked by an assistant message.
    #[serde(default)]
    pub clarification: Option<PendingClarification>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            text: text.into(),
            timestamp: Utc::now(),
            cards: Vec::new(),
            actions: Vec::new(),
            intent: None,
            recorded_action: None,
            clarification: None,
        }
    }

    pub fn with_cards(mut self, cards: Vec<Card>) -> Self {
        self.cards = cards;
        self
    }

    pub fn with_recorded_action(mut self, action: RecordedAction) -> Self {
        self.recorded_action = Some(action);
        self
    }

    pub fn with_clarification(mut self, clarification: PendingClarification) -> Self {
        self.clarification = Some(clarification);
        self
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }
}
