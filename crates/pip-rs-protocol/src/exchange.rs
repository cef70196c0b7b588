//! Request/response envelopes for a single conversational turn.

use crate::card::{Action, Card};
use crate::cellar::{BottleStatus, CellarBottle, UserProfile};
use crate::intent::{AmbiguityReason, Entities, IntentKind};
use crate::{Message, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Binary or remote attachment submitted with a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    /// MIME type, e.g. `image/jpeg`.
    pub media_type: String,
    /// Opaque reference understood by the vision service (URL, path, or base64).
    pub reference: String,
}

impl Attachment {
    pub fn image(reference: impl Into<String>) -> Self {
        Self {
            media_type: "image/jpeg".to_string(),
            reference: reference.into(),
        }
    }

    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }
}

/// Destructive action awaiting an explicit yes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationAction {
    RemoveBottle,
    ResetProfile,
}

/// Pending confirmation handed back to the caller and re-submitted with the next turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationRequest {
    pub id: Uuid,
    pub action: ConfirmationAction,
    pub target_id: String,
    pub target_name: String,
    pub destructive: bool,
    pub created_at: DateTime<Utc>,
}

impl ConfirmationRequest {
    pub fn new(
        action: ConfirmationAction,
        target_id: impl Into<String>,
        target_name: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            action,
            target_id: target_id.into(),
            target_name: target_name.into(),
            destructive: true,
            created_at: Utc::now(),
        }
    }
}

/// Reversible record of what an assistant turn did, carried on the message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordedAction {
    Recommend {
        request: String,
        entities: Entities,
    },
    CellarAdd {
        bottle_id: Uuid,
        wine_name: String,
        /// The entry did not exist before this add.
        created: bool,
        previous_quantity: u32,
        previous_status: BottleStatus,
    },
    CellarRemove {
        bottle: CellarBottle,
    },
    Rate {
        bottle_id: Uuid,
        wine_name: String,
        rating: f32,
        created: bool,
        previous_rating: Option<f32>,
        previous_notes: Option<String>,
        previous_status: BottleStatus,
        previous_quantity: u32,
    },
    ProfileReset {
        previous: UserProfile,
    },
}

impl RecordedAction {
    /// Short label used in logs and undo messages.
    pub fn describe(&self) -> String {
        match self {
            RecordedAction::Recommend { request, .. } => format!("recommendations for \"{request}\""),
            RecordedAction::CellarAdd { wine_name, .. } => format!("adding {wine_name}"),
            RecordedAction::CellarRemove { bottle } => {
                format!("removing {}", bottle.display_name())
            }
            RecordedAction::Rate {
                wine_name, rating, ..
            } => format!("rating {wine_name} {rating}/5"),
            RecordedAction::ProfileReset { .. } => "resetting your taste profile".to_string(),
        }
    }
}

/// Clarification the assistant asked, so the next answer can resume the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingClarification {
    pub reason: AmbiguityReason,
    pub original_message: String,
    #[serde(default)]
    pub original_kind: Option<IntentKind>,
}

/// Orchestrator pipeline state for one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Classifying,
    Dispatching,
    AgentHandling,
    ConfirmationPending,
    Responding,
}

/// Everything the core needs to process one user message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessRequest {
    /// Authenticated user, if any. Cellar and profile intents require one.
    #[serde(default)]
    pub user_id: Option<String>,
    pub message: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Rolling history, oldest first.
    #[serde(default)]
    pub history: Vec<Message>,
    /// Confirmation returned by the previous turn, if still pending.
    #[serde(default)]
    pub confirmation: Option<ConfirmationRequest>,
}

impl ProcessRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn with_confirmation(mut self, confirmation: Option<ConfirmationRequest>) -> Self {
        self.confirmation = confirmation;
        self
    }
}

/// Exactly one response is produced per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessResponse {
    pub response_text: String,
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub requires_auth: bool,
    #[serde(default)]
    pub confirmation: Option<ConfirmationRequest>,
    #[serde(default)]
    pub intent: Option<IntentKind>,
    #[serde(default)]
    pub recorded_action: Option<RecordedAction>,
    #[serde(default)]
    pub clarification: Option<PendingClarification>,
    /// States visited while handling the turn.
    #[serde(skip)]
    pub trace: Vec<PipelineState>,
}

impl ProcessResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            response_text: text.into(),
            cards: Vec::new(),
            actions: Vec::new(),
            requires_auth: false,
            confirmation: None,
            intent: None,
            recorded_action: None,
            clarification: None,
            trace: Vec::new(),
        }
    }

    /// Assistant message the caller appends to its history.
    pub fn to_message(&self) -> Message {
        Message {
            id: Uuid::new_v4(),
            role: Role::Assistant,
            text: self.response_text.clone(),
            timestamp: Utc::now(),
            cards: self.cards.clone(),
            actions: self.actions.clone(),
            intent: self.intent,
            recorded_action: self.recorded_action.clone(),
            clarification: self.clarification.clone(),
        }
    }
}
