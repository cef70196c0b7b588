//! Classified intents and the entities extracted from a message.

use crate::cellar::BottleStatus;
use crate::exchange::RecordedAction;
use crate::wine::WineType;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Closed set of intents the orchestrator can dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Recommend,
    EducateGeneral,
    EducateSpecific,
    CellarAdd,
    CellarQuery,
    CellarRemove,
    Rate,
    ProfileQuery,
    Decide,
    AnalyzePhoto,
    Correction,
    OffTopic,
    Unclear,
}

impl IntentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::Recommend => "recommend",
            IntentKind::EducateGeneral => "educate_general",
            IntentKind::EducateSpecific => "educate_specific",
            IntentKind::CellarAdd => "cellar_add",
            IntentKind::CellarQuery => "cellar_query",
            IntentKind::CellarRemove => "cellar_remove",
            IntentKind::Rate => "rate",
            IntentKind::ProfileQuery => "profile_query",
            IntentKind::Decide => "decide",
            IntentKind::AnalyzePhoto => "analyze_photo",
            IntentKind::Correction => "correction",
            IntentKind::OffTopic => "off_topic",
            IntentKind::Unclear => "unclear",
        }
    }

    /// Map a model label onto the taxonomy, accepting a few common synonyms.
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_lowercase().replace([' ', '-'], "_");
        let kind = match normalized.as_str() {
            "recommend" | "recommendation" => IntentKind::Recommend,
            "educate_general" | "education" => IntentKind::EducateGeneral,
            "educate_specific" => IntentKind::EducateSpecific,
            "cellar_add" | "add" => IntentKind::CellarAdd,
            "cellar_query" => IntentKind::CellarQuery,
            "cellar_remove" | "remove" => IntentKind::CellarRemove,
            "rate" | "rating" => IntentKind::Rate,
            "profile_query" | "profile" => IntentKind::ProfileQuery,
            "decide" => IntentKind::Decide,
            "analyze_photo" | "photo" => IntentKind::AnalyzePhoto,
            "correction" | "correct" => IntentKind::Correction,
            "off_topic" | "greeting" => IntentKind::OffTopic,
            "unclear" | "unknown" => IntentKind::Unclear,
            _ => return None,
        };
        Some(kind)
    }

    /// Intents that read or mutate per-user data.
    pub fn requires_user(&self) -> bool {
        matches!(
            self,
            IntentKind::CellarAdd
                | IntentKind::CellarQuery
                | IntentKind::CellarRemove
                | IntentKind::Rate
                | IntentKind::ProfileQuery
                | IntentKind::Decide
        )
    }

    /// Intents that act on one specific wine and therefore need a target.
    pub fn needs_target(&self) -> bool {
        matches!(
            self,
            IntentKind::EducateSpecific
                | IntentKind::CellarAdd
                | IntentKind::CellarRemove
                | IntentKind::Rate
        )
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an intent needs clarification before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityReason {
    /// A reference ("it", "the second one") could not be resolved.
    UnclearTarget,
    /// A pairing request that could mean a new purchase or a cellar pick.
    NewOrCellar,
    /// Classification confidence fell under the threshold.
    LowConfidence,
}

impl AmbiguityReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AmbiguityReason::UnclearTarget => "unclear_target",
            AmbiguityReason::NewOrCellar => "new_or_cellar",
            AmbiguityReason::LowConfidence => "low_confidence",
        }
    }
}

/// How a correction message relates to the previous action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionMode {
    /// Reverse the last recorded action.
    Undo,
    /// Change a field of the last action and re-run its handler.
    Amend,
    /// Drop the current thread without changing anything.
    Dismiss,
}

/// Structured fields pulled out of a message. Absent fields stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entities {
    #[serde(default)]
    pub price_min: Option<f64>,
    #[serde(default)]
    pub price_max: Option<f64>,
    #[serde(default)]
    pub wine_type: Option<WineType>,
    #[serde(default)]
    pub exclude_type: Option<WineType>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub varietal: Option<String>,
    #[serde(default)]
    pub occasion: Option<String>,
    #[serde(default)]
    pub food_pairing: Option<String>,
    #[serde(default)]
    pub characteristics: Vec<String>,
    #[serde(default)]
    pub wine_reference: Option<String>,
    #[serde(default)]
    pub vintage: Option<i32>,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub status: Option<BottleStatus>,
    #[serde(default)]
    pub tasting_notes: Option<String>,
    #[serde(default)]
    pub min_rating: Option<f32>,
    #[serde(default)]
    pub max_rating: Option<f32>,
    #[serde(default)]
    pub profile_reset: bool,
    #[serde(default)]
    pub drank: bool,
}

impl Entities {
    /// True when either price bound is set.
    pub fn has_price(&self) -> bool {
        self.price_min.is_some() || self.price_max.is_some()
    }

    /// True when any search filter is set.
    pub fn has_search_filters(&self) -> bool {
        self.has_price()
            || self.wine_type.is_some()
            || self.region.is_some()
            || self.country.is_some()
            || self.varietal.is_some()
    }

    /// Overwrite fields with those set in `other`; characteristics are unioned.
    pub fn overlay(&mut self, other: &Entities) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() {
                    self.$field = other.$field.clone();
                })*
            };
        }
        take!(
            price_min,
            price_max,
            wine_type,
            exclude_type,
            region,
            country,
            varietal,
            occasion,
            food_pairing,
            wine_reference,
            vintage,
            rating,
            quantity,
            status,
            tasting_notes,
            min_rating,
            max_rating
        );
        for value in &other.characteristics {
            if !self.characteristics.contains(value) {
                self.characteristics.push(value.clone());
            }
        }
        self.profile_reset |= other.profile_reset;
        self.drank |= other.drank;
    }

    /// Fill only the fields that are still empty.
    pub fn fill_missing(&mut self, other: &Entities) {
        let mut merged = other.clone();
        merged.overlay(self);
        *self = merged;
    }
}

/// A reference in the message resolved against a prior card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedReference {
    pub name: String,
    #[serde(default)]
    pub wine_id: Option<String>,
    #[serde(default)]
    pub bottle_id: Option<Uuid>,
    /// Position of the card in the referenced message.
    pub card_index: usize,
}

/// The single classification produced for each incoming message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub kind: IntentKind,
    pub confidence: f32,
    #[serde(default)]
    pub is_ambiguous: bool,
    #[serde(default)]
    pub ambiguity_reason: Option<AmbiguityReason>,
    #[serde(default)]
    pub clarifying_question: Option<String>,
    #[serde(default)]
    pub entities: Entities,
    #[serde(default)]
    pub resolved_references: Vec<ResolvedReference>,
    /// Cards the user may have meant when a reference is ambiguous.
    #[serde(default)]
    pub candidates: Vec<ResolvedReference>,
    #[serde(default)]
    pub correction_mode: Option<CorrectionMode>,
    #[serde(default)]
    pub correction_target: Option<RecordedAction>,
}

impl Intent {
    pub fn new(kind: IntentKind, confidence: f32) -> Self {
        Self {
            kind,
            confidence: confidence.clamp(0.0, 1.0),
            is_ambiguous: false,
            ambiguity_reason: None,
            clarifying_question: None,
            entities: Entities::default(),
            resolved_references: Vec::new(),
            candidates: Vec::new(),
            correction_mode: None,
            correction_target: None,
        }
    }

    pub fn with_entities(mut self, entities: Entities) -> Self {
        self.entities = entities;
        self
    }

    /// Mark the intent as needing clarification before dispatch.
    pub fn mark_ambiguous(&mut self, reason: AmbiguityReason, question: impl Into<String>) {
        self.is_ambiguous = true;
        self.ambiguity_reason = Some(reason);
        self.clarifying_question = Some(question.into());
    }

    /// First resolved reference, if any.
    pub fn primary_reference(&self) -> Option<&ResolvedReference> {
        self.resolved_references.first()
    }
}
