//! Structured cards and suggested actions attached to assistant messages.

use crate::cellar::{BottleStatus, CellarBottle, PriceComfort, UserProfile};
use crate::wine::{Provenance, Wine, WineRecommendation, WineType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Card rendered alongside an assistant message, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Card {
    Wine(WineCard),
    Cellar(CellarCard),
    Profile(ProfileCard),
}

impl Card {
    /// Display name of the wine behind the card, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            Card::Wine(card) => Some(card.name.as_str()),
            Card::Cellar(card) => Some(card.name.as_str()),
            Card::Profile(_) => None,
        }
    }

    /// Catalog id of the wine behind the card.
    pub fn wine_id(&self) -> Option<&str> {
        match self {
            Card::Wine(card) => card.wine_id.as_deref(),
            Card::Cellar(card) => card.wine_id.as_deref(),
            Card::Profile(_) => None,
        }
    }

    /// Cellar entry behind the card.
    pub fn bottle_id(&self) -> Option<Uuid> {
        match self {
            Card::Cellar(card) => Some(card.bottle_id),
            _ => None,
        }
    }

    /// Words that identify the wine in conversation (name, producer, varietal, region, vintage).
    pub fn identity_text(&self) -> String {
        match self {
            Card::Wine(card) => [
                Some(card.name.clone()),
                card.producer.clone(),
                card.varietal.clone(),
                card.region.clone(),
                card.vintage.map(|v| v.to_string()),
            ]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" "),
            Card::Cellar(card) => [
                Some(card.name.clone()),
                card.producer.clone(),
                card.varietal.clone(),
                card.region.clone(),
                card.vintage.map(|v| v.to_string()),
            ]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" "),
            Card::Profile(_) => String::new(),
        }
    }
}

/// A catalog (or photo-identified) wine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WineCard {
    #[serde(default)]
    pub wine_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub producer: Option<String>,
    #[serde(default)]
    pub vintage: Option<i32>,
    #[serde(default)]
    pub wine_type: Option<WineType>,
    #[serde(default)]
    pub varietal: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub price_usd: Option<f64>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub relevance_score: Option<f32>,
    #[serde(default)]
    pub provenance: Vec<Provenance>,
    #[serde(default)]
    pub is_in_cellar: bool,
}

impl WineCard {
    pub fn from_wine(wine: &Wine) -> Self {
        let optional = |value: &str| {
            if value.trim().is_empty() {
                None
            } else {
                Some(value.to_string())
            }
        };
        Self {
            wine_id: Some(wine.id.clone()),
            name: wine.name.clone(),
            producer: optional(&wine.producer),
            vintage: wine.vintage,
            wine_type: Some(wine.wine_type),
            varietal: optional(&wine.varietal),
            region: optional(&wine.region),
            country: optional(&wine.country),
            price_usd: Some(wine.price_usd),
            explanation: None,
            relevance_score: None,
            provenance: Vec::new(),
            is_in_cellar: false,
        }
    }

    pub fn from_recommendation(recommendation: &WineRecommendation, is_in_cellar: bool) -> Self {
        Self {
            explanation: Some(recommendation.explanation.clone()),
            relevance_score: Some(recommendation.relevance_score),
            provenance: recommendation.provenance.clone(),
            is_in_cellar,
            ..Self::from_wine(&recommendation.wine)
        }
    }
}

/// A bottle from the user's cellar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellarCard {
    pub bottle_id: Uuid,
    #[serde(default)]
    pub wine_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub producer: Option<String>,
    #[serde(default)]
    pub vintage: Option<i32>,
    #[serde(default)]
    pub wine_type: Option<WineType>,
    #[serde(default)]
    pub varietal: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub price_usd: Option<f64>,
    pub status: BottleStatus,
    pub quantity: u32,
    #[serde(default)]
    pub rating: Option<f32>,
}

impl From<&CellarBottle> for CellarCard {
    fn from(bottle: &CellarBottle) -> Self {
        Self {
            bottle_id: bottle.id,
            wine_id: bottle.wine_id.clone(),
            name: bottle.name.clone(),
            producer: bottle.producer.clone(),
            vintage: bottle.vintage,
            wine_type: bottle.wine_type,
            varietal: bottle.varietal.clone(),
            region: bottle.region.clone(),
            price_usd: bottle.price_usd,
            status: bottle.status,
            quantity: bottle.quantity,
            rating: bottle.rating,
        }
    }
}

/// Summary of the learned taste profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileCard {
    pub summary: String,
    #[serde(default)]
    pub preferred_attributes: Vec<String>,
    #[serde(default)]
    pub avoided_attributes: Vec<String>,
    #[serde(default)]
    pub explored_varietals: Vec<String>,
    #[serde(default)]
    pub price_comfort: Option<PriceComfort>,
    pub total_ratings: u32,
}

impl ProfileCard {
    pub fn new(profile: &UserProfile, summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            preferred_attributes: profile.preferred_attributes.clone(),
            avoided_attributes: profile.avoided_attributes.clone(),
            explored_varietals: profile.explored_varietals.clone(),
            price_comfort: profile.price_comfort,
            total_ratings: profile.total_ratings,
        }
    }
}

/// Kind of a suggested follow-up action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Save,
    AddCellar,
    TellMore,
    ViewCellar,
    Undo,
    Confirm,
    Cancel,
    RecommendNew,
    PickFromCellar,
    SelectWine,
    FindWines,
}

/// A follow-up the UI can offer as a button.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    pub label: String,
    #[serde(default)]
    pub value: Option<String>,
}

impl Action {
    pub fn new(kind: ActionKind, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn cards_serialize_with_type_tag() {
        let card = Card::Profile(ProfileCard::new(&UserProfile::default(), "new here"));
        let value = serde_json::to_value(&card).expect("serialize");
        assert_eq!(value["type"], "profile");
        assert_eq!(value["summary"], "new here");

        let bottle = CellarBottle::named("Catena Malbec", BottleStatus::Owned, 2);
        let value = serde_json::to_value(Card::Cellar(CellarCard::from(&bottle))).expect("cellar");
        assert_eq!(value["type"], "cellar");
        assert_eq!(value["quantity"], 2);
    }
}
