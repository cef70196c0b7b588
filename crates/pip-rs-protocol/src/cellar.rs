//! Personal cellar bottles and the learned taste profile.

use crate::wine::{PriceRange, Wine, WineType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Ownership state of a cellar entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BottleStatus {
    /// Physically in the user's cellar.
    Owned,
    /// Drunk or tasted; kept for its rating.
    Tried,
    /// Saved to try later.
    #[serde(alias = "saved")]
    Wishlist,
}

impl fmt::Display for BottleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BottleStatus::Owned => "owned",
            BottleStatus::Tried => "tried",
            BottleStatus::Wishlist => "wishlist",
        };
        f.write_str(label)
    }
}

/// A wine the user owns, has tried, or wants to try.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellarBottle {
    pub id: Uuid,
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
    pub characteristics: Vec<String>,
    #[serde(default)]
    pub flavor_notes: Vec<String>,
    pub status: BottleStatus,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub notes: Option<String>,
    pub quantity: u32,
    pub added_at: DateTime<Utc>,
}

impl CellarBottle {
    /// Snapshot a catalog wine into a new cellar entry.
    pub fn from_wine(wine: &Wine, status: BottleStatus, quantity: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            wine_id: Some(wine.id.clone()),
            name: wine.name.clone(),
            producer: non_empty(&wine.producer),
            vintage: wine.vintage,
            wine_type: Some(wine.wine_type),
            varietal: non_empty(&wine.varietal),
            region: non_empty(&wine.region),
            country: non_empty(&wine.country),
            price_usd: Some(wine.price_usd),
            characteristics: wine.characteristics.clone(),
            flavor_notes: wine.flavor_notes.clone(),
            status,
            rating: None,
            notes: None,
            quantity,
            added_at: Utc::now(),
        }
    }

    /// Entry for a wine known only by name (e.g. from a label photo).
    pub fn named(name: impl Into<String>, status: BottleStatus, quantity: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            wine_id: None,
            name: name.into(),
            producer: None,
            vintage: None,
            wine_type: None,
            varietal: None,
            region: None,
            country: None,
            price_usd: None,
            characteristics: Vec::new(),
            flavor_notes: Vec::new(),
            status,
            rating: None,
            notes: None,
            quantity,
            added_at: Utc::now(),
        }
    }

    /// Name prefixed with the vintage when known.
    pub fn display_name(&self) -> String {
        match self.vintage {
            Some(vintage) if !self.name.contains(&vintage.to_string()) => {
                format!("{vintage} {}", self.name)
            }
            _ => self.name.clone(),
        }
    }

    /// Lowercased characteristics followed by flavor notes.
    pub fn descriptors(&self) -> Vec<String> {
        self.characteristics
            .iter()
            .chain(self.flavor_notes.iter())
            .map(|value| value.trim().to_lowercase())
            .filter(|value| !value.is_empty())
            .collect()
    }

    /// Owned with at least one bottle on hand.
    pub fn is_available(&self) -> bool {
        self.status == BottleStatus::Owned && self.quantity > 0
    }

    /// View the bottle as a catalog-shaped wine for scoring and explanation.
    pub fn as_wine(&self) -> Wine {
        Wine {
            id: self
                .wine_id
                .clone()
                .unwrap_or_else(|| format!("cellar:{}", self.id)),
            name: self.name.clone(),
            producer: self.producer.clone().unwrap_or_default(),
            vintage: self.vintage,
            wine_type: self.wine_type.unwrap_or(WineType::Red),
            varietal: self.varietal.clone().unwrap_or_default(),
            country: self.country.clone().unwrap_or_default(),
            region: self.region.clone().unwrap_or_default(),
            price_usd: self.price_usd.unwrap_or_default(),
            rating: self.rating,
            body: None,
            characteristics: self.characteristics.clone(),
            flavor_notes: self.flavor_notes.clone(),
            description: String::new(),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Price band the user has been comfortable paying.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceComfort {
    pub min: f64,
    pub max: f64,
}

/// Taste profile built incrementally from rating events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub preferred_attributes: Vec<String>,
    #[serde(default)]
    pub avoided_attributes: Vec<String>,
    #[serde(default)]
    pub explored_varietals: Vec<String>,
    #[serde(default)]
    pub preferred_regions: Vec<String>,
    #[serde(default)]
    pub price_comfort: Option<PriceComfort>,
    #[serde(default)]
    pub total_ratings: u32,
    #[serde(default)]
    pub average_rating: Option<f32>,
    #[serde(default)]
    pub type_affinity: BTreeMap<WineType, f32>,
    /// Attributes set from explicit tasting notes; inferred signals never move them.
    #[serde(default)]
    pub pinned_attributes: Vec<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// True before any rating has been recorded.
    pub fn is_empty(&self) -> bool {
        self.total_ratings == 0
    }

    /// Wine type with the strongest positive affinity, if any.
    pub fn favorite_type(&self) -> Option<WineType> {
        self.type_affinity
            .iter()
            .filter(|(_, score)| **score > 0.0)
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(wine_type, _)| *wine_type)
    }

    /// Fallback search preferences derived from the profile.
    pub fn stored_preferences(&self) -> StoredPreferences {
        StoredPreferences {
            price_range: self
                .price_comfort
                .map(|comfort| PriceRange::new(Some(comfort.min), Some(comfort.max))),
            wine_type: self
                .type_affinity
                .iter()
                .filter(|(_, score)| **score >= STRONG_TYPE_AFFINITY)
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(wine_type, _)| *wine_type),
        }
    }
}

/// Affinity at which a favorite type becomes a stored search default.
const STRONG_TYPE_AFFINITY: f32 = 1.5;

/// Stored preferences consulted only when the user gave no explicit signal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredPreferences {
    #[serde(default)]
    pub price_range: Option<PriceRange>,
    #[serde(default)]
    pub wine_type: Option<WineType>,
}
