//! Catalog wine model, search queries, and ranked recommendations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad style of a wine, used as an exact-match hard filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WineType {
    Red,
    White,
    #[serde(alias = "rosé")]
    Rose,
    Sparkling,
    Dessert,
}

impl WineType {
    /// Every wine type, in display order.
    pub const ALL: [WineType; 5] = [
        WineType::Red,
        WineType::White,
        WineType::Rose,
        WineType::Sparkling,
        WineType::Dessert,
    ];

    /// Stable identifier used in serialized payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            WineType::Red => "red",
            WineType::White => "white",
            WineType::Rose => "rose",
            WineType::Sparkling => "sparkling",
            WineType::Dessert => "dessert",
        }
    }

    /// Parse a loose user or model label ("reds", "rosé", "bubbly").
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "red" | "reds" | "red wine" => Some(WineType::Red),
            "white" | "whites" | "white wine" => Some(WineType::White),
            "rose" | "rosé" | "roses" | "rosés" | "rosato" | "pink" => Some(WineType::Rose),
            "sparkling" | "bubbly" | "champagne" | "prosecco" | "cava" | "bubbles" => {
                Some(WineType::Sparkling)
            }
            "dessert" | "sweet" | "port" | "sauternes" => Some(WineType::Dessert),
            _ => None,
        }
    }
}

impl fmt::Display for WineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WineType::Rose => "rosé",
            other => other.as_str(),
        };
        f.write_str(label)
    }
}

/// Inclusive price bounds in USD; either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

impl PriceRange {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    /// True when neither bound is set.
    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// Inclusive bound check.
    pub fn contains(&self, price: f64) -> bool {
        if let Some(min) = self.min
            && price < min
        {
            return false;
        }
        if let Some(max) = self.max
            && price > max
        {
            return false;
        }
        true
    }

    /// Midpoint used for price-proximity tie breaking.
    ///
    /// An open floor is treated as zero; an open ceiling collapses to the floor.
    pub fn midpoint(&self) -> Option<f64> {
        match (self.min, self.max) {
            (Some(min), Some(max)) => Some((min + max) / 2.0),
            (None, Some(max)) => Some(max / 2.0),
            (Some(min), None) => Some(min),
            (None, None) => None,
        }
    }
}

/// A catalog wine. Read-only to the assistant core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wine {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub producer: String,
    #[serde(default)]
    pub vintage: Option<i32>,
    pub wine_type: WineType,
    #[serde(default)]
    pub varietal: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub region: String,
    pub price_usd: f64,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub characteristics: Vec<String>,
    #[serde(default)]
    pub flavor_notes: Vec<String>,
    #[serde(default)]
    pub description: String,
}

impl Wine {
    /// Lowercased characteristics followed by flavor notes.
    pub fn descriptors(&self) -> Vec<String> {
        self.characteristics
            .iter()
            .chain(self.flavor_notes.iter())
            .map(|value| value.trim().to_lowercase())
            .filter(|value| !value.is_empty())
            .collect()
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

    /// Text used when embedding the wine for similarity search.
    pub fn embedding_text(&self) -> String {
        let mut parts = vec![
            self.name.clone(),
            format!("{} wine", self.wine_type),
            self.varietal.clone(),
            self.region.clone(),
            self.country.clone(),
        ];
        if !self.characteristics.is_empty() {
            parts.push(self.characteristics.join(", "));
        }
        if !self.flavor_notes.is_empty() {
            parts.push(self.flavor_notes.join(", "));
        }
        if !self.description.is_empty() {
            parts.push(self.description.clone());
        }
        parts
            .into_iter()
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join(". ")
    }
}

/// Structured search request produced by the preference interpreter.
///
/// `user_request` is the verbatim ask and `category_knowledge` is retrieved
/// domain context; the two are never merged. `query_text` is the only fused
/// string and is used solely for embedding search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query_text: String,
    #[serde(default)]
    pub category_knowledge: String,
    pub user_request: String,
    #[serde(default)]
    pub price_range: PriceRange,
    #[serde(default)]
    pub wine_type_filter: Option<WineType>,
    #[serde(default)]
    pub region_filter: Option<String>,
    #[serde(default)]
    pub country_filter: Option<String>,
    #[serde(default)]
    pub varietal_filter: Option<String>,
    #[serde(default)]
    pub occasion: Option<String>,
    #[serde(default)]
    pub food_pairing: Option<String>,
}

/// Origin of a clause in a recommendation explanation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Echoes something the user literally asked for.
    UserRequest,
    /// Education framed as what a region or style is known for.
    CategoryKnowledge,
    /// The wine's own listed characteristics or flavor notes.
    WineAttributes,
}

/// A ranked search result with its explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WineRecommendation {
    pub wine: Wine,
    pub explanation: String,
    pub relevance_score: f32,
    #[serde(default)]
    pub provenance: Vec<Provenance>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_loose_type_labels() {
        assert_eq!(WineType::parse("Rosé"), Some(WineType::Rose));
        assert_eq!(WineType::parse(" bubbly "), Some(WineType::Sparkling));
        assert_eq!(WineType::parse("orange"), None);
    }

    #[test]
    fn price_range_bounds_are_inclusive() {
        let range = PriceRange::new(Some(20.0), Some(40.0));
        assert!(range.contains(20.0));
        assert!(range.contains(40.0));
        assert!(!range.contains(40.01));
        assert_eq!(range.midpoint(), Some(30.0));
        assert_eq!(PriceRange::new(None, Some(40.0)).midpoint(), Some(20.0));
    }

    #[test]
    fn rose_serializes_with_ascii_name() {
        let json = serde_json::to_string(&WineType::Rose).expect("serialize");
        assert_eq!(json, "\"rose\"");
        let parsed: WineType = serde_json::from_str("\"rosé\"").expect("alias");
        assert_eq!(parsed, WineType::Rose);
    }
}
