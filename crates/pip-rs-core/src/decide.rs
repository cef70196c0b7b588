//! Picking one owned bottle for tonight.
//!
//! Score in [0, 1] = 0.35 pairing + 0.15 occasion + 0.35 profile + 0.15 rating.
//! Components without a signal sit at a neutral 0.5.

use crate::phrasing::{capitalize, natural_list};
use log::debug;
use pip_rs_protocol::{CellarBottle, Entities, UserProfile, WineType};
use std::cmp::Ordering;

const PAIRING_WEIGHT: f32 = 0.35;
const OCCASION_WEIGHT: f32 = 0.15;
const PROFILE_WEIGHT: f32 = 0.35;
const RATING_WEIGHT: f32 = 0.15;
const NEUTRAL: f32 = 0.5;

struct Match {
    keys: &'static [&'static str],
    types: &'static [WineType],
    descriptors: &'static [&'static str],
}

const PAIRINGS: &[Match] = &[
    Match {
        keys: &["steak", "beef", "burgers", "lamb", "barbecue"],
        types: &[WineType::Red],
        descriptors: &["bold", "full-bodied", "tannic", "structured", "spicy", "jammy"],
    },
    Match {
        keys: &["pasta", "pizza", "lasagna"],
        types: &[WineType::Red],
        descriptors: &["savory", "medium-bodied", "juicy", "earthy", "bright"],
    },
    Match {
        keys: &["pork", "duck", "turkey", "mushrooms"],
        types: &[WineType::Red, WineType::Rose],
        descriptors: &["earthy", "elegant", "light-bodied", "medium-bodied", "fruity"],
    },
    Match {
        keys: &["chicken", "risotto"],
        types: &[WineType::White, WineType::Red],
        descriptors: &["buttery", "rich", "round", "medium-bodied", "elegant"],
    },
    Match {
        keys: &["fish", "salmon", "tuna"],
        types: &[WineType::White, WineType::Rose],
        descriptors: &["crisp", "mineral", "light-bodied", "fresh"],
    },
    Match {
        keys: &[
            "seafood", "shellfish", "oysters", "shrimp", "lobster", "crab", "sushi",
        ],
        types: &[WineType::White, WineType::Sparkling],
        descriptors: &["crisp", "mineral", "zesty", "fresh"],
    },
    Match {
        keys: &["cheese", "charcuterie"],
        types: &[WineType::Red, WineType::White],
        descriptors: &["bold", "earthy", "rich", "structured"],
    },
    Match {
        keys: &["salad"],
        types: &[WineType::White, WineType::Rose],
        descriptors: &["crisp", "fresh", "zesty"],
    },
    Match {
        keys: &[
            "curry",
            "thai food",
            "indian food",
            "spicy food",
            "tacos",
            "mexican food",
        ],
        types: &[WineType::White, WineType::Rose],
        descriptors: &["off-dry", "fruity", "aromatic", "fresh", "juicy"],
    },
    Match {
        keys: &["chocolate", "dessert"],
        types: &[WineType::Dessert, WineType::Red],
        descriptors: &["sweet", "jammy", "rich"],
    },
];

const OCCASIONS: &[Match] = &[
    Match {
        keys: &["date night"],
        types: &[WineType::Red, WineType::Sparkling, WineType::Rose],
        descriptors: &["elegant", "silky", "smooth", "aromatic"],
    },
    Match {
        keys: &["dinner party"],
        types: &[WineType::Red, WineType::White],
        descriptors: &["balanced", "elegant", "medium-bodied"],
    },
    Match {
        keys: &["celebration"],
        types: &[WineType::Sparkling],
        descriptors: &["crisp", "fresh", "bright"],
    },
    Match {
        keys: &["gift"],
        types: &[WineType::Red],
        descriptors: &["structured", "complex", "elegant"],
    },
    Match {
        keys: &["casual"],
        types: &[WineType::Red, WineType::White, WineType::Rose],
        descriptors: &["juicy", "fruity", "smooth", "fresh"],
    },
    Match {
        keys: &["holiday"],
        types: &[WineType::Red, WineType::Sparkling],
        descriptors: &["earthy", "rich", "spicy"],
    },
    Match {
        keys: &["outdoor"],
        types: &[WineType::Rose, WineType::White, WineType::Sparkling],
        descriptors: &["crisp", "fresh", "refreshing", "light-bodied"],
    },
];

/// What the user asked for when choosing a bottle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecideRequest {
    pub food_pairing: Option<String>,
    pub occasion: Option<String>,
    pub wine_type: Option<WineType>,
    pub exclude_type: Option<WineType>,
}

impl DecideRequest {
    pub fn from_entities(entities: &Entities) -> Self {
        Self {
            food_pairing: entities.food_pairing.clone(),
            occasion: entities.occasion.clone(),
            wine_type: entities.wine_type,
            exclude_type: entities.exclude_type,
        }
    }
}

/// The chosen bottle and how it scored.
#[derive(Debug, Clone, PartialEq)]
pub struct DecidePick {
    pub bottle: CellarBottle,
    pub score: f32,
    /// Score fell under the relevance floor.
    pub hedged: bool,
    pub reasons: Vec<String>,
    pub runner_up: Option<CellarBottle>,
}

impl DecidePick {
    /// Reply text for the pick.
    pub fn message(&self) -> String {
        let name = self.bottle.display_name();
        let lead = if self.hedged {
            format!("None of your bottles is an ideal match, but your {name} would work.")
        } else {
            format!("I'd open your {name}.")
        };
        let mut text = lead;
        if !self.reasons.is_empty() {
            text.push_str(&format!(" {}.", capitalize(&natural_list(&self.reasons))));
        }
        if let Some(runner_up) = &self.runner_up {
            text.push_str(&format!(
                " If you'd rather save it, the {} is a good second choice.",
                runner_up.display_name()
            ));
        }
        text
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecideOutcome {
    /// No owned bottles with quantity left.
    EmptyCellar,
    /// Bottles exist, but none of the requested type (or all of the excluded one).
    NoMatchingType(Option<WineType>),
    Pick(DecidePick),
}

/// Score every available bottle and pick the best.
pub fn decide(
    request: &DecideRequest,
    bottles: &[CellarBottle],
    profile: Option<&UserProfile>,
    min_relevance: f32,
) -> DecideOutcome {
    let available = bottles
        .iter()
        .filter(|bottle| bottle.is_available())
        .collect::<Vec<_>>();
    if available.is_empty() {
        return DecideOutcome::EmptyCellar;
    }
    let candidates = available
        .into_iter()
        .filter(|bottle| {
            request
                .wine_type
                .is_none_or(|wine_type| bottle.wine_type == Some(wine_type))
                && request
                    .exclude_type
                    .is_none_or(|excluded| bottle.wine_type != Some(excluded))
        })
        .collect::<Vec<_>>();
    if candidates.is_empty() {
        return DecideOutcome::NoMatchingType(request.wine_type);
    }

    let mut scored = candidates
        .into_iter()
        .map(|bottle| (score(request, bottle, profile), bottle))
        .collect::<Vec<_>>();
    scored.sort_by(|(a_score, a), (b_score, b)| {
        b_score
            .total_cmp(a_score)
            .then_with(|| compare_rating(a.rating, b.rating))
            .then_with(|| b.quantity.cmp(&a.quantity))
            .then_with(|| a.name.cmp(&b.name))
    });

    let mut ranked = scored.into_iter();
    let Some((best_score, best)) = ranked.next() else {
        return DecideOutcome::EmptyCellar;
    };
    let runner_up = ranked.next().map(|(_, bottle)| bottle.clone());
    debug!(
        "decided bottle (name={}, score={:.2}, runner_up={})",
        best.name,
        best_score,
        runner_up.is_some()
    );
    DecideOutcome::Pick(DecidePick {
        reasons: reasons(request, best, profile),
        bottle: best.clone(),
        score: best_score,
        hedged: best_score < min_relevance,
        runner_up,
    })
}

/// Rated first, higher rating first.
fn compare_rating(a: Option<f32>, b: Option<f32>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn lookup<'a>(table: &'a [Match], key: Option<&str>) -> Option<&'a Match> {
    let key = key?.to_lowercase();
    table.iter().find(|entry| entry.keys.contains(&key.as_str()))
}

fn fit(entry: Option<&Match>, bottle: &CellarBottle) -> f32 {
    let Some(entry) = entry else {
        return NEUTRAL;
    };
    let type_fit = match bottle.wine_type {
        Some(wine_type) if entry.types.contains(&wine_type) => 1.0,
        Some(_) => 0.0,
        None => NEUTRAL,
    };
    let descriptors = bottle.descriptors();
    let overlap = entry
        .descriptors
        .iter()
        .filter(|descriptor| descriptors.iter().any(|d| d == *descriptor))
        .count() as f32;
    0.6 * type_fit + 0.4 * (overlap / 2.0).min(1.0)
}

fn profile_fit(bottle: &CellarBottle, profile: Option<&UserProfile>) -> f32 {
    let Some(profile) = profile.filter(|profile| !profile.is_empty()) else {
        return NEUTRAL;
    };
    let descriptors = bottle.descriptors();
    let liked = descriptors
        .iter()
        .filter(|d| profile.preferred_attributes.contains(d))
        .count() as f32;
    let avoided = descriptors
        .iter()
        .filter(|d| profile.avoided_attributes.contains(d))
        .count() as f32;
    let affinity = bottle
        .wine_type
        .and_then(|wine_type| profile.type_affinity.get(&wine_type).copied())
        .unwrap_or(0.0)
        .clamp(-2.0, 2.0);
    (NEUTRAL + 0.15 * liked - 0.2 * avoided + 0.1 * affinity).clamp(0.0, 1.0)
}

fn rating_fit(bottle: &CellarBottle) -> f32 {
    bottle
        .rating
        .map(|rating| ((rating - 1.0) / 4.0).clamp(0.0, 1.0))
        .unwrap_or(NEUTRAL)
}

fn score(request: &DecideRequest, bottle: &CellarBottle, profile: Option<&UserProfile>) -> f32 {
    let pairing = fit(lookup(PAIRINGS, request.food_pairing.as_deref()), bottle);
    let occasion = fit(lookup(OCCASIONS, request.occasion.as_deref()), bottle);
    PAIRING_WEIGHT * pairing
        + OCCASION_WEIGHT * occasion
        + PROFILE_WEIGHT * profile_fit(bottle, profile)
        + RATING_WEIGHT * rating_fit(bottle)
}

fn reasons(
    request: &DecideRequest,
    bottle: &CellarBottle,
    profile: Option<&UserProfile>,
) -> Vec<String> {
    let descriptors = bottle.descriptors();
    let mut reasons = Vec::new();
    for (table, key) in [
        (PAIRINGS, request.food_pairing.as_deref()),
        (OCCASIONS, request.occasion.as_deref()),
    ] {
        let Some(entry) = lookup(table, key) else {
            continue;
        };
        let label = key.unwrap_or_default();
        let shared = entry
            .descriptors
            .iter()
            .filter(|descriptor| descriptors.iter().any(|d| d == *descriptor))
            .copied()
            .collect::<Vec<_>>();
        if !shared.is_empty() {
            reasons.push(format!("its {} character suits {label}", natural_list(&shared)));
        } else if let Some(wine_type) = bottle.wine_type
            && entry.types.contains(&wine_type)
        {
            reasons.push(format!("a {wine_type} is a natural fit for {label}"));
        }
    }
    if let Some(profile) = profile {
        let liked = descriptors
            .iter()
            .filter(|d| profile.preferred_attributes.contains(d))
            .take(3)
            .cloned()
            .collect::<Vec<_>>();
        if !liked.is_empty() {
            reasons.push(format!(
                "it's {}, which you've rated highly before",
                natural_list(&liked)
            ));
        }
    }
    if let Some(rating) = bottle.rating {
        reasons.push(format!("you gave it {rating}/5"));
    }
    reasons
}

#[cfg(test)]
mod tests {
    use super::*;
    use pip_rs_protocol::BottleStatus;
    use pip_rs_test_utils::sample_wine;
    use pretty_assertions::assert_eq;

    fn owned(id: &str) -> CellarBottle {
        CellarBottle::from_wine(&sample_wine(id), BottleStatus::Owned, 1)
    }

    fn pick(outcome: DecideOutcome) -> DecidePick {
        match outcome {
            DecideOutcome::Pick(pick) => pick,
            other => panic!("expected a pick, got {other:?}"),
        }
    }

    #[test]
    fn empty_or_depleted_cellar_never_picks() {
        let request = DecideRequest::default();
        assert_eq!(decide(&request, &[], None, 0.35), DecideOutcome::EmptyCellar);
        let mut finished = owned("napa-cab");
        finished.quantity = 0;
        let mut wishlist = owned("barolo");
        wishlist.status = BottleStatus::Wishlist;
        assert_eq!(
            decide(&request, &[finished, wishlist], None, 0.35),
            DecideOutcome::EmptyCellar
        );
    }

    #[test]
    fn pairing_prefers_matching_style() {
        let request = DecideRequest {
            food_pairing: Some("steak".to_string()),
            ..DecideRequest::default()
        };
        let bottles = [owned("loire-sancerre"), owned("napa-cab"), owned("veneto-prosecco")];
        let chosen = pick(decide(&request, &bottles, None, 0.35));
        assert_eq!(chosen.bottle.wine_id.as_deref(), Some("napa-cab"));
        assert!(!chosen.hedged);
        assert!(chosen.message().starts_with("I'd open your 2019 Stag Ridge"));
        assert!(chosen.reasons[0].contains("suits steak"));
    }

    #[test]
    fn poor_matches_are_hedged() {
        let request = DecideRequest {
            food_pairing: Some("oysters".to_string()),
            occasion: Some("celebration".to_string()),
            ..DecideRequest::default()
        };
        let mut profile = UserProfile::default();
        profile.total_ratings = 2;
        profile.avoided_attributes = vec!["tannic".to_string(), "structured".to_string()];
        profile.type_affinity.insert(WineType::Red, -2.0);
        let chosen = pick(decide(&request, &[owned("barolo")], Some(&profile), 0.35));
        assert!(chosen.hedged, "score {}", chosen.score);
        assert!(chosen.message().starts_with("None of your bottles is an ideal match, but"));
    }

    #[test]
    fn type_filter_without_matches_says_so() {
        let request = DecideRequest {
            wine_type: Some(WineType::Sparkling),
            ..DecideRequest::default()
        };
        assert_eq!(
            decide(&request, &[owned("napa-cab")], None, 0.35),
            DecideOutcome::NoMatchingType(Some(WineType::Sparkling))
        );
    }

    #[test]
    fn ties_break_on_rating_then_quantity() {
        let mut a = owned("mendoza-malbec");
        let mut b = owned("mendoza-malbec");
        b.name = "Another Malbec".to_string();
        a.quantity = 1;
        b.quantity = 4;
        let chosen = pick(decide(&DecideRequest::default(), &[a.clone(), b], None, 0.35));
        assert_eq!(chosen.bottle.quantity, 4);

        a.rating = Some(5.0);
        let mut c = owned("mendoza-malbec");
        c.rating = Some(5.0);
        c.quantity = 6;
        c.name = "Zeta Malbec".to_string();
        let chosen = pick(decide(&DecideRequest::default(), &[a, c], None, 0.35));
        assert_eq!(chosen.bottle.name, "Zeta Malbec");
    }
}
