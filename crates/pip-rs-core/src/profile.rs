//! Taste profile learning from rating events.
//!
//! Ratings infer signals from the bottle's own descriptors. Tasting notes
//! are read for descriptor words with negation; what they say overrides the
//! inferred signal and is pinned so later inferences leave it alone.

use crate::lexicon::{self, DESCRIPTORS, NEGATIONS, Normalized};
use crate::phrasing::{dollars, natural_list};
use chrono::Utc;
use log::debug;
use pip_rs_protocol::{CellarBottle, PriceComfort, UserProfile};

/// Attribute lists keep at most this many entries, newest last.
const MAX_ATTRIBUTES: usize = 20;
const LIKED_AT: f32 = 4.0;
const DISLIKED_AT: f32 = 2.0;
/// Ratings under this count get a "still learning" note.
const CONFIDENT_RATINGS: u32 = 3;

/// Descriptors a tasting note speaks for and against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteSignals {
    pub liked: Vec<String>,
    pub disliked: Vec<String>,
}

/// Read descriptor words from a tasting note, clause by clause.
pub fn note_signals(notes: &str) -> NoteSignals {
    let mut signals = NoteSignals::default();
    let lowered = notes.to_lowercase().replace(" but ", ",").replace(" though ", ",");
    for clause in lowered.split([',', ';', '.', '!', '\n']) {
        let clause = Normalized::new(clause);
        let found = lexicon::find_descriptors(&clause);
        if found.is_empty() {
            continue;
        }
        let target = if clause.has_any(NEGATIONS) {
            &mut signals.disliked
        } else {
            &mut signals.liked
        };
        for descriptor in found {
            push_unique(target, descriptor);
        }
    }
    signals
}

/// Merge one rating into `profile`.
pub fn record_rating(
    profile: &mut UserProfile,
    bottle: &CellarBottle,
    rating: f32,
    notes: Option<&str>,
) {
    let descriptors = bottle.descriptors();
    if rating >= LIKED_AT {
        for descriptor in &descriptors {
            prefer(profile, descriptor, false);
        }
    } else if rating <= DISLIKED_AT {
        for descriptor in &descriptors {
            avoid(profile, descriptor, false);
        }
    }

    if let Some(notes) = notes.filter(|notes| !notes.trim().is_empty()) {
        let signals = note_signals(notes);
        for descriptor in &signals.liked {
            prefer(profile, descriptor, true);
        }
        for descriptor in &signals.disliked {
            avoid(profile, descriptor, true);
        }
    }

    if let Some(wine_type) = bottle.wine_type {
        *profile.type_affinity.entry(wine_type).or_insert(0.0) += (rating - 2.5) / 2.5;
    }
    if let Some(varietal) = &bottle.varietal {
        push_unique(&mut profile.explored_varietals, varietal.clone());
    }
    if rating >= LIKED_AT {
        if let Some(region) = &bottle.region {
            push_unique(&mut profile.preferred_regions, region.clone());
        }
        if let Some(price) = bottle.price_usd.filter(|price| *price > 0.0) {
            profile.price_comfort = Some(match profile.price_comfort {
                Some(comfort) => PriceComfort {
                    min: comfort.min.min(price),
                    max: comfort.max.max(price),
                },
                None => PriceComfort {
                    min: price,
                    max: price,
                },
            });
        }
    }

    let previous_total = profile.total_ratings as f32;
    profile.total_ratings += 1;
    let average = profile.average_rating.unwrap_or(0.0);
    profile.average_rating =
        Some((average * previous_total + rating) / profile.total_ratings as f32);
    for list in [
        &mut profile.preferred_attributes,
        &mut profile.avoided_attributes,
        &mut profile.explored_varietals,
        &mut profile.preferred_regions,
    ] {
        cap(list);
    }
    profile.updated_at = Some(Utc::now());
    debug!(
        "recorded rating (wine={}, rating={}, total={})",
        bottle.name, rating, profile.total_ratings
    );
}

/// Profile built from scratch out of every rated bottle.
pub fn rebuild(bottles: &[CellarBottle]) -> UserProfile {
    let mut profile = UserProfile::default();
    for bottle in bottles {
        if let Some(rating) = bottle.rating {
            record_rating(&mut profile, bottle, rating, bottle.notes.as_deref());
        }
    }
    profile
}

/// Plain-language answer to "what do I like?".
pub fn summarize(profile: &UserProfile) -> String {
    if profile.is_empty() {
        return "I don't know your taste yet. Rate a few wines you've tried and I'll start learning what you like.".to_string();
    }
    let mut sentences = Vec::new();
    let ratings = if profile.total_ratings == 1 {
        "your first rating".to_string()
    } else {
        format!("your {} ratings", profile.total_ratings)
    };
    let (styles, flavors): (Vec<String>, Vec<String>) = profile
        .preferred_attributes
        .iter()
        .cloned()
        .partition(|attribute| DESCRIPTORS.contains(&attribute.as_str()));
    match (styles.is_empty(), flavors.is_empty()) {
        (true, true) => {
            sentences.push(format!("From {ratings}, no clear favorites have emerged yet."))
        }
        (false, true) => sentences.push(format!(
            "From {ratings}, you tend to enjoy {} wines.",
            natural_list(&recent(&styles, 4))
        )),
        (true, false) => sentences.push(format!(
            "From {ratings}, you tend to enjoy wines with notes of {}.",
            natural_list(&recent(&flavors, 4))
        )),
        (false, false) => sentences.push(format!(
            "From {ratings}, you tend to enjoy {} wines with notes of {}.",
            natural_list(&recent(&styles, 4)),
            natural_list(&recent(&flavors, 4))
        )),
    }
    if let Some(wine_type) = profile.favorite_type() {
        sentences.push(format!("You lean toward {wine_type} wines."));
    }
    if !profile.avoided_attributes.is_empty() {
        sentences.push(format!(
            "You usually steer clear of {} styles.",
            natural_list(&recent(&profile.avoided_attributes, 4))
        ));
    }
    if !profile.explored_varietals.is_empty() {
        sentences.push(format!(
            "Grapes you've explored: {}.",
            natural_list(&recent(&profile.explored_varietals, 5))
        ));
    }
    if let Some(comfort) = profile.price_comfort {
        if comfort.min == comfort.max {
            sentences.push(format!("Your favorites so far cost about {}.", dollars(comfort.max)));
        } else {
            sentences.push(format!(
                "Your favorites usually cost {} to {}.",
                dollars(comfort.min),
                dollars(comfort.max)
            ));
        }
    }
    if profile.total_ratings < CONFIDENT_RATINGS {
        sentences.push(
            "I'm still learning your taste, so rate a few more wines and this will sharpen up."
                .to_string(),
        );
    }
    sentences.join(" ")
}

fn prefer(profile: &mut UserProfile, descriptor: &str, from_notes: bool) {
    if !from_notes && profile.pinned_attributes.iter().any(|p| p == descriptor) {
        return;
    }
    profile.avoided_attributes.retain(|existing| existing != descriptor);
    push_unique(&mut profile.preferred_attributes, descriptor.to_string());
    if from_notes {
        push_unique(&mut profile.pinned_attributes, descriptor.to_string());
    }
}

fn avoid(profile: &mut UserProfile, descriptor: &str, from_notes: bool) {
    if !from_notes && profile.pinned_attributes.iter().any(|p| p == descriptor) {
        return;
    }
    profile.preferred_attributes.retain(|existing| existing != descriptor);
    push_unique(&mut profile.avoided_attributes, descriptor.to_string());
    if from_notes {
        push_unique(&mut profile.pinned_attributes, descriptor.to_string());
    }
}

/// Append, moving an existing entry to the end.
fn push_unique(list: &mut Vec<String>, value: String) {
    list.retain(|existing| *existing != value);
    list.push(value);
}

fn cap(list: &mut Vec<String>) {
    if list.len() > MAX_ATTRIBUTES {
        list.drain(..list.len() - MAX_ATTRIBUTES);
    }
}

/// Newest `count` entries, oldest of them first.
fn recent(list: &[String], count: usize) -> &[String] {
    &list[list.len().saturating_sub(count)..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pip_rs_protocol::{BottleStatus, WineType};
    use pip_rs_test_utils::sample_wine;
    use pretty_assertions::assert_eq;

    fn bottle(id: &str) -> CellarBottle {
        CellarBottle::from_wine(&sample_wine(id), BottleStatus::Tried, 0)
    }

    #[test]
    fn high_rating_prefers_the_wines_descriptors() {
        let mut profile = UserProfile::default();
        record_rating(&mut profile, &bottle("rioja-reserva"), 5.0, None);
        assert!(profile.preferred_attributes.contains(&"earthy".to_string()));
        assert_eq!(profile.explored_varietals, vec!["Tempranillo".to_string()]);
        assert_eq!(profile.total_ratings, 1);
        assert_eq!(profile.average_rating, Some(5.0));
        assert_eq!(profile.type_affinity.get(&WineType::Red), Some(&1.0));
        let comfort = profile.price_comfort.expect("comfort");
        assert_eq!((comfort.min, comfort.max), (28.0, 28.0));
    }

    #[test]
    fn low_rating_avoids_and_moves_affinity_down() {
        let mut profile = UserProfile::default();
        record_rating(&mut profile, &bottle("sonoma-chardonnay"), 1.0, None);
        assert!(profile.avoided_attributes.contains(&"buttery".to_string()));
        assert!(profile.preferred_attributes.is_empty());
        assert!(profile.type_affinity[&WineType::White] < 0.0);
        assert_eq!(profile.price_comfort, None);
    }

    #[test]
    fn notes_override_and_pin() {
        let mut profile = UserProfile::default();
        record_rating(
            &mut profile,
            &bottle("napa-cab"),
            4.0,
            Some("loved the fruit but way too oaky"),
        );
        assert!(profile.avoided_attributes.contains(&"oaky".to_string()));
        assert!(!profile.preferred_attributes.contains(&"oaky".to_string()));
        assert!(profile.pinned_attributes.contains(&"oaky".to_string()));

        // A later inferred signal does not move the pinned attribute.
        record_rating(&mut profile, &bottle("sonoma-chardonnay"), 5.0, None);
        assert!(profile.avoided_attributes.contains(&"oaky".to_string()));
        assert!(profile.preferred_attributes.contains(&"buttery".to_string()));
    }

    #[test]
    fn note_clauses_carry_their_own_negation() {
        let signals = note_signals("Earthy and smooth, not too tannic");
        assert_eq!(signals.liked, vec!["earthy".to_string(), "smooth".to_string()]);
        assert_eq!(signals.disliked, vec!["tannic".to_string()]);
    }

    #[test]
    fn rebuild_matches_incremental_history() {
        let mut rated = bottle("rioja-reserva");
        rated.rating = Some(5.0);
        let unrated = bottle("napa-cab");
        let profile = rebuild(&[rated, unrated]);
        assert_eq!(profile.total_ratings, 1);
        assert!(profile.preferred_attributes.contains(&"earthy".to_string()));
    }

    #[test]
    fn summary_mentions_attributes_after_one_rating() {
        let mut profile = UserProfile::default();
        assert!(summarize(&profile).contains("don't know your taste yet"));
        record_rating(&mut profile, &bottle("rioja-reserva"), 5.0, None);
        let summary = summarize(&profile);
        assert!(summary.contains("earthy"), "summary: {summary}");
        assert!(summary.contains("still learning"));
    }
}
