//! Resolution of "it", "the second one" and wine names against prior cards.
//!
//! Priority: explicit name match, then ordinal, then the sole card. Anything
//! else is ambiguous and the caller asks which wine was meant.

use crate::lexicon::{Normalized, REFERENCE_STOPWORDS};
use pip_rs_protocol::{Card, ResolvedReference};
use std::collections::HashSet;

const ANAPHORA: &[&str] = &[
    "it", "this", "that", "this one", "that one", "the one", "them", "those", "these", "first",
    "second", "third", "fourth", "fifth", "last one", "the last", "1st", "2nd", "3rd", "4th",
    "5th",
];

/// Message words that never count towards a name match.
const NAME_NOISE: &[&str] = &[
    "add", "remove", "delete", "rate", "rated", "give", "stars", "star", "cellar", "wishlist",
    "red", "white", "rose", "sparkling", "dessert", "bought", "drank", "tried", "loved", "liked",
    "really", "great", "good", "nice", "save", "later", "tonight", "out", "five", "four",
    "three", "two",
];

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Resolution {
    Resolved(ResolvedReference),
    Ambiguous(Vec<ResolvedReference>),
    Unresolved,
}

pub(crate) fn has_anaphora(text: &Normalized) -> bool {
    text.has_any(ANAPHORA)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ordinal {
    Index(usize),
    Last,
}

fn ordinal(text: &Normalized) -> Option<Ordinal> {
    const WORDS: &[(&[&str], usize)] = &[
        (&["first", "1st"], 0),
        (&["second", "2nd"], 1),
        (&["third", "3rd"], 2),
        (&["fourth", "4th"], 3),
        (&["fifth", "5th"], 4),
    ];
    if let Some((_, idx)) = WORDS.iter().find(|(words, _)| text.has_any(words)) {
        return Some(Ordinal::Index(*idx));
    }
    if text.has_any(&["last one", "the last", "last wine", "last bottle"]) {
        return Some(Ordinal::Last);
    }
    let tokens = text.tokens().collect::<Vec<_>>();
    tokens.windows(2).find_map(|pair| {
        let [marker, value] = pair else {
            return None;
        };
        if !matches!(*marker, "number" | "option" | "no" | "wine" | "pick") {
            return None;
        }
        value
            .parse::<usize>()
            .ok()
            .filter(|n| *n >= 1)
            .map(|n| Ordinal::Index(n - 1))
    })
}

fn reference_for(card: &Card, card_index: usize) -> Option<ResolvedReference> {
    Some(ResolvedReference {
        name: card.name()?.to_string(),
        wine_id: card.wine_id().map(str::to_string),
        bottle_id: card.bottle_id(),
        card_index,
    })
}

fn identity_tokens(card: &Card) -> HashSet<String> {
    Normalized::new(&card.identity_text())
        .tokens()
        .map(str::to_string)
        .collect()
}

fn card_vintage(card: &Card) -> Option<i32> {
    match card {
        Card::Wine(card) => card.vintage,
        Card::Cellar(card) => card.vintage,
        Card::Profile(_) => None,
    }
}

/// Indices of the cards whose identity best matches words in the message.
pub(crate) fn name_matches(text: &Normalized, cards: &[Card]) -> Vec<usize> {
    let words = text
        .tokens()
        .filter(|token| {
            !REFERENCE_STOPWORDS.contains(token)
                && !NAME_NOISE.contains(token)
                && (token.len() >= 3 || token.chars().all(|ch| ch.is_ascii_digit()))
        })
        .collect::<Vec<_>>();
    if words.is_empty() {
        return Vec::new();
    }
    let years = words
        .iter()
        .filter_map(|word| word.parse::<i32>().ok())
        .filter(|year| (1900..2100).contains(year))
        .collect::<Vec<_>>();

    let mut best = 0;
    let mut matches = Vec::new();
    for (idx, card) in cards.iter().enumerate() {
        if card.name().is_none() {
            continue;
        }
        if let Some(vintage) = card_vintage(card)
            && !years.is_empty()
            && !years.contains(&vintage)
        {
            continue;
        }
        let identity = identity_tokens(card);
        let score = words
            .iter()
            .filter(|word| identity.contains(**word))
            .count();
        if score == 0 || score < best {
            continue;
        }
        if score > best {
            best = score;
            matches.clear();
        }
        matches.push(idx);
    }
    matches
}

/// Resolve the message's reference against `cards`.
///
/// With `require_pointer` set, a sole card is only chosen when the message
/// actually points at something ("it", an ordinal).
pub(crate) fn resolve(text: &Normalized, cards: &[Card], require_pointer: bool) -> Resolution {
    let named = cards
        .iter()
        .enumerate()
        .filter_map(|(idx, card)| reference_for(card, idx))
        .collect::<Vec<_>>();
    if named.is_empty() {
        return Resolution::Unresolved;
    }

    let by_name = name_matches(text, cards);
    match by_name.as_slice() {
        [idx] => {
            if let Some(reference) = reference_for(&cards[*idx], *idx) {
                return Resolution::Resolved(reference);
            }
        }
        [] => {}
        many => {
            return Resolution::Ambiguous(
                many.iter()
                    .filter_map(|idx| reference_for(&cards[*idx], *idx))
                    .collect(),
            );
        }
    }

    if let Some(ordinal) = ordinal(text) {
        let position = match ordinal {
            Ordinal::Index(idx) => idx,
            Ordinal::Last => named.len() - 1,
        };
        return match named.get(position) {
            Some(reference) => Resolution::Resolved(reference.clone()),
            None => Resolution::Ambiguous(named),
        };
    }

    if require_pointer && !has_anaphora(text) {
        return Resolution::Unresolved;
    }
    if named.len() == 1 {
        return Resolution::Resolved(named[0].clone());
    }
    Resolution::Ambiguous(named)
}

/// Question listing the candidates by name.
pub(crate) fn clarifying_question(candidates: &[ResolvedReference]) -> String {
    let names = candidates
        .iter()
        .map(|candidate| format!("the {}", candidate.name))
        .collect::<Vec<_>>();
    match names.as_slice() {
        [] => "Which wine do you mean? Tell me its name and I'll take it from there.".to_string(),
        [only] => format!("Do you mean {only}?"),
        [init @ .., last] => format!("Which wine do you mean: {} or {last}?", init.join(", ")),
    }
}
