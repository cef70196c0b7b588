//! Deterministic entity extraction from a single message.
//!
//! Everything here is lexical: prices, types, places, grapes, foods,
//! occasions, ratings and wine references are read straight off the text.
//! Model-based extraction only ever fills gaps left by this pass.

use crate::lexicon::{
    self, COUNTRIES, FOODS, Normalized, OCCASIONS, REFERENCE_STOPWORDS, REGIONS, TYPES, VARIETALS,
};
use log::warn;
use pip_rs_protocol::{BottleStatus, Entities, WineType};
use regex::{Captures, Regex};
use std::sync::LazyLock;

const CHEAP_MAX: f64 = 20.0;
const NOT_EXPENSIVE_MAX: f64 = 25.0;
const NICE_BOTTLE: (f64, f64) = (30.0, 60.0);
const SPLURGE_MIN: f64 = 50.0;
const AROUND_LOW: f64 = 0.8;
const AROUND_HIGH: f64 = 1.2;

/// Trailing words that mean a number is not a price.
const NON_PRICE_UNITS: &[&str] = &[
    "bottle", "bottles", "star", "stars", "year", "years", "people", "guests", "glasses",
];

struct Patterns {
    between: Regex,
    range: Regex,
    under: Regex,
    over: Regex,
    around: Regex,
    bare_dollar: Regex,
    vintage: Regex,
    stars: Regex,
    rate_verb: Regex,
    quantity: Regex,
    exclude: Regex,
    polite_prefix: Regex,
    command: Regex,
    destination: Regex,
    rating_phrase: Regex,
    trailing_number: Regex,
    leading_filler: Regex,
}

impl Patterns {
    fn compile() -> Result<Self, regex::Error> {
        let amount = r"\$?(\d+(?:\.\d+)?)(?: (\w+))?";
        Ok(Self {
            between: Regex::new(r"\bbetween \$?(\d+(?:\.\d+)?) and \$?(\d+(?:\.\d+)?)")?,
            range: Regex::new(r"\$?(\d+(?:\.\d+)?) to \$?(\d+(?:\.\d+)?)(?: (\w+))?")?,
            under: Regex::new(&format!(
                r"\b(?:under|below|less than|max|maximum|up to|no more than|at most|cheaper than|within) {amount}"
            ))?,
            over: Regex::new(&format!(
                r"\b(?:over|above|more than|at least|minimum|min|starting at|upwards of) {amount}"
            ))?,
            around: Regex::new(&format!(
                r"\b(?:around|about|roughly|approximately|near|close to) {amount}"
            ))?,
            bare_dollar: Regex::new(r"\$(\d+(?:\.\d+)?)")?,
            vintage: Regex::new(r"(^|[^$\d])(19[5-9]\d|20[0-4]\d)\b")?,
            stars: Regex::new(r"(\d(?:\.\d+)?)\s*(?:stars?\b|/\s*5\b|out of (?:5|five)\b)")?,
            rate_verb: Regex::new(
                r"\b(?:rate|rated|rating|give|gave|giving|score|scored)\b[^\d\n$]{0,25}?(\d(?:\.\d+)?)\b",
            )?,
            quantity: Regex::new(
                r"\b(\d+|one|two|three|four|five|six|twelve|a dozen|a case of) (?:more )?bottles?\b",
            )?,
            exclude: Regex::new(
                r"\b(?:not|no|anything but|except|other than) (?:a |an |any )?(reds?|whites?|rosé|rose|sparkling)\b",
            )?,
            polite_prefix: Regex::new(
                r"(?i)^(?:please |can you |could you |i want to |i would like to |id like to |i'd like to |let's |lets |ok |okay |and )+",
            )?,
            command: Regex::new(
                r"(?i)^(?:add|remove|delete|rate|save|drop|toss|bought|drank|opened|finished|tell me (?:more )?about|what about|how about|more about|describe|what do you know about|i (?:just )?(?:bought|drank|tried|had|opened|finished|got|picked up|rated|loved|liked|hated|disliked))\b\s*",
            )?,
            destination: Regex::new(
                r"(?i)\s*\b(?:to|from|into|in|out of|off|on) (?:my |the )?(?:cellar|wishlist|wish list|collection|list)\b.*$",
            )?,
            rating_phrase: Regex::new(
                r"(?i)\s*\b(?:(?:a|an)\s+)?\d(?:\.\d+)?\s*(?:stars?\b|/\s*5\b|out of (?:5|five)\b).*$",
            )?,
            trailing_number: Regex::new(r"(?i)\s+(?:(?:a|an)\s+)?\d(?:\.\d+)?$")?,
            leading_filler: Regex::new(
                r"(?i)^(?:the|a|an|my|this|that|some|another|\d{1,2}|one|two|three|four|five|six|a few|bottles? of|a bottle of)\s+",
            )?,
        })
    }
}

static PATTERNS: LazyLock<Option<Patterns>> = LazyLock::new(|| match Patterns::compile() {
    Ok(patterns) => Some(patterns),
    Err(err) => {
        warn!("entity patterns failed to compile (error={})", err);
        None
    }
});

/// Extract every entity the message states explicitly.
pub fn extract(message: &str) -> Entities {
    let Some(patterns) = PATTERNS.as_ref() else {
        return Entities::default();
    };
    let text = Normalized::new(message);
    let lowered = message.to_lowercase();
    let mut entities = Entities::default();

    let (price_min, price_max) = extract_price(patterns, &text);
    entities.price_min = price_min;
    entities.price_max = price_max;

    entities.exclude_type = patterns
        .exclude
        .captures(text.as_str())
        .and_then(|caps| WineType::parse(caps[1].trim_end_matches('s')));
    entities.wine_type = lexicon::find_alias(&text, TYPES)
        .map(|(_, wine_type)| wine_type)
        .filter(|wine_type| Some(*wine_type) != entities.exclude_type);

    entities.varietal = lexicon::find_alias(&text, VARIETALS).map(|(_, v)| v.to_string());
    entities.region = lexicon::find_alias(&text, REGIONS).map(|(_, v)| v.to_string());
    entities.country = lexicon::find_alias(&text, COUNTRIES).map(|(_, v)| v.to_string());
    entities.food_pairing = lexicon::find_alias(&text, FOODS).map(|(_, v)| v.to_string());
    entities.occasion = lexicon::find_alias(&text, OCCASIONS).map(|(_, v)| v.to_string());
    entities.characteristics = lexicon::find_descriptors(&text);

    entities.vintage = patterns
        .vintage
        .captures(text.as_str())
        .and_then(|caps| caps[2].parse::<i32>().ok());
    entities.rating = extract_rating(patterns, &lowered);
    entities.quantity = patterns
        .quantity
        .captures(text.as_str())
        .and_then(|caps| parse_count(&caps[1]));
    entities.status = extract_status(&text);
    entities.tasting_notes = extract_notes(message, &text);

    if text.has_any(&[
        "didnt like",
        "did not like",
        "disliked",
        "disappointing",
        "hated",
        "worst",
        "not good",
    ]) {
        entities.max_rating = Some(3.0);
    } else if text.has_any(&[
        "liked",
        "loved",
        "enjoyed",
        "favorite",
        "favorites",
        "favourite",
        "best",
        "highly rated",
        "top rated",
        "highest rated",
    ]) {
        entities.min_rating = Some(4.0);
    }

    entities.drank = text.has_any(&[
        "drank",
        "drunk",
        "finished",
        "opened",
        "polished off",
        "had the last",
    ]);
    entities.profile_reset = text.has_any(&["reset", "clear", "start over", "wipe", "forget"])
        && text.has_any(&["profile", "preferences", "taste", "palate"]);
    entities.wine_reference = extract_reference(patterns, message);
    entities
}

fn extract_price(patterns: &Patterns, text: &Normalized) -> (Option<f64>, Option<f64>) {
    let source = text.as_str();
    if let Some(caps) = patterns.between.captures(source)
        && let (Some(low), Some(high)) = (number(&caps, 1), number(&caps, 2))
    {
        return (Some(low.min(high)), Some(low.max(high)));
    }
    if let Some(caps) = patterns.range.captures(source)
        && is_price_unit(&caps, 3)
        && let (Some(low), Some(high)) = (number(&caps, 1), number(&caps, 2))
        && (caps[0].contains('$') || high < 1900.0)
    {
        return (Some(low.min(high)), Some(low.max(high)));
    }

    let max = price_capture(&patterns.under, source);
    let min = price_capture(&patterns.over, source);
    if min.is_some() || max.is_some() {
        return (min, max);
    }
    if let Some(center) = price_capture(&patterns.around, source).or_else(|| {
        patterns
            .bare_dollar
            .captures(source)
            .and_then(|caps| number(&caps, 1))
    }) {
        return (
            Some((center * AROUND_LOW).floor()),
            Some((center * AROUND_HIGH).ceil()),
        );
    }

    if text.has_any(&["not too expensive", "not expensive", "not too pricey"]) {
        (None, Some(NOT_EXPENSIVE_MAX))
    } else if text.has_any(&["cheap", "inexpensive", "budget", "affordable", "bargain"]) {
        (None, Some(CHEAP_MAX))
    } else if text.has_any(&["nice bottle", "nicer bottle", "good bottle"]) {
        (Some(NICE_BOTTLE.0), Some(NICE_BOTTLE.1))
    } else if text.has_any(&["splurge", "special occasion", "high end", "fancy", "luxury"]) {
        (Some(SPLURGE_MIN), None)
    } else {
        (None, None)
    }
}

fn price_capture(regex: &Regex, source: &str) -> Option<f64> {
    regex
        .captures_iter(source)
        .filter(|caps| is_price_unit(caps, 2))
        .find_map(|caps| {
            let value = number(&caps, 1)?;
            let dollar = caps.get(0).is_some_and(|m| m.as_str().contains('$'));
            // A bare four-digit year is a vintage, not a budget.
            (dollar || !(1900.0..2100.0).contains(&value)).then_some(value)
        })
}

fn is_price_unit(caps: &Captures<'_>, group: usize) -> bool {
    caps.get(group)
        .is_none_or(|unit| !NON_PRICE_UNITS.contains(&unit.as_str()))
}

fn number(caps: &Captures<'_>, group: usize) -> Option<f64> {
    caps.get(group)?
        .as_str()
        .parse::<f64>()
        .ok()
        .filter(|value| *value > 0.0)
}

fn extract_rating(patterns: &Patterns, lowered: &str) -> Option<f32> {
    let caps = patterns
        .stars
        .captures(lowered)
        .or_else(|| patterns.rate_verb.captures(lowered))?;
    let rating = caps[1].parse::<f32>().ok()?;
    (1.0..=5.0).contains(&rating).then_some(rating)
}

fn parse_count(value: &str) -> Option<u32> {
    match value {
        "one" => Some(1),
        "two" => Some(2),
        "three" => Some(3),
        "four" => Some(4),
        "five" => Some(5),
        "six" => Some(6),
        "twelve" | "a dozen" | "a case of" => Some(12),
        digits => digits.parse().ok().filter(|count| *count > 0),
    }
}

fn extract_status(text: &Normalized) -> Option<BottleStatus> {
    if text.has_any(&[
        "wishlist",
        "wish list",
        "want to try",
        "to try",
        "for later",
        "saved",
        "save",
    ]) {
        Some(BottleStatus::Wishlist)
    } else if text.has_any(&["tried", "ive had", "have had", "drank", "drunk"]) {
        Some(BottleStatus::Tried)
    } else {
        None
    }
}

fn extract_notes(message: &str, text: &Normalized) -> Option<String> {
    let raw = message.trim();
    let lowered = raw.to_lowercase();
    if let Some(idx) = lowered.find("notes:") {
        let notes = raw[idx + "notes:".len()..].trim();
        return (!notes.is_empty()).then(|| notes.to_string());
    }
    if lexicon::find_descriptors(text).is_empty() {
        return None;
    }
    let tail = [",", ";", " - "]
        .iter()
        .filter_map(|sep| raw.find(sep).map(|idx| &raw[idx + sep.len()..]))
        .map(str::trim)
        .find(|tail| !tail.is_empty())
        .unwrap_or(raw);
    Some(tail.trim_end_matches(['.', '!']).to_string())
}

/// Name of a wine the message points at, after stripping commands, ratings
/// and destinations. Only messages that lead with a command are considered.
fn extract_reference(patterns: &Patterns, message: &str) -> Option<String> {
    let trimmed = message.trim().trim_end_matches(['.', '!', '?']);
    let stripped = patterns.polite_prefix.replace(trimmed, "");
    let command = patterns.command.find(&stripped)?;
    let mut rest = stripped[command.end()..].to_string();
    for separator in [",", ";", " - ", " because ", " it was ", " and it "] {
        if let Some(idx) = rest.find(separator) {
            rest.truncate(idx);
        }
    }
    let rest = patterns.destination.replace(&rest, "");
    let rest = patterns.rating_phrase.replace(&rest, "");
    let mut rest = patterns.trailing_number.replace(&rest, "").trim().to_string();
    loop {
        let next = patterns.leading_filler.replace(&rest, "").to_string();
        if next == rest {
            break;
        }
        rest = next;
    }
    let rest = rest.trim().to_string();
    let meaningful = rest.split_whitespace().any(|token| {
        let token = token.to_lowercase();
        !REFERENCE_STOPWORDS.contains(&token.as_str())
            && (token.len() >= 3 || token.chars().all(|ch| ch.is_ascii_digit()))
    });
    meaningful.then_some(rest)
}
