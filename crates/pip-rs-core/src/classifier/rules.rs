//! Lexical intent rules, tried in order before any model call.

use super::references;
use crate::lexicon::{Normalized, WINE_TERMS};
use pip_rs_protocol::{Card, Entities, IntentKind};

const GREETINGS: &[&str] = &[
    "hi", "hello", "hey", "hiya", "howdy", "yo", "good morning", "good afternoon",
    "good evening", "thanks", "thank you", "thx", "cheers", "bye", "goodbye",
];

const PROFILE_PHRASES: &[&str] = &[
    "what do i like",
    "what do i usually like",
    "my taste",
    "my palate",
    "my profile",
    "taste profile",
    "my preferences",
    "what kind of wine do i like",
    "what wines do i like",
    "what have you learned about me",
    "what do you know about me",
];

const RATED_QUERIES: &[&str] = &[
    "my ratings",
    "have i rated",
    "wines i rated",
    "ive rated",
    "my rated",
    "my highest rated",
    "my top rated",
];

const RATE_WORDS: &[&str] = &["rate", "rated", "rating", "stars"];

const RATING_ADJECTIVES: &[&str] = &[
    "highly rated",
    "top rated",
    "well rated",
    "best rated",
    "highest rated",
];

const REMOVE_WORDS: &[&str] = &[
    "remove",
    "delete",
    "take out",
    "get rid of",
    "throw out",
    "toss",
];

const ADD_WORDS: &[&str] = &[
    "add",
    "bought",
    "just got",
    "picked up",
    "grabbed",
    "save it",
    "save this",
    "save that",
    "save the",
    "save for later",
    "want to try it",
    "want to try this",
    "want to try that",
];

const CHOOSE_CUES: &[&str] = &[
    "should i open",
    "should i drink",
    "what should i",
    "which should",
    "which one should",
    "which bottle",
    "pick",
    "choose",
    "decide",
    "what to open",
    "open tonight",
];

const CELLAR_CUES: &[&str] = &[
    "my cellar",
    "i have",
    "i own",
    "i already have",
    "my wines",
    "my collection",
    "my bottles",
    "what i have",
];

const QUERY_CUES: &[&str] = &[
    "what", "whats", "show", "list", "how many", "do i have", "view", "see", "in my cellar",
];

const CELLAR_VIEWS: &[&str] = &[
    "my wishlist",
    "my wish list",
    "wines ive tried",
    "what have i tried",
    "my cellar",
];

const SPECIFIC_CUES: &[&str] = &[
    "tell me more",
    "tell me about",
    "more about",
    "what is it like",
    "whats it like",
    "how does it taste",
    "what does it taste like",
    "describe",
    "more info",
    "more details",
    "what do you know about",
    "why this",
    "why that",
    "why did you pick",
    "what about",
];

const RECOMMEND_CUES: &[&str] = &[
    "recommend",
    "recommendation",
    "suggest",
    "suggestion",
    "find me",
    "find a",
    "looking for",
    "im looking",
    "i want a",
    "i need a",
    "get me",
    "show me some",
    "whats a good",
    "what is a good",
    "any good",
    "cheaper",
    "more expensive",
    "pricier",
    "something else",
    "another one",
    "similar",
    "alternative",
    "alternatives",
    "other options",
    "something different",
    "what else",
];

const PAIRING_CUES: &[&str] = &[
    "what wine",
    "which wine",
    "what should i drink",
    "what to drink",
    "what goes",
    "goes with",
    "go with",
    "pair",
    "pairs",
    "pairing",
    "wine for",
    "wine with",
    "drink with",
    "serve with",
    "what should i serve",
    "to drink",
    "drink tonight",
];

const NEW_CUES: &[&str] = &["new", "buy", "shop", "store", "purchase", "order"];

const EDUCATION_CUES: &[&str] = &[
    "what is",
    "whats",
    "what are",
    "difference between",
    "why",
    "how do",
    "how does",
    "how is",
    "how are",
    "how long",
    "how to",
    "explain",
    "tell me about",
    "what does",
    "what makes",
    "meaning of",
    "is it true",
    "should i decant",
    "what temperature",
    "teach me",
    "learn about",
];

/// Outcome of the lexical pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct RuleMatch {
    pub kind: IntentKind,
    pub confidence: f32,
    /// Pairing question that could mean a purchase or a cellar pick.
    pub new_or_cellar: bool,
}

impl RuleMatch {
    fn new(kind: IntentKind, confidence: f32) -> Self {
        Self {
            kind,
            confidence,
            new_or_cellar: false,
        }
    }
}

fn mentions_wine(text: &Normalized, entities: &Entities) -> bool {
    text.has_any(WINE_TERMS)
        || entities.wine_type.is_some()
        || entities.varietal.is_some()
        || entities.region.is_some()
        || entities.country.is_some()
        || entities.food_pairing.is_some()
        || !entities.characteristics.is_empty()
}

/// Short social messages: hello, thanks, goodbye.
pub(crate) fn is_greeting(text: &Normalized) -> bool {
    text.token_count() <= 4 && text.starts_with_any(GREETINGS)
}

/// First matching rule, or `None` when the message needs the model.
pub(crate) fn classify(text: &Normalized, entities: &Entities, cards: &[Card]) -> Option<RuleMatch> {
    if is_greeting(text) {
        return Some(RuleMatch::new(IntentKind::OffTopic, 0.95));
    }
    if entities.profile_reset || text.has_any(PROFILE_PHRASES) {
        return Some(RuleMatch::new(IntentKind::ProfileQuery, 0.9));
    }
    if text.has_any(RATED_QUERIES) {
        return Some(RuleMatch::new(IntentKind::CellarQuery, 0.85));
    }
    if entities.rating.is_some()
        || (text.has_any(RATE_WORDS) && !text.has_any(RATING_ADJECTIVES))
    {
        return Some(RuleMatch::new(IntentKind::Rate, 0.9));
    }
    if text.has_any(REMOVE_WORDS) {
        return Some(RuleMatch::new(IntentKind::CellarRemove, 0.9));
    }
    if text.has_any(ADD_WORDS) {
        return Some(RuleMatch::new(IntentKind::CellarAdd, 0.85));
    }

    let cellar_cue = text.has_any(CELLAR_CUES);
    if text.has_any(CHOOSE_CUES) && (cellar_cue || text.has_any(&["should i open", "to open"])) {
        return Some(RuleMatch::new(IntentKind::Decide, 0.85));
    }
    if (cellar_cue && text.has_any(QUERY_CUES)) || text.has_any(CELLAR_VIEWS) {
        return Some(RuleMatch::new(IntentKind::CellarQuery, 0.85));
    }
    if text.has_any(SPECIFIC_CUES)
        && (references::has_anaphora(text) || !references::name_matches(text, cards).is_empty())
    {
        return Some(RuleMatch::new(IntentKind::EducateSpecific, 0.85));
    }
    if entities.has_price() {
        return Some(RuleMatch::new(IntentKind::Recommend, 0.9));
    }
    if text.has_any(RECOMMEND_CUES) {
        return Some(RuleMatch::new(IntentKind::Recommend, 0.85));
    }
    let situational = entities.food_pairing.is_some() || entities.occasion.is_some();
    if text.has_any(&["what should i drink", "what to drink", "drink tonight"])
        || (situational && text.has_any(PAIRING_CUES))
    {
        return Some(RuleMatch {
            kind: IntentKind::Recommend,
            confidence: 0.75,
            new_or_cellar: !text.has_any(NEW_CUES),
        });
    }
    if text.has_any(EDUCATION_CUES) {
        return mentions_wine(text, entities)
            .then(|| RuleMatch::new(IntentKind::EducateGeneral, 0.8));
    }
    if entities.has_search_filters() || situational {
        return Some(RuleMatch::new(IntentKind::Recommend, 0.7));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities;
    use pip_rs_test_utils::{sample_wine, wine_cards};
    use pretty_assertions::assert_eq;

    fn kind_of(message: &str) -> Option<IntentKind> {
        classify(&Normalized::new(message), &entities::extract(message), &[])
            .map(|rule| rule.kind)
    }

    #[test]
    fn routes_common_messages() {
        let cases = [
            ("Hi there!", Some(IntentKind::OffTopic)),
            ("Red wine under $40 for steak", Some(IntentKind::Recommend)),
            ("California red", Some(IntentKind::Recommend)),
            ("What's a good red under $30?", Some(IntentKind::Recommend)),
            ("What's the difference between Syrah and Shiraz?", Some(IntentKind::EducateGeneral)),
            ("Add the first one to my cellar", Some(IntentKind::CellarAdd)),
            ("What's in my cellar?", Some(IntentKind::CellarQuery)),
            ("show my wishlist", Some(IntentKind::CellarQuery)),
            ("remove the 2019 Malbec", Some(IntentKind::CellarRemove)),
            ("I rated the Rioja 5 stars", Some(IntentKind::Rate)),
            ("What do I like?", Some(IntentKind::ProfileQuery)),
            ("Reset my taste profile", Some(IntentKind::ProfileQuery)),
            ("What should I open tonight?", Some(IntentKind::Decide)),
            ("which of my wines goes with lamb? pick one", Some(IntentKind::Decide)),
            ("any highly rated whites?", Some(IntentKind::Recommend)),
            ("What is the meaning of life?", None),
        ];
        for (message, expected) in cases {
            assert_eq!(kind_of(message), expected, "message: {message}");
        }
    }

    #[test]
    fn pairing_questions_flag_new_or_cellar() {
        let message = "What should I drink with pasta tonight?";
        let rule = classify(&Normalized::new(message), &entities::extract(message), &[])
            .expect("rule");
        assert_eq!(rule.kind, IntentKind::Recommend);
        assert!(rule.new_or_cellar);

        let message = "What new wine should I buy for pasta?";
        let rule = classify(&Normalized::new(message), &entities::extract(message), &[])
            .expect("rule");
        assert!(!rule.new_or_cellar);
    }

    #[test]
    fn specific_questions_need_a_pointer_or_a_shown_name() {
        let cards = wine_cards(&[sample_wine("barolo")]);
        let message = "Tell me about Barolo";
        let general = classify(&Normalized::new(message), &entities::extract(message), &[])
            .expect("rule");
        assert_eq!(general.kind, IntentKind::EducateGeneral);
        let specific = classify(&Normalized::new(message), &entities::extract(message), &cards)
            .expect("rule");
        assert_eq!(specific.kind, IntentKind::EducateSpecific);
    }
}
