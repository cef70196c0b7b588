//! Preference interpreter: turns a recommendation request into a `SearchQuery`.
//!
//! Filters come from lexical extraction first, the completer fills whatever
//! is left, refinements inherit the previous search, and stored preferences
//! apply last to fields the user said nothing about. Category knowledge is
//! retrieved separately and never mixed into `user_request`.

use crate::entities;
use crate::history::ConversationWindow;
use crate::json::parse_embedded;
use crate::lexicon::Normalized;
use crate::prompts::{INTERPRETER_SYSTEM, QUERY_SYSTEM};
use log::{debug, warn};
use pip_rs_knowledge::{Embedder, KnowledgeIndex};
use pip_rs_protocol::{
    Card, Completer, CompletionRequest, Entities, PriceRange, RecordedAction, SearchQuery,
    StoredPreferences,
};
use std::sync::Arc;

const CHEAPER_CUES: &[&str] = &[
    "cheaper",
    "less expensive",
    "more affordable",
    "lower price",
    "cheaper one",
    "too expensive",
    "too pricey",
];
const PRICIER_CUES: &[&str] = &[
    "more expensive",
    "pricier",
    "fancier",
    "nicer",
    "higher end",
    "splurge",
    "treat myself",
];
const SIMILAR_CUES: &[&str] = &[
    "another",
    "another one",
    "something else",
    "similar",
    "more like",
    "more options",
    "other options",
    "different one",
    "show me more",
];
/// Share of the inherited ceiling kept by "cheaper".
const CHEAPER_FACTOR: f64 = 0.75;
/// Headroom added above a stored price comfort ceiling.
const STORED_CEILING_HEADROOM: f64 = 1.25;

/// Search query plus the user-stated entities it was built from.
///
/// `entities` excludes stored preferences so that recording and amending a
/// search never treats them as something the user said.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpretation {
    pub query: SearchQuery,
    pub entities: Entities,
    pub refined: bool,
}

/// Agent 1 of the recommendation pipeline.
pub struct PreferenceInterpreter {
    completer: Arc<dyn Completer>,
    embedder: Arc<dyn Embedder>,
    knowledge: Arc<dyn KnowledgeIndex>,
    knowledge_top_k: usize,
}

impl PreferenceInterpreter {
    pub fn new(
        completer: Arc<dyn Completer>,
        embedder: Arc<dyn Embedder>,
        knowledge: Arc<dyn KnowledgeIndex>,
        knowledge_top_k: usize,
    ) -> Self {
        Self {
            completer,
            embedder,
            knowledge,
            knowledge_top_k,
        }
    }

    /// Interpret `description` from scratch.
    pub async fn interpret(
        &self,
        description: &str,
        history: &ConversationWindow<'_>,
        preferences: Option<&StoredPreferences>,
    ) -> SearchQuery {
        self.interpret_with(description, entities::extract(description), history, preferences)
            .await
            .query
    }

    /// Interpret with entities the classifier already extracted.
    pub async fn interpret_with(
        &self,
        description: &str,
        extracted: Entities,
        history: &ConversationWindow<'_>,
        preferences: Option<&StoredPreferences>,
    ) -> Interpretation {
        let mut stated = extracted;
        self.fill_from_model(description, &mut stated).await;
        let refined = inherit_refinement(description, &mut stated, history);

        let mut effective = stated.clone();
        if let Some(preferences) = preferences {
            apply_stored(&mut effective, preferences);
        }

        let category_knowledge = self.category_knowledge(description, &effective).await;
        let query_text = self
            .fuse_query(description, &effective, &category_knowledge)
            .await;
        let query = SearchQuery {
            query_text,
            category_knowledge,
            user_request: description.trim().to_string(),
            price_range: PriceRange::new(effective.price_min, effective.price_max),
            wine_type_filter: effective.wine_type,
            region_filter: effective.region.clone(),
            country_filter: effective.country.clone(),
            varietal_filter: effective.varietal.clone(),
            occasion: effective.occasion.clone(),
            food_pairing: effective.food_pairing.clone(),
        };
        debug!(
            "interpreted request (type={:?}, price={:?}, food={:?}, refined={}, knowledge_chars={})",
            query.wine_type_filter,
            query.price_range,
            query.food_pairing,
            refined,
            query.category_knowledge.len()
        );
        Interpretation {
            query,
            entities: stated,
            refined,
        }
    }

    /// Model extraction fills search fields the lexical pass left empty.
    async fn fill_from_model(&self, description: &str, entities: &mut Entities) {
        let request = CompletionRequest::new(INTERPRETER_SYSTEM, format!("Request: {description}"));
        let reply = match self.completer.complete(request).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!("preference extraction failed (error={})", err);
                return;
            }
        };
        let Some(model) = parse_embedded::<Entities>(&reply) else {
            debug!("no structured preferences in reply (chars={})", reply.len());
            return;
        };
        let mut search_fields = Entities {
            wine_type: model.wine_type,
            region: model.region,
            country: model.country,
            varietal: model.varietal,
            occasion: model.occasion,
            food_pairing: model.food_pairing,
            ..Entities::default()
        };
        if !entities.has_price() {
            search_fields.price_min = model.price_min;
            search_fields.price_max = model.price_max;
        }
        if entities.exclude_type.is_some() && search_fields.wine_type == entities.exclude_type {
            search_fields.wine_type = None;
        }
        entities.fill_missing(&search_fields);
    }

    async fn category_knowledge(&self, description: &str, entities: &Entities) -> String {
        let mut text = description.trim().to_string();
        if let Some(food) = &entities.food_pairing {
            text.push_str(&format!(" with {food}"));
        }
        if let Some(wine_type) = entities.wine_type {
            text.push_str(&format!(" {wine_type} wine"));
        }
        let embedding = match self.embedder.embed(&text).await {
            Ok(embedding) => embedding,
            Err(err) => {
                warn!("knowledge query embedding failed (error={})", err);
                return String::new();
            }
        };
        match self.knowledge.search(&embedding, self.knowledge_top_k).await {
            Ok(chunks) => chunks
                .iter()
                .map(|scored| scored.chunk.render())
                .collect::<Vec<_>>()
                .join("\n"),
            Err(err) => {
                warn!("knowledge lookup failed (error={})", err);
                String::new()
            }
        }
    }

    async fn fuse_query(&self, description: &str, entities: &Entities, knowledge: &str) -> String {
        let prompt = if knowledge.is_empty() {
            format!("Request: {description}")
        } else {
            format!("Request: {description}\nReference notes:\n{knowledge}")
        };
        match self
            .completer
            .complete(CompletionRequest::new(QUERY_SYSTEM, prompt))
            .await
        {
            Ok(reply) => {
                let sentence = reply.lines().map(str::trim).find(|line| !line.is_empty());
                if let Some(sentence) = sentence
                    && !sentence.starts_with('{')
                {
                    return sentence.to_string();
                }
            }
            Err(err) => warn!("query fusion failed (error={})", err),
        }
        fused_query(description, entities, knowledge)
    }
}

/// Deterministic query text: the request, its filters, then the knowledge.
pub fn fused_query(description: &str, entities: &Entities, knowledge: &str) -> String {
    let mut parts = vec![description.trim().to_string()];
    if let Some(wine_type) = entities.wine_type {
        parts.push(format!("{wine_type} wine"));
    }
    parts.extend(
        [&entities.varietal, &entities.region, &entities.country]
            .into_iter()
            .flatten()
            .cloned(),
    );
    if let Some(food) = &entities.food_pairing {
        parts.push(format!("pairs with {food}"));
    }
    if let Some(occasion) = &entities.occasion {
        parts.push(format!("for {occasion}"));
    }
    if !entities.characteristics.is_empty() {
        parts.push(entities.characteristics.join(", "));
    }
    if !knowledge.is_empty() {
        parts.push(knowledge.replace('\n', " "));
    }
    parts
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(". ")
}

/// Carry the previous search into "cheaper", "another one" and friends.
fn inherit_refinement(
    description: &str,
    entities: &mut Entities,
    history: &ConversationWindow<'_>,
) -> bool {
    let text = Normalized::new(description);
    let cheaper = text.has_any(CHEAPER_CUES);
    let pricier = !cheaper && text.has_any(PRICIER_CUES);
    if !cheaper && !pricier && !text.has_any(SIMILAR_CUES) {
        return false;
    }
    let Some(RecordedAction::Recommend {
        entities: previous, ..
    }) = history.last_recommendation()
    else {
        return false;
    };

    let stated_price = entities.has_price();
    let mut inherited = previous.clone();
    if stated_price {
        inherited.price_min = None;
        inherited.price_max = None;
    }
    entities.fill_missing(&inherited);

    if !stated_price {
        let shown = shown_prices(history.last_cards());
        if cheaper {
            let base = previous
                .price_max
                .or_else(|| shown.iter().copied().reduce(f64::min));
            if let Some(base) = base {
                let ceiling = (base * CHEAPER_FACTOR).round();
                entities.price_max = Some(ceiling);
                entities.price_min = entities.price_min.filter(|min| *min < ceiling);
            }
        } else if pricier {
            let base = previous
                .price_max
                .or_else(|| shown.iter().copied().reduce(f64::max));
            if let Some(base) = base {
                entities.price_min = Some(base);
                entities.price_max = None;
            }
        }
    }
    debug!(
        "refinement inherits previous search (cheaper={}, pricier={}, price_max={:?})",
        cheaper, pricier, entities.price_max
    );
    true
}

fn shown_prices(cards: &[Card]) -> Vec<f64> {
    cards
        .iter()
        .filter_map(|card| match card {
            Card::Wine(wine) => wine.price_usd,
            _ => None,
        })
        .collect()
}

/// Stored preferences fill only what the user left unsaid; price is one signal.
fn apply_stored(entities: &mut Entities, preferences: &StoredPreferences) {
    if !entities.has_price()
        && let Some(range) = preferences.price_range
        && let Some(max) = range.max
    {
        entities.price_max = Some((max * STORED_CEILING_HEADROOM).ceil());
    }
    if entities.wine_type.is_none()
        && entities.varietal.is_none()
        && let Some(wine_type) = preferences.wine_type
        && entities.exclude_type != Some(wine_type)
    {
        entities.wine_type = Some(wine_type);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pip_rs_protocol::{Message, WineType};
    use pip_rs_test_utils::{
        FailingCompleter, FailingKnowledge, KeywordEmbedder, ScriptedCompleter, StubKnowledge,
        assistant_with_wines, sample_wine,
    };
    use pretty_assertions::assert_eq;

    fn interpreter(
        completer: impl Completer + 'static,
        knowledge: impl KnowledgeIndex + 'static,
    ) -> PreferenceInterpreter {
        PreferenceInterpreter::new(
            Arc::new(completer),
            Arc::new(KeywordEmbedder::new()),
            Arc::new(knowledge),
            3,
        )
    }

    #[tokio::test]
    async fn extracts_filters_and_keeps_request_verbatim() {
        let interpreter = interpreter(
            ScriptedCompleter::new(),
            StubKnowledge::passage("Steak pairings", "Tannic reds cut through the fat of steak."),
        );
        let history: Vec<Message> = Vec::new();
        let query = interpreter
            .interpret(
                "Red wine under $40 for steak",
                &ConversationWindow::new(&history, 10),
                None,
            )
            .await;
        assert_eq!(query.wine_type_filter, Some(WineType::Red));
        assert_eq!(query.price_range, PriceRange::new(None, Some(40.0)));
        assert_eq!(query.food_pairing.as_deref(), Some("steak"));
        assert_eq!(query.user_request, "Red wine under $40 for steak");
        assert_eq!(
            query.category_knowledge,
            "Steak pairings: Tannic reds cut through the fat of steak."
        );
        assert_ne!(query.user_request, query.category_knowledge);
        assert!(query.query_text.starts_with("Red wine under $40 for steak"));
    }

    #[tokio::test]
    async fn model_fills_gaps_without_overriding() {
        let completer = ScriptedCompleter::new().on(
            "Extract wine search preferences",
            r#"{"wine_type": "white", "region": "Rioja", "price_max": 15}"#,
        );
        let interpreter = interpreter(completer, StubKnowledge::empty());
        let history: Vec<Message> = Vec::new();
        let query = interpreter
            .interpret(
                "Red wine under $40 for steak",
                &ConversationWindow::new(&history, 10),
                None,
            )
            .await;
        assert_eq!(query.wine_type_filter, Some(WineType::Red));
        assert_eq!(query.price_range.max, Some(40.0));
        assert_eq!(query.region_filter.as_deref(), Some("Rioja"));
    }

    #[tokio::test]
    async fn stored_preferences_only_fill_unstated_fields() {
        let interpreter = interpreter(ScriptedCompleter::new(), StubKnowledge::empty());
        let history: Vec<Message> = Vec::new();
        let window = ConversationWindow::new(&history, 10);
        let stored = StoredPreferences {
            price_range: Some(PriceRange::new(Some(20.0), Some(40.0))),
            wine_type: Some(WineType::Red),
        };

        let query = interpreter
            .interpret("something for tonight", &window, Some(&stored))
            .await;
        assert_eq!(query.wine_type_filter, Some(WineType::Red));
        assert_eq!(query.price_range, PriceRange::new(None, Some(50.0)));

        let query = interpreter
            .interpret("a white over $30", &window, Some(&stored))
            .await;
        assert_eq!(query.wine_type_filter, Some(WineType::White));
        assert_eq!(query.price_range, PriceRange::new(Some(30.0), None));
    }

    #[tokio::test]
    async fn cheaper_inherits_and_lowers_the_ceiling() {
        let interpreter = interpreter(ScriptedCompleter::new(), StubKnowledge::empty());
        let previous = entities::extract("Red wine under $40 for steak");
        let history = vec![
            Message::user("Red wine under $40 for steak"),
            assistant_with_wines("I found 1 wine", &[sample_wine("napa-cab")])
                .with_recorded_action(RecordedAction::Recommend {
                    request: "Red wine under $40 for steak".to_string(),
                    entities: previous,
                }),
        ];
        let interpretation = interpreter
            .interpret_with(
                "something cheaper",
                entities::extract("something cheaper"),
                &ConversationWindow::new(&history, 10),
                None,
            )
            .await;
        assert!(interpretation.refined);
        let query = interpretation.query;
        assert_eq!(query.price_range, PriceRange::new(None, Some(30.0)));
        assert_eq!(query.wine_type_filter, Some(WineType::Red));
        assert_eq!(query.food_pairing.as_deref(), Some("steak"));
        assert_eq!(query.user_request, "something cheaper");
    }

    #[tokio::test]
    async fn knowledge_failure_leaves_context_empty() {
        let interpreter = interpreter(FailingCompleter::new("offline"), FailingKnowledge);
        let history: Vec<Message> = Vec::new();
        let query = interpreter
            .interpret("California red", &ConversationWindow::new(&history, 10), None)
            .await;
        assert_eq!(query.category_knowledge, "");
        assert_eq!(query.wine_type_filter, Some(WineType::Red));
        assert!(query.query_text.contains("California red"));
    }

    #[test]
    fn fused_query_lists_filters_in_order() {
        let entities = entities::extract("Red wine under $40 for steak");
        assert_eq!(
            fused_query("Red wine under $40 for steak", &entities, ""),
            "Red wine under $40 for steak. red wine. pairs with steak"
        );
    }
}
