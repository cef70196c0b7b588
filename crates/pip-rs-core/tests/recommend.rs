//! Recommendation turns end to end: interpretation, search, explanations.

use pip_rs_config::PipConfig;
use pip_rs_core::Orchestrator;
use pip_rs_core::prompts::{INTERPRETER_SYSTEM, QUERY_SYSTEM};
use pip_rs_knowledge::{CatalogIndex, KnowledgeIndex};
use pip_rs_protocol::{
    Card, IntentKind, Message, PipelineState, ProcessRequest, ProcessResponse, Provenance,
    RecordedAction, WineCard, WineType,
};
use pip_rs_test_utils::{
    FailingCatalog, KeywordEmbedder, ScriptedCompleter, StubKnowledge, sample_catalog,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

const NAPA_NOTES: &str =
    "Napa Valley Cabernet is known for bold, full-bodied reds with oaky structure.";

fn build(
    completer: ScriptedCompleter,
    knowledge: impl KnowledgeIndex + 'static,
    catalog: impl CatalogIndex + 'static,
) -> Orchestrator {
    Orchestrator::builder(PipConfig::default())
        .completer(Arc::new(completer))
        .embedder(Arc::new(KeywordEmbedder::new()))
        .knowledge(Arc::new(knowledge))
        .catalog(Arc::new(catalog))
        .build()
        .expect("orchestrator")
}

async fn orchestrator(completer: ScriptedCompleter, knowledge: StubKnowledge) -> Orchestrator {
    build(completer, knowledge, sample_catalog().await)
}

fn wine_cards(response: &ProcessResponse) -> Vec<&WineCard> {
    response
        .cards
        .iter()
        .filter_map(|card| match card {
            Card::Wine(card) => Some(card),
            _ => None,
        })
        .collect()
}

/// A typed, budgeted pairing request returns three matching reds.
#[tokio::test]
async fn red_under_forty_for_steak() {
    let pip = orchestrator(ScriptedCompleter::new(), StubKnowledge::empty()).await;
    let response = pip
        .process(ProcessRequest::new("Red wine under $40 for steak"))
        .await;

    assert_eq!(response.intent, Some(IntentKind::Recommend));
    assert_eq!(response.response_text, "I found 3 wines that should work well:");
    let cards = wine_cards(&response);
    assert_eq!(cards.len(), 3);
    for card in &cards {
        assert_eq!(card.wine_type, Some(WineType::Red));
        assert!(card.price_usd.is_some_and(|price| price <= 40.0), "{}", card.name);
        assert!(card.explanation.is_some());
    }
    let Some(RecordedAction::Recommend { request, entities }) = &response.recorded_action else {
        panic!("expected a recorded recommendation");
    };
    assert_eq!(request, "Red wine under $40 for steak");
    assert_eq!(entities.price_max, Some(40.0));
    assert_eq!(
        response.trace,
        vec![
            PipelineState::Idle,
            PipelineState::Classifying,
            PipelineState::Dispatching,
            PipelineState::AgentHandling,
            PipelineState::Responding,
            PipelineState::Idle,
        ]
    );
}

/// Echoed terms trace to the request; "known for" framing traces to knowledge.
#[tokio::test]
async fn explanation_clauses_carry_their_sources() {
    let pip = orchestrator(
        ScriptedCompleter::new(),
        StubKnowledge::passage("Napa Valley", NAPA_NOTES),
    )
    .await;
    let response = pip
        .process(ProcessRequest::new("Red wine under $40 for steak"))
        .await;

    let cards = wine_cards(&response);
    assert_eq!(cards.len(), 3);
    for card in &cards {
        let explanation = card.explanation.as_deref().expect("explanation");
        assert!(explanation.contains("You mentioned steak"), "{explanation}");
        assert!(card.provenance.contains(&Provenance::UserRequest));
        assert!(!explanation.contains("You mentioned bold"), "{explanation}");
        if explanation.contains("known for") {
            assert!(card.provenance.contains(&Provenance::CategoryKnowledge));
        }
    }
    assert!(
        cards
            .iter()
            .any(|card| card.provenance.contains(&Provenance::CategoryKnowledge))
    );
}

/// Retrieved notes reach query fusion but never the preference extraction prompt.
#[tokio::test]
async fn category_knowledge_stays_out_of_the_request() {
    let completer = ScriptedCompleter::new();
    let pip = orchestrator(
        completer.clone(),
        StubKnowledge::passage("Napa Valley", NAPA_NOTES),
    )
    .await;
    pip.process(ProcessRequest::new("Red wine under $40 for steak"))
        .await;

    let requests = completer.requests();
    let extraction = requests
        .iter()
        .find(|request| request.system == INTERPRETER_SYSTEM)
        .expect("extraction request");
    assert_eq!(extraction.prompt, "Request: Red wine under $40 for steak");
    let fusion = requests
        .iter()
        .find(|request| request.system == QUERY_SYSTEM)
        .expect("fusion request");
    assert!(fusion.prompt.contains(NAPA_NOTES));
}

/// An empty search drops the grape once and says so.
#[tokio::test]
async fn empty_search_relaxes_the_most_specific_filter() {
    let pip = orchestrator(ScriptedCompleter::new(), StubKnowledge::empty()).await;
    let response = pip
        .process(ProcessRequest::new("Recommend a Cabernet from Spain"))
        .await;

    assert!(
        response.response_text.starts_with(
            "I couldn't find an exact match, so I dropped the Cabernet Sauvignon requirement."
        ),
        "{}",
        response.response_text
    );
    let cards = wine_cards(&response);
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].wine_id.as_deref(), Some("rioja-reserva"));
}

/// "Cheaper" inherits the last search and lowers its ceiling.
#[tokio::test]
async fn cheaper_refines_the_previous_search() {
    let pip = orchestrator(ScriptedCompleter::new(), StubKnowledge::empty()).await;
    let first = pip
        .process(ProcessRequest::new("Red wine under $40 for steak"))
        .await;
    let history = vec![
        Message::user("Red wine under $40 for steak"),
        first.to_message(),
    ];

    let response = pip
        .process(ProcessRequest::new("something cheaper").with_history(history))
        .await;
    assert_eq!(response.intent, Some(IntentKind::Recommend));
    let cards = wine_cards(&response);
    assert!(!cards.is_empty());
    for card in &cards {
        assert_eq!(card.wine_type, Some(WineType::Red));
        assert!(card.price_usd.is_some_and(|price| price <= 30.0), "{}", card.name);
    }
}

/// "Actually, under $30" re-runs the recorded search with the new ceiling.
#[tokio::test]
async fn amend_reruns_with_the_corrected_budget() {
    let pip = orchestrator(ScriptedCompleter::new(), StubKnowledge::empty()).await;
    let first = pip
        .process(ProcessRequest::new("Red wine under $40 for steak"))
        .await;
    let history = vec![
        Message::user("Red wine under $40 for steak"),
        first.to_message(),
    ];

    let response = pip
        .process(ProcessRequest::new("Actually, under $25").with_history(history))
        .await;
    let cards = wine_cards(&response);
    assert!(!cards.is_empty());
    for card in &cards {
        assert_eq!(card.wine_type, Some(WineType::Red));
        assert!(card.price_usd.is_some_and(|price| price <= 25.0), "{}", card.name);
    }
    let Some(RecordedAction::Recommend { entities, .. }) = &response.recorded_action else {
        panic!("expected a recorded recommendation");
    };
    assert_eq!(entities.price_max, Some(25.0));
}

/// A catalog outage becomes a friendly reply and the turn still ends idle.
#[tokio::test]
async fn catalog_outage_is_reported() {
    let pip = build(ScriptedCompleter::new(), StubKnowledge::empty(), FailingCatalog);
    let response = pip
        .process(ProcessRequest::new("Red wine under $40 for steak"))
        .await;

    assert!(
        response
            .response_text
            .starts_with("I couldn't reach the wine catalog")
    );
    assert!(response.cards.is_empty());
    assert_eq!(response.trace.last(), Some(&PipelineState::Idle));
    assert!(response.trace.contains(&PipelineState::Responding));
}
