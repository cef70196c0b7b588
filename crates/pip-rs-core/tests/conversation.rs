//! Multi-turn flows: clarification, confirmation, undo and the sign-in gate.

use pip_rs_config::PipConfig;
use pip_rs_core::{CellarStore, InMemoryCellarStore, NEW_OR_CELLAR_QUESTION, Orchestrator};
use pip_rs_protocol::{
    ActionKind, AmbiguityReason, BottleStatus, CellarBottle, ConfirmationAction, IntentKind,
    Message, PipelineState, ProcessRequest, RecordedAction,
};
use pip_rs_test_utils::{
    KeywordEmbedder, ScriptedCompleter, StubKnowledge, assistant_with_wines, sample_catalog,
    sample_wine,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

const USER: &str = "alice";

async fn orchestrator(cellar: Arc<InMemoryCellarStore>) -> Orchestrator {
    Orchestrator::builder(PipConfig::default())
        .completer(Arc::new(ScriptedCompleter::new()))
        .embedder(Arc::new(KeywordEmbedder::new()))
        .knowledge(Arc::new(StubKnowledge::empty()))
        .catalog(Arc::new(sample_catalog().await))
        .cellar_store(cellar)
        .build()
        .expect("orchestrator")
}

/// A cellar holding two bottles of the 2019 Catena Malbec.
async fn cellar_with_malbec() -> Arc<InMemoryCellarStore> {
    let cellar = Arc::new(InMemoryCellarStore::new());
    let bottle = CellarBottle::from_wine(&sample_wine("mendoza-malbec"), BottleStatus::Owned, 2);
    cellar.upsert(USER, bottle).await.expect("seed cellar");
    cellar
}

/// Greetings get the capability summary.
#[tokio::test]
async fn greeting_introduces_pip() {
    let pip = orchestrator(Arc::new(InMemoryCellarStore::new())).await;
    let response = pip.process(ProcessRequest::new("Hi there!")).await;
    assert_eq!(response.intent, Some(IntentKind::OffTopic));
    assert!(response.response_text.starts_with("Hi! I'm Pip"));
}

/// Cellar questions without a user ask for sign-in and dispatch nothing.
#[tokio::test]
async fn cellar_intents_require_sign_in() {
    let pip = orchestrator(Arc::new(InMemoryCellarStore::new())).await;
    let response = pip.process(ProcessRequest::new("What's in my cellar?")).await;

    assert!(response.requires_auth);
    assert_eq!(response.intent, Some(IntentKind::CellarQuery));
    assert_eq!(
        response.trace,
        vec![
            PipelineState::Idle,
            PipelineState::Classifying,
            PipelineState::Dispatching,
            PipelineState::Responding,
            PipelineState::Idle,
        ]
    );
}

/// "Add it" over three shown wines asks which one and writes nothing.
#[tokio::test]
async fn ambiguous_target_asks_before_acting() {
    let cellar = Arc::new(InMemoryCellarStore::new());
    let pip = orchestrator(cellar.clone()).await;
    let shown = [
        sample_wine("napa-cab"),
        sample_wine("mendoza-malbec"),
        sample_wine("rioja-reserva"),
    ];
    let history = vec![
        Message::user("Red wine under $40 for steak"),
        assistant_with_wines("I found 3 wines that should work well:", &shown),
    ];

    let response = pip
        .process(
            ProcessRequest::new("add it to my cellar")
                .with_user(USER)
                .with_history(history.clone()),
        )
        .await;
    assert!(response.response_text.starts_with("Which wine do you mean"));
    assert_eq!(response.cards.len(), 3);
    assert_eq!(response.actions.len(), 3);
    assert!(
        response
            .actions
            .iter()
            .all(|action| action.kind == ActionKind::SelectWine)
    );
    assert!(!response.trace.contains(&PipelineState::AgentHandling));
    assert_eq!(
        response.clarification.as_ref().map(|pending| pending.reason),
        Some(AmbiguityReason::UnclearTarget)
    );
    assert!(cellar.list(USER).await.expect("list").is_empty());

    let mut history = history;
    history.push(Message::user("add it to my cellar"));
    history.push(response.to_message());
    let answer = pip
        .process(
            ProcessRequest::new("the Malbec")
                .with_user(USER)
                .with_history(history),
        )
        .await;
    assert_eq!(answer.intent, Some(IntentKind::CellarAdd));
    assert_eq!(answer.response_text, "Added 2019 Catena Malbec to your cellar!");
    let bottles = cellar.list(USER).await.expect("list");
    assert_eq!(bottles.len(), 1);
    assert_eq!(bottles[0].wine_id.as_deref(), Some("mendoza-malbec"));
}

/// Removal waits for "yes", and undo puts the bottle back.
#[tokio::test]
async fn removal_is_confirmed_then_undone() {
    let cellar = cellar_with_malbec().await;
    let pip = orchestrator(cellar.clone()).await;

    let asked = pip
        .process(ProcessRequest::new("remove the 2019 Malbec").with_user(USER))
        .await;
    assert_eq!(
        asked.response_text,
        "Remove 2019 Catena Malbec from your cellar? Say 'yes' to confirm."
    );
    let pending = asked.confirmation.clone().expect("confirmation");
    assert_eq!(pending.action, ConfirmationAction::RemoveBottle);
    assert!(asked.trace.contains(&PipelineState::ConfirmationPending));
    assert_eq!(cellar.list(USER).await.expect("list").len(), 1);

    let mut history = vec![Message::user("remove the 2019 Malbec"), asked.to_message()];
    let removed = pip
        .process(
            ProcessRequest::new("yes, remove it")
                .with_user(USER)
                .with_history(history.clone())
                .with_confirmation(Some(pending)),
        )
        .await;
    assert_eq!(removed.response_text, "Removed 2019 Catena Malbec from your cellar.");
    assert!(matches!(
        removed.recorded_action,
        Some(RecordedAction::CellarRemove { .. })
    ));
    assert!(cellar.list(USER).await.expect("list").is_empty());

    history.push(Message::user("yes, remove it"));
    history.push(removed.to_message());
    let undone = pip
        .process(ProcessRequest::new("undo").with_user(USER).with_history(history))
        .await;
    assert_eq!(undone.intent, Some(IntentKind::Correction));
    assert_eq!(
        undone.response_text,
        "Undone. 2019 Catena Malbec is back in your cellar."
    );
    let bottles = cellar.list(USER).await.expect("list");
    assert_eq!(bottles.len(), 1);
    assert_eq!(bottles[0].quantity, 2);
}

/// "Never mind" cancels a pending removal without touching the cellar.
#[tokio::test]
async fn declined_confirmation_changes_nothing() {
    let cellar = cellar_with_malbec().await;
    let pip = orchestrator(cellar.clone()).await;
    let asked = pip
        .process(ProcessRequest::new("remove the 2019 Malbec").with_user(USER))
        .await;
    let history = vec![Message::user("remove the 2019 Malbec"), asked.to_message()];

    let response = pip
        .process(
            ProcessRequest::new("never mind")
                .with_user(USER)
                .with_history(history)
                .with_confirmation(asked.confirmation.clone()),
        )
        .await;
    assert_eq!(response.response_text, "Okay, I won't change anything.");
    assert!(!response.trace.contains(&PipelineState::AgentHandling));
    assert_eq!(cellar.list(USER).await.expect("list").len(), 1);
}

/// An unrelated message lets the confirmation lapse and is handled on its own.
#[tokio::test]
async fn unrelated_reply_lapses_the_confirmation() {
    let cellar = cellar_with_malbec().await;
    let pip = orchestrator(cellar.clone()).await;
    let asked = pip
        .process(ProcessRequest::new("remove the 2019 Malbec").with_user(USER))
        .await;

    let response = pip
        .process(
            ProcessRequest::new("What do I like?")
                .with_user(USER)
                .with_confirmation(asked.confirmation.clone()),
        )
        .await;
    assert_eq!(response.intent, Some(IntentKind::ProfileQuery));
    assert_eq!(response.confirmation, None);
    assert_eq!(cellar.list(USER).await.expect("list").len(), 1);
}

/// A pairing question asks new-or-cellar only when there is a cellar to pick from.
#[tokio::test]
async fn pairing_question_checks_the_cellar_first() {
    let empty = orchestrator(Arc::new(InMemoryCellarStore::new())).await;
    let direct = empty
        .process(ProcessRequest::new("What should I drink with pasta tonight?").with_user(USER))
        .await;
    assert_eq!(direct.intent, Some(IntentKind::Recommend));
    assert!(!direct.cards.is_empty());

    let stocked = orchestrator(cellar_with_malbec().await).await;
    let asked = stocked
        .process(ProcessRequest::new("What should I drink with pasta tonight?").with_user(USER))
        .await;
    assert_eq!(asked.response_text, NEW_OR_CELLAR_QUESTION);
    assert!(asked.cards.is_empty());
    let kinds = asked
        .actions
        .iter()
        .map(|action| action.kind)
        .collect::<Vec<_>>();
    assert_eq!(
        kinds,
        vec![ActionKind::RecommendNew, ActionKind::PickFromCellar]
    );
    assert!(!asked.trace.contains(&PipelineState::AgentHandling));
}

/// "What should I open tonight?" with nothing owned points at recommendations.
#[tokio::test]
async fn decide_with_empty_cellar() {
    let pip = orchestrator(Arc::new(InMemoryCellarStore::new())).await;
    let response = pip
        .process(ProcessRequest::new("What should I open tonight?").with_user(USER))
        .await;
    assert_eq!(response.intent, Some(IntentKind::Decide));
    assert_eq!(
        response.response_text,
        "Your cellar is empty! Let's find some wines to add."
    );
    assert_eq!(response.actions.len(), 1);
    assert_eq!(response.actions[0].kind, ActionKind::FindWines);
}

/// With one owned bottle the pick is that bottle.
#[tokio::test]
async fn decide_picks_from_the_cellar() {
    let pip = orchestrator(cellar_with_malbec().await).await;
    let response = pip
        .process(ProcessRequest::new("What should I open tonight?").with_user(USER))
        .await;
    assert_eq!(response.intent, Some(IntentKind::Decide));
    assert!(!response.cards.is_empty());
    assert_eq!(
        response.cards[0].name(),
        Some("Catena Malbec")
    );
}
