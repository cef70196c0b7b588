//! Ratings, the taste profile, label photos and wine questions.

use pip_rs_config::PipConfig;
use pip_rs_core::{CellarStore, FileStore, Orchestrator, ProfileStore};
use pip_rs_protocol::{
    Attachment, BottleStatus, Card, Completer, ConfirmationAction, IntentKind, Message,
    ProcessRequest, RecordedAction, VisionService,
};
use pip_rs_test_utils::{
    FailingCompleter, KeywordEmbedder, ScriptedCompleter, StubKnowledge, StubVision,
    sample_catalog,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tempfile::TempDir;

const USER: &str = "bob";

struct Setup {
    completer: Arc<dyn Completer>,
    knowledge: StubKnowledge,
    vision: Option<Arc<dyn VisionService>>,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            completer: Arc::new(ScriptedCompleter::new()),
            knowledge: StubKnowledge::empty(),
            vision: None,
        }
    }
}

async fn orchestrator(setup: Setup, store: Arc<FileStore>) -> Orchestrator {
    let mut builder = Orchestrator::builder(PipConfig::default())
        .completer(setup.completer)
        .embedder(Arc::new(KeywordEmbedder::new()))
        .knowledge(Arc::new(setup.knowledge))
        .catalog(Arc::new(sample_catalog().await))
        .cellar_store(store.clone())
        .profile_store(store);
    if let Some(vision) = setup.vision {
        builder = builder.vision(vision);
    }
    builder.build().expect("orchestrator")
}

fn file_store(temp: &TempDir) -> Arc<FileStore> {
    Arc::new(FileStore::new(temp.path()).expect("file store"))
}

/// Rating an earthy wine five stars shows up in "what do I like?".
#[tokio::test]
async fn five_star_rating_teaches_the_profile() {
    let temp = TempDir::new().expect("tmp");
    let store = file_store(&temp);
    let pip = orchestrator(Setup::default(), store.clone()).await;

    let rated = pip
        .process(ProcessRequest::new("I rated the Rioja 5 stars").with_user(USER))
        .await;
    assert_eq!(rated.intent, Some(IntentKind::Rate));
    assert!(
        rated
            .response_text
            .starts_with("Got it! Rated 2016 Bodega Lomas Rioja Reserva 5/5."),
        "{}",
        rated.response_text
    );
    assert!(matches!(
        rated.recorded_action,
        Some(RecordedAction::Rate { created: true, .. })
    ));
    let bottles = CellarStore::list(store.as_ref(), USER).await.expect("list");
    assert_eq!(bottles.len(), 1);
    assert_eq!(bottles[0].status, BottleStatus::Tried);
    assert_eq!(bottles[0].rating, Some(5.0));

    let history = vec![
        Message::user("I rated the Rioja 5 stars"),
        rated.to_message(),
    ];
    let profile = pip
        .process(
            ProcessRequest::new("What do I like?")
                .with_user(USER)
                .with_history(history),
        )
        .await;
    assert_eq!(profile.intent, Some(IntentKind::ProfileQuery));
    assert!(profile.response_text.contains("earthy"), "{}", profile.response_text);
    let Some(Card::Profile(card)) = profile.cards.first() else {
        panic!("expected a profile card");
    };
    assert_eq!(card.total_ratings, 1);
    assert!(card.preferred_attributes.contains(&"earthy".to_string()));
}

/// The profile survives a restart when backed by files.
#[tokio::test]
async fn profile_persists_across_orchestrators() {
    let temp = TempDir::new().expect("tmp");
    {
        let pip = orchestrator(Setup::default(), file_store(&temp)).await;
        pip.process(ProcessRequest::new("I rated the Rioja 5 stars").with_user(USER))
            .await;
    }

    let store = file_store(&temp);
    let profile = ProfileStore::load(store.as_ref(), USER)
        .await
        .expect("load")
        .expect("profile");
    assert_eq!(profile.total_ratings, 1);

    let pip = orchestrator(Setup::default(), store).await;
    let response = pip
        .process(ProcessRequest::new("What do I like?").with_user(USER))
        .await;
    assert!(response.response_text.contains("earthy"));
}

/// Resetting the profile needs a yes, and clears the stored profile.
#[tokio::test]
async fn profile_reset_is_confirmed() {
    let temp = TempDir::new().expect("tmp");
    let store = file_store(&temp);
    let pip = orchestrator(Setup::default(), store.clone()).await;
    pip.process(ProcessRequest::new("I rated the Rioja 5 stars").with_user(USER))
        .await;

    let asked = pip
        .process(ProcessRequest::new("Reset my taste profile").with_user(USER))
        .await;
    let pending = asked.confirmation.clone().expect("confirmation");
    assert_eq!(pending.action, ConfirmationAction::ResetProfile);
    assert!(
        ProfileStore::load(store.as_ref(), USER)
            .await
            .expect("load")
            .is_some()
    );

    let done = pip
        .process(
            ProcessRequest::new("yes")
                .with_user(USER)
                .with_confirmation(Some(pending)),
        )
        .await;
    assert!(done.response_text.starts_with("Done. I've reset your taste profile"));
    assert!(matches!(
        done.recorded_action,
        Some(RecordedAction::ProfileReset { .. })
    ));
    assert_eq!(
        ProfileStore::load(store.as_ref(), USER).await.expect("load"),
        None
    );
}

/// A confident label read names the wine and links it to the catalog.
#[tokio::test]
async fn label_photo_identifies_the_wine() {
    let temp = TempDir::new().expect("tmp");
    let setup = Setup {
        vision: Some(Arc::new(StubVision::label("Catena Malbec", Some(2019), 0.9))),
        ..Setup::default()
    };
    let pip = orchestrator(setup, file_store(&temp)).await;

    let response = pip
        .process(
            ProcessRequest::new("what is this?")
                .with_user(USER)
                .with_attachment(Attachment::image("label.jpg")),
        )
        .await;
    assert_eq!(response.intent, Some(IntentKind::AnalyzePhoto));
    assert_eq!(
        response.response_text,
        "I found **Catena Malbec** (2019)! What would you like to do with it?"
    );
    let Some(Card::Wine(card)) = response.cards.first() else {
        panic!("expected a wine card");
    };
    assert_eq!(card.wine_id.as_deref(), Some("mendoza-malbec"));
    assert_eq!(response.actions.len(), 3);
}

/// A blurry photo gets retake guidance instead of a guess.
#[tokio::test]
async fn blurry_photo_gets_guidance() {
    let temp = TempDir::new().expect("tmp");
    let setup = Setup {
        vision: Some(Arc::new(StubVision::unreadable("image is blurry", 0.1))),
        ..Setup::default()
    };
    let pip = orchestrator(setup, file_store(&temp)).await;

    let response = pip
        .process(ProcessRequest::new("").with_attachment(Attachment::image("label.jpg")))
        .await;
    assert!(response.response_text.contains("blurry"));
    assert!(response.response_text.ends_with("Feel free to send another photo."));
    assert!(response.cards.is_empty());
}

/// General questions are answered by the completer over retrieved notes.
#[tokio::test]
async fn general_question_uses_the_completer() {
    let temp = TempDir::new().expect("tmp");
    let completer = ScriptedCompleter::new().on(
        "knowledgeable wine guide",
        "Syrah and Shiraz are the same grape; the name usually hints at the style.",
    );
    let setup = Setup {
        completer: Arc::new(completer.clone()),
        knowledge: StubKnowledge::passage("Syrah", "Syrah is called Shiraz in Australia."),
        vision: None,
    };
    let pip = orchestrator(setup, file_store(&temp)).await;

    let response = pip
        .process(ProcessRequest::new(
            "What's the difference between Syrah and Shiraz?",
        ))
        .await;
    assert_eq!(response.intent, Some(IntentKind::EducateGeneral));
    assert_eq!(
        response.response_text,
        "Syrah and Shiraz are the same grape; the name usually hints at the style."
    );
    let asked = completer
        .requests()
        .into_iter()
        .find(|request| request.system.contains("knowledgeable wine guide"))
        .expect("education request");
    assert!(asked.prompt.contains("Syrah is called Shiraz in Australia."));
}

/// Without the completer, the top retrieved passage is the answer.
#[tokio::test]
async fn general_question_falls_back_to_the_passage() {
    let temp = TempDir::new().expect("tmp");
    let setup = Setup {
        completer: Arc::new(FailingCompleter::new("offline")),
        knowledge: StubKnowledge::passage("Syrah", "Syrah is called Shiraz in Australia."),
        vision: None,
    };
    let pip = orchestrator(setup, file_store(&temp)).await;

    let response = pip
        .process(ProcessRequest::new(
            "What's the difference between Syrah and Shiraz?",
        ))
        .await;
    assert_eq!(response.response_text, "Syrah is called Shiraz in Australia.");
}
