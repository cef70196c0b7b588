//! Fixed reply texts and small response builders shared by handlers.

use pip_rs_protocol::{
    Action, ActionKind, AmbiguityReason, Card, CellarBottle, CellarCard, Intent, IntentKind,
    ProcessResponse, RecordedAction,
};

pub(crate) const GENERIC_ERROR: &str =
    "Sorry, something went wrong on my end. Mind trying that again?";
pub(crate) const CATALOG_UNAVAILABLE: &str =
    "I couldn't reach the wine catalog just now, so I can't search for bottles. Please try again in a moment.";
pub(crate) const SIGN_IN: &str =
    "Please sign in so I can keep track of your cellar and your taste profile.";
pub(crate) const EMPTY_CELLAR: &str = "Your cellar is empty! Let's find some wines to add.";
pub(crate) const NO_MATCH: &str = "I couldn't find wines matching those exact criteria. Try broadening your search - maybe a wider price range or different style?";
pub(crate) const CANCELLED: &str = "Okay, I won't change anything.";
pub(crate) const GREETING: &str = "Hi! I'm Pip, your wine guide. I can recommend bottles, explain wine terms, keep track of your cellar, learn your taste from your ratings, help you pick a bottle for tonight, and read wine labels from photos. What are you in the mood for?";
pub(crate) const OFF_TOPIC: &str = "I'm best with wine! Ask me for a recommendation, a pairing, or anything about grapes and regions.";
pub(crate) const HELP: &str = "I'm not sure what you'd like. I can suggest wines (\"a red under $30 for pizza\"), answer wine questions, add or rate bottles in your cellar, and help you pick what to open tonight.";

/// Plain reply tagged with the intent that produced it.
pub(crate) fn text(kind: IntentKind, text: impl Into<String>) -> ProcessResponse {
    let mut response = ProcessResponse::text(text);
    response.intent = Some(kind);
    response
}

/// Reply for a mutation: the bottle's card, an undo action and the record.
pub(crate) fn mutation(
    kind: IntentKind,
    message: impl Into<String>,
    bottle: &CellarBottle,
    recorded: RecordedAction,
) -> ProcessResponse {
    let mut response = text(kind, message);
    response.cards = vec![Card::Cellar(CellarCard::from(bottle))];
    response.actions = vec![
        Action::new(ActionKind::Undo, "Undo"),
        Action::new(ActionKind::ViewCellar, "View cellar"),
    ];
    response.recorded_action = Some(recorded);
    response
}

/// Shown when a request needs a cellar but none has bottles yet.
pub(crate) fn empty_cellar(kind: IntentKind) -> ProcessResponse {
    let mut response = text(kind, EMPTY_CELLAR);
    response.actions = vec![Action::new(ActionKind::FindWines, "Find wines")];
    response
}

/// Stars without a trailing ".0".
pub(crate) fn stars(rating: f32) -> String {
    if rating.fract() == 0.0 {
        format!("{rating:.0}/5")
    } else {
        format!("{rating:.1}/5")
    }
}

/// Buttons offered for an ambiguous intent.
pub(crate) fn disambiguation_actions(intent: &Intent) -> Vec<Action> {
    match intent.ambiguity_reason {
        Some(AmbiguityReason::NewOrCellar) => vec![
            Action::new(ActionKind::RecommendNew, "Something new").with_value("something new"),
            Action::new(ActionKind::PickFromCellar, "From my cellar").with_value("from my cellar"),
        ],
        Some(AmbiguityReason::UnclearTarget) => intent
            .candidates
            .iter()
            .map(|candidate| {
                Action::new(ActionKind::SelectWine, candidate.name.clone())
                    .with_value(candidate.name.clone())
            })
            .collect(),
        _ => Vec::new(),
    }
}
