//! Intent classification: corrections, pending clarifications, lexical
//! rules, then a model fallback. Every path ends in exactly one `Intent`.

mod correction;
mod references;
mod rules;

pub(crate) use references::{Resolution, clarifying_question, name_matches, resolve};
pub(crate) use rules::is_greeting;

use crate::entities;
use crate::history::ConversationWindow;
use crate::json::parse_embedded;
use crate::lexicon::Normalized;
use crate::prompts::CLASSIFIER_SYSTEM;
use log::{debug, warn};
use pip_rs_config::ClassifierConfig;
use pip_rs_protocol::{
    AmbiguityReason, Attachment, Card, Completer, CompletionRequest, CorrectionMode, Entities,
    Intent, IntentKind, PendingClarification,
};
use serde::Deserialize;
use std::sync::Arc;

/// Confidence assigned when the completer could not be reached.
const SERVICE_FAILURE_CONFIDENCE: f32 = 0.3;

/// Question asked when a pairing request could mean a purchase or a cellar pick.
pub const NEW_OR_CELLAR_QUESTION: &str =
    "Would you like me to recommend something new to try, or help you pick from wines you already have?";

const NEW_CUES: &[&str] = &[
    "new",
    "something new",
    "buy",
    "shop",
    "recommend",
    "suggest",
    "store",
    "purchase",
];

const CELLAR_CUES: &[&str] = &[
    "cellar",
    "my wines",
    "my collection",
    "i have",
    "i own",
    "already have",
    "from mine",
    "my bottles",
    "what i have",
];

#[derive(Debug, Deserialize)]
struct ModelClassification {
    intent: String,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default)]
    entities: Option<serde_json::Value>,
    #[serde(default)]
    requires_clarification: bool,
    #[serde(default)]
    clarification_reason: Option<String>,
}

/// Classifies one message against the recent conversation.
#[derive(Clone)]
pub struct IntentClassifier {
    completer: Arc<dyn Completer>,
    config: ClassifierConfig,
}

impl IntentClassifier {
    pub fn new(completer: Arc<dyn Completer>, config: ClassifierConfig) -> Self {
        Self { completer, config }
    }

    /// Classify `message`; never fails.
    pub async fn classify(
        &self,
        message: &str,
        attachments: &[Attachment],
        history: &ConversationWindow<'_>,
    ) -> Intent {
        let trimmed = message.trim();
        if attachments.iter().any(Attachment::is_image) {
            return Intent::new(IntentKind::AnalyzePhoto, 1.0)
                .with_entities(entities::extract(trimmed));
        }
        if trimmed.is_empty() {
            return Intent::new(IntentKind::Unclear, 1.0);
        }

        let text = Normalized::new(trimmed);
        if let Some(mode) = correction::detect(&text) {
            if let Some(intent) = self.correction(trimmed, mode, history) {
                debug!("classified correction (mode={:?})", mode);
                return intent;
            }
            let remainder = correction::strip_cue(trimmed);
            debug!("amend without target, classifying remainder (text={})", remainder);
            return self.classify_fresh(&remainder, history).await;
        }

        if let Some(pending) = history.pending_clarification()
            && let Some(intent) = resume(pending, &text, trimmed, history.last_cards())
        {
            debug!(
                "resumed clarification (reason={}, intent={})",
                pending.reason.as_str(),
                intent.kind
            );
            return intent;
        }

        self.classify_fresh(trimmed, history).await
    }

    fn correction(
        &self,
        message: &str,
        mode: CorrectionMode,
        history: &ConversationWindow<'_>,
    ) -> Option<Intent> {
        let target = history.last_recorded_action().cloned();
        let mut intent = Intent::new(IntentKind::Correction, 0.95);
        intent.correction_mode = Some(mode);
        if mode == CorrectionMode::Amend {
            let remainder = correction::strip_cue(message);
            let amended = entities::extract(&remainder);
            let applies = target
                .as_ref()
                .is_some_and(|target| correction::amends(target, &amended));
            if !applies && !remainder.is_empty() {
                return None;
            }
            intent.entities = amended;
        }
        intent.correction_target = target;
        Some(intent)
    }

    async fn classify_fresh(&self, message: &str, history: &ConversationWindow<'_>) -> Intent {
        if message.trim().is_empty() {
            return Intent::new(IntentKind::Unclear, 1.0);
        }
        let text = Normalized::new(message);
        let extracted = entities::extract(message);
        let cards = history.last_cards();

        let mut intent = match rules::classify(&text, &extracted, cards) {
            Some(rule) => {
                debug!(
                    "classified by rule (intent={}, confidence={:.2})",
                    rule.kind, rule.confidence
                );
                let mut intent =
                    Intent::new(rule.kind, rule.confidence).with_entities(extracted.clone());
                if rule.new_or_cellar {
                    intent.mark_ambiguous(AmbiguityReason::NewOrCellar, NEW_OR_CELLAR_QUESTION);
                }
                intent
            }
            None if self.config.model_fallback => {
                self.classify_with_model(message, extracted, history).await
            }
            None => Intent::new(IntentKind::Unclear, SERVICE_FAILURE_CONFIDENCE)
                .with_entities(extracted),
        };

        if !intent.is_ambiguous && intent.confidence < self.config.confidence_threshold {
            let question = low_confidence_question(intent.kind);
            intent.mark_ambiguous(AmbiguityReason::LowConfidence, question);
        }
        if !intent.is_ambiguous && intent.kind.needs_target() {
            bind_target(&mut intent, &text, cards);
        }
        intent
    }

    async fn classify_with_model(
        &self,
        message: &str,
        extracted: Entities,
        history: &ConversationWindow<'_>,
    ) -> Intent {
        let transcript = history.render(self.config.context_messages);
        let prompt = if transcript.is_empty() {
            format!("Message: {message}")
        } else {
            format!("Conversation so far:\n{transcript}\n\nMessage: {message}")
        };
        let reply = match self
            .completer
            .complete(CompletionRequest::new(CLASSIFIER_SYSTEM, prompt))
            .await
        {
            Ok(reply) => reply,
            Err(err) => {
                warn!("intent fallback failed (error={})", err);
                return Intent::new(IntentKind::Unclear, SERVICE_FAILURE_CONFIDENCE)
                    .with_entities(extracted);
            }
        };

        let Some(parsed) = parse_embedded::<ModelClassification>(&reply) else {
            warn!("unparseable intent reply (chars={})", reply.len());
            return Intent::new(IntentKind::Unclear, 0.0).with_entities(extracted);
        };
        let Some(kind) = IntentKind::from_label(&parsed.intent) else {
            warn!("unknown intent label (label={})", parsed.intent);
            return Intent::new(IntentKind::Unclear, 0.0).with_entities(extracted);
        };

        let mut entities = extracted;
        if let Some(value) = parsed.entities
            && let Ok(model_entities) = serde_json::from_value::<Entities>(value)
        {
            entities.fill_missing(&model_entities);
        }
        let confidence = parsed.confidence.unwrap_or(0.5);
        debug!(
            "classified by model (intent={}, confidence={:.2})",
            kind, confidence
        );
        let mut intent = Intent::new(kind, confidence).with_entities(entities);
        if parsed.requires_clarification {
            let question = parsed
                .clarification_reason
                .filter(|reason| reason.trim().ends_with('?'))
                .unwrap_or_else(|| low_confidence_question(kind).to_string());
            intent.mark_ambiguous(AmbiguityReason::LowConfidence, question);
        }
        intent
    }
}

/// Continue the request a clarifying question interrupted.
fn resume(
    pending: &PendingClarification,
    text: &Normalized,
    message: &str,
    cards: &[Card],
) -> Option<Intent> {
    match pending.reason {
        AmbiguityReason::NewOrCellar => {
            let kind = if text.has_any(CELLAR_CUES) {
                IntentKind::Decide
            } else if text.has_any(NEW_CUES) {
                IntentKind::Recommend
            } else {
                return None;
            };
            let mut merged = entities::extract(&pending.original_message);
            merged.overlay(&entities::extract(message));
            Some(Intent::new(kind, 0.9).with_entities(merged))
        }
        AmbiguityReason::UnclearTarget => {
            let kind = pending.original_kind?;
            let Resolution::Resolved(reference) = resolve(text, cards, false) else {
                return None;
            };
            let mut merged = entities::extract(&pending.original_message);
            merged.wine_reference = None;
            merged.overlay(&entities::extract(message));
            let mut intent = Intent::new(kind, 0.9).with_entities(merged);
            intent.resolved_references.push(reference);
            Some(intent)
        }
        AmbiguityReason::LowConfidence => None,
    }
}

/// Attach the referenced card, or mark the intent as needing a target.
fn bind_target(intent: &mut Intent, text: &Normalized, cards: &[Card]) {
    let named = intent.entities.wine_reference.is_some();
    match resolve(text, cards, named) {
        Resolution::Resolved(reference) => intent.resolved_references.push(reference),
        Resolution::Ambiguous(candidates) => {
            let question = clarifying_question(&candidates);
            intent.candidates = candidates;
            intent.mark_ambiguous(AmbiguityReason::UnclearTarget, question);
        }
        Resolution::Unresolved if named => {}
        Resolution::Unresolved => {
            intent.mark_ambiguous(AmbiguityReason::UnclearTarget, clarifying_question(&[]));
        }
    }
}

fn low_confidence_question(kind: IntentKind) -> &'static str {
    match kind {
        IntentKind::Recommend => {
            "Are you looking for a wine recommendation? Tell me a style, a budget, or what you're eating."
        }
        IntentKind::EducateGeneral | IntentKind::EducateSpecific => {
            "Is that a wine question? Give me a little more detail and I'll explain."
        }
        IntentKind::CellarAdd | IntentKind::CellarQuery | IntentKind::CellarRemove => {
            "Is this about your cellar? Tell me which wine and whether to add, find or remove it."
        }
        IntentKind::Rate => "Would you like to rate a wine? Tell me which one and how many stars.",
        IntentKind::Decide => "Want help picking a bottle you already own? What are you eating?",
        IntentKind::ProfileQuery => "Do you want to see what I've learned about your taste?",
        IntentKind::AnalyzePhoto
        | IntentKind::Correction
        | IntentKind::OffTopic
        | IntentKind::Unclear => {
            "I'm not sure what you'd like. I can suggest wines, answer wine questions, and keep track of your cellar."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pip_rs_protocol::{Message, RecordedAction, WineType};
    use pip_rs_test_utils::{
        FailingCompleter, ScriptedCompleter, assistant_with_wines, sample_wine,
    };
    use pretty_assertions::assert_eq;

    fn classifier(completer: impl Completer + 'static) -> IntentClassifier {
        IntentClassifier::new(Arc::new(completer), ClassifierConfig::default())
    }

    async fn classify(message: &str, history: &[Message]) -> Intent {
        classifier(ScriptedCompleter::new())
            .classify(message, &[], &ConversationWindow::new(history, 10))
            .await
    }

    fn recommendation(request: &str, entities: Entities) -> Message {
        Message::assistant("Here are some picks").with_recorded_action(RecordedAction::Recommend {
            request: request.to_string(),
            entities,
        })
    }

    #[tokio::test]
    async fn empty_message_is_unclear() {
        let intent = classify("   ", &[]).await;
        assert_eq!(intent.kind, IntentKind::Unclear);
        assert!(!intent.is_ambiguous);
    }

    #[tokio::test]
    async fn image_attachment_wins() {
        let intent = classifier(ScriptedCompleter::new())
            .classify(
                "what is this?",
                &[Attachment::image("label.jpg")],
                &ConversationWindow::new(&[], 10),
            )
            .await;
        assert_eq!(intent.kind, IntentKind::AnalyzePhoto);
    }

    #[tokio::test]
    async fn ordinal_resolves_against_last_cards() {
        let history = vec![
            Message::user("Red wine under $40 for steak"),
            assistant_with_wines(
                "I found 2 wines",
                &[sample_wine("napa-cab"), sample_wine("mendoza-malbec")],
            ),
        ];
        let intent = classify("tell me about the second one", &history).await;
        assert_eq!(intent.kind, IntentKind::EducateSpecific);
        assert!(!intent.is_ambiguous);
        assert_eq!(
            intent.primary_reference().and_then(|r| r.wine_id.as_deref()),
            Some("mendoza-malbec")
        );
    }

    #[tokio::test]
    async fn bare_pronoun_over_many_cards_asks_which() {
        let history = vec![assistant_with_wines(
            "Here are three",
            &[
                sample_wine("napa-cab"),
                sample_wine("mendoza-malbec"),
                sample_wine("rioja-reserva"),
            ],
        )];
        let intent = classify("add it to my cellar", &history).await;
        assert_eq!(intent.kind, IntentKind::CellarAdd);
        assert!(intent.is_ambiguous);
        assert_eq!(intent.ambiguity_reason, Some(AmbiguityReason::UnclearTarget));
        assert_eq!(intent.candidates.len(), 3);
        assert!(
            intent
                .clarifying_question
                .as_deref()
                .is_some_and(|q| q.starts_with("Which wine do you mean"))
        );
    }

    #[tokio::test]
    async fn named_wine_off_screen_is_left_for_the_handler() {
        let intent = classify("remove the 2019 Malbec", &[]).await;
        assert_eq!(intent.kind, IntentKind::CellarRemove);
        assert!(!intent.is_ambiguous);
        assert_eq!(intent.entities.wine_reference.as_deref(), Some("2019 Malbec"));
    }

    #[tokio::test]
    async fn undo_targets_last_recorded_action() {
        let history = vec![recommendation("red under $40", Entities::default())];
        let intent = classify("undo", &history).await;
        assert_eq!(intent.kind, IntentKind::Correction);
        assert_eq!(intent.correction_mode, Some(CorrectionMode::Undo));
        assert!(matches!(
            intent.correction_target,
            Some(RecordedAction::Recommend { .. })
        ));
    }

    #[tokio::test]
    async fn amend_carries_corrected_fields() {
        let history = vec![recommendation(
            "red under $40",
            Entities {
                price_max: Some(40.0),
                wine_type: Some(WineType::Red),
                ..Entities::default()
            },
        )];
        let intent = classify("Actually, under $30", &history).await;
        assert_eq!(intent.kind, IntentKind::Correction);
        assert_eq!(intent.correction_mode, Some(CorrectionMode::Amend));
        assert_eq!(intent.entities.price_max, Some(30.0));
    }

    #[tokio::test]
    async fn amend_without_matching_fields_is_classified_fresh() {
        let history = vec![recommendation("red under $40", Entities::default())];
        let intent = classify("actually, what do I like?", &history).await;
        assert_eq!(intent.kind, IntentKind::ProfileQuery);
    }

    #[tokio::test]
    async fn new_or_cellar_question_resumes() {
        let first = classify("What should I drink with pasta tonight?", &[]).await;
        assert_eq!(first.kind, IntentKind::Recommend);
        assert_eq!(first.ambiguity_reason, Some(AmbiguityReason::NewOrCellar));
        assert_eq!(first.clarifying_question.as_deref(), Some(NEW_OR_CELLAR_QUESTION));

        let asked = Message::assistant(NEW_OR_CELLAR_QUESTION).with_clarification(
            PendingClarification {
                reason: AmbiguityReason::NewOrCellar,
                original_message: "What should I drink with pasta tonight?".to_string(),
                original_kind: Some(IntentKind::Recommend),
            },
        );
        let history = vec![Message::user("What should I drink with pasta tonight?"), asked];
        let cellar = classify("from my cellar", &history).await;
        assert_eq!(cellar.kind, IntentKind::Decide);
        assert_eq!(cellar.entities.food_pairing.as_deref(), Some("pasta"));

        let fresh = classify("something new", &history).await;
        assert_eq!(fresh.kind, IntentKind::Recommend);
        assert!(!fresh.is_ambiguous);
    }

    #[tokio::test]
    async fn model_fallback_parses_json_reply() {
        let completer = ScriptedCompleter::fixed(
            r#"Sure: {"intent": "educate_general", "confidence": 0.82, "entities": {"region": "Jura"}}"#,
        );
        let intent = classifier(completer.clone())
            .classify(
                "Are screw caps bad?",
                &[],
                &ConversationWindow::new(&[], 10),
            )
            .await;
        assert_eq!(intent.kind, IntentKind::EducateGeneral);
        assert!(!intent.is_ambiguous);
        assert_eq!(intent.entities.region.as_deref(), Some("Jura"));
        assert_eq!(completer.call_count(), 1);
    }

    #[tokio::test]
    async fn model_failure_maps_to_low_confidence_unclear() {
        let intent = classifier(FailingCompleter::new("offline"))
            .classify(
                "Are screw caps bad?",
                &[],
                &ConversationWindow::new(&[], 10),
            )
            .await;
        assert_eq!(intent.kind, IntentKind::Unclear);
        assert!((intent.confidence - SERVICE_FAILURE_CONFIDENCE).abs() < f32::EPSILON);
        assert_eq!(intent.ambiguity_reason, Some(AmbiguityReason::LowConfidence));
    }

    #[tokio::test]
    async fn identical_input_gives_identical_kind() {
        let history = vec![assistant_with_wines("One pick", &[sample_wine("barolo")])];
        let first = classify("rate it 4 stars", &history).await;
        let second = classify("rate it 4 stars", &history).await;
        assert_eq!(first.kind, IntentKind::Rate);
        assert_eq!(first.kind, second.kind);
        assert_eq!(first.resolved_references, second.resolved_references);
    }
}
