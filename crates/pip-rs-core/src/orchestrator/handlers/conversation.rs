use crate::classifier::is_greeting;
use crate::lexicon::Normalized;
use crate::orchestrator::{Orchestrator, TurnContext, reply};
use pip_rs_protocol::{IntentKind, ProcessResponse};

const THANKS: &[&str] = &["thanks", "thank you", "thx", "cheers"];
const FAREWELLS: &[&str] = &["bye", "goodbye"];

impl Orchestrator {
    /// Greetings get the capability summary; anything else a polite redirect.
    pub(crate) fn off_topic(&self, ctx: &TurnContext<'_>) -> ProcessResponse {
        let text = Normalized::new(ctx.message);
        if !is_greeting(&text) {
            return reply::text(IntentKind::OffTopic, reply::OFF_TOPIC);
        }
        let answer = if text.starts_with_any(THANKS) {
            "You're welcome! Let me know whenever you want another bottle idea."
        } else if text.starts_with_any(FAREWELLS) {
            "Cheers! Come back any time you need a wine."
        } else {
            reply::GREETING
        };
        reply::text(IntentKind::OffTopic, answer)
    }
}
