//! Matching a reply against a pending destructive-action confirmation.

use crate::lexicon::Normalized;
use pip_rs_protocol::{ConfirmationAction, ConfirmationRequest};

const AFFIRMATIVE: &[&str] = &[
    "yes", "yeah", "yep", "yup", "sure", "confirm", "confirmed", "do it", "go ahead", "ok",
    "okay", "please do", "absolutely", "correct",
];

const NEGATIVE: &[&str] = &[
    "no", "nope", "nah", "cancel", "never mind", "nevermind", "dont", "do not", "stop", "keep it",
    "wait", "forget it", "not now",
];

/// Replies longer than this are treated as a new request, not an answer.
const MAX_REPLY_TOKENS: usize = 8;

/// How the next message relates to a pending confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConfirmationReply {
    Affirm,
    Decline,
    /// Anything else: the confirmation lapses and the message is processed fresh.
    Unrelated,
}

/// Classify `message` as an answer to `pending`.
pub(crate) fn classify_reply(message: &str, pending: &ConfirmationRequest) -> ConfirmationReply {
    let text = Normalized::new(message);
    if text.token_count() == 0 || text.token_count() > MAX_REPLY_TOKENS {
        return ConfirmationReply::Unrelated;
    }
    if text.has_any(NEGATIVE) {
        return ConfirmationReply::Decline;
    }
    let (own, other): (&[&str], &[&str]) = match pending.action {
        ConfirmationAction::RemoveBottle => (
            &["remove", "delete", "drop", "toss"],
            &["reset", "clear", "wipe"],
        ),
        ConfirmationAction::ResetProfile => (
            &["reset", "clear", "wipe", "start over"],
            &["remove", "delete", "drop", "toss"],
        ),
    };
    if text.has_any(other) {
        return ConfirmationReply::Unrelated;
    }
    if text.has_any(AFFIRMATIVE) || (text.has_any(own) && text.has_any(&["it", "that", "them"])) {
        ConfirmationReply::Affirm
    } else {
        ConfirmationReply::Unrelated
    }
}
