//! Correction cues: undo, amend, dismiss.

use crate::lexicon::Normalized;
use pip_rs_protocol::{CorrectionMode, Entities, RecordedAction};

const UNDO_CUES: &[&str] = &["undo", "undo that", "take that back", "revert", "scratch that"];

const DISMISS_CUES: &[&str] = &[
    "never mind",
    "nevermind",
    "forget it",
    "forget about it",
    "forget that",
    "cancel that",
];

const AMEND_PREFIXES: &[&str] = &[
    "actually",
    "i meant",
    "no i meant",
    "sorry i meant",
    "wait",
    "make that",
    "make it",
    "change that to",
    "change it to",
    "correction",
];

/// Filler that may precede a correction cue.
const OPENERS: &[&str] = &["no", "sorry", "oh"];

/// Correction mode signalled by the message, if any.
pub(crate) fn detect(text: &Normalized) -> Option<CorrectionMode> {
    if text.has_any(UNDO_CUES) {
        Some(CorrectionMode::Undo)
    } else if text.starts_with_any(DISMISS_CUES) || DISMISS_CUES.contains(&text.as_str()) {
        Some(CorrectionMode::Dismiss)
    } else if text.starts_with_any(AMEND_PREFIXES) || text.has("i meant") {
        Some(CorrectionMode::Amend)
    } else {
        None
    }
}

/// The message with its leading correction cue removed.
pub(crate) fn strip_cue(message: &str) -> String {
    let mut rest = message.trim();
    loop {
        let lowered = rest.to_lowercase();
        let Some(prefix) = AMEND_PREFIXES
            .iter()
            .chain(OPENERS.iter())
            .filter(|prefix| {
                lowered.starts_with(*prefix)
                    && lowered[prefix.len()..]
                        .chars()
                        .next()
                        .is_none_or(|ch| !ch.is_alphanumeric())
            })
            .max_by_key(|prefix| prefix.len())
        else {
            break;
        };
        let Some(tail) = rest.get(prefix.len()..) else {
            break;
        };
        rest = tail.trim_start_matches(|ch: char| {
            ch.is_whitespace() || matches!(ch, ',' | ':' | '!' | '.' | '-')
        });
    }
    rest.trim().to_string()
}

/// True when the message carries a change that applies to `target`.
pub(crate) fn amends(target: &RecordedAction, entities: &Entities) -> bool {
    match target {
        RecordedAction::Recommend { .. } => {
            entities.has_search_filters()
                || entities.exclude_type.is_some()
                || entities.food_pairing.is_some()
                || entities.occasion.is_some()
                || !entities.characteristics.is_empty()
        }
        RecordedAction::Rate { .. } => {
            entities.rating.is_some() || entities.tasting_notes.is_some()
        }
        RecordedAction::CellarAdd { .. } => {
            entities.quantity.is_some() || entities.status.is_some()
        }
        RecordedAction::CellarRemove { .. } | RecordedAction::ProfileReset { .. } => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn detects_modes() {
        assert_eq!(detect(&Normalized::new("undo")), Some(CorrectionMode::Undo));
        assert_eq!(
            detect(&Normalized::new("Never mind.")),
            Some(CorrectionMode::Dismiss)
        );
        assert_eq!(
            detect(&Normalized::new("Actually, under $30")),
            Some(CorrectionMode::Amend)
        );
        assert_eq!(detect(&Normalized::new("what's actually good here?")), None);
    }

    #[test]
    fn strips_leading_cues() {
        assert_eq!(strip_cue("Actually, under $30"), "under $30");
        assert_eq!(strip_cue("no, I meant a white"), "a white");
        assert_eq!(strip_cue("actually"), "");
    }
}
