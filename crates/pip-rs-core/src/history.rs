//! Bounded view over the caller-supplied conversation history.

use pip_rs_protocol::{Card, IntentKind, Message, PendingClarification, RecordedAction, Role};

/// The last `window` messages of a conversation, oldest first.
#[derive(Debug, Clone, Copy)]
pub struct ConversationWindow<'a> {
    messages: &'a [Message],
}

impl<'a> ConversationWindow<'a> {
    pub fn new(history: &'a [Message], window: usize) -> Self {
        let start = history.len().saturating_sub(window);
        Self {
            messages: &history[start..],
        }
    }

    pub fn messages(&self) -> &'a [Message] {
        self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Most recent assistant message.
    pub fn last_assistant(&self) -> Option<&'a Message> {
        self.messages.iter().rev().find(|message| message.is_assistant())
    }

    /// Cards on the most recent assistant message.
    pub fn last_cards(&self) -> &'a [Card] {
        self.last_assistant()
            .map(|message| message.cards.as_slice())
            .unwrap_or_default()
    }

    /// Clarification asked by the most recent assistant message.
    pub fn pending_clarification(&self) -> Option<&'a PendingClarification> {
        self.last_assistant()?.clarification.as_ref()
    }

    /// Newest recorded action that has not already been undone.
    pub fn last_recorded_action(&self) -> Option<&'a RecordedAction> {
        for message in self.messages.iter().rev().filter(|m| m.is_assistant()) {
            if let Some(action) = &message.recorded_action {
                return Some(action);
            }
            if message.intent == Some(IntentKind::Correction) {
                return None;
            }
        }
        None
    }

    /// Request text and entities of the newest recommendation, for refinements.
    pub fn last_recommendation(&self) -> Option<&'a RecordedAction> {
        self.messages
            .iter()
            .rev()
            .filter_map(|message| message.recorded_action.as_ref())
            .find(|action| matches!(action, RecordedAction::Recommend { .. }))
    }

    /// Plain-text transcript of the last `count` messages for prompts.
    pub fn render(&self, count: usize) -> String {
        let start = self.messages.len().saturating_sub(count);
        self.messages[start..]
            .iter()
            .map(|message| {
                let speaker = match message.role {
                    Role::User => "User",
                    Role::Assistant => "Assistant",
                };
                let cards = message
                    .cards
                    .iter()
                    .filter_map(Card::name)
                    .collect::<Vec<_>>();
                if cards.is_empty() {
                    format!("{speaker}: {}", message.text)
                } else {
                    format!("{speaker}: {} [shown: {}]", message.text, cards.join("; "))
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
