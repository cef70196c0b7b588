//! Conversation history builders.

use pip_rs_protocol::{Card, CellarBottle, CellarCard, Message, Wine, WineCard};

/// Wine cards for the given wines, in order.
pub fn wine_cards(wines: &[Wine]) -> Vec<Card> {
    wines
        .iter()
        .map(|wine| Card::Wine(WineCard::from_wine(wine)))
        .collect()
}

/// An assistant message that showed the given wines.
pub fn assistant_with_wines(text: &str, wines: &[Wine]) -> Message {
    Message::assistant(text).with_cards(wine_cards(wines))
}

/// An assistant message that showed the given cellar bottles.
pub fn assistant_with_cellar(text: &str, bottles: &[CellarBottle]) -> Message {
    Message::assistant(text).with_cards(
        bottles
            .iter()
            .map(|bottle| Card::Cellar(CellarCard::from(bottle)))
            .collect(),
    )
}
