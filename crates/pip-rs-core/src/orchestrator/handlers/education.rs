//! Wine questions: general knowledge and one specific wine.

use super::Target;
use crate::error::PipCoreError;
use crate::orchestrator::{Orchestrator, TurnContext, reply};
use crate::phrasing::{dollars, natural_list};
use crate::prompts::{EDUCATION_SYSTEM, WINE_DETAIL_SYSTEM};
use log::{debug, warn};
use pip_rs_knowledge::ScoredChunk;
use pip_rs_protocol::{
    Action, ActionKind, Card, CellarCard, CompletionRequest, Intent, IntentKind, ProcessResponse,
    Wine, WineCard, WineType,
};

const UNKNOWN: &str = "I don't have a good answer for that one yet. Try asking about a grape, a region, or a wine style.";

impl Orchestrator {
    pub(crate) async fn educate_general(
        &self,
        ctx: &TurnContext<'_>,
    ) -> Result<ProcessResponse, PipCoreError> {
        let passages = self.passages(ctx.message).await;
        let reference = passages
            .iter()
            .map(|passage| passage.chunk.render())
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = if reference.is_empty() {
            format!("Question: {}", ctx.message)
        } else {
            format!("Reference material:\n{reference}\n\nQuestion: {}", ctx.message)
        };
        let answer = match self
            .completer
            .complete(CompletionRequest::new(EDUCATION_SYSTEM, prompt))
            .await
        {
            Ok(answer) if !answer.trim().is_empty() => answer.trim().to_string(),
            Ok(_) => {
                warn!("education answer was empty");
                fallback_answer(&passages)
            }
            Err(err) => {
                warn!("education answer failed (error={})", err);
                fallback_answer(&passages)
            }
        };
        Ok(reply::text(IntentKind::EducateGeneral, answer))
    }

    pub(crate) async fn educate_specific(
        &self,
        ctx: &TurnContext<'_>,
        intent: &Intent,
    ) -> Result<ProcessResponse, PipCoreError> {
        let target = match self.resolve_target(ctx, intent).await? {
            Some(Target::Named(name)) => match self.catalog_find(ctx.message).await {
                Some(wine) => Target::Wine(wine),
                None => Target::Named(name),
            },
            Some(target) => target,
            None => match self.catalog_find(ctx.message).await {
                Some(wine) => Target::Wine(wine),
                None => return self.educate_general(ctx).await,
            },
        };

        let (wine, card) = match &target {
            Target::Bottle(bottle) => {
                let wine = match bottle.wine_id.as_deref() {
                    Some(wine_id) => self.catalog_get(wine_id).await,
                    None => None,
                };
                (
                    wine.unwrap_or_else(|| bottle.as_wine()),
                    Card::Cellar(CellarCard::from(bottle)),
                )
            }
            Target::Ambiguous(bottles) => match bottles.first() {
                Some(bottle) => (bottle.as_wine(), Card::Cellar(CellarCard::from(bottle))),
                None => return self.educate_general(ctx).await,
            },
            Target::Wine(wine) => (wine.clone(), Card::Wine(WineCard::from_wine(wine))),
            Target::Card(card) => (card_wine(card), Card::Wine(card.clone())),
            Target::Named(name) => {
                let text = format!(
                    "I don't have {name} in my catalog, so I can't give you reliable details about it. I can tell you about its grape or region if you like."
                );
                return Ok(reply::text(IntentKind::EducateSpecific, text));
            }
        };
        debug!("describing wine (name={}, id={})", wine.name, wine.id);

        let prompt = format!("Wine:\n{}", wine_details(&wine));
        let text = match self
            .completer
            .complete(CompletionRequest::new(WINE_DETAIL_SYSTEM, prompt))
            .await
        {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => describe(&wine),
            Err(err) => {
                warn!("wine description failed (error={})", err);
                describe(&wine)
            }
        };
        let mut response = reply::text(IntentKind::EducateSpecific, text);
        response.cards = vec![card];
        if !matches!(target, Target::Bottle(_)) {
            response.actions = vec![Action::new(ActionKind::AddCellar, "Add to cellar")];
        }
        Ok(response)
    }

    /// Knowledge passages for `text`; retrieval failures leave them empty.
    async fn passages(&self, text: &str) -> Vec<ScoredChunk> {
        let top_k = self.config.recommender.knowledge_top_k;
        let embedding = match self.embedder.embed(text).await {
            Ok(embedding) => embedding,
            Err(err) => {
                warn!("question embedding failed (error={})", err);
                return Vec::new();
            }
        };
        match self.knowledge.search(&embedding, top_k).await {
            Ok(passages) => passages,
            Err(err) => {
                warn!("knowledge search failed (error={})", err);
                Vec::new()
            }
        }
    }
}

/// Top passage verbatim, or a stock answer when nothing was retrieved.
fn fallback_answer(passages: &[ScoredChunk]) -> String {
    match passages.first() {
        Some(top) => top.chunk.text.clone(),
        None => UNKNOWN.to_string(),
    }
}

fn card_wine(card: &WineCard) -> Wine {
    Wine {
        id: card.wine_id.clone().unwrap_or_default(),
        name: card.name.clone(),
        producer: card.producer.clone().unwrap_or_default(),
        vintage: card.vintage,
        wine_type: card.wine_type.unwrap_or(WineType::Red),
        varietal: card.varietal.clone().unwrap_or_default(),
        country: card.country.clone().unwrap_or_default(),
        region: card.region.clone().unwrap_or_default(),
        price_usd: card.price_usd.unwrap_or_default(),
        rating: None,
        body: None,
        characteristics: Vec::new(),
        flavor_notes: Vec::new(),
        description: card.explanation.clone().unwrap_or_default(),
    }
}

/// Attribute lines handed to the completer.
fn wine_details(wine: &Wine) -> String {
    let mut lines = vec![format!("Name: {}", wine.display_name())];
    let mut push = |label: &str, value: &str| {
        if !value.trim().is_empty() {
            lines.push(format!("{label}: {value}"));
        }
    };
    push("Producer", &wine.producer);
    push("Type", wine.wine_type.as_str());
    push("Grape", &wine.varietal);
    push("Region", &wine.region);
    push("Country", &wine.country);
    push("Style", &wine.characteristics.join(", "));
    push("Flavors", &wine.flavor_notes.join(", "));
    push("Notes", &wine.description);
    if wine.price_usd > 0.0 {
        lines.push(format!("Price: {}", dollars(wine.price_usd)));
    }
    lines.join("\n")
}

/// Plain description used when the completer is unavailable.
fn describe(wine: &Wine) -> String {
    let mut text = format!("The {} is a {} wine", wine.display_name(), wine.wine_type.as_str());
    if !wine.varietal.is_empty() {
        text.push_str(&format!(" made from {}", wine.varietal));
    }
    if !wine.region.is_empty() {
        text.push_str(&format!(" from {}", wine.region));
    }
    text.push('.');
    if !wine.characteristics.is_empty() {
        text.push_str(&format!(
            " Expect something {}.",
            natural_list(&wine.characteristics)
        ));
    }
    if !wine.flavor_notes.is_empty() {
        text.push_str(&format!(
            " Look for notes of {}.",
            natural_list(&wine.flavor_notes)
        ));
    }
    if !wine.description.is_empty() {
        text.push(' ');
        text.push_str(wine.description.trim());
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use pip_rs_test_utils::sample_wine;
    use pretty_assertions::assert_eq;

    #[test]
    fn fallback_description_uses_attributes_only() {
        let mut wine = sample_wine("napa-cab");
        wine.description = String::new();
        let text = describe(&wine);
        assert!(text.starts_with("The "));
        assert!(text.contains("Cabernet Sauvignon"));
        assert!(text.contains("blackcurrant, cedar and vanilla"));
    }

    #[test]
    fn details_skip_empty_fields() {
        let mut wine = sample_wine("rioja-reserva");
        wine.producer = String::new();
        let details = wine_details(&wine);
        assert!(!details.contains("Producer"));
        assert_eq!(details.lines().next(), Some(format!("Name: {}", wine.display_name()).as_str()));
    }
}
