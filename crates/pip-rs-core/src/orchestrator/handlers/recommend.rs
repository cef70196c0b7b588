//! Two-agent recommendation: interpret the request, then search the catalog.

use crate::error::PipCoreError;
use crate::orchestrator::{Orchestrator, TurnContext, reply};
use crate::phrasing::plural;
use log::info;
use pip_rs_protocol::{
    Action, ActionKind, AmbiguityReason, Card, Entities, Intent, IntentKind, ProcessResponse,
    RecordedAction, WineCard,
};

impl Orchestrator {
    pub(crate) async fn recommend(
        &self,
        ctx: &TurnContext<'_>,
        intent: &Intent,
    ) -> Result<ProcessResponse, PipCoreError> {
        let description = match ctx.history.pending_clarification() {
            // "Something new" answers the pairing question; the question's
            // original message carries the actual request.
            Some(pending)
                if pending.reason == AmbiguityReason::NewOrCellar
                    && pending.original_message != ctx.message =>
            {
                format!("{}. {}", pending.original_message, ctx.message)
            }
            _ => ctx.message.to_string(),
        };
        self.run_recommendation(ctx, &description, intent.entities.clone())
            .await
    }

    /// Interpret `description`, search, and build the wine-card reply.
    pub(crate) async fn run_recommendation(
        &self,
        ctx: &TurnContext<'_>,
        description: &str,
        entities: Entities,
    ) -> Result<ProcessResponse, PipCoreError> {
        let preferences = self.stored_preferences(ctx.user_id).await;
        let interpretation = self
            .interpreter
            .interpret_with(description, entities, &ctx.history, preferences.as_ref())
            .await;
        let settings = &self.config.recommender;
        let outcome = self
            .searcher
            .search_with_relaxation(
                &interpretation.query,
                settings.top_n,
                settings.relaxed_retry,
            )
            .await?;
        info!(
            "recommendation search finished (results={}, relaxed={})",
            outcome.recommendations.len(),
            outcome.relaxed.is_some()
        );
        if outcome.recommendations.is_empty() {
            return Ok(reply::text(IntentKind::Recommend, reply::NO_MATCH));
        }

        let owned = self.owned_wine_ids(ctx.user_id).await;
        let mut text = String::new();
        if let Some(relaxation) = &outcome.relaxed {
            text.push_str(&format!(
                "I couldn't find an exact match, so I dropped {}. ",
                relaxation.describe()
            ));
        }
        text.push_str(&format!(
            "I found {} that should work well:",
            plural(outcome.recommendations.len(), "wine")
        ));

        let mut response = reply::text(IntentKind::Recommend, text);
        response.cards = outcome
            .recommendations
            .iter()
            .map(|rec| Card::Wine(WineCard::from_recommendation(rec, owned.contains(&rec.wine.id))))
            .collect();
        response.actions = vec![
            Action::new(ActionKind::AddCellar, "Add to cellar"),
            Action::new(ActionKind::TellMore, "Tell me more"),
        ];
        response.recorded_action = Some(RecordedAction::Recommend {
            request: description.trim().to_string(),
            entities: interpretation.entities,
        });
        Ok(response)
    }
}
