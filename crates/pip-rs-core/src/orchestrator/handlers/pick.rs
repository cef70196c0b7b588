//! "What should I open tonight?": pick one bottle from the cellar.

use crate::decide::{DecideOutcome, DecideRequest, decide};
use crate::error::PipCoreError;
use crate::orchestrator::{Orchestrator, TurnContext, reply};
use log::debug;
use pip_rs_protocol::{Card, CellarCard, Intent, IntentKind, ProcessResponse};

impl Orchestrator {
    pub(crate) async fn decide(
        &self,
        ctx: &TurnContext<'_>,
        intent: &Intent,
    ) -> Result<ProcessResponse, PipCoreError> {
        let user_id = ctx.user(IntentKind::Decide)?;
        let bottles = self.cellar.list(user_id).await?;
        let profile = self.load_profile(Some(user_id)).await;
        let request = DecideRequest::from_entities(&intent.entities);
        debug!(
            "deciding from cellar (bottles={}, food={:?}, occasion={:?})",
            bottles.len(),
            request.food_pairing,
            request.occasion
        );

        match decide(
            &request,
            &bottles,
            profile.as_ref(),
            self.config.decide.min_relevance,
        ) {
            DecideOutcome::EmptyCellar => Ok(reply::empty_cellar(IntentKind::Decide)),
            DecideOutcome::NoMatchingType(wine_type) => {
                let text = match wine_type {
                    Some(wine_type) => format!(
                        "You don't have any {wine_type} wines in your cellar right now. Want me to recommend one?"
                    ),
                    None => "None of your bottles fit that right now. Want me to recommend something new?"
                        .to_string(),
                };
                Ok(reply::text(IntentKind::Decide, text))
            }
            DecideOutcome::Pick(pick) => {
                let mut response = reply::text(IntentKind::Decide, pick.message());
                response.cards = std::iter::once(&pick.bottle)
                    .chain(pick.runner_up.as_ref())
                    .map(|bottle| Card::Cellar(CellarCard::from(bottle)))
                    .collect();
                Ok(response)
            }
        }
    }
}
