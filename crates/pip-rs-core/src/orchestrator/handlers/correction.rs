//! Undo, amend and dismiss against the last recorded action.

use super::Target;
use super::rate::RatingUpdate;
use crate::error::PipCoreError;
use crate::lexicon::varietal_type;
use crate::orchestrator::{Orchestrator, TurnContext, reply};
use crate::phrasing::plural;
use crate::profile;
use log::info;
use pip_rs_protocol::{
    BottleStatus, CorrectionMode, Entities, Intent, IntentKind, ProcessResponse, RecordedAction,
};

const NOTHING_TO_UNDO: &str = "There's nothing for me to undo right now.";
const NOTHING_TO_CHANGE: &str =
    "I'm not sure what to change. Tell me what you'd like instead and I'll start from there.";
const DISMISSED: &str = "No problem, let's leave it there. What else can I help with?";

impl Orchestrator {
    pub(crate) async fn correction(
        &self,
        ctx: &TurnContext<'_>,
        intent: Intent,
    ) -> Result<ProcessResponse, PipCoreError> {
        let mode = intent.correction_mode.unwrap_or(CorrectionMode::Dismiss);
        info!(
            "handling correction (mode={:?}, target={})",
            mode,
            intent
                .correction_target
                .as_ref()
                .map(RecordedAction::describe)
                .unwrap_or_else(|| "none".to_string())
        );
        match (mode, intent.correction_target) {
            (CorrectionMode::Dismiss, _) => Ok(reply::text(IntentKind::Correction, DISMISSED)),
            (CorrectionMode::Undo, None) => {
                Ok(reply::text(IntentKind::Correction, NOTHING_TO_UNDO))
            }
            (CorrectionMode::Amend, None) => {
                Ok(reply::text(IntentKind::Correction, NOTHING_TO_CHANGE))
            }
            (CorrectionMode::Undo, Some(target)) => self.undo(ctx, target).await,
            (CorrectionMode::Amend, Some(target)) => {
                self.amend(ctx, target, &intent.entities).await
            }
        }
    }

    /// Reverse a recorded action. The reply records nothing, so a second
    /// undo does not reach further back.
    async fn undo(
        &self,
        ctx: &TurnContext<'_>,
        target: RecordedAction,
    ) -> Result<ProcessResponse, PipCoreError> {
        if let RecordedAction::Recommend { .. } = target {
            return Ok(reply::text(
                IntentKind::Correction,
                "Okay, let's forget those suggestions. What would you like instead?",
            ));
        }
        let user_id = ctx.user(IntentKind::Correction)?;
        let text = match target {
            RecordedAction::Recommend { .. } => DISMISSED.to_string(),
            RecordedAction::CellarAdd {
                bottle_id,
                wine_name,
                created,
                previous_quantity,
                previous_status,
            } => {
                if created {
                    self.cellar.remove(user_id, bottle_id).await?;
                    format!("Undone. I've taken {wine_name} back out of your cellar.")
                } else if let Some(mut bottle) = self.cellar.get(user_id, bottle_id).await? {
                    bottle.quantity = previous_quantity;
                    bottle.status = previous_status;
                    self.cellar.upsert(user_id, bottle).await?;
                    format!("Undone. {wine_name} is back to how it was.")
                } else {
                    format!("{wine_name} isn't in your cellar anymore, so there's nothing to undo.")
                }
            }
            RecordedAction::CellarRemove { bottle } => {
                let name = bottle.display_name();
                self.cellar.upsert(user_id, bottle).await?;
                format!("Undone. {name} is back in your cellar.")
            }
            RecordedAction::Rate {
                bottle_id,
                wine_name,
                created,
                previous_rating,
                previous_notes,
                previous_status,
                previous_quantity,
                ..
            } => {
                if created {
                    self.cellar.remove(user_id, bottle_id).await?;
                } else if let Some(mut bottle) = self.cellar.get(user_id, bottle_id).await? {
                    bottle.rating = previous_rating;
                    bottle.notes = previous_notes;
                    bottle.status = previous_status;
                    bottle.quantity = previous_quantity;
                    self.cellar.upsert(user_id, bottle).await?;
                }
                let bottles = self.cellar.list(user_id).await?;
                self.profiles
                    .save(user_id, &profile::rebuild(&bottles))
                    .await?;
                format!("Undone. I've taken back your rating of {wine_name}.")
            }
            RecordedAction::ProfileReset { previous } => {
                self.profiles.save(user_id, &previous).await?;
                "Undone. Your taste profile is back the way it was.".to_string()
            }
        };
        info!("undo applied (user={})", user_id);
        Ok(reply::text(IntentKind::Correction, text))
    }

    /// Re-run the recorded action's handler with the corrected fields.
    async fn amend(
        &self,
        ctx: &TurnContext<'_>,
        target: RecordedAction,
        corrected: &Entities,
    ) -> Result<ProcessResponse, PipCoreError> {
        match target {
            RecordedAction::Recommend { request, entities } => {
                let amended = amended_search(&entities, corrected);
                self.run_recommendation(ctx, &request, amended).await
            }
            RecordedAction::Rate {
                bottle_id,
                wine_name,
                rating,
                ..
            } => {
                let user_id = ctx.user(IntentKind::Correction)?;
                let Some(bottle) = self.cellar.get(user_id, bottle_id).await? else {
                    return Ok(reply::text(
                        IntentKind::Correction,
                        format!("{wine_name} isn't in your cellar anymore, so I can't change its rating."),
                    ));
                };
                let update = RatingUpdate {
                    rating: corrected.rating.unwrap_or(rating),
                    notes: corrected.tasting_notes.clone(),
                    drank: false,
                };
                self.apply_rating(user_id, Target::Bottle(bottle), update)
                    .await
            }
            RecordedAction::CellarAdd {
                bottle_id,
                wine_name,
                created,
                previous_quantity,
                previous_status,
            } => {
                let user_id = ctx.user(IntentKind::Correction)?;
                let Some(mut bottle) = self.cellar.get(user_id, bottle_id).await? else {
                    return Ok(reply::text(
                        IntentKind::Correction,
                        format!("{wine_name} isn't in your cellar anymore, so there's nothing to change."),
                    ));
                };
                let message = if corrected.status == Some(BottleStatus::Wishlist) {
                    bottle.status = BottleStatus::Wishlist;
                    bottle.quantity = 0;
                    format!("Got it, {wine_name} is on your wishlist instead.")
                } else {
                    let added = corrected.quantity.unwrap_or(1);
                    let base = if previous_status == BottleStatus::Owned {
                        previous_quantity
                    } else {
                        0
                    };
                    bottle.status = BottleStatus::Owned;
                    bottle.quantity = base + added;
                    format!(
                        "Got it, you now have {} of {wine_name}.",
                        plural(bottle.quantity as usize, "bottle")
                    )
                };
                self.cellar.upsert(user_id, bottle.clone()).await?;
                let recorded = RecordedAction::CellarAdd {
                    bottle_id,
                    wine_name,
                    created,
                    previous_quantity,
                    previous_status,
                };
                Ok(reply::mutation(
                    IntentKind::Correction,
                    message,
                    &bottle,
                    recorded,
                ))
            }
            RecordedAction::CellarRemove { .. } | RecordedAction::ProfileReset { .. } => {
                Ok(reply::text(IntentKind::Correction, NOTHING_TO_CHANGE))
            }
        }
    }
}

/// Search entities with the correction laid over them. A new type or
/// exclusion drops a grape of another colour, and a new ceiling drops a
/// floor above it.
fn amended_search(previous: &Entities, corrected: &Entities) -> Entities {
    let mut amended = previous.clone();
    amended.overlay(corrected);
    if let Some(excluded) = corrected.exclude_type
        && amended.wine_type == Some(excluded)
    {
        amended.wine_type = None;
    }
    if corrected.wine_type.is_some() && corrected.exclude_type.is_none() {
        amended.exclude_type = None;
    }
    let clashes = amended
        .varietal
        .as_deref()
        .and_then(varietal_type)
        .is_some_and(|grape_type| {
            amended.wine_type.is_some_and(|wine_type| wine_type != grape_type)
                || amended.exclude_type == Some(grape_type)
        });
    if clashes && corrected.varietal.is_none() {
        amended.varietal = None;
    }
    if let (Some(min), Some(max)) = (amended.price_min, amended.price_max)
        && corrected.price_min.is_none()
        && min > max
    {
        amended.price_min = None;
    }
    amended
}
