//! Ratings: update the cellar entry, then fold the rating into the profile.

use super::{Target, which_bottle};
use crate::error::PipCoreError;
use crate::orchestrator::{Orchestrator, TurnContext, reply};
use crate::profile;
use log::{info, warn};
use pip_rs_protocol::{
    BottleStatus, Card, CellarBottle, CellarCard, Intent, IntentKind, ProcessResponse,
    RecordedAction, WineCard,
};

/// A rating to apply to a target.
pub(crate) struct RatingUpdate {
    pub(crate) rating: f32,
    pub(crate) notes: Option<String>,
    /// The user finished a bottle, so one comes off the owned count.
    pub(crate) drank: bool,
}

impl Orchestrator {
    pub(crate) async fn rate(
        &self,
        ctx: &TurnContext<'_>,
        intent: &Intent,
    ) -> Result<ProcessResponse, PipCoreError> {
        let user_id = ctx.user(IntentKind::Rate)?;
        let target = match self.resolve_target(ctx, intent).await? {
            Some(Target::Ambiguous(bottles)) => {
                return Ok(which_bottle(ctx, IntentKind::Rate, &bottles));
            }
            Some(target) => target,
            None => {
                return Ok(reply::text(
                    IntentKind::Rate,
                    "Which wine would you like to rate?",
                ));
            }
        };

        let name = target.name();
        let rating = match intent.entities.rating {
            Some(rating) if (1.0..=5.0).contains(&rating) => rating,
            Some(_) => {
                return Ok(reply::text(
                    IntentKind::Rate,
                    format!("Ratings go from 1 to 5 stars. How many would you give the {name}?"),
                ));
            }
            None => {
                let mut response = reply::text(
                    IntentKind::Rate,
                    format!("How many stars would you give the {name}? Anything from 1 to 5."),
                );
                response.cards = target_card(&target).into_iter().collect();
                return Ok(response);
            }
        };

        let update = RatingUpdate {
            rating,
            notes: intent.entities.tasting_notes.clone(),
            drank: intent.entities.drank,
        };
        self.apply_rating(user_id, target, update).await
    }

    /// Write the rating and update the profile; the cellar change is reverted
    /// if the profile cannot be saved.
    pub(crate) async fn apply_rating(
        &self,
        user_id: &str,
        target: Target,
        update: RatingUpdate,
    ) -> Result<ProcessResponse, PipCoreError> {
        let (original, mut bottle, created) = match target {
            Target::Bottle(bottle) => (Some(bottle.clone()), bottle, false),
            // Rating a wine the cellar does not hold records it as tried.
            other => (None, other.new_bottle(BottleStatus::Tried, 0), true),
        };
        let previous_rating = bottle.rating;
        let previous_notes = bottle.notes.clone();
        let previous_status = bottle.status;
        let previous_quantity = bottle.quantity;

        bottle.rating = Some(update.rating);
        if let Some(notes) = update.notes.as_ref() {
            bottle.notes = Some(notes.clone());
        }
        if bottle.status == BottleStatus::Wishlist {
            bottle.status = BottleStatus::Tried;
        }
        if update.drank && bottle.status == BottleStatus::Owned {
            bottle.quantity = bottle.quantity.saturating_sub(1);
            if bottle.quantity == 0 {
                bottle.status = BottleStatus::Tried;
            }
        }
        self.cellar.upsert(user_id, bottle.clone()).await?;

        if let Err(err) = self
            .refresh_profile(user_id, &bottle, update.rating, previous_rating.is_some())
            .await
        {
            warn!(
                "profile update failed, reverting rating (user={}, error={})",
                user_id, err
            );
            match original {
                Some(original) => self.cellar.upsert(user_id, original).await?,
                None => {
                    self.cellar.remove(user_id, bottle.id).await?;
                }
            }
            return Err(err);
        }
        info!(
            "rating recorded (user={}, name={}, rating={})",
            user_id, bottle.name, update.rating
        );

        let name = bottle.display_name();
        let mut message = format!("Got it! Rated {name} {}.", reply::stars(update.rating));
        if previous_status == BottleStatus::Owned && bottle.status == BottleStatus::Tried {
            message.push_str(" That was your last bottle, so I've moved it to your tried list.");
        }
        if update.notes.is_none() {
            message.push_str(" Would you like to add any tasting notes?");
        }
        let recorded = RecordedAction::Rate {
            bottle_id: bottle.id,
            wine_name: name,
            rating: update.rating,
            created,
            previous_rating,
            previous_notes,
            previous_status,
            previous_quantity,
        };
        Ok(reply::mutation(IntentKind::Rate, message, &bottle, recorded))
    }

    /// Fold the rating into the stored profile. A changed rating rebuilds
    /// the profile from every rated bottle so the old one stops counting.
    async fn refresh_profile(
        &self,
        user_id: &str,
        bottle: &CellarBottle,
        rating: f32,
        rerated: bool,
    ) -> Result<(), PipCoreError> {
        let profile = if rerated {
            let bottles = self.cellar.list(user_id).await?;
            profile::rebuild(&bottles)
        } else {
            let mut profile = self.profiles.load(user_id).await?.unwrap_or_default();
            profile::record_rating(&mut profile, bottle, rating, bottle.notes.as_deref());
            profile
        };
        self.profiles.save(user_id, &profile).await?;
        Ok(())
    }
}

fn target_card(target: &Target) -> Option<Card> {
    match target {
        Target::Bottle(bottle) => Some(Card::Cellar(CellarCard::from(bottle))),
        Target::Wine(wine) => Some(Card::Wine(WineCard::from_wine(wine))),
        Target::Card(card) => Some(Card::Wine(card.clone())),
        Target::Named(_) | Target::Ambiguous(_) => None,
    }
}
