//! Cellar add, query and remove.

use super::{Target, which_bottle};
use crate::error::PipCoreError;
use crate::orchestrator::{Orchestrator, TurnContext, reply};
use crate::phrasing::{dollars, plural};
use log::{info, warn};
use pip_rs_protocol::{
    Action, ActionKind, BottleStatus, Card, CellarBottle, CellarCard, ConfirmationAction,
    ConfirmationRequest, Entities, Intent, IntentKind, ProcessResponse, RecordedAction, WineType,
};
use uuid::Uuid;

/// Cards shown for a cellar query.
const MAX_QUERY_CARDS: usize = 5;

impl Orchestrator {
    pub(crate) async fn cellar_add(
        &self,
        ctx: &TurnContext<'_>,
        intent: &Intent,
    ) -> Result<ProcessResponse, PipCoreError> {
        let user_id = ctx.user(IntentKind::CellarAdd)?;
        let target = match self.resolve_target(ctx, intent).await? {
            Some(Target::Ambiguous(bottles)) => {
                return Ok(which_bottle(ctx, IntentKind::CellarAdd, &bottles));
            }
            Some(target) => target,
            None => {
                return Ok(reply::text(
                    IntentKind::CellarAdd,
                    "Which wine would you like to add? Tell me its name or pick one of my suggestions.",
                ));
            }
        };
        let wishlist = intent.entities.status == Some(BottleStatus::Wishlist);
        let quantity = intent.entities.quantity.unwrap_or(1);

        let mut bottle = match target {
            Target::Bottle(bottle) => bottle,
            target => {
                let (status, quantity) = if wishlist {
                    (BottleStatus::Wishlist, 0)
                } else {
                    (BottleStatus::Owned, quantity)
                };
                let bottle = target.new_bottle(status, quantity);
                self.cellar.upsert(user_id, bottle.clone()).await?;
                info!(
                    "cellar entry created (user={}, name={}, status={}, quantity={})",
                    user_id, bottle.name, status, quantity
                );
                let name = bottle.display_name();
                let message = if wishlist {
                    format!("Saved {name} to your wishlist.")
                } else if quantity > 1 {
                    format!("Added {quantity} bottles of {name} to your cellar!")
                } else {
                    format!("Added {name} to your cellar!")
                };
                let recorded = RecordedAction::CellarAdd {
                    bottle_id: bottle.id,
                    wine_name: name,
                    created: true,
                    previous_quantity: 0,
                    previous_status: status,
                };
                return Ok(reply::mutation(IntentKind::CellarAdd, message, &bottle, recorded));
            }
        };

        let name = bottle.display_name();
        if wishlist {
            let text = match bottle.status {
                BottleStatus::Wishlist => format!("{name} is already on your wishlist."),
                _ => format!("{name} is already in your cellar."),
            };
            return Ok(reply::text(IntentKind::CellarAdd, text));
        }
        let previous_quantity = bottle.quantity;
        let previous_status = bottle.status;
        let message = if previous_status == BottleStatus::Owned {
            bottle.quantity += quantity;
            format!(
                "Added {} of {name}. You now have {}.",
                plural(quantity as usize, "more bottle"),
                plural(bottle.quantity as usize, "bottle")
            )
        } else {
            bottle.status = BottleStatus::Owned;
            bottle.quantity = quantity;
            format!("Added {name} to your cellar!")
        };
        self.cellar.upsert(user_id, bottle.clone()).await?;
        info!(
            "cellar entry updated (user={}, name={}, quantity={})",
            user_id, bottle.name, bottle.quantity
        );
        let recorded = RecordedAction::CellarAdd {
            bottle_id: bottle.id,
            wine_name: name,
            created: false,
            previous_quantity,
            previous_status,
        };
        Ok(reply::mutation(IntentKind::CellarAdd, message, &bottle, recorded))
    }

    pub(crate) async fn cellar_query(
        &self,
        ctx: &TurnContext<'_>,
        intent: &Intent,
    ) -> Result<ProcessResponse, PipCoreError> {
        let user_id = ctx.user(IntentKind::CellarQuery)?;
        let bottles = self.cellar.list(user_id).await?;
        let filter = CellarFilter::from_entities(&intent.entities);
        if bottles.is_empty()
            || (filter.is_default() && !bottles.iter().any(CellarBottle::is_available))
        {
            return Ok(reply::empty_cellar(IntentKind::CellarQuery));
        }

        let mut matched = bottles
            .into_iter()
            .filter(|bottle| filter.matches(bottle))
            .collect::<Vec<_>>();
        if filter.min_rating.is_some() || filter.max_rating.is_some() {
            matched.sort_by(|a, b| {
                b.rating
                    .unwrap_or_default()
                    .total_cmp(&a.rating.unwrap_or_default())
            });
        } else {
            matched.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        }
        let scope = filter.scope();
        if matched.is_empty() {
            return Ok(reply::text(
                IntentKind::CellarQuery,
                format!("I couldn't find any wines {scope} that match."),
            ));
        }

        let mut text = if filter.status == Some(BottleStatus::Owned) && filter.is_default() {
            let bottles = matched.iter().map(|bottle| bottle.quantity).sum::<u32>();
            format!(
                "You have {} ({}) {scope}:",
                plural(matched.len(), "wine"),
                plural(bottles as usize, "bottle")
            )
        } else {
            format!("I found {} {scope}:", plural(matched.len(), "wine"))
        };
        if matched.len() > MAX_QUERY_CARDS {
            text.push_str(&format!(" Here are the first {MAX_QUERY_CARDS}."));
        }
        let mut response = reply::text(IntentKind::CellarQuery, text);
        response.cards = matched
            .iter()
            .take(MAX_QUERY_CARDS)
            .map(|bottle| Card::Cellar(CellarCard::from(bottle)))
            .collect();
        response.actions = vec![Action::new(ActionKind::ViewCellar, "View cellar")];
        Ok(response)
    }

    pub(crate) async fn cellar_remove(
        &self,
        ctx: &TurnContext<'_>,
        intent: &Intent,
    ) -> Result<ProcessResponse, PipCoreError> {
        ctx.user(IntentKind::CellarRemove)?;
        let bottle = match self.resolve_target(ctx, intent).await? {
            Some(Target::Bottle(bottle)) => bottle,
            Some(Target::Ambiguous(bottles)) => {
                return Ok(which_bottle(ctx, IntentKind::CellarRemove, &bottles));
            }
            Some(other) => {
                return Ok(reply::text(
                    IntentKind::CellarRemove,
                    format!("I couldn't find {} in your cellar.", other.name()),
                ));
            }
            None => {
                return Ok(reply::text(
                    IntentKind::CellarRemove,
                    "Which wine would you like to remove from your cellar?",
                ));
            }
        };

        let name = bottle.display_name();
        let mut response = reply::text(
            IntentKind::CellarRemove,
            format!("Remove {name} from your cellar? Say 'yes' to confirm."),
        );
        response.cards = vec![Card::Cellar(CellarCard::from(&bottle))];
        response.actions = vec![
            Action::new(ActionKind::Confirm, "Yes, remove it").with_value("yes, remove it"),
            Action::new(ActionKind::Cancel, "Keep it").with_value("never mind"),
        ];
        response.confirmation = Some(ConfirmationRequest::new(
            ConfirmationAction::RemoveBottle,
            bottle.id.to_string(),
            name,
        ));
        Ok(response)
    }

    /// Run a confirmed removal.
    pub(crate) async fn confirm_remove(
        &self,
        user_id: &str,
        pending: &ConfirmationRequest,
    ) -> Result<ProcessResponse, PipCoreError> {
        let removed = match Uuid::parse_str(&pending.target_id) {
            Ok(bottle_id) => self.cellar.remove(user_id, bottle_id).await?,
            Err(err) => {
                warn!(
                    "confirmation target is not a bottle id (target={}, error={})",
                    pending.target_id, err
                );
                None
            }
        };
        let Some(bottle) = removed else {
            return Ok(reply::text(
                IntentKind::CellarRemove,
                format!(
                    "{} isn't in your cellar anymore, so there was nothing to remove.",
                    pending.target_name
                ),
            ));
        };
        info!("cellar entry removed (user={}, name={})", user_id, bottle.name);
        let message = format!("Removed {} from your cellar.", bottle.display_name());
        let recorded = RecordedAction::CellarRemove {
            bottle: bottle.clone(),
        };
        Ok(reply::mutation(IntentKind::CellarRemove, message, &bottle, recorded))
    }
}

/// What a cellar question asks for.
#[derive(Debug, Clone, Default, PartialEq)]
struct CellarFilter {
    /// `None` means any status (rating questions span owned and tried).
    status: Option<BottleStatus>,
    wine_type: Option<WineType>,
    varietal: Option<String>,
    region: Option<String>,
    country: Option<String>,
    min_rating: Option<f32>,
    max_rating: Option<f32>,
    price_max: Option<f64>,
}

impl CellarFilter {
    fn from_entities(entities: &Entities) -> Self {
        let rated = entities.min_rating.is_some() || entities.max_rating.is_some();
        Self {
            status: entities
                .status
                .or((!rated).then_some(BottleStatus::Owned)),
            wine_type: entities.wine_type,
            varietal: entities.varietal.clone(),
            region: entities.region.clone(),
            country: entities.country.clone(),
            min_rating: entities.min_rating,
            max_rating: entities.max_rating,
            price_max: entities.price_max,
        }
    }

    /// Only the status is constrained.
    fn is_default(&self) -> bool {
        Self {
            status: self.status,
            ..Self::default()
        } == *self
    }

    fn matches(&self, bottle: &CellarBottle) -> bool {
        let contains = |field: &Option<String>, needle: &str| {
            field
                .as_deref()
                .is_some_and(|value| value.to_lowercase().contains(&needle.to_lowercase()))
        };
        self.status.is_none_or(|status| bottle.status == status)
            && (self.status != Some(BottleStatus::Owned) || bottle.quantity > 0)
            && self
                .wine_type
                .is_none_or(|wine_type| bottle.wine_type == Some(wine_type))
            && self
                .varietal
                .as_deref()
                .is_none_or(|varietal| contains(&bottle.varietal, varietal))
            && self
                .region
                .as_deref()
                .is_none_or(|region| contains(&bottle.region, region))
            && self.country.as_deref().is_none_or(|country| {
                contains(&bottle.country, country) || contains(&bottle.region, country)
            })
            && self
                .min_rating
                .is_none_or(|min| bottle.rating.is_some_and(|rating| rating >= min))
            && self
                .max_rating
                .is_none_or(|max| bottle.rating.is_some_and(|rating| rating <= max))
            && self
                .price_max
                .is_none_or(|max| bottle.price_usd.is_some_and(|price| price <= max))
    }

    /// Trailing phrase for the reply, e.g. "in your cellar" or "you rated 4 stars or more".
    fn scope(&self) -> String {
        let mut scope = match (self.min_rating, self.max_rating) {
            (Some(min), _) => format!("you rated {} or more", reply::stars(min)),
            (None, Some(max)) => format!("you rated {} or less", reply::stars(max)),
            (None, None) => match self.status {
                Some(BottleStatus::Tried) => "you've tried".to_string(),
                Some(BottleStatus::Wishlist) => "on your wishlist".to_string(),
                _ => "in your cellar".to_string(),
            },
        };
        if let Some(max) = self.price_max {
            scope.push_str(&format!(" under {}", dollars(max)));
        }
        scope
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bottle(name: &str, wine_type: WineType, rating: Option<f32>) -> CellarBottle {
        let mut bottle = CellarBottle::named(name, BottleStatus::Owned, 1);
        bottle.wine_type = Some(wine_type);
        bottle.rating = rating;
        bottle
    }

    #[test]
    fn default_filter_lists_owned_bottles_with_stock() {
        let filter = CellarFilter::from_entities(&Entities::default());
        assert!(filter.is_default());
        assert!(filter.matches(&bottle("Catena Malbec", WineType::Red, None)));
        let mut empty = bottle("Catena Malbec", WineType::Red, None);
        empty.quantity = 0;
        assert!(!filter.matches(&empty));
        assert_eq!(filter.scope(), "in your cellar");
    }

    #[test]
    fn rating_questions_span_statuses() {
        let filter = CellarFilter::from_entities(&Entities {
            min_rating: Some(4.0),
            ..Entities::default()
        });
        let mut tried = bottle("Muga Reserva", WineType::Red, Some(5.0));
        tried.status = BottleStatus::Tried;
        tried.quantity = 0;
        assert!(filter.matches(&tried));
        assert!(!filter.matches(&bottle("Cheap Merlot", WineType::Red, Some(2.0))));
        assert_eq!(filter.scope(), "you rated 4/5 or more");
    }

    #[test]
    fn country_matches_region_text() {
        let filter = CellarFilter::from_entities(&Entities {
            country: Some("California".to_string()),
            wine_type: Some(WineType::Red),
            ..Entities::default()
        });
        let mut napa = bottle("Stag Ridge Cabernet", WineType::Red, None);
        napa.region = Some("Napa Valley, California".to_string());
        assert!(filter.matches(&napa));
        assert!(!filter.is_default());
    }
}
