//! Intent handlers. Each file adds an `impl Orchestrator` block for one
//! concern; shared target lookup lives here.

mod cellar;
mod conversation;
mod correction;
mod education;
mod photo;
mod pick;
mod rate;
mod recommend;
mod taste;

use super::{Orchestrator, TurnContext, reply};
use crate::classifier::{clarifying_question, name_matches};
use crate::error::PipCoreError;
use crate::lexicon::Normalized;
use log::{debug, warn};
use pip_rs_protocol::{
    AmbiguityReason, BottleStatus, Card, CellarBottle, CellarCard, Intent, IntentKind,
    PendingClarification, ProcessResponse, ResolvedReference, StoredPreferences, UserProfile,
    Wine, WineCard,
};
use std::collections::HashSet;

/// The wine a message points at.
#[derive(Debug, Clone)]
pub(crate) enum Target {
    /// An entry in the user's cellar.
    Bottle(CellarBottle),
    /// A catalog wine the user does not hold.
    Wine(Wine),
    /// A card from an earlier reply with no catalog or cellar record behind it.
    Card(WineCard),
    /// Only a name is known.
    Named(String),
    /// Several cellar entries match the name.
    Ambiguous(Vec<CellarBottle>),
}

impl Target {
    pub(crate) fn name(&self) -> String {
        match self {
            Target::Bottle(bottle) => bottle.display_name(),
            Target::Wine(wine) => wine.display_name(),
            Target::Card(card) => match card.vintage {
                Some(vintage) if !card.name.contains(&vintage.to_string()) => {
                    format!("{vintage} {}", card.name)
                }
                _ => card.name.clone(),
            },
            Target::Named(name) => name.clone(),
            Target::Ambiguous(bottles) => bottles
                .first()
                .map(CellarBottle::display_name)
                .unwrap_or_default(),
        }
    }

    /// New cellar entry for a target the cellar does not hold yet.
    pub(crate) fn new_bottle(&self, status: BottleStatus, quantity: u32) -> CellarBottle {
        match self {
            Target::Bottle(bottle) => {
                let mut copy = CellarBottle::named(bottle.name.clone(), status, quantity);
                copy.wine_id = bottle.wine_id.clone();
                copy
            }
            Target::Wine(wine) => CellarBottle::from_wine(wine, status, quantity),
            Target::Card(card) => {
                let mut bottle = CellarBottle::named(card.name.clone(), status, quantity);
                bottle.wine_id = card.wine_id.clone();
                bottle.producer = card.producer.clone();
                bottle.vintage = card.vintage;
                bottle.wine_type = card.wine_type;
                bottle.varietal = card.varietal.clone();
                bottle.region = card.region.clone();
                bottle.country = card.country.clone();
                bottle.price_usd = card.price_usd;
                bottle
            }
            Target::Named(name) => CellarBottle::named(name.clone(), status, quantity),
            Target::Ambiguous(bottles) => match bottles.first() {
                Some(bottle) => Target::Bottle(bottle.clone()).new_bottle(status, quantity),
                None => CellarBottle::named(String::new(), status, quantity),
            },
        }
    }
}

impl Orchestrator {
    /// Resolve the intent's target: a resolved card reference first, then the
    /// named wine against the cellar and the catalog.
    pub(crate) async fn resolve_target(
        &self,
        ctx: &TurnContext<'_>,
        intent: &Intent,
    ) -> Result<Option<Target>, PipCoreError> {
        let bottles = match ctx.user_id {
            Some(user_id) => self.cellar.list(user_id).await?,
            None => Vec::new(),
        };

        if let Some(reference) = intent.primary_reference() {
            if let Some(bottle_id) = reference.bottle_id
                && let Some(bottle) = bottles.iter().find(|bottle| bottle.id == bottle_id)
            {
                return Ok(Some(Target::Bottle(bottle.clone())));
            }
            if let Some(wine_id) = reference.wine_id.as_deref() {
                if let Some(bottle) = bottles
                    .iter()
                    .find(|bottle| bottle.wine_id.as_deref() == Some(wine_id))
                {
                    return Ok(Some(Target::Bottle(bottle.clone())));
                }
                if let Some(wine) = self.catalog_get(wine_id).await {
                    return Ok(Some(Target::Wine(wine)));
                }
            }
            let target = match ctx.history.last_cards().get(reference.card_index) {
                Some(Card::Wine(card)) if card.name == reference.name => Target::Card(card.clone()),
                _ => Target::Named(reference.name.clone()),
            };
            return Ok(Some(target));
        }

        let Some(name) = intent.entities.wine_reference.as_deref() else {
            return Ok(None);
        };
        let cards = bottles
            .iter()
            .map(|bottle| Card::Cellar(CellarCard::from(bottle)))
            .collect::<Vec<_>>();
        let matches = name_matches(&Normalized::new(name), &cards);
        debug!(
            "resolved named target (name={}, cellar_matches={})",
            name,
            matches.len()
        );
        match matches.as_slice() {
            [idx] => return Ok(Some(Target::Bottle(bottles[*idx].clone()))),
            [] => {}
            many => {
                return Ok(Some(Target::Ambiguous(
                    many.iter().map(|idx| bottles[*idx].clone()).collect(),
                )));
            }
        }
        if let Some(wine) = self.catalog_find(name).await {
            return Ok(Some(Target::Wine(wine)));
        }
        Ok(Some(Target::Named(name.to_string())))
    }

    /// Catalog lookup by id; a failing catalog only loses the link.
    pub(crate) async fn catalog_get(&self, wine_id: &str) -> Option<Wine> {
        match self.catalog.get(wine_id).await {
            Ok(wine) => wine,
            Err(err) => {
                warn!("catalog lookup failed (wine_id={}, error={})", wine_id, err);
                None
            }
        }
    }

    pub(crate) async fn catalog_find(&self, name: &str) -> Option<Wine> {
        match self.catalog.find_by_name(name).await {
            Ok(wine) => wine,
            Err(err) => {
                warn!("catalog name lookup failed (name={}, error={})", name, err);
                None
            }
        }
    }

    /// The user's profile, when one exists and loads.
    pub(crate) async fn load_profile(&self, user_id: Option<&str>) -> Option<UserProfile> {
        let user_id = user_id?;
        match self.profiles.load(user_id).await {
            Ok(profile) => profile,
            Err(err) => {
                warn!("profile load failed (user={}, error={})", user_id, err);
                None
            }
        }
    }

    pub(crate) async fn stored_preferences(
        &self,
        user_id: Option<&str>,
    ) -> Option<StoredPreferences> {
        self.load_profile(user_id)
            .await
            .filter(|profile| !profile.is_empty())
            .map(|profile| profile.stored_preferences())
    }

    /// Catalog ids of wines the user owns.
    pub(crate) async fn owned_wine_ids(&self, user_id: Option<&str>) -> HashSet<String> {
        let Some(user_id) = user_id else {
            return HashSet::new();
        };
        match self.cellar.list(user_id).await {
            Ok(bottles) => bottles
                .into_iter()
                .filter(|bottle| bottle.status == BottleStatus::Owned)
                .filter_map(|bottle| bottle.wine_id)
                .collect(),
            Err(err) => {
                warn!("cellar lookup failed (user={}, error={})", user_id, err);
                HashSet::new()
            }
        }
    }
}

/// Ask which of several matching cellar entries the user meant.
///
/// The entries go out as cards so the answer ("the 2019 one") resolves
/// against them on the next turn.
pub(crate) fn which_bottle(
    ctx: &TurnContext<'_>,
    kind: IntentKind,
    bottles: &[CellarBottle],
) -> ProcessResponse {
    let candidates = bottles
        .iter()
        .enumerate()
        .map(|(card_index, bottle)| ResolvedReference {
            name: bottle.display_name(),
            wine_id: bottle.wine_id.clone(),
            bottle_id: Some(bottle.id),
            card_index,
        })
        .collect::<Vec<_>>();
    let mut intent = Intent::new(kind, 1.0);
    intent.mark_ambiguous(
        AmbiguityReason::UnclearTarget,
        clarifying_question(&candidates),
    );
    intent.candidates = candidates;

    let mut response = reply::text(kind, intent.clarifying_question.clone().unwrap_or_default());
    response.actions = reply::disambiguation_actions(&intent);
    response.cards = bottles
        .iter()
        .map(|bottle| Card::Cellar(CellarCard::from(bottle)))
        .collect();
    response.clarification = Some(PendingClarification {
        reason: AmbiguityReason::UnclearTarget,
        original_message: ctx.message.to_string(),
        original_kind: Some(kind),
    });
    response
}
