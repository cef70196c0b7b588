//! Profile questions and the confirmed profile reset.

use crate::error::PipCoreError;
use crate::orchestrator::{Orchestrator, TurnContext, reply};
use crate::profile::summarize;
use log::info;
use pip_rs_protocol::{
    Action, ActionKind, Card, ConfirmationAction, ConfirmationRequest, Intent, IntentKind,
    ProcessResponse, ProfileCard, RecordedAction, UserProfile,
};

impl Orchestrator {
    pub(crate) async fn profile(
        &self,
        ctx: &TurnContext<'_>,
        intent: &Intent,
    ) -> Result<ProcessResponse, PipCoreError> {
        let user_id = ctx.user(IntentKind::ProfileQuery)?;
        let profile = self.profiles.load(user_id).await?.unwrap_or_default();

        if intent.entities.profile_reset {
            if profile.is_empty() {
                return Ok(reply::text(
                    IntentKind::ProfileQuery,
                    "Your taste profile is already empty, so there's nothing to reset.",
                ));
            }
            let mut response = reply::text(
                IntentKind::ProfileQuery,
                "Reset your taste profile? I'll forget everything I've learned from your ratings. Say 'yes' to confirm.",
            );
            response.actions = vec![
                Action::new(ActionKind::Confirm, "Yes, reset it").with_value("yes, reset it"),
                Action::new(ActionKind::Cancel, "Keep it").with_value("never mind"),
            ];
            response.confirmation = Some(ConfirmationRequest::new(
                ConfirmationAction::ResetProfile,
                user_id,
                "your taste profile",
            ));
            return Ok(response);
        }

        let summary = summarize(&profile);
        let mut response = reply::text(IntentKind::ProfileQuery, summary.clone());
        response.cards = vec![Card::Profile(ProfileCard::new(&profile, summary))];
        Ok(response)
    }

    /// Run a confirmed profile reset.
    pub(crate) async fn confirm_reset(
        &self,
        user_id: &str,
    ) -> Result<ProcessResponse, PipCoreError> {
        let previous = self.profiles.reset(user_id).await?.unwrap_or_default();
        info!(
            "profile reset (user={}, ratings={})",
            user_id, previous.total_ratings
        );
        let mut response = reply::text(
            IntentKind::ProfileQuery,
            "Done. I've reset your taste profile, so we're starting fresh.",
        );
        response.cards = vec![Card::Profile(ProfileCard::new(
            &UserProfile::default(),
            summarize(&UserProfile::default()),
        ))];
        response.actions = vec![Action::new(ActionKind::Undo, "Undo")];
        response.recorded_action = Some(RecordedAction::ProfileReset { previous });
        Ok(response)
    }
}
