//! Chat orchestrator: one `process` call per user message.
//!
//! A turn walks `Idle → Classifying → Dispatching → {AgentHandling |
//! ConfirmationPending} → Responding → Idle`. Ambiguous intents and missing
//! sign-in short-circuit to `Responding` without dispatching a handler, and
//! destructive actions only run when the next request carries their
//! confirmation.

mod confirmation;
mod handlers;
mod reply;
mod turn;

use crate::classifier::IntentClassifier;
use crate::error::PipCoreError;
use crate::history::ConversationWindow;
use crate::interpreter::PreferenceInterpreter;
use crate::searcher::WineSearcher;
use crate::store::{CellarStore, InMemoryCellarStore, InMemoryProfileStore, ProfileStore};
use confirmation::{ConfirmationReply, classify_reply};
use log::{debug, error, info, warn};
use pip_rs_config::{MAX_HISTORY_WINDOW, PipConfig};
use pip_rs_knowledge::{CatalogIndex, Embedder, KnowledgeIndex};
use pip_rs_protocol::{
    AmbiguityReason, Attachment, Card, Completer, ConfirmationAction, ConfirmationRequest, Intent,
    IntentKind, PendingClarification, PipelineState, ProcessRequest, ProcessResponse,
    RecordedAction, VisionService,
};
use std::sync::Arc;
use turn::Turn;

/// What a handler sees of the current request.
pub(crate) struct TurnContext<'a> {
    pub(crate) user_id: Option<&'a str>,
    pub(crate) message: &'a str,
    pub(crate) attachments: &'a [Attachment],
    pub(crate) history: ConversationWindow<'a>,
}

impl<'a> TurnContext<'a> {
    /// The signed-in user; handlers behind the auth gate rely on it.
    pub(crate) fn user(&self, kind: IntentKind) -> Result<&'a str, PipCoreError> {
        self.user_id.ok_or(PipCoreError::Unauthenticated(kind))
    }
}

/// Routes classified intents to handlers and owns every collaborator.
pub struct Orchestrator {
    config: PipConfig,
    classifier: IntentClassifier,
    interpreter: PreferenceInterpreter,
    searcher: WineSearcher,
    completer: Arc<dyn Completer>,
    embedder: Arc<dyn Embedder>,
    knowledge: Arc<dyn KnowledgeIndex>,
    catalog: Arc<dyn CatalogIndex>,
    vision: Option<Arc<dyn VisionService>>,
    cellar: Arc<dyn CellarStore>,
    profiles: Arc<dyn ProfileStore>,
}

impl Orchestrator {
    pub fn builder(config: PipConfig) -> OrchestratorBuilder {
        OrchestratorBuilder::new(config)
    }

    pub fn config(&self) -> &PipConfig {
        &self.config
    }

    /// Handle one user message. Always returns exactly one response.
    pub async fn process(&self, request: ProcessRequest) -> ProcessResponse {
        let window = self
            .config
            .assistant
            .history_window
            .clamp(1, MAX_HISTORY_WINDOW);
        let ctx = TurnContext {
            user_id: request.user_id.as_deref(),
            message: request.message.trim(),
            attachments: &request.attachments,
            history: ConversationWindow::new(&request.history, window),
        };
        let mut turn = Turn::new();
        let mut response = match self
            .run(&ctx, request.confirmation.as_ref(), &mut turn)
            .await
        {
            Ok(response) => response,
            Err(err) => {
                error!(
                    "turn failed (state={:?}, error={})",
                    turn.state(),
                    err
                );
                turn.fail();
                let text = match err {
                    PipCoreError::Retrieval(_) => reply::CATALOG_UNAVAILABLE,
                    _ => reply::GENERIC_ERROR,
                };
                ProcessResponse::text(text)
            }
        };
        response.trace = turn.finish();
        response
    }

    async fn run(
        &self,
        ctx: &TurnContext<'_>,
        confirmation: Option<&ConfirmationRequest>,
        turn: &mut Turn,
    ) -> Result<ProcessResponse, PipCoreError> {
        turn.advance(PipelineState::Classifying)?;
        if let Some(pending) = confirmation {
            match classify_reply(ctx.message, pending) {
                ConfirmationReply::Affirm => {
                    info!(
                        "confirmation accepted (action={:?}, target={})",
                        pending.action, pending.target_name
                    );
                    turn.advance(PipelineState::Dispatching)?;
                    turn.advance(PipelineState::AgentHandling)?;
                    let response = self.execute_confirmed(ctx, pending).await?;
                    turn.advance(PipelineState::Responding)?;
                    return Ok(response);
                }
                ConfirmationReply::Decline => {
                    info!("confirmation declined (action={:?})", pending.action);
                    turn.advance(PipelineState::Dispatching)?;
                    turn.advance(PipelineState::Responding)?;
                    return Ok(reply::text(confirmation_kind(pending.action), reply::CANCELLED));
                }
                ConfirmationReply::Unrelated => {
                    debug!("confirmation lapsed (action={:?})", pending.action);
                }
            }
        }

        let mut intent = self
            .classifier
            .classify(ctx.message, ctx.attachments, &ctx.history)
            .await;
        info!(
            "classified message (intent={}, confidence={:.2}, ambiguous={})",
            intent.kind, intent.confidence, intent.is_ambiguous
        );
        turn.advance(PipelineState::Dispatching)?;

        if requires_user(&intent) && ctx.user_id.is_none() {
            turn.advance(PipelineState::Responding)?;
            let mut response = reply::text(intent.kind, reply::SIGN_IN);
            response.requires_auth = true;
            return Ok(response);
        }
        if intent.is_ambiguous
            && intent.ambiguity_reason == Some(AmbiguityReason::NewOrCellar)
            && !self.has_owned_bottles(ctx.user_id).await
        {
            debug!("no bottles to pick from, recommending directly");
            intent.is_ambiguous = false;
            intent.ambiguity_reason = None;
            intent.clarifying_question = None;
        }
        if intent.is_ambiguous {
            turn.advance(PipelineState::Responding)?;
            return Ok(clarify(ctx, &intent));
        }

        turn.advance(PipelineState::AgentHandling)?;
        let response = self.dispatch(ctx, intent).await?;
        if response.confirmation.is_some() {
            turn.advance(PipelineState::ConfirmationPending)?;
        }
        turn.advance(PipelineState::Responding)?;
        Ok(response)
    }

    async fn dispatch(
        &self,
        ctx: &TurnContext<'_>,
        intent: Intent,
    ) -> Result<ProcessResponse, PipCoreError> {
        match intent.kind {
            IntentKind::Recommend => self.recommend(ctx, &intent).await,
            IntentKind::EducateGeneral => self.educate_general(ctx).await,
            IntentKind::EducateSpecific => self.educate_specific(ctx, &intent).await,
            IntentKind::CellarAdd => self.cellar_add(ctx, &intent).await,
            IntentKind::CellarQuery => self.cellar_query(ctx, &intent).await,
            IntentKind::CellarRemove => self.cellar_remove(ctx, &intent).await,
            IntentKind::Rate => self.rate(ctx, &intent).await,
            IntentKind::ProfileQuery => self.profile(ctx, &intent).await,
            IntentKind::Decide => self.decide(ctx, &intent).await,
            IntentKind::AnalyzePhoto => self.analyze_photo(ctx).await,
            IntentKind::Correction => self.correction(ctx, intent).await,
            IntentKind::OffTopic => Ok(self.off_topic(ctx)),
            IntentKind::Unclear => Ok(reply::text(IntentKind::Unclear, reply::HELP)),
        }
    }

    async fn execute_confirmed(
        &self,
        ctx: &TurnContext<'_>,
        pending: &ConfirmationRequest,
    ) -> Result<ProcessResponse, PipCoreError> {
        let kind = confirmation_kind(pending.action);
        let Some(user_id) = ctx.user_id else {
            let mut response = reply::text(kind, reply::SIGN_IN);
            response.requires_auth = true;
            return Ok(response);
        };
        match pending.action {
            ConfirmationAction::RemoveBottle => self.confirm_remove(user_id, pending).await,
            ConfirmationAction::ResetProfile => self.confirm_reset(user_id).await,
        }
    }

    async fn has_owned_bottles(&self, user_id: Option<&str>) -> bool {
        let Some(user_id) = user_id else {
            return false;
        };
        match self.cellar.list(user_id).await {
            Ok(bottles) => bottles.iter().any(|bottle| bottle.is_available()),
            Err(err) => {
                warn!("cellar lookup failed (error={})", err);
                true
            }
        }
    }
}

/// Intents that touch per-user data, including undo of a cellar or profile change.
fn requires_user(intent: &Intent) -> bool {
    if intent.kind == IntentKind::Correction {
        return intent
            .correction_target
            .as_ref()
            .is_some_and(|target| !matches!(target, RecordedAction::Recommend { .. }));
    }
    intent.kind.requires_user()
}

fn confirmation_kind(action: ConfirmationAction) -> IntentKind {
    match action {
        ConfirmationAction::RemoveBottle => IntentKind::CellarRemove,
        ConfirmationAction::ResetProfile => IntentKind::ProfileQuery,
    }
}

/// Clarifying reply for an ambiguous intent; nothing is dispatched.
fn clarify(ctx: &TurnContext<'_>, intent: &Intent) -> ProcessResponse {
    let question = intent
        .clarifying_question
        .clone()
        .unwrap_or_else(|| reply::HELP.to_string());
    let mut response = reply::text(intent.kind, question);
    response.actions = reply::disambiguation_actions(intent);
    let cards = ctx.history.last_cards();
    response.cards = intent
        .candidates
        .iter()
        .filter_map(|candidate| cards.get(candidate.card_index))
        .cloned()
        .collect::<Vec<Card>>();
    response.clarification = intent.ambiguity_reason.map(|reason| PendingClarification {
        reason,
        original_message: ctx.message.to_string(),
        original_kind: Some(intent.kind),
    });
    response
}

/// Assembles an [`Orchestrator`]; completer, embedder, knowledge and catalog
/// are required, stores default to in-memory.
pub struct OrchestratorBuilder {
    config: PipConfig,
    completer: Option<Arc<dyn Completer>>,
    embedder: Option<Arc<dyn Embedder>>,
    knowledge: Option<Arc<dyn KnowledgeIndex>>,
    catalog: Option<Arc<dyn CatalogIndex>>,
    vision: Option<Arc<dyn VisionService>>,
    cellar: Option<Arc<dyn CellarStore>>,
    profiles: Option<Arc<dyn ProfileStore>>,
}

impl OrchestratorBuilder {
    pub fn new(config: PipConfig) -> Self {
        Self {
            config,
            completer: None,
            embedder: None,
            knowledge: None,
            catalog: None,
            vision: None,
            cellar: None,
            profiles: None,
        }
    }

    pub fn completer(mut self, completer: Arc<dyn Completer>) -> Self {
        self.completer = Some(completer);
        self
    }

    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn knowledge(mut self, knowledge: Arc<dyn KnowledgeIndex>) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    pub fn catalog(mut self, catalog: Arc<dyn CatalogIndex>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn vision(mut self, vision: Arc<dyn VisionService>) -> Self {
        self.vision = Some(vision);
        self
    }

    pub fn cellar_store(mut self, cellar: Arc<dyn CellarStore>) -> Self {
        self.cellar = Some(cellar);
        self
    }

    pub fn profile_store(mut self, profiles: Arc<dyn ProfileStore>) -> Self {
        self.profiles = Some(profiles);
        self
    }

    pub fn build(self) -> Result<Orchestrator, PipCoreError> {
        let completer = self
            .completer
            .ok_or(PipCoreError::MissingComponent("completer"))?;
        let embedder = self
            .embedder
            .ok_or(PipCoreError::MissingComponent("embedder"))?;
        let knowledge = self
            .knowledge
            .ok_or(PipCoreError::MissingComponent("knowledge index"))?;
        let catalog = self
            .catalog
            .ok_or(PipCoreError::MissingComponent("catalog index"))?;
        let cellar = self
            .cellar
            .unwrap_or_else(|| Arc::new(InMemoryCellarStore::new()));
        let profiles = self
            .profiles
            .unwrap_or_else(|| Arc::new(InMemoryProfileStore::new()));

        let recommender = &self.config.recommender;
        let classifier = IntentClassifier::new(completer.clone(), self.config.classifier.clone());
        let interpreter = PreferenceInterpreter::new(
            completer.clone(),
            embedder.clone(),
            knowledge.clone(),
            recommender.knowledge_top_k,
        );
        let searcher = WineSearcher::new(
            embedder.clone(),
            catalog.clone(),
            recommender.candidate_pool,
        );
        info!(
            "orchestrator ready (vision={}, top_n={}, history_window={})",
            self.vision.is_some(),
            recommender.top_n,
            self.config.assistant.history_window
        );
        Ok(Orchestrator {
            classifier,
            interpreter,
            searcher,
            completer,
            embedder,
            knowledge,
            catalog,
            vision: self.vision,
            cellar,
            profiles,
            config: self.config,
        })
    }
}
