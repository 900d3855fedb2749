//! Build orchestrator.
//!
//! Drives a `BuildSession` through
//! `planning -> collecting -> generating -> validating -> confirming -> creating -> done`
//! with the recoverable back-edges `validating -> collecting`,
//! `confirming -> generating` (edit) and `confirming -> collecting` (add).
//!
//! The orchestrator is the only caller of collaborators and, apart from
//! explicit user edits and rollbacks, the only writer to a session's store.
//! It suspends exactly when an interaction is pending: `drive` returns
//! `StepOutcome::Suspended` and the caller later answers through `respond`
//! or `cancel`, then drives again. Nothing is held in memory across a
//! suspension that is not also in the session snapshot.

pub mod collect;
pub mod transition;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use entrance_types::agent::RuntimeHandle;
use entrance_types::config::BuilderSettings;
use entrance_types::error::{BuildError, CollaboratorError, InteractionError};
use entrance_types::interaction::{
    ACTION_ADD, ACTION_CONFIRM, ACTION_EDIT, ACTION_SUBMIT, ConfirmAction, DisplayItem,
    InteractionAction, InteractionKind, InteractionRequest, InteractionResponse,
};
use entrance_types::patch::{ConfigPatch, PatchOp, PatchSource};
use entrance_types::path::{FieldPath, SkillField, ToolField};
use entrance_types::phase::BuildPhase;
use entrance_types::version::ConfigVersion;
use serde_json::Value;
use tracing::{Instrument, info_span};
use uuid::Uuid;

use crate::collaborator::{
    AgentCreator, ContentGenerator, GenerationRequest, GenerationTarget, QualityReviewer,
    SkillResolver, ToolCatalog,
};
use crate::diff::diff;
use crate::session::BuildSession;
use crate::store::apply_patch;
use crate::transcript::parse_sample_conversation;
use crate::validator::ConfigValidator;

pub use transition::{PhaseEvent, transition};

/// Result of one orchestrator step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// The session moved (or retried) and can keep going.
    Advanced(BuildPhase),
    /// Waiting on a human.
    Suspended(InteractionRequest),
    /// `done` or `failed`.
    Finished(BuildPhase),
}

pub struct Orchestrator<G, R, C> {
    generator: G,
    resolver: R,
    creator: C,
    catalog: Arc<dyn ToolCatalog>,
    validator: ConfigValidator,
    settings: BuilderSettings,
}

impl<G, R, C> Orchestrator<G, R, C>
where
    G: ContentGenerator,
    R: SkillResolver,
    C: AgentCreator,
{
    pub fn new(
        generator: G,
        resolver: R,
        creator: C,
        catalog: Arc<dyn ToolCatalog>,
        settings: BuilderSettings,
    ) -> Self {
        let validator = ConfigValidator::new(&settings, Arc::clone(&catalog));
        Self {
            generator,
            resolver,
            creator,
            catalog,
            validator,
            settings,
        }
    }

    pub fn with_reviewer(mut self, reviewer: Arc<dyn QualityReviewer>) -> Self {
        self.validator = self.validator.with_reviewer(reviewer);
        self
    }

    pub fn settings(&self) -> &BuilderSettings {
        &self.settings
    }

    pub fn validator(&self) -> &ConfigValidator {
        &self.validator
    }

    pub fn catalog(&self) -> &Arc<dyn ToolCatalog> {
        &self.catalog
    }

    pub fn creator(&self) -> &C {
        &self.creator
    }

    /// Start a new session for `goal`.
    pub fn start(&self, goal: impl Into<String>) -> BuildSession {
        let session = BuildSession::new(goal);
        tracing::info!(session_id = %session.session_id, goal = %session.goal, "build session started");
        session
    }

    /// Step until the session suspends or finishes.
    pub async fn drive(&self, session: &mut BuildSession) -> Result<StepOutcome, BuildError> {
        self.expire_stale(session)?;
        loop {
            match self.step(session).await? {
                StepOutcome::Advanced(_) => continue,
                outcome => return Ok(outcome),
            }
        }
    }

    /// Run one attempt of the current phase.
    pub async fn step(&self, session: &mut BuildSession) -> Result<StepOutcome, BuildError> {
        if session.is_terminal() {
            return Ok(StepOutcome::Finished(session.phase));
        }
        if let Some(pending) = session.broker.pending() {
            return Ok(StepOutcome::Suspended(pending.clone()));
        }

        let span = info_span!(
            "build_step",
            session_id = %session.session_id,
            phase = %session.phase,
        );
        async move {
            match session.phase {
                BuildPhase::Planning => self.plan(session).await,
                BuildPhase::Collecting => self.collect(session),
                BuildPhase::Generating => self.generate(session).await,
                BuildPhase::Validating => self.validate(session),
                BuildPhase::Confirming => self.confirm(session),
                BuildPhase::Creating => self.create(session).await,
                BuildPhase::Done | BuildPhase::Failed => Ok(StepOutcome::Finished(session.phase)),
            }
        }
        .instrument(span)
        .await
    }

    // -----------------------------------------------------------------------
    // Resuming a suspended session
    // -----------------------------------------------------------------------

    /// Answer the pending interaction and take the resulting transition.
    ///
    /// A payload that would not apply cleanly is rejected before the
    /// interaction is consumed, so the caller can simply answer again.
    pub fn respond(
        &self,
        session: &mut BuildSession,
        interaction_id: Uuid,
        action_id: &str,
        data: Option<&Value>,
    ) -> Result<BuildPhase, BuildError> {
        self.ensure_active(session)?;
        let response = session
            .broker
            .parse_response(interaction_id, action_id, data)?;

        let (patch, event) = match (session.phase, response) {
            (BuildPhase::Collecting, InteractionResponse::Information { patch }) => {
                let patch = collect::with_slots(session.store.document(), patch);
                (patch, None)
            }
            (BuildPhase::Confirming, InteractionResponse::Confirmation(result)) => {
                if result.action == ConfirmAction::Confirm && !result.overrides.is_empty() {
                    return Err(InteractionError::MalformedResponse(
                        "confirm does not take field changes; use edit".to_string(),
                    )
                    .into());
                }
                let event = match result.action {
                    ConfirmAction::Confirm => PhaseEvent::Confirmed,
                    ConfirmAction::Edit => PhaseEvent::EditRequested,
                    ConfirmAction::Add => PhaseEvent::AddRequested,
                };
                let patch = collect::with_slots(session.store.document(), result.overrides);
                (patch, Some(event))
            }
            (phase, _) => {
                return Err(BuildError::InvalidTransition {
                    from: phase,
                    event: "interaction response".to_string(),
                });
            }
        };

        // Dry run first: a bad answer must leave the request pending.
        let supplied = !patch.is_empty();
        if supplied {
            let drafted = apply_patch(session.store.document(), &patch)?;
            self.check_skill_limit(session.store.document().skills.len(), drafted.skills.len())?;
        }
        session.broker.complete(interaction_id)?;
        if session.phase == BuildPhase::Confirming {
            session.last_confirmed_version = Some(session.store.current_sequence());
        }
        if supplied {
            session.store.apply_patch(patch, PatchSource::User)?;
        }

        let event = match event {
            Some(PhaseEvent::AddRequested) if !supplied => {
                // Nothing supplied: ask for the next tool slot.
                session.flagged = vec![next_tool_slot(session)];
                PhaseEvent::AddRequested
            }
            Some(event) => event,
            None => {
                session.flagged.clear();
                if collect::missing_fields(session.store.document(), &[]).is_empty() {
                    PhaseEvent::FieldsComplete
                } else {
                    PhaseEvent::FieldsMissing
                }
            }
        };
        self.advance(session, event)
    }

    /// Reject answers that would bind more skills than validation allows.
    ///
    /// Collecting can only ask for single fields, so an over-limit skill
    /// list accepted here could never be answered away.
    fn check_skill_limit(&self, before: usize, after: usize) -> Result<(), BuildError> {
        let max = self.validator.max_skills();
        if after > max && after > before {
            return Err(InteractionError::MalformedResponse(format!(
                "at most {max} skill(s) may be bound; add tools to an existing skill instead"
            ))
            .into());
        }
        Ok(())
    }

    /// Cancel the pending interaction. Recoverable until the interaction
    /// retry limit is reached.
    pub fn cancel(
        &self,
        session: &mut BuildSession,
        interaction_id: Uuid,
    ) -> Result<BuildPhase, BuildError> {
        self.ensure_active(session)?;
        session.broker.cancel(interaction_id)?;
        self.interaction_aborted(session, "cancelled")
    }

    /// Expire the pending interaction if it outlived the configured timeout.
    pub fn expire_stale(&self, session: &mut BuildSession) -> Result<bool, BuildError> {
        let Some(pending) = session.broker.pending() else {
            return Ok(false);
        };
        let interaction_id = pending.interaction_id;
        let after = TimeDelta::seconds(
            i64::try_from(self.settings.interaction_timeout_secs).unwrap_or(i64::MAX),
        );
        if !session.broker.expire(interaction_id, after)? {
            return Ok(false);
        }
        self.interaction_aborted(session, "expired")?;
        Ok(true)
    }

    /// Roll the document back to `target` and re-enter collecting.
    ///
    /// Any pending interaction described the old document, so it is
    /// withdrawn without counting against the retry limit.
    pub fn rollback(
        &self,
        session: &mut BuildSession,
        target: u64,
    ) -> Result<ConfigVersion, BuildError> {
        self.ensure_active(session)?;
        let version = session.store.rollback(target)?.clone();
        if let Some(pending) = session.broker.pending() {
            let interaction_id = pending.interaction_id;
            session.broker.cancel(interaction_id)?;
        }
        session.flagged.clear();
        self.advance(session, PhaseEvent::RolledBack)?;
        Ok(version)
    }

    // -----------------------------------------------------------------------
    // Phases
    // -----------------------------------------------------------------------

    async fn plan(&self, session: &mut BuildSession) -> Result<StepOutcome, BuildError> {
        // The name is committed on its own before any other planning work.
        if session.store.document().name.trim().is_empty() {
            let name = match self.draft(session, GenerationTarget::AgentName, Vec::new()).await {
                Ok(patch) => patch,
                Err(err) => return self.collaborator_failed(session, err),
            };
            if let Err(err) = self.commit_generated(session, name, PatchSource::Planning) {
                return self.collaborator_failed(session, err);
            }
        }

        let plan = match self.draft(session, GenerationTarget::Plan, Vec::new()).await {
            Ok(patch) => patch,
            Err(err) => return self.collaborator_failed(session, err),
        };
        if let Err(err) = self.commit_generated(session, plan, PatchSource::Planning) {
            return self.collaborator_failed(session, err);
        }

        session.counters.generation_failures = 0;
        let phase = self.advance(session, PhaseEvent::Planned)?;
        Ok(StepOutcome::Advanced(phase))
    }

    fn collect(&self, session: &mut BuildSession) -> Result<StepOutcome, BuildError> {
        let missing = collect::missing_fields(session.store.document(), &session.flagged);
        if missing.is_empty() {
            session.flagged.clear();
            let phase = self.advance(session, PhaseEvent::FieldsComplete)?;
            return Ok(StepOutcome::Advanced(phase));
        }

        let items = missing
            .into_iter()
            .map(|path| {
                let hint = self.field_hint(session, &path);
                DisplayItem::field(path, hint)
            })
            .collect();
        let failed_validation = session
            .last_report
            .as_ref()
            .is_some_and(|report| !report.is_passing());
        let message = if failed_validation && !session.flagged.is_empty() {
            "Some fields did not pass validation. Please correct them."
        } else {
            "A few details are needed before the agent can be drafted."
        };
        let request = session.broker.request(
            InteractionKind::InformationRequest,
            "Missing details",
            message,
            items,
            vec![InteractionAction::new(ACTION_SUBMIT, "Submit", true)],
        )?;
        session.touch();
        Ok(StepOutcome::Suspended(request))
    }

    async fn generate(&self, session: &mut BuildSession) -> Result<StepOutcome, BuildError> {
        let doc = session.store.document().clone();
        let mut patch = ConfigPatch::new();

        let fields = collect::draftable_fields(&doc);
        if !fields.is_empty() {
            match self.draft(session, GenerationTarget::Content, fields.clone()).await {
                Ok(drafted) => patch.extend(collect::restrict_to(drafted, &fields)),
                Err(err) => return self.collaborator_failed(session, err),
            }
        }

        for (i, skill) in doc.skills.iter().enumerate() {
            if skill.tools.is_empty() {
                let requirement = if skill.when_to_use.trim().is_empty() {
                    &skill.name
                } else {
                    &skill.when_to_use
                };
                let bindings = match self
                    .bounded("skill resolver", self.resolver.resolve(requirement))
                    .await
                {
                    Ok(bindings) => bindings,
                    Err(err) => return self.collaborator_failed(session, err),
                };
                let mut seen: Vec<String> = Vec::new();
                for tool in bindings {
                    if !seen.contains(&tool.tool_id) {
                        seen.push(tool.tool_id.clone());
                        patch = patch.with(PatchOp::AppendTool { skill: i, tool });
                    }
                }
            } else {
                // Bindings added by hand may carry only an id.
                for (j, tool) in skill.tools.iter().enumerate() {
                    if tool.name.trim().is_empty() {
                        if let Some(entry) = self.catalog.lookup(&tool.tool_id) {
                            patch = patch.set(FieldPath::tool(i, j, ToolField::Name), entry.name);
                        }
                    }
                }
            }
        }

        if let Err(err) = self.commit_generated(session, patch, PatchSource::Generating) {
            return self.collaborator_failed(session, err);
        }

        let sample = self
            .bounded(
                "content generator",
                self.generator.sample_conversation(session.store.document()),
            )
            .await;
        match sample {
            Ok(Some(markdown)) => {
                session.sample_conversation = parse_sample_conversation(&markdown);
            }
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "sample conversation unavailable"),
        }

        session.counters.generation_failures = 0;
        let phase = self.advance(session, PhaseEvent::Generated)?;
        Ok(StepOutcome::Advanced(phase))
    }

    fn validate(&self, session: &mut BuildSession) -> Result<StepOutcome, BuildError> {
        let report = self.validator.validate(session.store.document());
        for warning in report.warnings() {
            tracing::debug!(path = %warning.path, message = %warning.message, "validation warning");
        }

        let event = if report.is_passing() {
            session.counters.validation_failures = 0;
            session.flagged.clear();
            PhaseEvent::ValidationPassed
        } else {
            session.counters.validation_failures += 1;
            let attempts = session.counters.validation_failures;
            let exhausted = attempts >= self.settings.max_validation_retries;
            session.flagged = report.error_paths();
            tracing::warn!(
                errors = report.error_count(),
                attempts,
                exhausted,
                "validation failed"
            );
            if exhausted {
                let first = report
                    .errors()
                    .next()
                    .map(|f| f.to_string())
                    .unwrap_or_default();
                session.failure = Some(format!(
                    "validation failed {attempts} times; last error: {first}"
                ));
            }
            PhaseEvent::ValidationFailed { exhausted }
        };
        session.last_report = Some(report);

        let phase = self.advance(session, event)?;
        Ok(self.outcome(phase))
    }

    fn confirm(&self, session: &mut BuildSession) -> Result<StepOutcome, BuildError> {
        let store = &session.store;
        let base = session
            .last_confirmed_version
            .and_then(|seq| store.version(seq))
            .or_else(|| store.version(0))
            .map(|v| v.document.clone())
            .unwrap_or_default();

        let mut items: Vec<DisplayItem> = diff(&base, store.document())
            .into_iter()
            .map(|change| DisplayItem::note(change.path.to_string(), change.describe()))
            .collect();
        if items.is_empty() {
            items.push(DisplayItem::note("changes", "none since last review"));
        }
        for turn in &session.sample_conversation {
            items.push(DisplayItem::note(turn.speaker.to_string(), turn.text.clone()));
        }

        let message = format!(
            "Review version {} of '{}'. Confirm to create the agent, edit to adjust and regenerate, or add more.",
            store.current_sequence(),
            store.document().name
        );
        let request = session.broker.request(
            InteractionKind::Confirmation,
            "Confirm configuration",
            message,
            items,
            vec![
                InteractionAction::new(ACTION_CONFIRM, "Create agent", true),
                InteractionAction::new(ACTION_EDIT, "Continue editing", false),
                InteractionAction::new(ACTION_ADD, "Add more", false),
            ],
        )?;
        session.touch();
        Ok(StepOutcome::Suspended(request))
    }

    async fn create(&self, session: &mut BuildSession) -> Result<StepOutcome, BuildError> {
        let result = self
            .bounded(
                "agent creator",
                self.creator.instantiate(session.store.document()),
            )
            .await;

        let event = match result {
            Ok(handle) => {
                self.record_runtime(session, handle);
                PhaseEvent::Created
            }
            Err(err) => {
                session.counters.creation_failures += 1;
                let attempts = session.counters.creation_failures;
                let exhausted = attempts >= self.settings.max_creation_retries;
                tracing::warn!(error = %err, attempts, exhausted, "agent creation failed");
                if exhausted {
                    session.failure = Some(err.to_string());
                }
                PhaseEvent::CreationFailed { exhausted }
            }
        };
        let phase = self.advance(session, event)?;
        Ok(self.outcome(phase))
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn advance(&self, session: &mut BuildSession, event: PhaseEvent) -> Result<BuildPhase, BuildError> {
        let from = session.phase;
        let to = transition(from, event)?;
        session.phase = to;
        session.touch();

        if to == BuildPhase::Failed {
            tracing::error!(
                session_id = %session.session_id,
                %from,
                %event,
                reason = session.failure.as_deref().unwrap_or("unknown"),
                "build failed"
            );
        } else if from != to {
            tracing::info!(
                session_id = %session.session_id,
                %from,
                %to,
                %event,
                version = session.store.current_sequence(),
                "phase transition"
            );
        }
        Ok(to)
    }

    fn outcome(&self, phase: BuildPhase) -> StepOutcome {
        if phase.is_terminal() {
            StepOutcome::Finished(phase)
        } else {
            StepOutcome::Advanced(phase)
        }
    }

    fn ensure_active(&self, session: &BuildSession) -> Result<(), BuildError> {
        if session.is_terminal() {
            return Err(BuildError::Terminal {
                phase: session.phase,
            });
        }
        Ok(())
    }

    async fn draft(
        &self,
        session: &BuildSession,
        target: GenerationTarget,
        fields: Vec<FieldPath>,
    ) -> Result<ConfigPatch, CollaboratorError> {
        let request = GenerationRequest {
            target,
            goal: session.goal.clone(),
            document: session.store.document().clone(),
            fields,
        };
        self.bounded("content generator", self.generator.generate(&request))
            .await
    }

    /// Apply a collaborator-produced patch. A patch that does not apply is
    /// the collaborator's failure, not a caller error.
    fn commit_generated(
        &self,
        session: &mut BuildSession,
        patch: ConfigPatch,
        source: PatchSource,
    ) -> Result<(), CollaboratorError> {
        if patch.is_empty() {
            return Ok(());
        }
        session
            .store
            .apply_patch(patch, source)
            .map(|_| ())
            .map_err(|e| CollaboratorError::Generation(e.to_string()))
    }

    /// Await a collaborator call under the configured timeout.
    async fn bounded<T>(
        &self,
        collaborator: &'static str,
        call: impl Future<Output = Result<T, CollaboratorError>>,
    ) -> Result<T, CollaboratorError> {
        let secs = self.settings.collaborator_timeout_secs;
        match tokio::time::timeout(Duration::from_secs(secs), call).await {
            Ok(result) => result,
            Err(_) => Err(CollaboratorError::Timeout {
                collaborator,
                after_secs: secs,
            }),
        }
    }

    fn collaborator_failed(
        &self,
        session: &mut BuildSession,
        err: CollaboratorError,
    ) -> Result<StepOutcome, BuildError> {
        session.counters.generation_failures += 1;
        let attempts = session.counters.generation_failures;
        let exhausted = attempts >= self.settings.max_generation_retries;
        tracing::warn!(error = %err, attempts, exhausted, "collaborator call failed");
        if exhausted {
            session.failure = Some(err.to_string());
        }
        let phase = self.advance(session, PhaseEvent::CollaboratorFailed { exhausted })?;
        Ok(self.outcome(phase))
    }

    fn interaction_aborted(
        &self,
        session: &mut BuildSession,
        how: &str,
    ) -> Result<BuildPhase, BuildError> {
        session.counters.interaction_failures += 1;
        let attempts = session.counters.interaction_failures;
        let exhausted = attempts >= self.settings.max_interaction_retries;
        tracing::warn!(attempts, exhausted, "interaction {how}");
        if exhausted {
            session.failure = Some(format!("interaction {how} {attempts} times"));
        }
        self.advance(session, PhaseEvent::InteractionAborted { exhausted })
    }

    fn record_runtime(&self, session: &mut BuildSession, handle: RuntimeHandle) {
        tracing::info!(
            session_id = %session.session_id,
            agent_id = %handle.agent_id,
            name = %handle.name,
            "agent created"
        );
        session.runtime = Some(handle);
    }

    fn field_hint(&self, session: &BuildSession, path: &FieldPath) -> String {
        if let Some(report) = &session.last_report {
            if let Some(finding) = report.errors().find(|f| &f.path == path) {
                return finding.message.clone();
            }
        }
        match path {
            FieldPath::Skill(_, SkillField::Tool(_, ToolField::ToolId)) => {
                let ids: Vec<String> = self.catalog.list().into_iter().map(|t| t.tool_id).collect();
                format!("one of: {}", ids.join(", "))
            }
            FieldPath::Skill(_, SkillField::WhenToUse) => {
                "when should this skill handle a user message?".to_string()
            }
            _ => String::new(),
        }
    }
}

/// Path of the tool slot one past the end of the primary skill.
fn next_tool_slot(session: &BuildSession) -> FieldPath {
    let tools = session
        .store
        .document()
        .primary_skill()
        .map(|s| s.tools.len())
        .unwrap_or_default();
    FieldPath::tool(0, tools, ToolField::ToolId)
}
