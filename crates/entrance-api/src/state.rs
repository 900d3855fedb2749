//! Application state wiring all services together.
//!
//! AppState holds the orchestrator and session repository used by both the
//! CLI and the REST API. The orchestrator is generic over its collaborators;
//! AppState pins it to the concrete infra implementations.
//!
//! Every session operation follows the same cycle: lock the session, load
//! and rehydrate it, apply the operation, drive until it suspends or
//! finishes, then save. Nothing lives in memory between requests.

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use entrance_core::collaborator::ToolCatalog;
use entrance_core::orchestrator::Orchestrator;
use entrance_core::repository::SessionRepository;
use entrance_core::session::{BuildSession, StoredSession};
use entrance_infra::catalog::StaticToolCatalog;
use entrance_infra::config::{load_config, resolve_data_dir};
use entrance_infra::creator::MockAgentCreator;
use entrance_infra::generator::TemplateContentGenerator;
use entrance_infra::memory::InMemorySessionRepository;
use entrance_infra::resolver::CatalogSkillResolver;
use entrance_infra::reviewer::HeuristicReviewer;
use entrance_infra::sqlite::pool::{DatabasePool, database_url};
use entrance_infra::sqlite::session::SqliteSessionRepository;
use entrance_types::agent::{AgentConfiguration, RuntimeHandle};
use entrance_types::config::GlobalConfig;
use entrance_types::error::{BuildError, RepositoryError, StoreError};
use entrance_types::interaction::InteractionRequest;
use entrance_types::phase::BuildPhase;
use entrance_types::session::{RetryCounters, SampleTurn, SessionSummary};
use entrance_types::validation::ValidationReport;
use entrance_types::version::{ConfigVersion, VersionSummary};

/// Orchestrator pinned to the infra collaborators.
pub type ConcreteOrchestrator =
    Orchestrator<TemplateContentGenerator, CatalogSkillResolver, MockAgentCreator>;

// ---------------------------------------------------------------------------
// Session storage
// ---------------------------------------------------------------------------

/// The session repository in use: SQLite, or in-memory for `serve --ephemeral`
/// and tests.
pub enum SessionStore {
    Sqlite(SqliteSessionRepository),
    Memory(InMemorySessionRepository),
}

impl SessionRepository for SessionStore {
    async fn save(&self, session: &StoredSession) -> Result<(), RepositoryError> {
        match self {
            Self::Sqlite(repo) => repo.save(session).await,
            Self::Memory(repo) => repo.save(session).await,
        }
    }

    async fn load(&self, session_id: &Uuid) -> Result<Option<StoredSession>, RepositoryError> {
        match self {
            Self::Sqlite(repo) => repo.load(session_id).await,
            Self::Memory(repo) => repo.load(session_id).await,
        }
    }

    async fn list(&self) -> Result<Vec<SessionSummary>, RepositoryError> {
        match self {
            Self::Sqlite(repo) => repo.list().await,
            Self::Memory(repo) => repo.list().await,
        }
    }

    async fn delete(&self, session_id: &Uuid) -> Result<bool, RepositoryError> {
        match self {
            Self::Sqlite(repo) => repo.delete(session_id).await,
            Self::Memory(repo) => repo.delete(session_id).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors and views
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("stored session is unreadable: {0}")]
    Corrupt(#[from] StoreError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// What clients see of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub goal: String,
    pub phase: BuildPhase,
    pub current_version: u64,
    pub document: AgentConfiguration,
    pub pending_interaction: Option<InteractionRequest>,
    pub counters: RetryCounters,
    pub last_report: Option<ValidationReport>,
    pub sample_conversation: Vec<SampleTurn>,
    pub runtime: Option<RuntimeHandle>,
    pub failure: Option<String>,
}

impl From<&BuildSession> for SessionView {
    fn from(session: &BuildSession) -> Self {
        Self {
            session_id: session.session_id,
            goal: session.goal.clone(),
            phase: session.phase,
            current_version: session.store.current_sequence(),
            document: session.store.document().clone(),
            pending_interaction: session.broker.pending().cloned(),
            counters: session.counters,
            last_report: session.last_report.clone(),
            sample_conversation: session.sample_conversation.clone(),
            runtime: session.runtime.clone(),
            failure: session.failure.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Shared application state holding all services.
///
/// Used by both CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ConcreteOrchestrator>,
    pub sessions: Arc<SessionStore>,
    pub catalog: Arc<dyn ToolCatalog>,
    pub data_dir: PathBuf,
    locks: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl AppState {
    /// Initialize the application state: load config, connect to DB, wire services.
    ///
    /// With `ephemeral`, sessions are kept in memory only.
    pub async fn init(ephemeral: bool) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();

        // Ensure data directory exists
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_config(&data_dir).await;

        let sessions = if ephemeral {
            SessionStore::Memory(InMemorySessionRepository::new())
        } else {
            let db_pool = DatabasePool::new(&database_url(&data_dir)).await?;
            SessionStore::Sqlite(SqliteSessionRepository::new(db_pool))
        };

        Ok(Self::with_parts(config, sessions, data_dir))
    }

    /// Wire the services around an already loaded config and store.
    pub fn with_parts(config: GlobalConfig, sessions: SessionStore, data_dir: PathBuf) -> Self {
        let catalog: Arc<dyn ToolCatalog> =
            Arc::new(StaticToolCatalog::with_extras(config.tools.clone()));

        let orchestrator = Orchestrator::new(
            TemplateContentGenerator::new(),
            CatalogSkillResolver::new(Arc::clone(&catalog)),
            MockAgentCreator::new(),
            Arc::clone(&catalog),
            config.builder.clone(),
        )
        .with_reviewer(Arc::new(HeuristicReviewer));

        Self {
            orchestrator: Arc::new(orchestrator),
            sessions: Arc::new(sessions),
            catalog,
            data_dir,
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Per-session lock serializing mutations of one session.
    fn lock_for(&self, session_id: Uuid) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.entry(session_id).or_default().value())
    }

    /// Drop the session's lock entry unless another caller still holds it.
    ///
    /// Called once a session is missing, deleted or finished, so the map
    /// only holds locks for sessions that can still change.
    fn release_lock(&self, session_id: Uuid, lock: Arc<Mutex<()>>) {
        drop(lock);
        self.locks
            .remove_if(&session_id, |_, held| Arc::strong_count(held) == 1);
    }

    fn release_if_settled(
        &self,
        session_id: Uuid,
        lock: Arc<Mutex<()>>,
        result: &Result<BuildSession, SessionError>,
    ) {
        let settled = match result {
            Ok(session) => session.is_terminal(),
            Err(SessionError::NotFound(_)) | Err(SessionError::Build(BuildError::Terminal { .. })) => {
                true
            }
            Err(_) => false,
        };
        if settled {
            self.release_lock(session_id, lock);
        }
    }

    pub async fn load_session(&self, session_id: Uuid) -> Result<BuildSession, SessionError> {
        let stored = self
            .sessions
            .load(&session_id)
            .await?
            .ok_or(SessionError::NotFound(session_id))?;
        Ok(BuildSession::rehydrate(stored)?)
    }

    /// Start a session for `goal` and drive it to its first suspension.
    pub async fn start_session(&self, goal: &str) -> Result<BuildSession, SessionError> {
        let mut session = self.orchestrator.start(goal);
        let session_id = session.session_id;
        let lock = self.lock_for(session_id);
        let result = {
            let _guard = lock.lock().await;
            self.start_locked(&mut session).await.map(|()| session)
        };
        self.release_if_settled(session_id, lock, &result);
        result
    }

    async fn start_locked(&self, session: &mut BuildSession) -> Result<(), SessionError> {
        // Persist before driving so a crash mid-planning leaves a resumable session.
        self.sessions.save(&session.to_stored()).await?;
        let driven = self.orchestrator.drive(session).await;
        self.sessions.save(&session.to_stored()).await?;
        driven?;
        Ok(())
    }

    /// Drive an existing session (expiring a stale interaction first).
    pub async fn resume_session(&self, session_id: Uuid) -> Result<BuildSession, SessionError> {
        self.mutate(session_id, |_, _| Ok(())).await
    }

    pub async fn respond(
        &self,
        session_id: Uuid,
        interaction_id: Uuid,
        action_id: &str,
        data: Option<&Value>,
    ) -> Result<BuildSession, SessionError> {
        self.mutate(session_id, |orchestrator, session| {
            orchestrator
                .respond(session, interaction_id, action_id, data)
                .map(|_| ())
        })
        .await
    }

    pub async fn cancel(
        &self,
        session_id: Uuid,
        interaction_id: Uuid,
    ) -> Result<BuildSession, SessionError> {
        self.mutate(session_id, |orchestrator, session| {
            orchestrator.cancel(session, interaction_id).map(|_| ())
        })
        .await
    }

    pub async fn rollback(&self, session_id: Uuid, target: u64) -> Result<BuildSession, SessionError> {
        self.mutate(session_id, |orchestrator, session| {
            orchestrator.rollback(session, target).map(|_| ())
        })
        .await
    }

    pub async fn history(&self, session_id: Uuid) -> Result<Vec<ConfigVersion>, SessionError> {
        let session = self.load_session(session_id).await?;
        Ok(session.store.history().to_vec())
    }

    pub async fn history_summaries(
        &self,
        session_id: Uuid,
    ) -> Result<Vec<VersionSummary>, SessionError> {
        let session = self.load_session(session_id).await?;
        Ok(session.store.summaries())
    }

    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>, SessionError> {
        Ok(self.sessions.list().await?)
    }

    pub async fn delete_session(&self, session_id: Uuid) -> Result<bool, SessionError> {
        let lock = self.lock_for(session_id);
        let deleted = {
            let _guard = lock.lock().await;
            self.sessions.delete(&session_id).await
        };
        self.release_lock(session_id, lock);
        Ok(deleted?)
    }

    pub fn validate(&self, document: &AgentConfiguration) -> ValidationReport {
        self.orchestrator.validator().validate(document)
    }

    /// Load, apply `op`, drive and save, under the session's lock.
    ///
    /// A rejected operation leaves the stored session untouched.
    async fn mutate<F>(&self, session_id: Uuid, op: F) -> Result<BuildSession, SessionError>
    where
        F: FnOnce(&ConcreteOrchestrator, &mut BuildSession) -> Result<(), BuildError>,
    {
        let lock = self.lock_for(session_id);
        let result = {
            let _guard = lock.lock().await;
            self.mutate_locked(session_id, op).await
        };
        self.release_if_settled(session_id, lock, &result);
        result
    }

    async fn mutate_locked<F>(&self, session_id: Uuid, op: F) -> Result<BuildSession, SessionError>
    where
        F: FnOnce(&ConcreteOrchestrator, &mut BuildSession) -> Result<(), BuildError>,
    {
        let mut session = self.load_session(session_id).await?;
        op(&self.orchestrator, &mut session)?;
        let driven = if session.is_terminal() {
            Ok(())
        } else {
            self.orchestrator.drive(&mut session).await.map(|_| ())
        };
        self.sessions.save(&session.to_stored()).await?;
        driven?;
        Ok(session)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use entrance_types::interaction::{
        ACTION_CONFIRM, ACTION_SUBMIT, InteractionKind,
    };
    use serde_json::json;

    pub(crate) fn test_state() -> AppState {
        AppState::with_parts(
            GlobalConfig::default(),
            SessionStore::Memory(InMemorySessionRepository::new()),
            PathBuf::from("."),
        )
    }

    fn pending(session: &BuildSession) -> InteractionRequest {
        session.broker.pending().cloned().unwrap()
    }

    #[tokio::test]
    async fn full_build_with_template_collaborators() {
        let state = test_state();

        let session = state
            .start_session("I run a hotel and want help with bookings")
            .await
            .unwrap();
        assert_eq!(session.phase, BuildPhase::Collecting);
        assert_eq!(session.store.document().name, "Hotel Assistant");
        let ask = pending(&session);
        assert_eq!(
            ask.requested_paths().map(|p| p.to_string()).collect::<Vec<_>>(),
            vec!["skills[0].when_to_use"]
        );

        // Booking binds the calendar, which then needs its calendar id.
        let session = state
            .respond(
                session.session_id,
                ask.interaction_id,
                ACTION_SUBMIT,
                Some(&json!({"skills[0].when_to_use": "When a guest wants to book a room"})),
            )
            .await
            .unwrap();
        let ask = pending(&session);
        assert_eq!(
            ask.requested_paths().map(|p| p.to_string()).collect::<Vec<_>>(),
            vec!["skills[0].tools[0].config.calendar_id"]
        );

        let session = state
            .respond(
                session.session_id,
                ask.interaction_id,
                ACTION_SUBMIT,
                Some(&json!({"skills[0].tools[0].config.calendar_id": "front-desk"})),
            )
            .await
            .unwrap();
        let confirm = pending(&session);
        assert_eq!(confirm.kind, InteractionKind::Confirmation);
        assert_eq!(session.phase, BuildPhase::Confirming);

        let session = state
            .respond(session.session_id, confirm.interaction_id, ACTION_CONFIRM, None)
            .await
            .unwrap();
        assert_eq!(session.phase, BuildPhase::Done);

        let runtime = session.runtime.as_ref().unwrap();
        let agent = state.orchestrator.creator().agent(&runtime.agent_id).unwrap();
        let answer = agent.call(&runtime.entrypoints[0], "two nights").unwrap();
        assert_eq!(
            answer,
            "[Mock Response from google_calendar] Successfully processed: two nights"
        );

        let listed = state.list_sessions().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].archived);
        assert!(state.locks.is_empty());
    }

    #[tokio::test]
    async fn rejected_answer_leaves_stored_session_untouched() {
        let state = test_state();
        let session = state.start_session("hotel bookings").await.unwrap();
        let ask = pending(&session);
        let before = state.load_session(session.session_id).await.unwrap();

        let err = state
            .respond(
                session.session_id,
                ask.interaction_id,
                ACTION_SUBMIT,
                Some(&json!({"skills[0].when_to_use": 42})),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Build(BuildError::Store(_))));

        let after = state.load_session(session.session_id).await.unwrap();
        assert_eq!(after.snapshot(), before.snapshot());
    }

    #[tokio::test]
    async fn rollback_is_persisted_with_history() {
        let state = test_state();
        let session = state.start_session("hotel bookings").await.unwrap();
        let versions = session.store.len();

        let session = state.rollback(session.session_id, 1).await.unwrap();
        assert_eq!(session.store.len(), versions + 1);
        assert_eq!(session.phase, BuildPhase::Collecting);

        let summaries = state.history_summaries(session.session_id).await.unwrap();
        assert_eq!(summaries.last().unwrap().change, "rollback to version 1");
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let state = test_state();
        let id = Uuid::now_v7();
        assert!(matches!(
            state.resume_session(id).await.unwrap_err(),
            SessionError::NotFound(missing) if missing == id
        ));
        assert!(!state.delete_session(id).await.unwrap());
        assert!(state.locks.is_empty());
    }

    #[tokio::test]
    async fn locks_are_kept_only_for_live_sessions() {
        let state = test_state();
        for _ in 0..3 {
            let _ = state.cancel(Uuid::now_v7(), Uuid::now_v7()).await;
        }
        assert!(state.locks.is_empty());

        let session = state.start_session("hotel bookings").await.unwrap();
        assert_eq!(state.locks.len(), 1);
        let ask = pending(&session);
        state
            .respond(
                session.session_id,
                ask.interaction_id,
                ACTION_SUBMIT,
                Some(&json!({"skills[0].when_to_use": "When a guest wants to book a room"})),
            )
            .await
            .unwrap();
        assert_eq!(state.locks.len(), 1);

        assert!(state.delete_session(session.session_id).await.unwrap());
        assert!(state.locks.is_empty());
    }

    #[tokio::test]
    async fn held_lock_survives_release() {
        let state = test_state();
        let id = Uuid::now_v7();
        let held = state.lock_for(id);
        state.release_lock(id, state.lock_for(id));
        assert_eq!(state.locks.len(), 1);

        state.release_lock(id, held);
        assert!(state.locks.is_empty());
    }
}
