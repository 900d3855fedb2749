//! Build sessions.
//!
//! A `BuildSession` owns one configuration store, one phase cursor and the
//! interaction broker holding its (zero or one) pending request. It is
//! persisted as a `SessionSnapshot` plus the store's version history and can
//! be rehydrated from exactly that.

use chrono::{DateTime, Utc};
use entrance_types::agent::RuntimeHandle;
use entrance_types::error::StoreError;
use entrance_types::path::FieldPath;
use entrance_types::phase::BuildPhase;
use entrance_types::session::{RetryCounters, SampleTurn, SessionSnapshot, SessionSummary};
use entrance_types::validation::ValidationReport;
use entrance_types::version::ConfigVersion;
use uuid::Uuid;

use crate::interaction::InteractionBroker;
use crate::store::ConfigurationStore;

/// A persisted session: snapshot plus full version history.
#[derive(Debug, Clone)]
pub struct StoredSession {
    pub snapshot: SessionSnapshot,
    pub history: Vec<ConfigVersion>,
}

#[derive(Debug, Clone)]
pub struct BuildSession {
    pub session_id: Uuid,
    pub goal: String,
    pub phase: BuildPhase,
    pub store: ConfigurationStore,
    pub broker: InteractionBroker,
    pub counters: RetryCounters,
    pub flagged: Vec<FieldPath>,
    pub last_report: Option<ValidationReport>,
    pub last_confirmed_version: Option<u64>,
    pub sample_conversation: Vec<SampleTurn>,
    pub runtime: Option<RuntimeHandle>,
    pub failure: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BuildSession {
    /// A fresh session in `planning` with an empty document.
    pub fn new(goal: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::now_v7(),
            goal: goal.into(),
            phase: BuildPhase::Planning,
            store: ConfigurationStore::new(),
            broker: InteractionBroker::new(),
            counters: RetryCounters::default(),
            flagged: Vec::new(),
            last_report: None,
            last_confirmed_version: None,
            sample_conversation: Vec::new(),
            runtime: None,
            failure: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id,
            goal: self.goal.clone(),
            phase: self.phase,
            current_version: self.store.current_sequence(),
            pending_interaction: self.broker.pending().cloned(),
            counters: self.counters,
            flagged: self.flagged.clone(),
            last_report: self.last_report.clone(),
            last_confirmed_version: self.last_confirmed_version,
            sample_conversation: self.sample_conversation.clone(),
            runtime: self.runtime.clone(),
            failure: self.failure.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id,
            goal: self.goal.clone(),
            agent_name: self.store.document().name.clone(),
            phase: self.phase,
            current_version: self.store.current_sequence(),
            archived: self.is_terminal(),
            updated_at: self.updated_at,
        }
    }

    pub fn to_stored(&self) -> StoredSession {
        StoredSession {
            snapshot: self.snapshot(),
            history: self.store.history().to_vec(),
        }
    }

    /// Rebuild a session from its snapshot and version history.
    ///
    /// The history must replay to its stored documents and end at the
    /// snapshot's `current_version`.
    pub fn rehydrate(stored: StoredSession) -> Result<Self, StoreError> {
        let StoredSession { snapshot, history } = stored;
        let store = ConfigurationStore::from_history(history)?;
        store.verify()?;
        if store.current_sequence() != snapshot.current_version {
            return Err(StoreError::CorruptHistory(format!(
                "session is at version {} but history ends at {}",
                snapshot.current_version,
                store.current_sequence()
            )));
        }

        Ok(Self {
            session_id: snapshot.session_id,
            goal: snapshot.goal,
            phase: snapshot.phase,
            store,
            broker: InteractionBroker::restore(snapshot.pending_interaction),
            counters: snapshot.counters,
            flagged: snapshot.flagged,
            last_report: snapshot.last_report,
            last_confirmed_version: snapshot.last_confirmed_version,
            sample_conversation: snapshot.sample_conversation,
            runtime: snapshot.runtime,
            failure: snapshot.failure,
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
        })
    }
}
