//! Session persistence port.
//!
//! Implemented in entrance-infra by an in-memory store and a SQLite store.
//! Version rows are immutable: `save` only ever adds versions the backend has
//! not seen yet, mirroring the append-only history of the store.

use std::future::Future;

use entrance_types::error::RepositoryError;
use entrance_types::session::SessionSummary;
use uuid::Uuid;

use crate::session::StoredSession;

pub trait SessionRepository: Send + Sync {
    /// Save or update a session (upsert on session_id).
    fn save(&self, session: &StoredSession) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Load a session by id. `None` if it was never saved.
    fn load(
        &self,
        session_id: &Uuid,
    ) -> impl Future<Output = Result<Option<StoredSession>, RepositoryError>> + Send;

    /// All sessions, most recently updated first.
    fn list(&self) -> impl Future<Output = Result<Vec<SessionSummary>, RepositoryError>> + Send;

    /// Delete a session and its history. Returns whether it existed.
    fn delete(&self, session_id: &Uuid) -> impl Future<Output = Result<bool, RepositoryError>> + Send;
}

/// Build the listing entry for a stored session.
pub fn summarize(stored: &StoredSession) -> SessionSummary {
    let snapshot = &stored.snapshot;
    let agent_name = stored
        .history
        .iter()
        .find(|v| v.sequence == snapshot.current_version)
        .map(|v| v.document.name.clone())
        .unwrap_or_default();
    SessionSummary {
        session_id: snapshot.session_id,
        goal: snapshot.goal.clone(),
        agent_name,
        phase: snapshot.phase,
        current_version: snapshot.current_version,
        archived: snapshot.phase.is_terminal(),
        updated_at: snapshot.updated_at,
    }
}
