//! In-memory `SessionRepository`.
//!
//! Used by tests and by `entrance serve --ephemeral`. Same contract as the
//! SQLite repository: stored versions are never rewritten.

use dashmap::DashMap;
use entrance_core::repository::{SessionRepository, summarize};
use entrance_core::session::StoredSession;
use entrance_types::error::RepositoryError;
use entrance_types::session::SessionSummary;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct InMemorySessionRepository {
    sessions: DashMap<Uuid, StoredSession>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionRepository for InMemorySessionRepository {
    async fn save(&self, session: &StoredSession) -> Result<(), RepositoryError> {
        let session_id = session.snapshot.session_id;
        match self.sessions.get_mut(&session_id) {
            Some(mut existing) => {
                let known = existing.history.len();
                existing.snapshot = session.snapshot.clone();
                existing
                    .history
                    .extend(session.history.iter().skip(known).cloned());
            }
            None => {
                self.sessions.insert(session_id, session.clone());
            }
        }
        Ok(())
    }

    async fn load(&self, session_id: &Uuid) -> Result<Option<StoredSession>, RepositoryError> {
        Ok(self.sessions.get(session_id).map(|entry| entry.value().clone()))
    }

    async fn list(&self) -> Result<Vec<SessionSummary>, RepositoryError> {
        let mut summaries: Vec<SessionSummary> =
            self.sessions.iter().map(|entry| summarize(entry.value())).collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    async fn delete(&self, session_id: &Uuid) -> Result<bool, RepositoryError> {
        Ok(self.sessions.remove(session_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entrance_core::session::BuildSession;
    use entrance_types::patch::{ConfigPatch, PatchSource};
    use entrance_types::path::FieldPath;

    #[tokio::test]
    async fn save_appends_and_lists() {
        let repo = InMemorySessionRepository::new();
        let mut session = BuildSession::new("hotel");
        repo.save(&session.to_stored()).await.unwrap();

        session
            .store
            .apply_patch(
                ConfigPatch::new().set(FieldPath::Name, "Hotel Assistant"),
                PatchSource::Planning,
            )
            .unwrap();
        session.touch();
        repo.save(&session.to_stored()).await.unwrap();

        let loaded = repo.load(&session.session_id).await.unwrap().unwrap();
        assert_eq!(loaded.history.len(), 2);
        assert_eq!(loaded.snapshot.current_version, 1);

        let listed = repo.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].agent_name, "Hotel Assistant");

        assert!(repo.delete(&session.session_id).await.unwrap());
        assert!(repo.list().await.unwrap().is_empty());
    }
}
