//! SQLite implementation of `SessionRepository`.
//!
//! A session is one row in `sessions` (upserted on every save, with the
//! snapshot serialized as JSON and the listing columns denormalized) plus
//! one immutable row per configuration version in `session_versions`.
//! Versions are written with INSERT OR IGNORE: a sequence number, once
//! stored, is never rewritten.

use chrono::{DateTime, SecondsFormat, Utc};
use entrance_core::repository::{SessionRepository, summarize};
use entrance_core::session::StoredSession;
use entrance_types::error::RepositoryError;
use entrance_types::phase::BuildPhase;
use entrance_types::session::{SessionSnapshot, SessionSummary};
use entrance_types::version::ConfigVersion;
use sqlx::Row;
use uuid::Uuid;

use crate::sqlite::pool::DatabasePool;

/// SQLite-backed session persistence.
pub struct SqliteSessionRepository {
    pool: DatabasePool,
}

impl SqliteSessionRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn query_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

/// Fixed-width RFC 3339 so that text ordering matches time ordering.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value).map_err(|e| RepositoryError::Serialization(e.to_string()))
}

fn from_json<T: serde::de::DeserializeOwned>(json: &str) -> Result<T, RepositoryError> {
    serde_json::from_str(json).map_err(|e| RepositoryError::Serialization(e.to_string()))
}

// ---------------------------------------------------------------------------
// SessionRepository implementation
// ---------------------------------------------------------------------------

impl SessionRepository for SqliteSessionRepository {
    async fn save(&self, session: &StoredSession) -> Result<(), RepositoryError> {
        let snapshot = &session.snapshot;
        let summary = summarize(session);
        let session_id = snapshot.session_id.to_string();

        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;

        sqlx::query(
            r#"INSERT INTO sessions (session_id, goal, agent_name, phase, current_version, archived, snapshot_json, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(session_id) DO UPDATE SET
                   agent_name = excluded.agent_name,
                   phase = excluded.phase,
                   current_version = excluded.current_version,
                   archived = excluded.archived,
                   snapshot_json = excluded.snapshot_json,
                   updated_at = excluded.updated_at"#,
        )
        .bind(&session_id)
        .bind(&snapshot.goal)
        .bind(&summary.agent_name)
        .bind(snapshot.phase.to_string())
        .bind(snapshot.current_version as i64)
        .bind(summary.archived)
        .bind(to_json(snapshot)?)
        .bind(format_datetime(&snapshot.created_at))
        .bind(format_datetime(&snapshot.updated_at))
        .execute(&mut *tx)
        .await
        .map_err(query_err)?;

        for version in &session.history {
            sqlx::query(
                r#"INSERT OR IGNORE INTO session_versions (session_id, sequence, version_json, created_at)
                   VALUES (?, ?, ?, ?)"#,
            )
            .bind(&session_id)
            .bind(version.sequence as i64)
            .bind(to_json(version)?)
            .bind(format_datetime(&version.created_at))
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;
        }

        tx.commit().await.map_err(query_err)?;
        tracing::debug!(
            session_id = %snapshot.session_id,
            phase = %snapshot.phase,
            version = snapshot.current_version,
            "session saved"
        );
        Ok(())
    }

    async fn load(&self, session_id: &Uuid) -> Result<Option<StoredSession>, RepositoryError> {
        let row = sqlx::query("SELECT snapshot_json FROM sessions WHERE session_id = ?")
            .bind(session_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let snapshot_json: String = row.try_get("snapshot_json").map_err(query_err)?;
        let snapshot: SessionSnapshot = from_json(&snapshot_json)?;

        let rows = sqlx::query(
            "SELECT version_json FROM session_versions WHERE session_id = ? ORDER BY sequence ASC",
        )
        .bind(session_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        let mut history: Vec<ConfigVersion> = Vec::with_capacity(rows.len());
        for row in &rows {
            let json: String = row.try_get("version_json").map_err(query_err)?;
            history.push(from_json(&json)?);
        }

        Ok(Some(StoredSession { snapshot, history }))
    }

    async fn list(&self) -> Result<Vec<SessionSummary>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT session_id, goal, agent_name, phase, current_version, archived, updated_at FROM sessions ORDER BY updated_at DESC",
        )
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in &rows {
            let sid: String = row.try_get("session_id").map_err(query_err)?;
            let phase: String = row.try_get("phase").map_err(query_err)?;
            let current_version: i64 = row.try_get("current_version").map_err(query_err)?;
            let updated_at: String = row.try_get("updated_at").map_err(query_err)?;

            summaries.push(SessionSummary {
                session_id: Uuid::parse_str(&sid)
                    .map_err(|e| RepositoryError::Query(format!("invalid session_id: {e}")))?,
                goal: row.try_get("goal").map_err(query_err)?,
                agent_name: row.try_get("agent_name").map_err(query_err)?,
                phase: phase.parse::<BuildPhase>().map_err(RepositoryError::Query)?,
                current_version: current_version as u64,
                archived: row.try_get("archived").map_err(query_err)?,
                updated_at: parse_datetime(&updated_at)?,
            });
        }

        Ok(summaries)
    }

    async fn delete(&self, session_id: &Uuid) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;
        sqlx::query("DELETE FROM session_versions WHERE session_id = ?")
            .bind(session_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;
        let result = sqlx::query("DELETE FROM sessions WHERE session_id = ?")
            .bind(session_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;
        tx.commit().await.map_err(query_err)?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entrance_core::session::BuildSession;
    use entrance_types::patch::{ConfigPatch, PatchSource};
    use entrance_types::path::FieldPath;

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        std::mem::forget(dir);
        DatabasePool::new(&url).await.unwrap()
    }

    fn named_session(goal: &str, name: &str) -> BuildSession {
        let mut session = BuildSession::new(goal);
        session
            .store
            .apply_patch(ConfigPatch::new().set(FieldPath::Name, name), PatchSource::Planning)
            .unwrap();
        session.phase = BuildPhase::Collecting;
        session
    }

    #[tokio::test]
    async fn save_load_roundtrip_rehydrates() {
        let repo = SqliteSessionRepository::new(test_pool().await);
        let session = named_session("hotel bookings", "Hotel Assistant");

        repo.save(&session.to_stored()).await.unwrap();
        let loaded = repo.load(&session.session_id).await.unwrap().unwrap();
        assert_eq!(loaded.history.len(), 2);

        let restored = BuildSession::rehydrate(loaded).unwrap();
        assert_eq!(restored.snapshot(), session.snapshot());
        assert_eq!(restored.store.document().name, "Hotel Assistant");
    }

    #[tokio::test]
    async fn saving_again_appends_new_versions_only() {
        let repo = SqliteSessionRepository::new(test_pool().await);
        let mut session = named_session("hotel bookings", "Hotel Assistant");
        repo.save(&session.to_stored()).await.unwrap();

        session
            .store
            .apply_patch(
                ConfigPatch::new().set(FieldPath::Description, "Books rooms"),
                PatchSource::User,
            )
            .unwrap();
        session.store.rollback(1).unwrap();
        session.touch();
        repo.save(&session.to_stored()).await.unwrap();

        let loaded = repo.load(&session.session_id).await.unwrap().unwrap();
        assert_eq!(loaded.snapshot.current_version, 3);
        let sequences: Vec<u64> = loaded.history.iter().map(|v| v.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2, 3]);
        assert_eq!(loaded.history[3].document.description, "");
    }

    #[tokio::test]
    async fn load_nonexistent_returns_none() {
        let repo = SqliteSessionRepository::new(test_pool().await);
        assert!(repo.load(&Uuid::now_v7()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_returns_most_recent_first() {
        let repo = SqliteSessionRepository::new(test_pool().await);
        let first = named_session("hotel", "Hotel Assistant");
        repo.save(&first.to_stored()).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        let mut second = named_session("clinic", "Clinic Assistant");
        second.phase = BuildPhase::Failed;
        second.touch();
        repo.save(&second.to_stored()).await.unwrap();

        let summaries = repo.list().await.unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].session_id, second.session_id);
        assert_eq!(summaries[0].agent_name, "Clinic Assistant");
        assert!(summaries[0].archived);
        assert_eq!(summaries[1].phase, BuildPhase::Collecting);
        assert!(!summaries[1].archived);
    }

    #[tokio::test]
    async fn delete_removes_session_and_history() {
        let repo = SqliteSessionRepository::new(test_pool().await);
        let session = named_session("hotel", "Hotel Assistant");
        repo.save(&session.to_stored()).await.unwrap();

        assert!(repo.delete(&session.session_id).await.unwrap());
        assert!(repo.load(&session.session_id).await.unwrap().is_none());
        assert!(!repo.delete(&session.session_id).await.unwrap());

        let remaining: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM session_versions")
            .fetch_one(&repo.pool.reader)
            .await
            .unwrap();
        assert_eq!(remaining.0, 0);
    }
}
