//! Persisted build-session layout.
//!
//! A snapshot plus the store's independently persisted version history is
//! enough to rehydrate a session mid-build.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::RuntimeHandle;
use crate::interaction::InteractionRequest;
use crate::path::FieldPath;
use crate::phase::BuildPhase;
use crate::validation::ValidationReport;

/// Bounded-retry bookkeeping carried across suspensions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryCounters {
    #[serde(default)]
    pub validation_failures: u32,
    #[serde(default)]
    pub generation_failures: u32,
    #[serde(default)]
    pub creation_failures: u32,
    #[serde(default)]
    pub interaction_failures: u32,
}

/// Who speaks a line of a sample conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Agent,
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "User"),
            Self::Agent => write!(f, "Agent"),
        }
    }
}

/// One turn of the sample dialogue shown at confirmation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleTurn {
    pub speaker: Speaker,
    pub text: String,
}

/// Everything about a session except its version history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    /// The user's stated goal that started the build.
    pub goal: String,
    pub phase: BuildPhase,
    pub current_version: u64,
    #[serde(default)]
    pub pending_interaction: Option<InteractionRequest>,
    #[serde(default)]
    pub counters: RetryCounters,
    /// Fields the last failed validation flagged for collection.
    #[serde(default)]
    pub flagged: Vec<FieldPath>,
    /// Report from the most recent validation run.
    #[serde(default)]
    pub last_report: Option<ValidationReport>,
    /// Version shown in the last confirmation, for diff display.
    #[serde(default)]
    pub last_confirmed_version: Option<u64>,
    #[serde(default)]
    pub sample_conversation: Vec<SampleTurn>,
    #[serde(default)]
    pub runtime: Option<RuntimeHandle>,
    /// Reason recorded when the session entered `failed`.
    #[serde(default)]
    pub failure: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lightweight listing entry for saved sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub goal: String,
    /// Agent name at the current version (may be empty).
    pub agent_name: String,
    pub phase: BuildPhase,
    pub current_version: u64,
    /// Terminal sessions are archived rather than deleted.
    pub archived: bool,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_tolerates_missing_optional_fields() {
        let id = Uuid::now_v7();
        let json = serde_json::json!({
            "session_id": id,
            "goal": "hotel bookings",
            "phase": "collecting",
            "current_version": 2,
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z"
        });
        let snapshot: SessionSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(snapshot.session_id, id);
        assert_eq!(snapshot.phase, BuildPhase::Collecting);
        assert!(snapshot.pending_interaction.is_none());
        assert_eq!(snapshot.counters, RetryCounters::default());
    }
}
