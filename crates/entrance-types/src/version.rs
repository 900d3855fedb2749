//! Immutable configuration versions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::AgentConfiguration;
use crate::patch::{ConfigPatch, PatchSource};

/// How a version came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VersionOrigin {
    /// Version 0 of every store.
    Initial,
    Patch { source: PatchSource },
    /// Content duplicated from an earlier version.
    Rollback { target: u64 },
}

/// A sequence-numbered snapshot of the document plus the patch that
/// produced it. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigVersion {
    /// Monotonically increasing, starting at 0.
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
    pub origin: VersionOrigin,
    pub patch: ConfigPatch,
    pub document: AgentConfiguration,
}

impl ConfigVersion {
    /// The empty version 0.
    pub fn initial() -> Self {
        Self {
            sequence: 0,
            created_at: Utc::now(),
            origin: VersionOrigin::Initial,
            patch: ConfigPatch::default(),
            document: AgentConfiguration::default(),
        }
    }
}

/// Lightweight view of a version for history listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionSummary {
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
    pub origin: VersionOrigin,
    pub change: String,
}

impl From<&ConfigVersion> for VersionSummary {
    fn from(version: &ConfigVersion) -> Self {
        let change = match version.origin {
            VersionOrigin::Initial => "initial empty document".to_string(),
            VersionOrigin::Rollback { target } => format!("rollback to version {target}"),
            VersionOrigin::Patch { .. } => version.patch.to_string(),
        };
        Self {
            sequence: version.sequence,
            created_at: version.created_at,
            origin: version.origin,
            change,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::FieldPath;

    #[test]
    fn initial_version_is_empty_and_zero() {
        let v = ConfigVersion::initial();
        assert_eq!(v.sequence, 0);
        assert!(v.document.is_empty());
        assert!(v.patch.is_empty());
        assert_eq!(v.origin, VersionOrigin::Initial);
    }

    #[test]
    fn summary_describes_the_change() {
        let mut v = ConfigVersion::initial();
        v.sequence = 4;
        v.origin = VersionOrigin::Patch {
            source: PatchSource::User,
        };
        v.patch = ConfigPatch::new().set(FieldPath::Name, "Concierge");
        assert_eq!(VersionSummary::from(&v).change, "set name");

        v.origin = VersionOrigin::Rollback { target: 2 };
        assert_eq!(VersionSummary::from(&v).change, "rollback to version 2");
    }

    #[test]
    fn origin_serializes_with_kind_tag() {
        let json = serde_json::to_string(&VersionOrigin::Rollback { target: 3 }).unwrap();
        assert_eq!(json, r#"{"kind":"rollback","target":3}"#);
    }
}
