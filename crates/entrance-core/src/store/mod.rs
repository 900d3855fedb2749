//! Versioned configuration store.
//!
//! Owns the ordered version history of one build session's document.
//! Every successful patch appends exactly one immutable version; rollback
//! appends a copy of an earlier version instead of truncating, so the full
//! audit trail always survives.

pub mod patch;

use chrono::Utc;
use entrance_types::agent::AgentConfiguration;
use entrance_types::error::StoreError;
use entrance_types::patch::{ConfigPatch, PatchOp, PatchSource};
use entrance_types::version::{ConfigVersion, VersionOrigin, VersionSummary};

pub use patch::apply_patch;

/// Versioned document store for a single build session.
///
/// Single writer: mutation takes `&mut self`, so patch application within a
/// session is serialized by construction.
#[derive(Debug, Clone)]
pub struct ConfigurationStore {
    versions: Vec<ConfigVersion>,
}

impl Default for ConfigurationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigurationStore {
    /// A store holding only the empty version 0.
    pub fn new() -> Self {
        Self {
            versions: vec![ConfigVersion::initial()],
        }
    }

    /// Rebuild a store from persisted history.
    ///
    /// The history must start at version 0 and have contiguous sequence
    /// numbers.
    pub fn from_history(versions: Vec<ConfigVersion>) -> Result<Self, StoreError> {
        let Some(first) = versions.first() else {
            return Err(StoreError::CorruptHistory("history is empty".to_string()));
        };
        if first.sequence != 0 {
            return Err(StoreError::CorruptHistory(format!(
                "history starts at version {}",
                first.sequence
            )));
        }
        for pair in versions.windows(2) {
            if pair[1].sequence != pair[0].sequence + 1 {
                return Err(StoreError::CorruptHistory(format!(
                    "version {} is followed by {}",
                    pair[0].sequence, pair[1].sequence
                )));
            }
        }
        Ok(Self { versions })
    }

    /// Apply `patch` to the current document and append the result.
    ///
    /// On error the store is unchanged.
    pub fn apply_patch(
        &mut self,
        patch: ConfigPatch,
        source: PatchSource,
    ) -> Result<&ConfigVersion, StoreError> {
        let document = apply_patch(&self.current().document, &patch)?;
        let sequence = self.current().sequence + 1;

        tracing::debug!(
            sequence,
            source = %source,
            change = %patch,
            "applied configuration patch"
        );

        Ok(self.push(ConfigVersion {
            sequence,
            created_at: Utc::now(),
            origin: VersionOrigin::Patch { source },
            patch,
            document,
        }))
    }

    /// Append a new version whose content equals version `target`.
    pub fn rollback(&mut self, target: u64) -> Result<&ConfigVersion, StoreError> {
        let document = self
            .version(target)
            .ok_or(StoreError::UnknownVersion(target))?
            .document
            .clone();
        let sequence = self.current().sequence + 1;

        tracing::info!(sequence, target, "rolled back configuration");

        Ok(self.push(ConfigVersion {
            sequence,
            created_at: Utc::now(),
            origin: VersionOrigin::Rollback { target },
            patch: ConfigPatch::new().with(PatchOp::Replace {
                document: document.clone(),
            }),
            document,
        }))
    }

    /// The latest version.
    pub fn current(&self) -> &ConfigVersion {
        // Construction guarantees at least version 0.
        &self.versions[self.versions.len() - 1]
    }

    /// The latest document.
    pub fn document(&self) -> &AgentConfiguration {
        &self.current().document
    }

    pub fn current_sequence(&self) -> u64 {
        self.current().sequence
    }

    /// Version `sequence`, if it exists.
    pub fn version(&self, sequence: u64) -> Option<&ConfigVersion> {
        let index = usize::try_from(sequence).ok()?;
        self.versions.get(index)
    }

    /// All versions, oldest first.
    pub fn history(&self) -> &[ConfigVersion] {
        &self.versions
    }

    pub fn summaries(&self) -> Vec<VersionSummary> {
        self.versions.iter().map(VersionSummary::from).collect()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Re-apply every recorded patch starting from the empty document.
    ///
    /// Returns the reconstructed document at each version; callers compare
    /// it against the stored snapshots to verify history integrity.
    pub fn replay(&self) -> Result<Vec<AgentConfiguration>, StoreError> {
        let mut documents = Vec::with_capacity(self.versions.len());
        let mut doc = AgentConfiguration::default();
        documents.push(doc.clone());
        for version in &self.versions[1..] {
            doc = apply_patch(&doc, &version.patch)?;
            documents.push(doc.clone());
        }
        Ok(documents)
    }

    /// Whether replaying the patches reproduces every stored document.
    pub fn verify(&self) -> Result<(), StoreError> {
        let replayed = self
            .replay()
            .map_err(|e| StoreError::CorruptHistory(format!("history does not replay: {e}")))?;
        for (version, doc) in self.versions.iter().zip(&replayed) {
            if &version.document != doc {
                return Err(StoreError::CorruptHistory(format!(
                    "version {} does not match its patch",
                    version.sequence
                )));
            }
        }
        Ok(())
    }

    fn push(&mut self, version: ConfigVersion) -> &ConfigVersion {
        self.versions.push(version);
        self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entrance_types::agent::{SkillConfig, ToolBinding};
    use entrance_types::error::PatchError;
    use entrance_types::path::FieldPath;

    fn named(name: &str) -> ConfigPatch {
        ConfigPatch::new().set(FieldPath::Name, name)
    }

    #[test]
    fn new_store_has_empty_version_zero() {
        let store = ConfigurationStore::new();
        assert_eq!(store.len(), 1);
        assert_eq!(store.current_sequence(), 0);
        assert!(store.document().is_empty());
    }

    #[test]
    fn each_patch_appends_one_version() {
        let mut store = ConfigurationStore::new();
        let v1 = store.apply_patch(named("Hotel Assistant"), PatchSource::Planning).unwrap();
        assert_eq!(v1.sequence, 1);
        assert_eq!(
            v1.origin,
            VersionOrigin::Patch {
                source: PatchSource::Planning
            }
        );

        store
            .apply_patch(
                ConfigPatch::new().set(FieldPath::Description, "Books rooms"),
                PatchSource::User,
            )
            .unwrap();
        assert_eq!(store.current_sequence(), 2);
        assert_eq!(store.document().name, "Hotel Assistant");
        assert_eq!(store.document().description, "Books rooms");
        // Earlier versions are untouched.
        assert!(store.version(1).unwrap().document.description.is_empty());
    }

    #[test]
    fn failed_patch_leaves_store_unchanged() {
        let mut store = ConfigurationStore::new();
        store.apply_patch(named("Hotel Assistant"), PatchSource::Planning).unwrap();

        let bad = ConfigPatch::new()
            .set(FieldPath::Description, "partial")
            .set("skills[0].name".parse().unwrap(), "Booking");
        let err = store.apply_patch(bad, PatchSource::User).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Patch(PatchError::PathNotFound { .. })
        ));
        assert_eq!(store.len(), 2);
        assert!(store.document().description.is_empty());

        let err = store.apply_patch(ConfigPatch::new(), PatchSource::User).unwrap_err();
        assert_eq!(err, StoreError::Patch(PatchError::EmptyPatch));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn rollback_appends_copy_of_target() {
        let mut store = ConfigurationStore::new();
        store.apply_patch(named("First"), PatchSource::Planning).unwrap();
        store.apply_patch(named("Second"), PatchSource::User).unwrap();

        let rolled = store.rollback(1).unwrap();
        assert_eq!(rolled.sequence, 3);
        assert_eq!(rolled.origin, VersionOrigin::Rollback { target: 1 });
        assert_eq!(rolled.document.name, "First");

        // Nothing was discarded.
        assert_eq!(store.len(), 4);
        assert_eq!(store.version(2).unwrap().document.name, "Second");
        assert_eq!(store.version(3).unwrap().document, store.version(1).unwrap().document);
    }

    #[test]
    fn rolling_back_to_the_same_version_twice_matches() {
        let mut store = ConfigurationStore::new();
        store.apply_patch(named("Hotel Assistant"), PatchSource::Planning).unwrap();
        store
            .apply_patch(
                ConfigPatch::new().set(FieldPath::Description, "Books rooms"),
                PatchSource::User,
            )
            .unwrap();

        let first = store.rollback(1).unwrap().clone();
        store
            .apply_patch(named("Concierge"), PatchSource::User)
            .unwrap();
        let second = store.rollback(1).unwrap().clone();

        assert_eq!(first.document, second.document);
        assert_eq!(first.document, store.version(1).unwrap().document);
        assert_eq!((first.sequence, second.sequence), (3, 5));
        let sequences: Vec<u64> = store.history().iter().map(|v| v.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2, 3, 4, 5]);
        store.verify().unwrap();
    }

    #[test]
    fn rollback_to_unknown_version_fails() {
        let mut store = ConfigurationStore::new();
        assert_eq!(store.rollback(7).unwrap_err(), StoreError::UnknownVersion(7));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn replay_reproduces_every_version() {
        let mut store = ConfigurationStore::new();
        store.apply_patch(named("Hotel Assistant"), PatchSource::Planning).unwrap();
        store
            .apply_patch(
                ConfigPatch::new().with(PatchOp::AppendSkill {
                    skill: SkillConfig {
                        name: "Booking".to_string(),
                        tools: vec![ToolBinding::new("sms", "send_sms")],
                        ..Default::default()
                    },
                }),
                PatchSource::User,
            )
            .unwrap();
        store.rollback(1).unwrap();

        let replayed = store.replay().unwrap();
        assert_eq!(replayed.len(), 4);
        for (version, doc) in store.history().iter().zip(&replayed) {
            assert_eq!(&version.document, doc);
        }
        store.verify().unwrap();
    }

    #[test]
    fn verify_catches_tampered_documents() {
        let mut store = ConfigurationStore::new();
        store.apply_patch(named("Hotel Assistant"), PatchSource::Planning).unwrap();
        store.apply_patch(named("Concierge"), PatchSource::User).unwrap();

        let mut history = store.history().to_vec();
        history[1].document.name = "Tampered".to_string();
        let tampered = ConfigurationStore::from_history(history).unwrap();
        assert!(matches!(tampered.verify(), Err(StoreError::CorruptHistory(_))));

        let mut history = store.history().to_vec();
        history[2].patch = ConfigPatch::new().set("skills[3].name".parse().unwrap(), "x");
        let unreplayable = ConfigurationStore::from_history(history).unwrap();
        assert!(matches!(unreplayable.verify(), Err(StoreError::CorruptHistory(_))));
    }

    #[test]
    fn from_history_checks_sequence() {
        let mut store = ConfigurationStore::new();
        store.apply_patch(named("A"), PatchSource::User).unwrap();
        store.apply_patch(named("B"), PatchSource::User).unwrap();

        let restored = ConfigurationStore::from_history(store.history().to_vec()).unwrap();
        assert_eq!(restored.document().name, "B");

        let mut gapped = store.history().to_vec();
        gapped.remove(1);
        assert!(matches!(
            ConfigurationStore::from_history(gapped),
            Err(StoreError::CorruptHistory(_))
        ));
        assert!(matches!(
            ConfigurationStore::from_history(Vec::new()),
            Err(StoreError::CorruptHistory(_))
        ));
    }

    #[test]
    fn summaries_follow_history() {
        let mut store = ConfigurationStore::new();
        store.apply_patch(named("A"), PatchSource::User).unwrap();
        store.rollback(0).unwrap();
        let changes: Vec<_> = store.summaries().into_iter().map(|s| s.change).collect();
        assert_eq!(
            changes,
            vec!["initial empty document", "set name", "rollback to version 0"]
        );
    }
}
