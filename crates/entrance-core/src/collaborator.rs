//! Collaborator ports.
//!
//! The orchestrator is the only component that calls these. Implementations
//! live in entrance-infra (template generator, catalog resolver, mock
//! creator); tests supply their own.
//!
//! The async ports use RPITIT like every async trait in this workspace. The
//! catalog and quality reviewer are synchronous, read-only and shared across
//! sessions behind `Arc<dyn ..>`.

use std::future::Future;

use entrance_types::agent::{AgentConfiguration, RuntimeHandle, ToolBinding};
use entrance_types::catalog::CatalogTool;
use entrance_types::error::CollaboratorError;
use entrance_types::patch::ConfigPatch;
use entrance_types::path::FieldPath;
use entrance_types::validation::Finding;

/// What a generation call should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationTarget {
    /// The agent's display name, committed before anything else.
    AgentName,
    /// Initial plan: description and a skill skeleton derived from the goal.
    Plan,
    /// Prose for the fields listed in `GenerationRequest::fields`.
    Content,
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub target: GenerationTarget,
    /// The user's stated goal.
    pub goal: String,
    /// Current document.
    pub document: AgentConfiguration,
    /// Fields to draft. Only meaningful for `Content`.
    pub fields: Vec<FieldPath>,
}

/// Drafts document content.
pub trait ContentGenerator: Send + Sync {
    /// Produce a draft patch for `request`.
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> impl Future<Output = Result<ConfigPatch, CollaboratorError>> + Send;

    /// Optional markdown sample dialogue (`**User:** ..` / `**Agent:** ..`).
    fn sample_conversation(
        &self,
        _document: &AgentConfiguration,
    ) -> impl Future<Output = Result<Option<String>, CollaboratorError>> + Send {
        async { Ok(None) }
    }
}

/// Maps a requirement description onto tool bindings. Zero matches is a
/// valid answer.
pub trait SkillResolver: Send + Sync {
    fn resolve(
        &self,
        requirement: &str,
    ) -> impl Future<Output = Result<Vec<ToolBinding>, CollaboratorError>> + Send;
}

/// Instantiates a runtime agent from a final configuration.
pub trait AgentCreator: Send + Sync {
    fn instantiate(
        &self,
        document: &AgentConfiguration,
    ) -> impl Future<Output = Result<RuntimeHandle, CollaboratorError>> + Send;
}

/// Read-only tool catalog, safe for concurrent lookups.
pub trait ToolCatalog: Send + Sync {
    fn lookup(&self, tool_id: &str) -> Option<CatalogTool>;

    fn list(&self) -> Vec<CatalogTool>;

    fn exists(&self, tool_id: &str) -> bool {
        self.lookup(tool_id).is_some()
    }
}

/// Content-quality review. Findings are merged as warnings only.
pub trait QualityReviewer: Send + Sync {
    fn review(&self, document: &AgentConfiguration) -> Vec<Finding>;
}
