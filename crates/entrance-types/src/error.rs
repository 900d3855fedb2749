use thiserror::Error;
use uuid::Uuid;

use crate::phase::BuildPhase;
use crate::path::FieldPath;

/// A patch that cannot be applied. Caller bug; never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PatchError {
    #[error("patch contains no operations")]
    EmptyPatch,

    #[error("path '{path}' does not resolve in the current document")]
    PathNotFound { path: String },

    #[error("value at '{path}' must be {expected}")]
    TypeMismatch { path: FieldPath, expected: &'static str },

    #[error("tool_id '{tool_id}' appears more than once in skills[{skill}]")]
    DuplicateToolId { skill: usize, tool_id: String },

    #[error("skills[{skill}] has no tool with tool_id '{tool_id}'")]
    UnknownToolId { skill: usize, tool_id: String },
}

/// Errors from the configuration store.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error("version {0} does not exist")]
    UnknownVersion(u64),

    #[error("corrupt version history: {0}")]
    CorruptHistory(String),
}

/// Interaction protocol misuse.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InteractionError {
    #[error("interaction {pending} is still pending")]
    AlreadyPending { pending: Uuid },

    #[error("unknown interaction: {0}")]
    UnknownInteraction(Uuid),

    #[error("action '{action_id}' is not allowed for interaction {interaction_id}")]
    InvalidAction { interaction_id: Uuid, action_id: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Failure of an external collaborator. Retried up to a bounded count.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CollaboratorError {
    #[error("generation failed: {0}")]
    Generation(String),

    #[error("skill resolution failed: {0}")]
    Resolution(String),

    #[error("creation failed: {0}")]
    Creation(String),

    #[error("{collaborator} timed out after {after_secs}s")]
    Timeout {
        collaborator: &'static str,
        after_secs: u64,
    },
}

/// Errors surfaced by the build orchestrator.
///
/// Validation findings and collaborator failures are not errors; they
/// drive the phase machine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Interaction(#[from] InteractionError),

    #[error("session is already {phase}")]
    Terminal { phase: BuildPhase },

    #[error("no transition from {from} on {event}")]
    InvalidTransition { from: BuildPhase, event: String },
}

impl From<PatchError> for BuildError {
    fn from(err: PatchError) -> Self {
        Self::Store(StoreError::Patch(err))
    }
}

/// Errors from repository operations (session persistence).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("query error: {0}")]
    Query(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
