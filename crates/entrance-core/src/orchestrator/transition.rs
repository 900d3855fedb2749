//! The phase machine as a pure function.
//!
//! `transition` knows nothing about stores, collaborators or interactions; the
//! orchestrator turns their outcomes into `PhaseEvent`s and feeds them here.

use std::fmt;

use entrance_types::error::BuildError;
use entrance_types::phase::BuildPhase;

/// Outcome of one phase attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    /// Name and plan committed.
    Planned,
    /// Every required field of the current target is present.
    FieldsComplete,
    /// An information request was issued.
    FieldsMissing,
    Generated,
    ValidationPassed,
    ValidationFailed { exhausted: bool },
    Confirmed,
    EditRequested,
    AddRequested,
    Created,
    CreationFailed { exhausted: bool },
    /// Content generation or skill resolution failed.
    CollaboratorFailed { exhausted: bool },
    /// The pending interaction was cancelled or expired.
    InteractionAborted { exhausted: bool },
    /// Document rolled back to an earlier version.
    RolledBack,
}

impl fmt::Display for PhaseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Planned => "planned",
            Self::FieldsComplete => "fields_complete",
            Self::FieldsMissing => "fields_missing",
            Self::Generated => "generated",
            Self::ValidationPassed => "validation_passed",
            Self::ValidationFailed { .. } => "validation_failed",
            Self::Confirmed => "confirmed",
            Self::EditRequested => "edit_requested",
            Self::AddRequested => "add_requested",
            Self::Created => "created",
            Self::CreationFailed { .. } => "creation_failed",
            Self::CollaboratorFailed { .. } => "collaborator_failed",
            Self::InteractionAborted { .. } => "interaction_aborted",
            Self::RolledBack => "rolled_back",
        };
        write!(f, "{name}")
    }
}

/// Next phase for `event` in `phase`.
pub fn transition(phase: BuildPhase, event: PhaseEvent) -> Result<BuildPhase, BuildError> {
    use BuildPhase::*;
    use PhaseEvent::*;

    if phase.is_terminal() {
        return Err(BuildError::Terminal { phase });
    }

    let next = match (phase, event) {
        (Planning, Planned) => Collecting,

        (Collecting, FieldsComplete) => Generating,
        (Collecting, FieldsMissing) => Collecting,

        (Generating, Generated) => Validating,

        (Validating, ValidationPassed) => Confirming,
        (Validating, ValidationFailed { exhausted: false }) => Collecting,
        (Validating, ValidationFailed { exhausted: true }) => Failed,

        (Confirming, Confirmed) => Creating,
        (Confirming, EditRequested) => Generating,
        (Confirming, AddRequested) => Collecting,

        (Creating, Created) => Done,
        (Creating, CreationFailed { exhausted: false }) => Creating,
        (Creating, CreationFailed { exhausted: true }) => Failed,

        (Planning | Generating, CollaboratorFailed { exhausted: false }) => phase,
        (Planning | Generating, CollaboratorFailed { exhausted: true }) => Failed,

        (Collecting | Confirming, InteractionAborted { exhausted: false }) => phase,
        (Collecting | Confirming, InteractionAborted { exhausted: true }) => Failed,

        // A session that has not planned yet keeps planning.
        (Planning, RolledBack) => Planning,
        (_, RolledBack) => Collecting,

        (from, event) => {
            return Err(BuildError::InvalidTransition {
                from,
                event: event.to_string(),
            });
        }
    };
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use BuildPhase::*;
    use PhaseEvent::*;

    #[test]
    fn happy_path() {
        let steps = [
            (Planning, Planned, Collecting),
            (Collecting, FieldsComplete, Generating),
            (Generating, Generated, Validating),
            (Validating, ValidationPassed, Confirming),
            (Confirming, Confirmed, Creating),
            (Creating, Created, Done),
        ];
        for (from, event, to) in steps {
            assert_eq!(transition(from, event).unwrap(), to, "{from} on {event}");
        }
    }

    #[test]
    fn recoverable_back_edges() {
        assert_eq!(
            transition(Validating, ValidationFailed { exhausted: false }).unwrap(),
            Collecting
        );
        assert_eq!(transition(Confirming, EditRequested).unwrap(), Generating);
        assert_eq!(transition(Confirming, AddRequested).unwrap(), Collecting);
        assert_eq!(
            transition(Collecting, InteractionAborted { exhausted: false }).unwrap(),
            Collecting
        );
    }

    #[test]
    fn exhausted_retries_fail() {
        assert_eq!(
            transition(Validating, ValidationFailed { exhausted: true }).unwrap(),
            Failed
        );
        assert_eq!(
            transition(Creating, CreationFailed { exhausted: true }).unwrap(),
            Failed
        );
        assert_eq!(
            transition(Generating, CollaboratorFailed { exhausted: true }).unwrap(),
            Failed
        );
        assert_eq!(
            transition(Confirming, InteractionAborted { exhausted: true }).unwrap(),
            Failed
        );
    }

    #[test]
    fn terminal_phases_reject_everything() {
        for phase in [Done, Failed] {
            assert_eq!(
                transition(phase, Planned).unwrap_err(),
                BuildError::Terminal { phase }
            );
        }
    }

    #[test]
    fn mismatched_events_are_invalid() {
        let err = transition(Planning, Confirmed).unwrap_err();
        assert_eq!(
            err,
            BuildError::InvalidTransition {
                from: Planning,
                event: "confirmed".to_string()
            }
        );
        assert!(transition(Creating, InteractionAborted { exhausted: false }).is_err());
    }

    #[test]
    fn rollback_reenters_collecting() {
        assert_eq!(transition(Confirming, RolledBack).unwrap(), Collecting);
        assert_eq!(transition(Planning, RolledBack).unwrap(), Planning);
    }
}
