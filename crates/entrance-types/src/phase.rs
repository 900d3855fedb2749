use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Phases of the build workflow, in forward order.
///
/// `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildPhase {
    Planning,
    Collecting,
    Generating,
    Validating,
    Confirming,
    Creating,
    Done,
    Failed,
}

impl BuildPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    pub const ALL: [BuildPhase; 8] = [
        Self::Planning,
        Self::Collecting,
        Self::Generating,
        Self::Validating,
        Self::Confirming,
        Self::Creating,
        Self::Done,
        Self::Failed,
    ];
}

impl Default for BuildPhase {
    fn default() -> Self {
        Self::Planning
    }
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Planning => "planning",
            Self::Collecting => "collecting",
            Self::Generating => "generating",
            Self::Validating => "validating",
            Self::Confirming => "confirming",
            Self::Creating => "creating",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl FromStr for BuildPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|phase| phase.to_string() == s.to_lowercase())
            .ok_or_else(|| format!("invalid build phase: '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse_agree() {
        for phase in BuildPhase::ALL {
            assert_eq!(phase.to_string().parse::<BuildPhase>(), Ok(phase));
        }
        assert!("drafting".parse::<BuildPhase>().is_err());
    }

    #[test]
    fn terminal_phases() {
        assert!(BuildPhase::Done.is_terminal());
        assert!(BuildPhase::Failed.is_terminal());
        assert!(!BuildPhase::Confirming.is_terminal());
        assert_eq!(BuildPhase::default(), BuildPhase::Planning);
    }

    #[test]
    fn serde_uses_snake_case() {
        assert_eq!(serde_json::to_string(&BuildPhase::Collecting).unwrap(), "\"collecting\"");
    }
}
