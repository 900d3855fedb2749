//! Validation report types.
//!
//! Rule violations are data, not errors: the validator always returns a
//! report and the orchestrator decides what to do with it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::path::FieldPath;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Which rule family produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    Structural,
    Referential,
    Quality,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub kind: FindingKind,
    pub path: FieldPath,
    pub message: String,
}

impl Finding {
    pub fn error(kind: FindingKind, path: FieldPath, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            path,
            message: message.into(),
        }
    }

    pub fn warning(kind: FindingKind, path: FieldPath, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            path,
            message: message.into(),
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.path, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub findings: Vec<Finding>,
}

impl ValidationReport {
    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    /// Whether the document may progress (no error-severity findings).
    pub fn is_passing(&self) -> bool {
        self.error_count() == 0
    }

    /// Distinct paths carrying errors, in first-seen order.
    pub fn error_paths(&self) -> Vec<FieldPath> {
        let mut paths: Vec<FieldPath> = Vec::new();
        for finding in self.errors() {
            if !paths.contains(&finding.path) {
                paths.push(finding.path.clone());
            }
        }
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::{SkillField, ToolField};

    #[test]
    fn passing_ignores_warnings() {
        let report = ValidationReport {
            findings: vec![Finding::warning(
                FindingKind::Quality,
                FieldPath::SystemPrompt,
                "could be more specific",
            )],
        };
        assert!(report.is_passing());
        assert_eq!(report.warnings().count(), 1);
    }

    #[test]
    fn error_paths_are_deduplicated_in_order() {
        let tool_id = FieldPath::tool(0, 0, ToolField::ToolId);
        let report = ValidationReport {
            findings: vec![
                Finding::error(FindingKind::Referential, tool_id.clone(), "unknown"),
                Finding::error(FindingKind::Structural, FieldPath::Name, "empty"),
                Finding::error(FindingKind::Structural, tool_id.clone(), "duplicate"),
                Finding::warning(
                    FindingKind::Quality,
                    FieldPath::skill(0, SkillField::Prompt),
                    "short",
                ),
            ],
        };
        assert!(!report.is_passing());
        assert_eq!(report.error_count(), 3);
        assert_eq!(report.error_paths(), vec![tool_id, FieldPath::Name]);
    }

    #[test]
    fn finding_display() {
        let f = Finding::error(FindingKind::Structural, FieldPath::Name, "must not be empty");
        assert_eq!(f.to_string(), "[error] name: must not be empty");
    }
}
