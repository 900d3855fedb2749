//! Configuration validator.
//!
//! Runs structural, referential and (optionally) quality checks over a
//! document snapshot and accumulates every finding. Rule violations are
//! returned as data; `validate` has no error path and never mutates anything.

use std::sync::Arc;

use entrance_types::agent::{AgentConfiguration, SkillConfig};
use entrance_types::config::{BuilderSettings, LengthBound, LengthLimits};
use entrance_types::path::{FieldPath, SkillField, ToolField};
use entrance_types::validation::{Finding, FindingKind, Severity, ValidationReport};
use serde_json::Value;

use crate::collaborator::{QualityReviewer, ToolCatalog};

pub struct ConfigValidator {
    limits: LengthLimits,
    max_skills: usize,
    catalog: Arc<dyn ToolCatalog>,
    reviewer: Option<Arc<dyn QualityReviewer>>,
}

impl ConfigValidator {
    pub fn new(settings: &BuilderSettings, catalog: Arc<dyn ToolCatalog>) -> Self {
        Self {
            limits: settings.limits.clone(),
            max_skills: settings.max_skills,
            catalog,
            reviewer: None,
        }
    }

    pub fn with_reviewer(mut self, reviewer: Arc<dyn QualityReviewer>) -> Self {
        self.reviewer = Some(reviewer);
        self
    }

    pub fn max_skills(&self) -> usize {
        self.max_skills
    }

    /// Check `doc` and return every finding.
    pub fn validate(&self, doc: &AgentConfiguration) -> ValidationReport {
        let mut findings = Vec::new();
        self.check_structure(doc, &mut findings);
        self.check_references(doc, &mut findings);
        if let Some(reviewer) = &self.reviewer {
            findings.extend(reviewer.review(doc).into_iter().map(|mut finding| {
                finding.severity = Severity::Warning;
                finding.kind = FindingKind::Quality;
                finding
            }));
        }

        let report = ValidationReport { findings };
        tracing::debug!(
            errors = report.error_count(),
            warnings = report.warnings().count(),
            "validated configuration"
        );
        report
    }

    // -----------------------------------------------------------------------
    // Structural
    // -----------------------------------------------------------------------

    fn check_structure(&self, doc: &AgentConfiguration, findings: &mut Vec<Finding>) {
        check_length(findings, FieldPath::Name, &doc.name, &self.limits.name);
        check_length(
            findings,
            FieldPath::Description,
            &doc.description,
            &self.limits.description,
        );
        check_length(
            findings,
            FieldPath::SystemPrompt,
            &doc.system_prompt,
            &self.limits.system_prompt,
        );

        if doc.skills.is_empty() {
            findings.push(Finding::error(
                FindingKind::Structural,
                FieldPath::Skills,
                "at least one skill is required",
            ));
        } else if doc.skills.len() > self.max_skills {
            findings.push(Finding::error(
                FindingKind::Structural,
                FieldPath::Skills,
                format!(
                    "at most {} skill(s) may be bound, found {}",
                    self.max_skills,
                    doc.skills.len()
                ),
            ));
        }

        for (i, skill) in doc.skills.iter().enumerate() {
            self.check_skill(i, skill, findings);
        }
    }

    fn check_skill(&self, i: usize, skill: &SkillConfig, findings: &mut Vec<Finding>) {
        let limits = &self.limits;
        check_length(
            findings,
            FieldPath::skill(i, SkillField::Name),
            &skill.name,
            &limits.skill_name,
        );
        check_length(
            findings,
            FieldPath::skill(i, SkillField::WhenToUse),
            &skill.when_to_use,
            &limits.when_to_use,
        );
        check_length(
            findings,
            FieldPath::skill(i, SkillField::Prompt),
            &skill.prompt,
            &limits.skill_prompt,
        );

        for (j, tool) in skill.tools.iter().enumerate() {
            let path = FieldPath::tool(i, j, ToolField::ToolId);
            if tool.tool_id.trim().is_empty() {
                findings.push(Finding::error(
                    FindingKind::Structural,
                    path,
                    "tool_id is required",
                ));
            } else if skill.tools[..j].iter().any(|t| t.tool_id == tool.tool_id) {
                findings.push(Finding::error(
                    FindingKind::Structural,
                    path,
                    format!("tool_id '{}' is bound more than once", tool.tool_id),
                ));
            }
        }
    }

    // -----------------------------------------------------------------------
    // Referential
    // -----------------------------------------------------------------------

    fn check_references(&self, doc: &AgentConfiguration, findings: &mut Vec<Finding>) {
        for (i, skill) in doc.skills.iter().enumerate() {
            for (j, tool) in skill.tools.iter().enumerate() {
                if tool.tool_id.trim().is_empty() {
                    continue;
                }
                let Some(entry) = self.catalog.lookup(&tool.tool_id) else {
                    findings.push(Finding::error(
                        FindingKind::Referential,
                        FieldPath::tool(i, j, ToolField::ToolId),
                        format!("tool '{}' is not in the tool catalog", tool.tool_id),
                    ));
                    continue;
                };
                for key in &entry.config_required {
                    if is_blank(tool.config.get(key)) {
                        findings.push(Finding::error(
                            FindingKind::Referential,
                            FieldPath::tool(i, j, ToolField::ConfigEntry(key.clone())),
                            format!("'{key}' is required by tool '{}'", entry.tool_id),
                        ));
                    }
                }
            }
        }
    }
}

fn check_length(findings: &mut Vec<Finding>, path: FieldPath, value: &str, bound: &LengthBound) {
    if bound.contains(value) {
        return;
    }
    let message = if value.trim().is_empty() {
        "is required".to_string()
    } else {
        format!("must be {}", bound.describe())
    };
    findings.push(Finding::error(FindingKind::Structural, path, message));
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}
