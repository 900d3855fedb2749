//! Rule-of-thumb quality review.
//!
//! Findings from here are advisory; the validator records them as warnings
//! and never lets them block a build.

use entrance_core::collaborator::QualityReviewer;
use entrance_types::agent::AgentConfiguration;
use entrance_types::path::{FieldPath, SkillField};
use entrance_types::validation::{Finding, FindingKind};

/// System prompts shorter than this are flagged as thin.
const THIN_PROMPT_CHARS: usize = 40;

#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicReviewer;

impl QualityReviewer for HeuristicReviewer {
    fn review(&self, document: &AgentConfiguration) -> Vec<Finding> {
        let mut findings = Vec::new();

        let prompt = document.system_prompt.trim();
        if !prompt.is_empty() && prompt.chars().count() < THIN_PROMPT_CHARS {
            findings.push(Finding::warning(
                FindingKind::Quality,
                FieldPath::SystemPrompt,
                "system prompt is very short; describe tone and boundaries",
            ));
        }

        for (i, skill) in document.skills.iter().enumerate() {
            if skill.tools.is_empty() {
                findings.push(Finding::warning(
                    FindingKind::Quality,
                    FieldPath::skill(i, SkillField::Tools),
                    "skill has no tools and can only answer from its prompt",
                ));
            }
            let trigger = skill.when_to_use.trim();
            if !trigger.is_empty() && trigger.eq_ignore_ascii_case(document.description.trim()) {
                findings.push(Finding::warning(
                    FindingKind::Quality,
                    FieldPath::skill(i, SkillField::WhenToUse),
                    "usage trigger repeats the agent description; say when to route here",
                ));
            }
        }
        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entrance_types::agent::{SkillConfig, ToolBinding};

    #[test]
    fn flags_thin_prompt_and_toolless_skill() {
        let doc = AgentConfiguration {
            description: "Books rooms".to_string(),
            system_prompt: "Be nice.".to_string(),
            skills: vec![SkillConfig {
                when_to_use: "books rooms".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let findings = HeuristicReviewer.review(&doc);
        let paths: Vec<String> = findings.iter().map(|f| f.path.to_string()).collect();
        assert_eq!(
            paths,
            vec!["system_prompt", "skills[0].tools", "skills[0].when_to_use"]
        );
    }

    #[test]
    fn well_formed_document_passes_quietly() {
        let doc = AgentConfiguration {
            description: "Books rooms".to_string(),
            system_prompt: "You are a hotel assistant. Confirm dates before booking.".to_string(),
            skills: vec![SkillConfig {
                when_to_use: "When a guest wants to book a room".to_string(),
                tools: vec![ToolBinding::new("google_calendar", "google_calendar")],
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(HeuristicReviewer.review(&doc).is_empty());
    }
}
