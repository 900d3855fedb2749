//! Template content generator.
//!
//! A deterministic `ContentGenerator` that drafts names, plans, prompts and a
//! sample conversation from the goal text alone. It never needs a network
//! or a model, so the whole build flow runs offline and in tests. Drafts only
//! ever fill blank fields; the orchestrator additionally restricts content
//! drafts to the fields it asked for.

use entrance_core::collaborator::{ContentGenerator, GenerationRequest, GenerationTarget};
use entrance_types::agent::{AgentConfiguration, SkillConfig};
use entrance_types::error::CollaboratorError;
use entrance_types::patch::{ConfigPatch, PatchOp};
use entrance_types::path::{FieldPath, SkillField};

/// Words skipped when looking for the goal's subject.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "the", "i", "we", "my", "our", "me", "us", "to", "for", "with", "of",
    "in", "on", "that", "who", "which", "can", "could", "would", "want", "need", "needs",
    "like", "help", "helps", "run", "runs", "own", "have", "has", "build", "create", "make",
    "please", "agent", "assistant", "bot", "chatbot", "small", "local", "new", "some",
];

/// Longest description drafted from a goal, in characters.
const MAX_DESCRIPTION_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateContentGenerator;

impl TemplateContentGenerator {
    pub fn new() -> Self {
        Self
    }

    fn agent_name(goal: &str) -> String {
        match subject(goal) {
            Some(subject) => format!("{} Assistant", title_case(&subject)),
            None => "Assistant".to_string(),
        }
    }

    fn plan(goal: &str, doc: &AgentConfiguration) -> ConfigPatch {
        let mut patch = ConfigPatch::new();
        if doc.description.trim().is_empty() {
            patch = patch.set(FieldPath::Description, describe_goal(goal));
        }
        if doc.skills.is_empty() {
            let skill_name = match subject(goal) {
                Some(subject) => format!("{} Support", title_case(&subject)),
                None => "General Support".to_string(),
            };
            patch = patch.with(PatchOp::AppendSkill {
                skill: SkillConfig {
                    name: skill_name,
                    ..Default::default()
                },
            });
        }
        patch
    }

    fn content(doc: &AgentConfiguration, fields: &[FieldPath]) -> ConfigPatch {
        let mut patch = ConfigPatch::new();
        for field in fields {
            match field {
                FieldPath::SystemPrompt => {
                    patch = patch.set(field.clone(), system_prompt(doc));
                }
                FieldPath::Skill(i, SkillField::Prompt) => {
                    if let Some(skill) = doc.skills.get(*i) {
                        patch = patch.set(field.clone(), skill_prompt(doc, skill));
                    }
                }
                other => tracing::debug!(field = %other, "no template for field"),
            }
        }
        patch
    }
}

impl ContentGenerator for TemplateContentGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<ConfigPatch, CollaboratorError> {
        let goal = request.goal.trim();
        match request.target {
            GenerationTarget::AgentName | GenerationTarget::Plan if goal.is_empty() => Err(
                CollaboratorError::Generation("cannot plan an agent without a goal".to_string()),
            ),
            GenerationTarget::AgentName => {
                Ok(ConfigPatch::new().set(FieldPath::Name, Self::agent_name(goal)))
            }
            GenerationTarget::Plan => Ok(Self::plan(goal, &request.document)),
            GenerationTarget::Content => Ok(Self::content(&request.document, &request.fields)),
        }
    }

    async fn sample_conversation(
        &self,
        document: &AgentConfiguration,
    ) -> Result<Option<String>, CollaboratorError> {
        let Some(skill) = document.primary_skill() else {
            return Ok(None);
        };
        let trigger = if skill.when_to_use.trim().is_empty() {
            format!("I need help with {}.", skill.name.to_lowercase())
        } else {
            format!("Hi! {}", sentence(&skill.when_to_use))
        };
        let tools: Vec<&str> = skill.tools.iter().map(|t| t.name.as_str()).collect();
        let action = if tools.is_empty() {
            "Let me look into that for you.".to_string()
        } else {
            format!("I'll take care of that using {}.", tools.join(" and "))
        };
        Ok(Some(format!(
            "**User:** {trigger}\n\n**{name}:** Hello, this is {name}. {action}\n\n\
             **User:** Thanks!\n\n**{name}:** You're welcome. Anything else I can do?",
            name = document.name,
        )))
    }
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

fn system_prompt(doc: &AgentConfiguration) -> String {
    let mut prompt = format!("You are {}.", name_or_default(doc));
    if !doc.description.trim().is_empty() {
        prompt.push(' ');
        prompt.push_str(&sentence(&doc.description));
    }
    prompt.push_str(
        " Be friendly and concise. Confirm important details before acting \
         and hand the conversation to a human when you cannot help.",
    );
    prompt
}

fn skill_prompt(doc: &AgentConfiguration, skill: &SkillConfig) -> String {
    let mut prompt = format!(
        "You handle the \"{}\" requests for {}.",
        skill.name,
        name_or_default(doc)
    );
    if !skill.when_to_use.trim().is_empty() {
        prompt.push_str(&format!(" You are used {}", lower_first(&sentence(&skill.when_to_use))));
    }
    prompt.push_str(" Ask for any missing detail before using a tool.");
    prompt
}

fn name_or_default(doc: &AgentConfiguration) -> &str {
    if doc.name.trim().is_empty() {
        "an assistant"
    } else {
        doc.name.trim()
    }
}

fn describe_goal(goal: &str) -> String {
    let first = goal
        .split(['.', '!', '?', '\n'])
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or(goal);
    let text: String = first.chars().take(MAX_DESCRIPTION_CHARS).collect();
    sentence(&text)
}

/// First word of `goal` that is not a stopword, lowercased.
fn subject(goal: &str) -> Option<String> {
    goal.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .find(|w| w.len() > 1 && !STOPWORDS.contains(&w.as_str()))
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn lower_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Capitalize and make sure the text ends with a full stop.
fn sentence(text: &str) -> String {
    let text = title_case(text.trim());
    if text.ends_with(['.', '!', '?']) {
        text
    } else {
        format!("{text}.")
    }
}
