//! Field bookkeeping for the collecting and generating phases.

use entrance_types::agent::{AgentConfiguration, SkillConfig, ToolBinding};
use entrance_types::patch::{ConfigPatch, PatchOp};
use entrance_types::path::{FieldPath, SkillField, ToolField};
use serde_json::Value;

/// Fields the next information request should ask for.
///
/// Paths flagged by the last failed validation come first. After those, the
/// first incomplete target: base info (name, description), then the primary
/// skill's name and trigger.
pub fn missing_fields(doc: &AgentConfiguration, flagged: &[FieldPath]) -> Vec<FieldPath> {
    let mut fields: Vec<FieldPath> = Vec::new();
    for path in flagged {
        // "No skill at all" is answered by filling in the first skill.
        let expanded = if *path == FieldPath::Skills && doc.skills.is_empty() {
            skill_target(0)
        } else {
            vec![path.clone()]
        };
        for p in expanded {
            if !fields.contains(&p) {
                fields.push(p);
            }
        }
    }

    let base = [FieldPath::Name, FieldPath::Description];
    let target: Vec<FieldPath> = if base.iter().any(|p| is_blank(doc, p)) {
        base.to_vec()
    } else {
        skill_target(0)
    };
    for path in target {
        if is_blank(doc, &path) && !fields.contains(&path) {
            fields.push(path);
        }
    }
    fields
}

fn skill_target(index: usize) -> Vec<FieldPath> {
    vec![
        FieldPath::skill(index, SkillField::Name),
        FieldPath::skill(index, SkillField::WhenToUse),
    ]
}

/// Whether the string field at `path` is empty or missing.
pub fn is_blank(doc: &AgentConfiguration, path: &FieldPath) -> bool {
    current_value(doc, path).is_none_or(|v| match v {
        Value::String(s) => s.trim().is_empty(),
        Value::Null => true,
        _ => false,
    })
}

/// Current value at `path` as JSON, if the path resolves.
pub fn current_value(doc: &AgentConfiguration, path: &FieldPath) -> Option<Value> {
    let text = |s: &String| Some(Value::String(s.clone()));
    match path {
        FieldPath::Name => text(&doc.name),
        FieldPath::Description => text(&doc.description),
        FieldPath::SystemPrompt => text(&doc.system_prompt),
        FieldPath::Skills => serde_json::to_value(&doc.skills).ok(),
        FieldPath::Skill(i, field) => {
            let skill = doc.skills.get(*i)?;
            match field {
                SkillField::Name => text(&skill.name),
                SkillField::WhenToUse => text(&skill.when_to_use),
                SkillField::Prompt => text(&skill.prompt),
                SkillField::Tools => serde_json::to_value(&skill.tools).ok(),
                SkillField::Tool(j, tool_field) => {
                    let tool = skill.tools.get(*j)?;
                    match tool_field {
                        ToolField::ToolId => text(&tool.tool_id),
                        ToolField::Name => text(&tool.name),
                        ToolField::Config => Some(Value::Object(tool.config.clone())),
                        ToolField::ConfigEntry(key) => tool.config.get(key).cloned(),
                    }
                }
            }
        }
    }
}

/// Prefix `patch` with the skill and tool slots its `set` paths address
/// one past the end of the current lists.
///
/// Lets an answer for `skills[0].when_to_use` land in a document that has no
/// skill yet, and an answer for `skills[0].tools[2].tool_id` add a third tool.
pub fn with_slots(doc: &AgentConfiguration, patch: ConfigPatch) -> ConfigPatch {
    let mut skill_count = doc.skills.len();
    let mut tool_counts: Vec<usize> = doc.skills.iter().map(|s| s.tools.len()).collect();
    let mut slots = ConfigPatch::new();

    for path in patch.touched_paths() {
        let FieldPath::Skill(i, field) = path else {
            continue;
        };
        if *i == skill_count {
            slots = slots.with(PatchOp::AppendSkill {
                skill: SkillConfig::default(),
            });
            skill_count += 1;
            tool_counts.push(0);
        }
        if let (SkillField::Tool(j, _), Some(count)) = (field, tool_counts.get_mut(*i)) {
            if *j == *count {
                slots = slots.with(PatchOp::AppendTool {
                    skill: *i,
                    tool: ToolBinding::default(),
                });
                *count += 1;
            }
        }
    }

    slots.extend(patch);
    slots
}

/// Prose fields still empty and eligible for drafting.
///
/// Generation only fills gaps, so anything the user wrote survives an
/// edit-and-regenerate round.
pub fn draftable_fields(doc: &AgentConfiguration) -> Vec<FieldPath> {
    let mut fields = Vec::new();
    if doc.system_prompt.trim().is_empty() {
        fields.push(FieldPath::SystemPrompt);
    }
    for (i, skill) in doc.skills.iter().enumerate() {
        if skill.prompt.trim().is_empty() {
            fields.push(FieldPath::skill(i, SkillField::Prompt));
        }
    }
    fields
}

/// Keep only `set` operations on `allowed` paths.
pub fn restrict_to(patch: ConfigPatch, allowed: &[FieldPath]) -> ConfigPatch {
    ConfigPatch {
        ops: patch
            .ops
            .into_iter()
            .filter(|op| matches!(op, PatchOp::Set { path, .. } if allowed.contains(path)))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> FieldPath {
        s.parse().unwrap()
    }

    #[test]
    fn base_info_is_asked_before_skill() {
        let fields = missing_fields(&AgentConfiguration::default(), &[]);
        assert_eq!(fields, vec![FieldPath::Name, FieldPath::Description]);
    }

    #[test]
    fn skill_trigger_is_asked_once_base_is_complete() {
        let doc = AgentConfiguration {
            name: "Hotel Assistant".to_string(),
            description: "Books rooms".to_string(),
            skills: vec![SkillConfig {
                name: "Booking".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert_eq!(missing_fields(&doc, &[]), vec![path("skills[0].when_to_use")]);
    }

    #[test]
    fn flagged_paths_come_first() {
        let doc = AgentConfiguration {
            name: "Hotel Assistant".to_string(),
            ..Default::default()
        };
        let flagged = vec![path("system_prompt"), FieldPath::Skills];
        assert_eq!(
            missing_fields(&doc, &flagged),
            vec![
                path("system_prompt"),
                path("skills[0].name"),
                path("skills[0].when_to_use"),
                FieldPath::Description,
            ]
        );
    }

    #[test]
    fn slots_are_added_for_new_indices() {
        let patch = ConfigPatch::new()
            .set(path("skills[0].when_to_use"), "When guests ask about rooms")
            .set(path("skills[0].tools[0].tool_id"), "sms");
        let slotted = with_slots(&AgentConfiguration::default(), patch);
        assert_eq!(slotted.len(), 4);
        assert!(matches!(slotted.ops[0], PatchOp::AppendSkill { .. }));
        assert!(matches!(slotted.ops[1], PatchOp::AppendTool { skill: 0, .. }));

        let doc = crate::store::apply_patch(&AgentConfiguration::default(), &slotted).unwrap();
        assert_eq!(doc.skills[0].tools[0].tool_id, "sms");
    }

    #[test]
    fn existing_indices_need_no_slots() {
        let doc = AgentConfiguration {
            skills: vec![SkillConfig::default()],
            ..Default::default()
        };
        let patch = ConfigPatch::new().set(path("skills[0].name"), "Booking");
        assert_eq!(with_slots(&doc, patch.clone()), patch);
    }

    #[test]
    fn drafting_skips_user_content() {
        let doc = AgentConfiguration {
            system_prompt: "Written by the user.".to_string(),
            skills: vec![SkillConfig::default()],
            ..Default::default()
        };
        assert_eq!(draftable_fields(&doc), vec![path("skills[0].prompt")]);

        let drafted = ConfigPatch::new()
            .set(FieldPath::SystemPrompt, "Generated prompt")
            .set(path("skills[0].prompt"), "Generated skill prompt");
        let kept = restrict_to(drafted, &draftable_fields(&doc));
        assert_eq!(kept.len(), 1);
    }
}
