//! Applying a `ConfigPatch` to a document.
//!
//! Application is atomic: operations run against a copy of the document and
//! the copy is returned only if every operation resolved and the result
//! still has unique tool ids per skill.

use entrance_types::agent::{AgentConfiguration, SkillConfig};
use entrance_types::error::PatchError;
use entrance_types::patch::{ConfigPatch, PatchOp};
use entrance_types::path::{FieldPath, SkillField, ToolField};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Apply `patch` to `doc`, returning the new document.
pub fn apply_patch(
    doc: &AgentConfiguration,
    patch: &ConfigPatch,
) -> Result<AgentConfiguration, PatchError> {
    if patch.is_empty() {
        return Err(PatchError::EmptyPatch);
    }

    let mut next = doc.clone();
    for op in &patch.ops {
        apply_op(&mut next, op)?;
    }
    check_unique_tool_ids(&next)?;
    Ok(next)
}

fn apply_op(doc: &mut AgentConfiguration, op: &PatchOp) -> Result<(), PatchError> {
    match op {
        PatchOp::Set { path, value } => set_value(doc, path, value),
        PatchOp::AppendSkill { skill } => {
            doc.skills.push(skill.clone());
            Ok(())
        }
        PatchOp::RemoveSkill { index } => {
            if *index >= doc.skills.len() {
                return Err(not_found(format!("skills[{index}]")));
            }
            doc.skills.remove(*index);
            Ok(())
        }
        PatchOp::AppendTool { skill, tool } => {
            skill_mut(doc, *skill)?.tools.push(tool.clone());
            Ok(())
        }
        PatchOp::ReplaceTool { skill, index, tool } => {
            let target = skill_mut(doc, *skill)?;
            let slot = target
                .tools
                .get_mut(*index)
                .ok_or_else(|| not_found(format!("skills[{skill}].tools[{index}]")))?;
            *slot = tool.clone();
            Ok(())
        }
        PatchOp::RemoveTool { skill, tool_id } => {
            let target = skill_mut(doc, *skill)?;
            let position = target
                .tool_position(tool_id)
                .ok_or_else(|| PatchError::UnknownToolId {
                    skill: *skill,
                    tool_id: tool_id.clone(),
                })?;
            target.tools.remove(position);
            Ok(())
        }
        PatchOp::Replace { document } => {
            *doc = document.clone();
            Ok(())
        }
    }
}

fn set_value(doc: &mut AgentConfiguration, path: &FieldPath, value: &Value) -> Result<(), PatchError> {
    match path {
        FieldPath::Name => doc.name = expect_string(path, value)?,
        FieldPath::Description => doc.description = expect_string(path, value)?,
        FieldPath::SystemPrompt => doc.system_prompt = expect_string(path, value)?,
        FieldPath::Skills => doc.skills = expect_json(path, value, "an array of skills")?,
        FieldPath::Skill(index, field) => {
            let skill = doc
                .skills
                .get_mut(*index)
                .ok_or_else(|| not_found(path.to_string()))?;
            match field {
                SkillField::Name => skill.name = expect_string(path, value)?,
                SkillField::WhenToUse => skill.when_to_use = expect_string(path, value)?,
                SkillField::Prompt => skill.prompt = expect_string(path, value)?,
                SkillField::Tools => {
                    skill.tools = expect_json(path, value, "an array of tool bindings")?
                }
                SkillField::Tool(tool_index, tool_field) => {
                    let tool = skill
                        .tools
                        .get_mut(*tool_index)
                        .ok_or_else(|| not_found(path.to_string()))?;
                    match tool_field {
                        ToolField::ToolId => tool.tool_id = expect_string(path, value)?,
                        ToolField::Name => tool.name = expect_string(path, value)?,
                        ToolField::Config => match value {
                            Value::Object(map) => tool.config = map.clone(),
                            _ => {
                                return Err(PatchError::TypeMismatch {
                                    path: path.clone(),
                                    expected: "an object",
                                });
                            }
                        },
                        // Null clears the entry.
                        ToolField::ConfigEntry(key) => {
                            if value.is_null() {
                                tool.config.remove(key);
                            } else {
                                tool.config.insert(key.clone(), value.clone());
                            }
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

fn skill_mut(doc: &mut AgentConfiguration, index: usize) -> Result<&mut SkillConfig, PatchError> {
    doc.skills
        .get_mut(index)
        .ok_or_else(|| not_found(format!("skills[{index}]")))
}

fn expect_string(path: &FieldPath, value: &Value) -> Result<String, PatchError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| PatchError::TypeMismatch {
            path: path.clone(),
            expected: "a string",
        })
}

fn expect_json<T: DeserializeOwned>(
    path: &FieldPath,
    value: &Value,
    expected: &'static str,
) -> Result<T, PatchError> {
    serde_json::from_value(value.clone()).map_err(|_| PatchError::TypeMismatch {
        path: path.clone(),
        expected,
    })
}

fn not_found(path: String) -> PatchError {
    PatchError::PathNotFound { path }
}

/// Store-level structural invariant: tool ids are unique within a skill.
pub fn check_unique_tool_ids(doc: &AgentConfiguration) -> Result<(), PatchError> {
    for (skill_index, skill) in doc.skills.iter().enumerate() {
        for (i, tool) in skill.tools.iter().enumerate() {
            if skill.tools[..i].iter().any(|t| t.tool_id == tool.tool_id) {
                return Err(PatchError::DuplicateToolId {
                    skill: skill_index,
                    tool_id: tool.tool_id.clone(),
                });
            }
        }
    }
    Ok(())
}
