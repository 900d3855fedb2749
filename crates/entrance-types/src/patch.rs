//! Incremental patches against the configuration document.
//!
//! A patch lists only what changed. Applying it is the store's job
//! (`entrance_core::store`); this module defines the wire shape.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::{AgentConfiguration, SkillConfig, ToolBinding};
use crate::path::FieldPath;

/// One structural or field-level edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PatchOp {
    /// Assign `value` at `path`.
    Set { path: FieldPath, value: Value },
    AppendSkill { skill: SkillConfig },
    RemoveSkill { index: usize },
    AppendTool { skill: usize, tool: ToolBinding },
    ReplaceTool {
        skill: usize,
        index: usize,
        tool: ToolBinding,
    },
    RemoveTool { skill: usize, tool_id: String },
    /// Whole-document replacement. Only rollback writes this.
    Replace { document: AgentConfiguration },
}

impl PatchOp {
    /// Short description for audit listings.
    pub fn summary(&self) -> String {
        match self {
            Self::Set { path, .. } => format!("set {path}"),
            Self::AppendSkill { skill } => format!("append skill '{}'", skill.name),
            Self::RemoveSkill { index } => format!("remove skills[{index}]"),
            Self::AppendTool { skill, tool } => {
                format!("append tool '{}' to skills[{skill}]", tool.tool_id)
            }
            Self::ReplaceTool { skill, index, tool } => {
                format!("replace skills[{skill}].tools[{index}] with '{}'", tool.tool_id)
            }
            Self::RemoveTool { skill, tool_id } => {
                format!("remove tool '{tool_id}' from skills[{skill}]")
            }
            Self::Replace { .. } => "replace document".to_string(),
        }
    }
}

/// An ordered list of edits applied atomically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigPatch {
    #[serde(default)]
    pub ops: Vec<PatchOp>,
}

impl ConfigPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style `set` operation.
    pub fn set(mut self, path: FieldPath, value: impl Into<Value>) -> Self {
        self.ops.push(PatchOp::Set {
            path,
            value: value.into(),
        });
        self
    }

    /// Builder-style append of an arbitrary operation.
    pub fn with(mut self, op: PatchOp) -> Self {
        self.ops.push(op);
        self
    }

    /// Append all operations of `other` after this patch's operations.
    pub fn extend(&mut self, other: ConfigPatch) {
        self.ops.extend(other.ops);
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Paths touched by `set` operations, in order.
    pub fn touched_paths(&self) -> impl Iterator<Item = &FieldPath> {
        self.ops.iter().filter_map(|op| match op {
            PatchOp::Set { path, .. } => Some(path),
            _ => None,
        })
    }
}

impl fmt::Display for ConfigPatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.ops.iter().map(PatchOp::summary).collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Who produced a patch. Recorded on every version for audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchSource {
    Planning,
    Generating,
    /// Answers to an information request or a confirmation edit.
    User,
}

impl fmt::Display for PatchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Planning => write!(f, "planning"),
            Self::Generating => write!(f, "generating"),
            Self::User => write!(f, "user"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::SkillField;
    use serde_json::json;

    #[test]
    fn ops_serialize_with_op_tag() {
        let patch = ConfigPatch::new()
            .set(FieldPath::Name, "Hotel Assistant")
            .with(PatchOp::RemoveTool {
                skill: 0,
                tool_id: "sms".to_string(),
            });

        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(
            value,
            json!({"ops": [
                {"op": "set", "path": "name", "value": "Hotel Assistant"},
                {"op": "remove_tool", "skill": 0, "tool_id": "sms"}
            ]})
        );
    }

    #[test]
    fn deserializes_from_wire_json() {
        let patch: ConfigPatch = serde_json::from_value(json!({"ops": [
            {"op": "set", "path": "skills[0].when_to_use", "value": "When guests ask about rooms"},
            {"op": "append_tool", "skill": 0, "tool": {"tool_id": "email", "name": "send_email"}}
        ]}))
        .unwrap();

        assert_eq!(patch.len(), 2);
        let touched: Vec<_> = patch.touched_paths().collect();
        assert_eq!(touched, vec![&FieldPath::skill(0, SkillField::WhenToUse)]);
    }

    #[test]
    fn display_lists_summaries() {
        let patch = ConfigPatch::new()
            .set(FieldPath::Description, "x")
            .with(PatchOp::RemoveSkill { index: 1 });
        assert_eq!(patch.to_string(), "set description; remove skills[1]");
    }
}
