//! Field-level diff between two configuration documents.
//!
//! Shown in confirmation interactions so the user sees what changed since
//! the last time they were asked.

use std::fmt;

use entrance_types::agent::AgentConfiguration;
use entrance_types::path::{FieldPath, SkillField, ToolField};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Removed => write!(f, "removed"),
            Self::Modified => write!(f, "modified"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub path: FieldPath,
    pub kind: ChangeKind,
    pub before: Option<Value>,
    pub after: Option<Value>,
}

impl FieldChange {
    /// One-line rendering, e.g. `"Booking" -> "Reservations"`.
    pub fn describe(&self) -> String {
        match (&self.before, &self.after) {
            (None, Some(after)) => render(after),
            (Some(before), None) => format!("(removed) {}", render(before)),
            (Some(before), Some(after)) => format!("{} -> {}", render(before), render(after)),
            (None, None) => String::new(),
        }
    }
}

/// Leaf changes from `before` to `after`, in document order.
pub fn diff(before: &AgentConfiguration, after: &AgentConfiguration) -> Vec<FieldChange> {
    let old = leaves(before);
    let new = leaves(after);
    let mut changes = Vec::new();

    for (path, value) in &new {
        match old.iter().find(|(p, _)| p == path) {
            Some((_, previous)) if previous == value => {}
            Some((_, previous)) => changes.push(FieldChange {
                path: path.clone(),
                kind: ChangeKind::Modified,
                before: Some(previous.clone()),
                after: Some(value.clone()),
            }),
            None => changes.push(FieldChange {
                path: path.clone(),
                kind: ChangeKind::Added,
                before: None,
                after: Some(value.clone()),
            }),
        }
    }
    for (path, value) in &old {
        if !new.iter().any(|(p, _)| p == path) {
            changes.push(FieldChange {
                path: path.clone(),
                kind: ChangeKind::Removed,
                before: Some(value.clone()),
                after: None,
            });
        }
    }
    changes
}

/// Flatten a document into (path, value) pairs. Empty strings are absent.
fn leaves(doc: &AgentConfiguration) -> Vec<(FieldPath, Value)> {
    let mut out = Vec::new();
    push_str(&mut out, FieldPath::Name, &doc.name);
    push_str(&mut out, FieldPath::Description, &doc.description);
    push_str(&mut out, FieldPath::SystemPrompt, &doc.system_prompt);

    for (i, skill) in doc.skills.iter().enumerate() {
        push_str(&mut out, FieldPath::skill(i, SkillField::Name), &skill.name);
        push_str(&mut out, FieldPath::skill(i, SkillField::WhenToUse), &skill.when_to_use);
        push_str(&mut out, FieldPath::skill(i, SkillField::Prompt), &skill.prompt);
        for (j, tool) in skill.tools.iter().enumerate() {
            push_str(&mut out, FieldPath::tool(i, j, ToolField::ToolId), &tool.tool_id);
            push_str(&mut out, FieldPath::tool(i, j, ToolField::Name), &tool.name);
            for (key, value) in &tool.config {
                out.push((
                    FieldPath::tool(i, j, ToolField::ConfigEntry(key.clone())),
                    value.clone(),
                ));
            }
        }
    }
    out
}

fn push_str(out: &mut Vec<(FieldPath, Value)>, path: FieldPath, value: &str) {
    if !value.is_empty() {
        out.push((path, Value::String(value.to_string())));
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{s}\""),
        other => other.to_string(),
    }
}
