//! Typed field paths into the configuration document.
//!
//! A `FieldPath` addresses one field (or one list) of an `AgentConfiguration`.
//! The canonical string form is what findings, information requests and
//! `set` patch operations carry on the wire:
//!
//! ```text
//! name | description | system_prompt | skills
//! skills[0].name | skills[0].when_to_use | skills[0].prompt | skills[0].tools
//! skills[0].tools[1].tool_id | .name | .config | .config.calendar_id
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A string that does not name a field of the configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid field path: '{0}'")]
pub struct InvalidFieldPath(pub String);

/// Address of a field in the configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FieldPath {
    Name,
    Description,
    SystemPrompt,
    /// The skill list as a whole.
    Skills,
    /// A field of the skill at the given index.
    Skill(usize, SkillField),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SkillField {
    Name,
    WhenToUse,
    Prompt,
    /// The tool list as a whole.
    Tools,
    Tool(usize, ToolField),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ToolField {
    ToolId,
    Name,
    /// The whole config map.
    Config,
    /// One key inside the config map.
    ConfigEntry(String),
}

impl FieldPath {
    pub fn skill(index: usize, field: SkillField) -> Self {
        Self::Skill(index, field)
    }

    pub fn tool(skill: usize, tool: usize, field: ToolField) -> Self {
        Self::Skill(skill, SkillField::Tool(tool, field))
    }

    /// Index of the skill this path points into, if any.
    pub fn skill_index(&self) -> Option<usize> {
        match self {
            Self::Skill(index, _) => Some(*index),
            _ => None,
        }
    }

    /// Human-readable label used when prompting for this field.
    pub fn label(&self) -> String {
        match self {
            Self::Name => "Agent name".to_string(),
            Self::Description => "Agent description".to_string(),
            Self::SystemPrompt => "System prompt".to_string(),
            Self::Skills => "Skills".to_string(),
            Self::Skill(i, field) => {
                let n = i + 1;
                match field {
                    SkillField::Name => format!("Skill {n} name"),
                    SkillField::WhenToUse => format!("When to use skill {n}"),
                    SkillField::Prompt => format!("Skill {n} prompt"),
                    SkillField::Tools => format!("Skill {n} tools"),
                    SkillField::Tool(j, tool_field) => {
                        let m = j + 1;
                        match tool_field {
                            ToolField::ToolId => format!("Skill {n} tool {m} id"),
                            ToolField::Name => format!("Skill {n} tool {m} name"),
                            ToolField::Config => format!("Skill {n} tool {m} config"),
                            ToolField::ConfigEntry(key) => {
                                format!("Skill {n} tool {m} setting '{key}'")
                            }
                        }
                    }
                }
            }
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name => write!(f, "name"),
            Self::Description => write!(f, "description"),
            Self::SystemPrompt => write!(f, "system_prompt"),
            Self::Skills => write!(f, "skills"),
            Self::Skill(i, field) => {
                write!(f, "skills[{i}].")?;
                match field {
                    SkillField::Name => write!(f, "name"),
                    SkillField::WhenToUse => write!(f, "when_to_use"),
                    SkillField::Prompt => write!(f, "prompt"),
                    SkillField::Tools => write!(f, "tools"),
                    SkillField::Tool(j, tool_field) => {
                        write!(f, "tools[{j}].")?;
                        match tool_field {
                            ToolField::ToolId => write!(f, "tool_id"),
                            ToolField::Name => write!(f, "name"),
                            ToolField::Config => write!(f, "config"),
                            ToolField::ConfigEntry(key) => write!(f, "config.{key}"),
                        }
                    }
                }
            }
        }
    }
}

/// Parse `"<list>[<index>]"` out of the head of `s`, returning the index and
/// whatever follows the closing bracket.
fn split_indexed<'a>(s: &'a str, list: &str) -> Option<(usize, &'a str)> {
    let rest = s.strip_prefix(list)?.strip_prefix('[')?;
    let close = rest.find(']')?;
    let index = rest[..close].parse().ok()?;
    Some((index, &rest[close + 1..]))
}

fn parse_tool_field(s: &str) -> Option<ToolField> {
    match s {
        "tool_id" => Some(ToolField::ToolId),
        "name" => Some(ToolField::Name),
        "config" => Some(ToolField::Config),
        other => {
            let key = other.strip_prefix("config.")?;
            (!key.is_empty()).then(|| ToolField::ConfigEntry(key.to_string()))
        }
    }
}

fn parse_skill_field(s: &str) -> Option<SkillField> {
    match s {
        "name" => Some(SkillField::Name),
        "when_to_use" => Some(SkillField::WhenToUse),
        "prompt" => Some(SkillField::Prompt),
        "tools" => Some(SkillField::Tools),
        other => {
            let (index, rest) = split_indexed(other, "tools")?;
            let field = parse_tool_field(rest.strip_prefix('.')?)?;
            Some(SkillField::Tool(index, field))
        }
    }
}

impl FromStr for FieldPath {
    type Err = InvalidFieldPath;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let parsed = match trimmed {
            "name" => Some(Self::Name),
            "description" => Some(Self::Description),
            "system_prompt" => Some(Self::SystemPrompt),
            "skills" => Some(Self::Skills),
            other => split_indexed(other, "skills").and_then(|(index, rest)| {
                let field = parse_skill_field(rest.strip_prefix('.')?)?;
                Some(Self::Skill(index, field))
            }),
        };
        parsed.ok_or_else(|| InvalidFieldPath(s.to_string()))
    }
}

impl TryFrom<String> for FieldPath {
    type Error = InvalidFieldPath;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.to_string()
    }
}
