//! The entrance agent configuration document.
//!
//! This is the artifact a build session assembles: identity, system prompt
//! and the bound skill with its tools. The JSON shape of these types is the
//! wire format shared by the CLI, the REST API and persisted versions.
//!
//! Length bounds and the skill-count policy are NOT enforced here; the
//! validator owns those rules so that partially built documents stay
//! representable.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// The configuration document being built.
///
/// A fresh document is "empty but well typed": every string is empty and the
/// skill list has no entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentConfiguration {
    /// Display name of the agent.
    #[serde(default)]
    pub name: String,
    /// What the agent does, shown in listings.
    #[serde(default)]
    pub description: String,
    /// Prompt defining the agent's role and behavior.
    #[serde(default)]
    pub system_prompt: String,
    /// Bound skills, in routing order.
    #[serde(default)]
    pub skills: Vec<SkillConfig>,
}

impl AgentConfiguration {
    /// Whether nothing has been written into the document yet.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
            && self.description.is_empty()
            && self.system_prompt.is_empty()
            && self.skills.is_empty()
    }

    /// The first skill, if any. This system binds exactly one.
    pub fn primary_skill(&self) -> Option<&SkillConfig> {
        self.skills.first()
    }
}

/// A single bound sub-capability with its own prompt and tools.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillConfig {
    #[serde(default)]
    pub name: String,
    /// Usage trigger, consulted when routing a user turn to this skill.
    #[serde(default)]
    pub when_to_use: String,
    /// Skill-specific prompt.
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub tools: Vec<ToolBinding>,
}

impl SkillConfig {
    /// Position of the tool bound under `tool_id`, if present.
    pub fn tool_position(&self, tool_id: &str) -> Option<usize> {
        self.tools.iter().position(|t| t.tool_id == tool_id)
    }
}

/// A tool bound to a skill.
///
/// `tool_id` must be unique within its skill and must resolve against the
/// tool catalog. `config` is an opaque key/value map passed to the tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolBinding {
    pub tool_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl ToolBinding {
    /// Create a binding with an empty config.
    pub fn new(tool_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            tool_id: tool_id.into(),
            name: name.into(),
            config: Map::new(),
        }
    }
}

/// Handle to a runtime agent instantiated from a final configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeHandle {
    /// Identifier assigned by the creation collaborator.
    pub agent_id: Uuid,
    /// Agent display name at creation time.
    pub name: String,
    /// Callable names exposed by the runtime (skills wrapped as tools).
    #[serde(default)]
    pub entrypoints: Vec<String>,
}
