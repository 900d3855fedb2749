//! Mock agent runtime.
//!
//! `MockAgentCreator` instantiates a finished configuration as an in-process
//! agent: every skill is wrapped as a callable tool (agent-as-a-tool) and
//! every bound tool answers with a canned mock response. Instantiated agents
//! stay registered so they can be exercised after the build completes.

use dashmap::DashMap;
use entrance_core::collaborator::AgentCreator;
use entrance_types::agent::{AgentConfiguration, RuntimeHandle, SkillConfig, ToolBinding};
use entrance_types::error::CollaboratorError;
use serde_json::{Map, Value};
use uuid::Uuid;

/// Make `name` a valid function-calling tool name: `^[a-z0-9_-]+$`.
///
/// Lowercases, turns spaces into underscores and drops everything else
/// outside the allowed set. Names that end up empty or start with a digit
/// are prefixed with `skill_`.
pub fn sanitize_tool_name(name: &str) -> String {
    let sanitized: String = name
        .to_lowercase()
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_' || *c == '-')
        .collect();
    match sanitized.chars().next() {
        None => "skill_tool".to_string(),
        Some(first) if first.is_ascii_digit() => format!("skill_{sanitized}"),
        Some(_) => sanitized,
    }
}

// ---------------------------------------------------------------------------
// Runtime objects
// ---------------------------------------------------------------------------

/// A bound tool that answers with a canned response.
#[derive(Debug, Clone, PartialEq)]
pub struct MockTool {
    /// Sanitized callable name.
    pub name: String,
    /// Name as configured.
    pub label: String,
    pub description: String,
    pub config: Map<String, Value>,
}

impl MockTool {
    fn from_binding(binding: &ToolBinding) -> Self {
        let label = if binding.name.trim().is_empty() {
            binding.tool_id.clone()
        } else {
            binding.name.clone()
        };
        Self {
            name: sanitize_tool_name(&label),
            description: format!("Tool: {label}. Config: {}", Value::Object(binding.config.clone())),
            label,
            config: binding.config.clone(),
        }
    }

    pub fn invoke(&self, query: &str) -> String {
        format!("[Mock Response from {}] Successfully processed: {query}", self.label)
    }
}

/// A skill wrapped as a tool of the main agent.
#[derive(Debug, Clone, PartialEq)]
pub struct MockSkill {
    pub name: String,
    pub description: String,
    pub prompt: String,
    pub tools: Vec<MockTool>,
}

impl MockSkill {
    fn from_config(skill: &SkillConfig) -> Self {
        Self {
            name: sanitize_tool_name(&skill.name),
            description: format!("Use this tool when: {}", skill.when_to_use),
            prompt: skill.prompt.clone(),
            tools: skill.tools.iter().map(MockTool::from_binding).collect(),
        }
    }

    /// Run the skill: every bound tool processes the query in order.
    pub fn invoke(&self, query: &str) -> String {
        if self.tools.is_empty() {
            return format!("[{}] {query}", self.name);
        }
        self.tools
            .iter()
            .map(|tool| tool.invoke(query))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MockAgent {
    pub handle: RuntimeHandle,
    pub system_prompt: String,
    pub skills: Vec<MockSkill>,
}

impl MockAgent {
    /// Route `query` to the skill exposed as `entrypoint`.
    pub fn call(&self, entrypoint: &str, query: &str) -> Option<String> {
        self.skills
            .iter()
            .find(|s| s.name == entrypoint)
            .map(|s| s.invoke(query))
    }
}

// ---------------------------------------------------------------------------
// MockAgentCreator
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MockAgentCreator {
    agents: DashMap<Uuid, MockAgent>,
}

impl MockAgentCreator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn agent(&self, agent_id: &Uuid) -> Option<MockAgent> {
        self.agents.get(agent_id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl AgentCreator for MockAgentCreator {
    async fn instantiate(&self, document: &AgentConfiguration) -> Result<RuntimeHandle, CollaboratorError> {
        if document.skills.is_empty() {
            return Err(CollaboratorError::Creation(
                "configuration has no skill to expose".to_string(),
            ));
        }

        let skills: Vec<MockSkill> = document.skills.iter().map(MockSkill::from_config).collect();
        let handle = RuntimeHandle {
            agent_id: Uuid::now_v7(),
            name: document.name.clone(),
            entrypoints: skills.iter().map(|s| s.name.clone()).collect(),
        };
        tracing::info!(
            agent_id = %handle.agent_id,
            name = %handle.name,
            skills = skills.len(),
            "mock agent instantiated"
        );

        self.agents.insert(
            handle.agent_id,
            MockAgent {
                handle: handle.clone(),
                system_prompt: document.system_prompt.clone(),
                skills,
            },
        );
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sanitizes_names_for_function_calling() {
        assert_eq!(sanitize_tool_name("Room Booking"), "room_booking");
        assert_eq!(sanitize_tool_name("send_sms"), "send_sms");
        assert_eq!(sanitize_tool_name("订房 助手"), "_");
        assert_eq!(sanitize_tool_name("24h Desk!"), "skill_24h_desk");
        assert_eq!(sanitize_tool_name("预订"), "skill_tool");
    }

    #[tokio::test]
    async fn instantiated_agent_answers_with_mock_tools() {
        let mut calendar = ToolBinding::new("google_calendar", "google_calendar");
        calendar.config.insert("calendar_id".to_string(), json!("front-desk"));
        let doc = AgentConfiguration {
            name: "Hotel Assistant".to_string(),
            system_prompt: "You are a hotel assistant.".to_string(),
            skills: vec![SkillConfig {
                name: "Room Booking".to_string(),
                when_to_use: "When a guest wants to book a room".to_string(),
                prompt: "Book rooms.".to_string(),
                tools: vec![calendar],
            }],
            ..Default::default()
        };

        let creator = MockAgentCreator::new();
        let handle = creator.instantiate(&doc).await.unwrap();
        assert_eq!(handle.entrypoints, vec!["room_booking".to_string()]);
        assert_eq!(creator.len(), 1);

        let agent = creator.agent(&handle.agent_id).unwrap();
        assert_eq!(
            agent.skills[0].description,
            "Use this tool when: When a guest wants to book a room"
        );
        assert_eq!(
            agent.call("room_booking", "two nights from Friday").unwrap(),
            "[Mock Response from google_calendar] Successfully processed: two nights from Friday"
        );
        assert!(agent.call("unknown", "hi").is_none());
    }

    #[tokio::test]
    async fn skill_less_configuration_is_rejected() {
        let creator = MockAgentCreator::new();
        let err = creator
            .instantiate(&AgentConfiguration::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CollaboratorError::Creation(_)));
        assert!(creator.is_empty());
    }
}
