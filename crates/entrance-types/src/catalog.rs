//! Tool catalog entries.

use serde::{Deserialize, Serialize};

/// A tool that skills may bind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogTool {
    pub tool_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Config keys a binding must set for the tool to work.
    #[serde(default)]
    pub config_required: Vec<String>,
}

impl CatalogTool {
    pub fn new(tool_id: &str, name: &str, description: &str, config_required: &[&str]) -> Self {
        Self {
            tool_id: tool_id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            config_required: config_required.iter().map(|k| k.to_string()).collect(),
        }
    }
}
