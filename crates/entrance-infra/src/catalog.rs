//! Built-in tool catalog.
//!
//! The tools a skill may bind out of the box, optionally extended by
//! `[[tools]]` entries in `config.toml`.

use entrance_core::collaborator::ToolCatalog;
use entrance_types::catalog::CatalogTool;

/// Static, in-memory tool catalog.
#[derive(Debug, Clone)]
pub struct StaticToolCatalog {
    tools: Vec<CatalogTool>,
}

impl StaticToolCatalog {
    /// The built-in tools only.
    pub fn builtin() -> Self {
        Self {
            tools: builtin_tools(),
        }
    }

    /// Built-in tools plus `extras`. An extra with a built-in `tool_id`
    /// replaces the built-in entry.
    pub fn with_extras(extras: Vec<CatalogTool>) -> Self {
        let mut catalog = Self::builtin();
        for tool in extras {
            match catalog.tools.iter_mut().find(|t| t.tool_id == tool.tool_id) {
                Some(existing) => {
                    tracing::debug!(tool_id = %tool.tool_id, "catalog entry overridden by config");
                    *existing = tool;
                }
                None => catalog.tools.push(tool),
            }
        }
        catalog
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for StaticToolCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ToolCatalog for StaticToolCatalog {
    fn lookup(&self, tool_id: &str) -> Option<CatalogTool> {
        self.tools.iter().find(|t| t.tool_id == tool_id).cloned()
    }

    fn list(&self) -> Vec<CatalogTool> {
        self.tools.clone()
    }
}

fn builtin_tools() -> Vec<CatalogTool> {
    vec![
        CatalogTool::new("sms", "send_sms", "Send an SMS to the user (voice scenarios)", &[]),
        CatalogTool::new("email", "send_email", "Send an email to the user", &[]),
        CatalogTool::new(
            "google_calendar",
            "google_calendar",
            "Read and write a Google Calendar",
            &["calendar_id"],
        ),
        CatalogTool::new(
            "google_sheet",
            "google_sheet",
            "Read and write a Google Sheet",
            &["sheet_id"],
        ),
        CatalogTool::new("shopify", "shopify", "Product recommendations from Shopify", &[]),
        CatalogTool::new("amazon", "amazon", "Product information from Amazon", &[]),
        CatalogTool::new("rakuten", "rakuten", "Rakuten e-commerce integration", &[]),
        CatalogTool::new(
            "logistics_tracking",
            "logistics_tracking",
            "Track shipments and deliveries",
            &[],
        ),
        CatalogTool::new(
            "knowledge_search",
            "knowledge_search",
            "Answer from the agent's knowledge base",
            &[],
        ),
        CatalogTool::new("transfer", "transfer_to_human", "Hand the conversation to a human", &[]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_has_ten_tools() {
        let catalog = StaticToolCatalog::builtin();
        assert_eq!(catalog.len(), 10);
        assert!(catalog.exists("transfer"));
        assert!(!catalog.exists("transfer_to_human"));
        assert_eq!(
            catalog.lookup("google_sheet").unwrap().config_required,
            vec!["sheet_id".to_string()]
        );
    }

    #[test]
    fn extras_extend_and_override() {
        let catalog = StaticToolCatalog::with_extras(vec![
            CatalogTool::new("pms", "property_management", "Hotel PMS", &["property_id"]),
            CatalogTool::new("sms", "send_sms", "Twilio SMS", &["from_number"]),
        ]);
        assert_eq!(catalog.len(), 11);
        assert!(catalog.exists("pms"));
        assert_eq!(
            catalog.lookup("sms").unwrap().config_required,
            vec!["from_number".to_string()]
        );
    }
}
