//! Catalog-backed skill resolver.
//!
//! Maps a skill requirement (its usage trigger, or its name) onto catalog
//! tools by keyword. Only tools present in the catalog are ever returned.
//! When nothing matches, the skill falls back to `knowledge_search` plus
//! `transfer_to_human`, which together can serve any skill.

use std::sync::Arc;

use entrance_core::collaborator::{SkillResolver, ToolCatalog};
use entrance_types::agent::ToolBinding;
use entrance_types::catalog::CatalogTool;
use entrance_types::error::CollaboratorError;

/// Tools bound when no keyword matches.
const FALLBACK_TOOLS: [&str; 2] = ["knowledge_search", "transfer"];

/// Keywords for the built-in tools. Extra catalog entries are matched on the
/// words of their id and name instead.
const KEYWORDS: &[(&str, &[&str])] = &[
    ("sms", &["sms", "text message"]),
    ("email", &["email", "e-mail"]),
    (
        "google_calendar",
        &["calendar", "appointment", "book", "reservation", "schedule", "meeting"],
    ),
    ("google_sheet", &["spreadsheet", "google sheet"]),
    ("shopify", &["shopify", "recommend", "product"]),
    ("amazon", &["amazon"]),
    ("rakuten", &["rakuten"]),
    (
        "logistics_tracking",
        &["shipping", "shipment", "delivery", "parcel", "tracking", "order status"],
    ),
    ("transfer", &["human", "staff", "escalat", "complaint"]),
];

pub struct CatalogSkillResolver {
    catalog: Arc<dyn ToolCatalog>,
}

impl CatalogSkillResolver {
    pub fn new(catalog: Arc<dyn ToolCatalog>) -> Self {
        Self { catalog }
    }

    fn matches(tool: &CatalogTool, requirement: &str) -> bool {
        match KEYWORDS.iter().find(|(id, _)| *id == tool.tool_id) {
            Some((_, words)) => words.iter().any(|w| requirement.contains(w)),
            None => tool
                .tool_id
                .split('_')
                .chain(tool.name.split('_'))
                .filter(|w| w.len() >= 4)
                .any(|w| requirement.contains(&w.to_lowercase())),
        }
    }
}

impl SkillResolver for CatalogSkillResolver {
    async fn resolve(&self, requirement: &str) -> Result<Vec<ToolBinding>, CollaboratorError> {
        let requirement = requirement.to_lowercase();
        let tools = self.catalog.list();

        let mut bindings: Vec<ToolBinding> = tools
            .iter()
            .filter(|tool| Self::matches(tool, &requirement))
            .map(|tool| ToolBinding::new(&tool.tool_id, &tool.name))
            .collect();

        if bindings.is_empty() {
            bindings = FALLBACK_TOOLS
                .iter()
                .filter_map(|id| self.catalog.lookup(id))
                .map(|tool| ToolBinding::new(tool.tool_id, tool.name))
                .collect();
            tracing::debug!(%requirement, "no tool matched, using fallback tools");
        }
        if bindings.is_empty() {
            return Err(CollaboratorError::Resolution(format!(
                "no catalog tool serves '{requirement}' and the fallback tools are not in the catalog"
            )));
        }

        tracing::debug!(
            %requirement,
            tools = ?bindings.iter().map(|b| b.tool_id.as_str()).collect::<Vec<_>>(),
            "resolved skill tools"
        );
        Ok(bindings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticToolCatalog;

    fn resolver() -> CatalogSkillResolver {
        CatalogSkillResolver::new(Arc::new(StaticToolCatalog::builtin()))
    }

    fn ids(bindings: &[ToolBinding]) -> Vec<&str> {
        bindings.iter().map(|b| b.tool_id.as_str()).collect()
    }

    #[tokio::test]
    async fn booking_requirement_binds_calendar() {
        let bindings = resolver()
            .resolve("When a guest wants to Book a room")
            .await
            .unwrap();
        assert_eq!(ids(&bindings), vec!["google_calendar"]);
        assert_eq!(bindings[0].name, "google_calendar");
    }

    #[tokio::test]
    async fn several_tools_can_match() {
        let bindings = resolver()
            .resolve("track the delivery and send an SMS when it ships")
            .await
            .unwrap();
        assert_eq!(ids(&bindings), vec!["sms", "logistics_tracking"]);
    }

    #[tokio::test]
    async fn unmatched_requirement_falls_back() {
        let bindings = resolver().resolve("answer trivia about cats").await.unwrap();
        assert_eq!(ids(&bindings), vec!["knowledge_search", "transfer"]);
        assert_eq!(bindings[1].name, "transfer_to_human");
    }

    struct SmsOnly;

    impl ToolCatalog for SmsOnly {
        fn lookup(&self, tool_id: &str) -> Option<CatalogTool> {
            self.list().into_iter().find(|t| t.tool_id == tool_id)
        }

        fn list(&self) -> Vec<CatalogTool> {
            vec![CatalogTool::new("sms", "sms", "Send text messages", &[])]
        }
    }

    #[tokio::test]
    async fn catalog_without_fallbacks_cannot_resolve() {
        let resolver = CatalogSkillResolver::new(Arc::new(SmsOnly));
        let err = resolver.resolve("answer trivia about cats").await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Resolution(_)));

        let bindings = resolver.resolve("send an SMS reminder").await.unwrap();
        assert_eq!(ids(&bindings), vec!["sms"]);
    }

    #[tokio::test]
    async fn extra_tools_match_on_their_names() {
        let catalog = StaticToolCatalog::with_extras(vec![CatalogTool::new(
            "pms",
            "property_management",
            "Hotel PMS",
            &[],
        )]);
        let resolver = CatalogSkillResolver::new(Arc::new(catalog));
        let bindings = resolver
            .resolve("look up the guest in property records")
            .await
            .unwrap();
        assert_eq!(ids(&bindings), vec!["pms"]);
    }
}
