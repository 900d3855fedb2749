//! Tool catalog listing and offline validation (`entrance catalog`,
//! `entrance validate`).

use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use entrance_types::agent::AgentConfiguration;
use entrance_types::validation::Severity;

use crate::state::AppState;

/// List the tool catalog.
pub fn list_catalog(state: &AppState, json: bool) -> Result<()> {
    let tools = state.catalog.list();

    if json {
        println!("{}", serde_json::to_string_pretty(&tools)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Tool").fg(Color::White),
        Cell::new("Name").fg(Color::White),
        Cell::new("Required config").fg(Color::White),
        Cell::new("Description").fg(Color::White),
    ]);

    for tool in &tools {
        table.add_row(vec![
            Cell::new(&tool.tool_id).fg(Color::Cyan),
            Cell::new(&tool.name).fg(Color::White),
            Cell::new(tool.config_required.join(", ")).fg(Color::Yellow),
            Cell::new(&tool.description).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    Ok(())
}

/// Parse a configuration document from JSON, or TOML for `.toml` files.
pub fn parse_document(path: &Path, contents: &str) -> Result<AgentConfiguration> {
    let is_toml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml"));
    if is_toml {
        toml::from_str(contents).with_context(|| format!("Invalid TOML in {}", path.display()))
    } else {
        serde_json::from_str(contents).with_context(|| format!("Invalid JSON in {}", path.display()))
    }
}

/// Validate a configuration file. Fails when the document has errors.
pub async fn validate_file(state: &AppState, path: &Path, json: bool) -> Result<()> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let document = parse_document(path, &contents)?;
    let report = state.validate(&document);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!();
        if report.findings.is_empty() {
            println!("  {} No findings.", style("✓").green().bold());
        }
        for finding in &report.findings {
            let marker = match finding.severity {
                Severity::Error => style("✗").red().bold(),
                Severity::Warning => style("!").yellow().bold(),
            };
            println!("  {marker} {finding}");
        }
        println!();
    }

    if !report.is_passing() {
        anyhow::bail!(
            "{} failed validation with {} error(s)",
            path.display(),
            report.error_count()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::test_state;
    use std::io::Write;

    const TOML_DOC: &str = r#"
name = "Hotel Assistant"
description = "Books rooms"
system_prompt = "You are the front desk of a small hotel. Be brief."

[[skills]]
name = "Room Booking"
when_to_use = "When a guest wants to book a room"
prompt = "Collect dates and the number of guests, then book."

[[skills.tools]]
tool_id = "google_calendar"
name = "google_calendar"
config = { calendar_id = "front-desk" }
"#;

    #[test]
    fn parses_toml_and_json() {
        let doc = parse_document(Path::new("agent.toml"), TOML_DOC).unwrap();
        assert_eq!(doc.skills[0].tools[0].config["calendar_id"], "front-desk");

        let json = serde_json::to_string(&doc).unwrap();
        let again = parse_document(Path::new("agent.json"), &json).unwrap();
        assert_eq!(again, doc);
    }

    #[test]
    fn parse_errors_name_the_file() {
        let err = parse_document(Path::new("broken.json"), "{").unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }

    #[tokio::test]
    async fn valid_file_passes() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(TOML_DOC.as_bytes()).unwrap();
        validate_file(&test_state(), file.path(), true).await.unwrap();
    }

    #[tokio::test]
    async fn invalid_file_fails() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(b"{\"name\": \"Hotel Assistant\"}").unwrap();
        let err = validate_file(&test_state(), file.path(), true).await.unwrap_err();
        assert!(err.to_string().contains("failed validation"));
    }
}
