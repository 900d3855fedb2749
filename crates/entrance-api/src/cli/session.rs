//! Session management CLI commands: list, show, history, rollback, delete.
//!
//! Provides session browsing with rich tables and deletion with
//! confirmation prompt.

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::Confirm;
use uuid::Uuid;

use entrance_types::phase::BuildPhase;
use entrance_types::validation::Severity;
use entrance_types::version::{VersionOrigin, VersionSummary};

use crate::state::{AppState, SessionView};

/// List build sessions, most recently updated first.
///
/// # Examples
///
/// ```bash
/// entrance sessions
/// entrance sessions --all --json
/// ```
pub async fn list_sessions(state: &AppState, all: bool, json: bool) -> Result<()> {
    let sessions: Vec<_> = state
        .list_sessions()
        .await?
        .into_iter()
        .filter(|s| all || !s.archived)
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!();
        println!(
            "  {} No sessions found. Start one with: {}",
            style("i").blue().bold(),
            style("entrance build").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("ID").fg(Color::White),
        Cell::new("Agent").fg(Color::White),
        Cell::new("Phase").fg(Color::White),
        Cell::new("Version").fg(Color::White),
        Cell::new("Updated").fg(Color::White),
        Cell::new("Goal").fg(Color::White),
    ]);

    for session in &sessions {
        let agent = if session.agent_name.is_empty() {
            "(unnamed)".to_string()
        } else {
            session.agent_name.clone()
        };

        table.add_row(vec![
            Cell::new(session.session_id).fg(Color::DarkGrey),
            Cell::new(agent).fg(Color::Cyan),
            phase_cell(session.phase),
            Cell::new(session.current_version).fg(Color::White),
            Cell::new(session.updated_at.format("%Y-%m-%d %H:%M")).fg(Color::White),
            Cell::new(truncate(&session.goal, 40)).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} session{}",
        style(sessions.len()).bold(),
        if sessions.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}

/// Show a session's document, pending interaction and last validation.
pub async fn show_session(state: &AppState, session_id: Uuid, json: bool) -> Result<()> {
    let session = state
        .load_session(session_id)
        .await
        .with_context(|| format!("Session {session_id} not found"))?;
    let view = SessionView::from(&session);

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    let doc = &view.document;
    println!();
    println!(
        "  {} {}",
        style(if doc.name.is_empty() { "(unnamed)" } else { doc.name.as_str() })
            .cyan()
            .bold(),
        style(format!("v{}", view.current_version)).dim()
    );
    println!("  Phase:       {}", view.phase);
    println!("  Goal:        {}", view.goal);
    println!("  Description: {}", doc.description);
    if !doc.system_prompt.is_empty() {
        println!("  Prompt:      {}", truncate(&doc.system_prompt, 80));
    }
    for (i, skill) in doc.skills.iter().enumerate() {
        println!();
        println!("  Skill {i}: {}", style(&skill.name).bold());
        println!("    When to use: {}", skill.when_to_use);
        for tool in &skill.tools {
            let config = if tool.config.is_empty() {
                String::new()
            } else {
                format!(" {}", serde_json::Value::Object(tool.config.clone()))
            };
            println!("    - {} ({}){config}", tool.name, tool.tool_id);
        }
    }

    if let Some(pending) = &view.pending_interaction {
        println!();
        println!(
            "  {} Waiting on: {} ({})",
            style("?").yellow().bold(),
            pending.title,
            pending.kind
        );
        for path in pending.requested_paths() {
            println!("    - {path}");
        }
    }

    if let Some(report) = &view.last_report {
        if !report.findings.is_empty() {
            println!();
            println!("  Last validation:");
            for finding in &report.findings {
                let marker = match finding.severity {
                    Severity::Error => style("x").red(),
                    Severity::Warning => style("!").yellow(),
                };
                println!("    {marker} {finding}");
            }
        }
    }

    if let Some(reason) = &view.failure {
        println!();
        println!("  {} {reason}", style("Failed:").red().bold());
    }
    println!();

    Ok(())
}

/// Show the version history of a session.
pub async fn show_history(state: &AppState, session_id: Uuid, json: bool) -> Result<()> {
    let versions = state
        .history_summaries(session_id)
        .await
        .with_context(|| format!("Session {session_id} not found"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&versions)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Version").fg(Color::White),
        Cell::new("Created").fg(Color::White),
        Cell::new("Origin").fg(Color::White),
        Cell::new("Change").fg(Color::White),
    ]);

    for version in &versions {
        table.add_row(vec![
            Cell::new(version.sequence).fg(Color::Cyan),
            Cell::new(version.created_at.format("%Y-%m-%d %H:%M:%S")).fg(Color::White),
            Cell::new(origin_label(version)).fg(Color::DarkGrey),
            Cell::new(truncate(&version.change, 60)).fg(Color::White),
        ]);
    }

    println!();
    println!("{table}");
    println!();

    Ok(())
}

/// Roll a session back to `sequence` and report where it now stands.
pub async fn rollback(state: &AppState, session_id: Uuid, sequence: u64, json: bool) -> Result<()> {
    let session = state
        .rollback(session_id, sequence)
        .await
        .with_context(|| format!("Failed to roll back session {session_id}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&SessionView::from(&session))?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Rolled back to version {} (now v{}, {})",
        style("*").green().bold(),
        sequence,
        session.store.current_sequence(),
        session.phase
    );
    println!(
        "  {}",
        style(format!("Continue with: entrance resume {session_id}")).dim()
    );
    println!();

    Ok(())
}

/// Delete a session after confirmation.
pub async fn delete_session(state: &AppState, session_id: Uuid, force: bool, json: bool) -> Result<()> {
    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete session {session_id} and its history?"))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    let deleted = state.delete_session(session_id).await?;
    if !deleted {
        anyhow::bail!("Session {session_id} not found");
    }

    if json {
        println!(
            "{}",
            serde_json::json!({ "deleted": true, "session_id": session_id })
        );
    } else {
        println!("  {} Session deleted.", style("*").green().bold());
    }
    Ok(())
}

fn phase_cell(phase: BuildPhase) -> Cell {
    let color = match phase {
        BuildPhase::Done => Color::Green,
        BuildPhase::Failed => Color::Red,
        BuildPhase::Collecting | BuildPhase::Confirming => Color::Yellow,
        _ => Color::White,
    };
    Cell::new(phase).fg(color)
}

fn origin_label(version: &VersionSummary) -> String {
    match version.origin {
        VersionOrigin::Initial => "initial".to_string(),
        VersionOrigin::Patch { source } => source.to_string(),
        VersionOrigin::Rollback { target } => format!("rollback of v{target}"),
    }
}

/// Shorten `text` to `max` characters, adding an ellipsis.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use entrance_types::patch::PatchSource;

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a hotel booking agent", 10), "a hotel...");
        assert_eq!(truncate("予約予約予約予約予約予約", 5), "予約...");
    }

    #[test]
    fn origin_labels() {
        let summary = |origin| VersionSummary {
            sequence: 1,
            created_at: chrono::Utc::now(),
            origin,
            change: String::new(),
        };
        assert_eq!(origin_label(&summary(VersionOrigin::Initial)), "initial");
        assert_eq!(
            origin_label(&summary(VersionOrigin::Rollback { target: 2 })),
            "rollback of v2"
        );
        assert_eq!(
            origin_label(&summary(VersionOrigin::Patch {
                source: PatchSource::User
            })),
            PatchSource::User.to_string()
        );
    }
}
