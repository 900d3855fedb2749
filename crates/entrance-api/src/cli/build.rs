//! Interactive build wizard (`entrance build`, `entrance resume`).
//!
//! Drives a build session from the terminal: information requests become
//! dialoguer text prompts, confirmations become a selection over the
//! offered actions. Every step is persisted before the next prompt, so
//! Ctrl-C loses nothing and `entrance resume <ID>` picks up where it stopped.

use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{Map, Value};
use uuid::Uuid;

use entrance_core::session::BuildSession;
use entrance_types::agent::AgentConfiguration;
use entrance_types::interaction::{
    ACTION_ADD, ACTION_EDIT, DisplayItem, InteractionKind, InteractionRequest,
};
use entrance_types::path::{FieldPath, SkillField, ToolField};
use entrance_types::phase::BuildPhase;

use crate::state::{AppState, SessionView};

/// Start a new build for `goal`, prompting for it when absent.
pub async fn run_build(state: &AppState, goal: Option<String>, json: bool) -> Result<()> {
    let goal = match goal {
        Some(goal) => goal,
        None => Input::new()
            .with_prompt("What should your agent do?")
            .interact_text()?,
    };

    let spinner = spinner("Planning your agent...");
    let session = state.start_session(&goal).await;
    spinner.finish_and_clear();
    let session = session.context("Failed to start build session")?;

    if !json {
        println!();
        println!(
            "  {} Building '{}' (session {})",
            style("*").cyan().bold(),
            style(&session.store.document().name).yellow(),
            style(session.session_id).dim()
        );
        println!(
            "  {}",
            style(format!(
                "Resume any time with: entrance resume {}",
                session.session_id
            ))
            .dim()
        );
    }

    run_session_loop(state, session, json).await
}

/// Resume an existing session.
pub async fn run_resume(state: &AppState, session_id: Uuid, json: bool) -> Result<()> {
    let session = state
        .load_session(session_id)
        .await
        .with_context(|| format!("Session {session_id} not found"))?;

    if session.is_terminal() {
        return finish(state, &session, json);
    }

    let session = state
        .resume_session(session_id)
        .await
        .context("Failed to resume session")?;

    if !json {
        println!();
        println!(
            "  {} Resuming '{}' in {}",
            style("*").cyan().bold(),
            style(&session.goal).yellow(),
            style(session.phase).cyan()
        );
    }

    run_session_loop(state, session, json).await
}

// ---------------------------------------------------------------------------
// Session loop
// ---------------------------------------------------------------------------

async fn run_session_loop(state: &AppState, mut session: BuildSession, json: bool) -> Result<()> {
    loop {
        if session.is_terminal() {
            return finish(state, &session, json);
        }

        let Some(request) = session.broker.pending().cloned() else {
            // Not suspended: drive it again.
            session = state.resume_session(session.session_id).await?;
            continue;
        };

        print_request(&request);

        let spinner_message = match request.kind {
            InteractionKind::InformationRequest => "Updating the draft...",
            InteractionKind::Confirmation => "Working on it...",
        };

        let result = match request.kind {
            InteractionKind::InformationRequest => {
                let data = ask_fields(&request)?;
                if data.is_empty() {
                    println!("  {}", style("Nothing entered, skipping this request.").dim());
                    state.cancel(session.session_id, request.interaction_id).await
                } else {
                    let spinner = spinner(spinner_message);
                    let result = state
                        .respond(
                            session.session_id,
                            request.interaction_id,
                            submit_action(&request),
                            Some(&Value::Object(data)),
                        )
                        .await;
                    spinner.finish_and_clear();
                    result
                }
            }
            InteractionKind::Confirmation => {
                let (action, data) = ask_confirmation(&request, session.store.document())?;
                let spinner = spinner(spinner_message);
                let result = state
                    .respond(
                        session.session_id,
                        request.interaction_id,
                        &action,
                        data.map(Value::Object).as_ref(),
                    )
                    .await;
                spinner.finish_and_clear();
                result
            }
        };

        session = match result {
            Ok(next) => next,
            Err(e) => {
                println!();
                println!("  {} {e}", style("!").red().bold());
                // Rejected answers leave the stored session untouched.
                state.load_session(session.session_id).await?
            }
        };
    }
}

fn submit_action(request: &InteractionRequest) -> &str {
    request
        .primary_action()
        .map(|a| a.id.as_str())
        .unwrap_or(entrance_types::interaction::ACTION_SUBMIT)
}

fn spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

fn print_request(request: &InteractionRequest) {
    println!();
    println!("{}", style(format!("--- {} ---", request.title)).cyan());
    if !request.message.is_empty() {
        println!("  {}", request.message);
    }
    for item in request.items.iter().filter(|i| i.path.is_none()) {
        println!("  {}: {}", style(&item.label).bold(), item.value);
    }
}

/// Prompt for every requested field. Blank answers are left out.
fn ask_fields(request: &InteractionRequest) -> Result<Map<String, Value>> {
    let mut answers = Vec::new();
    for item in request.items.iter().filter(|i| i.path.is_some()) {
        let prompt = if item.value.is_empty() {
            item.label.clone()
        } else {
            format!("{} ({})", item.label, item.value)
        };
        let answer: String = Input::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?;
        answers.push((item, answer));
    }
    Ok(answers_to_data(answers))
}

/// Turn prompted answers into the `{ "<field path>": value }` response map.
fn answers_to_data<'a>(answers: impl IntoIterator<Item = (&'a DisplayItem, String)>) -> Map<String, Value> {
    answers
        .into_iter()
        .filter_map(|(item, answer)| {
            let path = item.path.as_ref()?;
            let answer = answer.trim();
            if answer.is_empty() {
                None
            } else {
                Some((path.to_string(), Value::String(answer.to_string())))
            }
        })
        .collect()
}

/// Pick a confirmation action and gather its field changes, if any.
fn ask_confirmation(
    request: &InteractionRequest,
    document: &AgentConfiguration,
) -> Result<(String, Option<Map<String, Value>>)> {
    let labels: Vec<&str> = request.actions.iter().map(|a| a.label.as_str()).collect();
    let default = request
        .actions
        .iter()
        .position(|a| a.primary)
        .unwrap_or(0);
    let selection = Select::new()
        .with_prompt("What next?")
        .items(&labels)
        .default(default)
        .interact()?;
    let action = request.actions[selection].id.clone();

    let data = match action.as_str() {
        ACTION_EDIT => {
            let path: String = Input::new()
                .with_prompt("Field to change (blank to just regenerate)")
                .allow_empty(true)
                .interact_text()?;
            if path.trim().is_empty() {
                None
            } else {
                let path: FieldPath = path.trim().parse()?;
                let value: String = Input::new()
                    .with_prompt(format!("New value for {path} (blank to regenerate it)"))
                    .allow_empty(true)
                    .interact_text()?;
                Some(Map::from_iter([(path.to_string(), Value::String(value))]))
            }
        }
        ACTION_ADD => {
            let tool_id: String = Input::new()
                .with_prompt("Tool to add (blank to be asked for one)")
                .allow_empty(true)
                .interact_text()?;
            let tool_id = tool_id.trim();
            if tool_id.is_empty() {
                None
            } else {
                Some(Map::from_iter([(
                    next_tool_path(document).to_string(),
                    Value::String(tool_id.to_string()),
                )]))
            }
        }
        _ => None,
    };
    Ok((action, data))
}

/// Path of the next free tool slot on the primary skill.
fn next_tool_path(document: &AgentConfiguration) -> FieldPath {
    let next = document.primary_skill().map_or(0, |s| s.tools.len());
    FieldPath::skill(0, SkillField::Tool(next, ToolField::ToolId))
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

fn finish(state: &AppState, session: &BuildSession, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&SessionView::from(session))?);
        return Ok(());
    }

    println!();
    match session.phase {
        BuildPhase::Done => {
            let doc = session.store.document();
            println!(
                "{}",
                style(format!("=== '{}' is ready ===", doc.name)).green().bold()
            );
            if let Some(runtime) = &session.runtime {
                println!("  Agent id: {}", style(runtime.agent_id).cyan());
                println!("  Entrypoints: {}", runtime.entrypoints.join(", "));
                try_agent(state, runtime.agent_id, &runtime.entrypoints)?;
            }
        }
        _ => {
            println!("{}", style("=== Build failed ===").red().bold());
            if let Some(reason) = &session.failure {
                println!("  {reason}");
            }
            println!(
                "  {}",
                style(format!(
                    "Inspect with: entrance history {}",
                    session.session_id
                ))
                .dim()
            );
        }
    }
    println!();
    Ok(())
}

/// Let the user talk to the freshly created mock agent.
fn try_agent(state: &AppState, agent_id: Uuid, entrypoints: &[String]) -> Result<()> {
    let Some(agent) = state.orchestrator.creator().agent(&agent_id) else {
        return Ok(());
    };
    let Some(entrypoint) = entrypoints.first() else {
        return Ok(());
    };

    println!();
    println!("  {}", style("Try it out (blank line to finish)").dim());
    loop {
        let query: String = Input::new()
            .with_prompt("You")
            .allow_empty(true)
            .interact_text()?;
        if query.trim().is_empty() {
            return Ok(());
        }
        if let Some(answer) = agent.call(entrypoint, query.trim()) {
            println!("  {} {answer}", style(format!("{}:", agent.handle.name)).cyan());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entrance_types::agent::{SkillConfig, ToolBinding};

    #[test]
    fn blank_answers_are_dropped() {
        let trigger = DisplayItem::field("skills[0].when_to_use".parse().unwrap(), "");
        let name = DisplayItem::field(FieldPath::Name, "");
        let note = DisplayItem::note("changes", "none");

        let data = answers_to_data([
            (&trigger, "  When a guest asks about rooms ".to_string()),
            (&name, "   ".to_string()),
            (&note, "ignored".to_string()),
        ]);
        assert_eq!(data.len(), 1);
        assert_eq!(
            data["skills[0].when_to_use"],
            Value::String("When a guest asks about rooms".to_string())
        );
    }

    #[test]
    fn next_tool_slot_follows_existing_tools() {
        assert_eq!(
            next_tool_path(&AgentConfiguration::default()).to_string(),
            "skills[0].tools[0].tool_id"
        );

        let doc = AgentConfiguration {
            skills: vec![SkillConfig {
                tools: vec![ToolBinding::new("sms", "send_sms")],
                ..Default::default()
            }],
            ..Default::default()
        };
        assert_eq!(next_tool_path(&doc).to_string(), "skills[0].tools[1].tool_id");
    }

    #[test]
    fn submit_uses_the_primary_action() {
        let request = InteractionRequest {
            interaction_id: Uuid::now_v7(),
            kind: InteractionKind::InformationRequest,
            title: "Missing details".to_string(),
            message: String::new(),
            items: Vec::new(),
            actions: vec![entrance_types::interaction::InteractionAction::new(
                "submit", "Submit", true,
            )],
            status: entrance_types::interaction::InteractionStatus::Pending,
            created_at: chrono::Utc::now(),
            resolved_at: None,
        };
        assert_eq!(submit_action(&request), "submit");
    }
}
