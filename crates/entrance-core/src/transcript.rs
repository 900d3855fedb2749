//! Sample conversation parsing.
//!
//! Generators return sample dialogues as markdown where every turn starts
//! with a bold speaker tag: `**User:** hello`. Lines without a tag continue
//! the current turn; a blank line closes it. Any speaker other than the user
//! is treated as the agent.

use entrance_types::session::{SampleTurn, Speaker};

pub fn parse_sample_conversation(markdown: &str) -> Vec<SampleTurn> {
    let mut turns = Vec::new();
    let mut speaker: Option<Speaker> = None;
    let mut lines: Vec<&str> = Vec::new();

    for raw in markdown.lines() {
        let line = raw.trim();
        if line.is_empty() {
            flush(&mut turns, speaker, &mut lines);
            continue;
        }
        match split_tag(line) {
            Some((role, rest)) => {
                flush(&mut turns, speaker, &mut lines);
                speaker = Some(speaker_for(role));
                lines.push(rest);
            }
            None if speaker.is_some() => lines.push(line),
            // Preamble before the first tag.
            None => {}
        }
    }
    flush(&mut turns, speaker, &mut lines);
    turns
}

/// Render turns back into the tagged markdown form.
pub fn render_sample_conversation(turns: &[SampleTurn]) -> String {
    turns
        .iter()
        .map(|turn| format!("**{}:** {}", turn.speaker, turn.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn flush(turns: &mut Vec<SampleTurn>, speaker: Option<Speaker>, lines: &mut Vec<&str>) {
    let text = lines.join("\n");
    lines.clear();
    let text = text.trim();
    if let (Some(speaker), false) = (speaker, text.is_empty()) {
        turns.push(SampleTurn {
            speaker,
            text: text.to_string(),
        });
    }
}

/// `**Role:** rest` -> `(Role, rest)`.
fn split_tag(line: &str) -> Option<(&str, &str)> {
    let inner = line.strip_prefix("**")?;
    let (role, rest) = inner.split_once(":**")?;
    let role = role.trim();
    if role.is_empty() {
        return None;
    }
    Some((role, rest.trim()))
}

fn speaker_for(role: &str) -> Speaker {
    match role.to_lowercase().as_str() {
        "user" | "guest" | "customer" | "用户" => Speaker::User,
        _ => Speaker::Agent,
    }
}
