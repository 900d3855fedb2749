//! Addressable human-input requests.
//!
//! An interaction is a record with identity and status rather than an
//! in-process blocking prompt, so a build session that is waiting on a human
//! survives process restarts.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::patch::ConfigPatch;
use crate::path::FieldPath;

/// Action id for answering an information request.
pub const ACTION_SUBMIT: &str = "submit";
/// Confirmation action ids.
pub const ACTION_CONFIRM: &str = "confirm";
pub const ACTION_EDIT: &str = "edit";
pub const ACTION_ADD: &str = "add";

/// The closed set of interaction kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    /// Freeform data collection; the answer is a field map.
    InformationRequest,
    /// The answer is one of the declared action ids.
    Confirmation,
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InformationRequest => write!(f, "information_request"),
            Self::Confirmation => write!(f, "confirmation"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionStatus {
    Pending,
    Answered,
    Cancelled,
    Expired,
}

impl InteractionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for InteractionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Answered => write!(f, "answered"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

/// A response action the user may pick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionAction {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub primary: bool,
}

impl InteractionAction {
    pub fn new(id: &str, label: &str, primary: bool) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            primary,
        }
    }
}

/// A line of context shown with a request.
///
/// Items carrying a `path` are the fields an information request asks for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayItem {
    pub label: String,
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<FieldPath>,
}

impl DisplayItem {
    /// An item asking for the field at `path`.
    pub fn field(path: FieldPath, hint: impl Into<String>) -> Self {
        Self {
            label: path.label(),
            value: hint.into(),
            path: Some(path),
        }
    }

    /// A read-only line of context.
    pub fn note(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            path: None,
        }
    }
}

/// An outstanding (or resolved) human-input request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRequest {
    pub interaction_id: Uuid,
    pub kind: InteractionKind,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub items: Vec<DisplayItem>,
    pub actions: Vec<InteractionAction>,
    pub status: InteractionStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl InteractionRequest {
    /// Fields this request asks for (items with a path).
    pub fn requested_paths(&self) -> impl Iterator<Item = &FieldPath> {
        self.items.iter().filter_map(|item| item.path.as_ref())
    }

    pub fn has_action(&self, action_id: &str) -> bool {
        self.actions.iter().any(|a| a.id == action_id)
    }

    pub fn primary_action(&self) -> Option<&InteractionAction> {
        self.actions.iter().find(|a| a.primary)
    }
}

/// The choices a confirmation can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmAction {
    /// Proceed to creating the runtime agent.
    Confirm,
    /// Continue editing: re-enter generation with an override patch.
    Edit,
    /// Extend scope: go back to collecting.
    Add,
}

impl fmt::Display for ConfirmAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Confirm => write!(f, "{ACTION_CONFIRM}"),
            Self::Edit => write!(f, "{ACTION_EDIT}"),
            Self::Add => write!(f, "{ACTION_ADD}"),
        }
    }
}

impl FromStr for ConfirmAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ACTION_CONFIRM => Ok(Self::Confirm),
            ACTION_EDIT => Ok(Self::Edit),
            ACTION_ADD => Ok(Self::Add),
            other => Err(format!("unknown confirmation action: '{other}'")),
        }
    }
}

/// The user's decision on a confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationResult {
    pub action: ConfirmAction,
    /// Field edits supplied alongside the decision (may be empty).
    #[serde(default)]
    pub overrides: ConfigPatch,
}

/// What a resolved interaction hands back to the suspended build flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InteractionResponse {
    Information { patch: ConfigPatch },
    Confirmation(ConfirmationResult),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::SkillField;

    fn sample_request() -> InteractionRequest {
        InteractionRequest {
            interaction_id: Uuid::now_v7(),
            kind: InteractionKind::InformationRequest,
            title: "Missing details".to_string(),
            message: "Tell me more".to_string(),
            items: vec![
                DisplayItem::note("Goal", "hotel bookings"),
                DisplayItem::field(FieldPath::skill(0, SkillField::WhenToUse), "10-500 chars"),
            ],
            actions: vec![InteractionAction::new(ACTION_SUBMIT, "Submit", true)],
            status: InteractionStatus::Pending,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }

    #[test]
    fn requested_paths_skip_notes() {
        let req = sample_request();
        let paths: Vec<_> = req.requested_paths().map(|p| p.to_string()).collect();
        assert_eq!(paths, vec!["skills[0].when_to_use"]);
    }

    #[test]
    fn action_lookup() {
        let req = sample_request();
        assert!(req.has_action("submit"));
        assert!(!req.has_action("confirm"));
        assert_eq!(req.primary_action().unwrap().id, "submit");
    }

    #[test]
    fn confirm_action_parses_declared_ids_only() {
        assert_eq!("confirm".parse::<ConfirmAction>(), Ok(ConfirmAction::Confirm));
        assert_eq!("edit".parse::<ConfirmAction>(), Ok(ConfirmAction::Edit));
        assert_eq!("add".parse::<ConfirmAction>(), Ok(ConfirmAction::Add));
        assert!("CONFIRM".parse::<ConfirmAction>().is_err());
    }

    #[test]
    fn only_pending_is_non_terminal() {
        assert!(!InteractionStatus::Pending.is_terminal());
        assert!(InteractionStatus::Answered.is_terminal());
        assert!(InteractionStatus::Cancelled.is_terminal());
        assert!(InteractionStatus::Expired.is_terminal());
    }
}
