//! Interaction broker.
//!
//! Tracks the (at most one) pending human-input request of a build session,
//! correlates responses by id and records how each request ended. A
//! request is a plain record, so a session waiting on a human can be saved
//! and restored at any time.

use chrono::{DateTime, TimeDelta, Utc};
use entrance_types::error::InteractionError;
use entrance_types::interaction::{
    ConfirmAction, ConfirmationResult, DisplayItem, InteractionAction, InteractionKind,
    InteractionRequest, InteractionResponse, InteractionStatus,
};
use entrance_types::patch::ConfigPatch;
use entrance_types::path::FieldPath;
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct InteractionBroker {
    pending: Option<InteractionRequest>,
    /// Requests that reached a terminal status during this process lifetime.
    resolved: Vec<InteractionRequest>,
}

impl InteractionBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a broker around a persisted pending request.
    pub fn restore(pending: Option<InteractionRequest>) -> Self {
        Self {
            pending: pending.filter(|r| r.status == InteractionStatus::Pending),
            resolved: Vec::new(),
        }
    }

    pub fn pending(&self) -> Option<&InteractionRequest> {
        self.pending.as_ref()
    }

    pub fn resolved(&self) -> &[InteractionRequest] {
        &self.resolved
    }

    /// Register a new pending request.
    pub fn request(
        &mut self,
        kind: InteractionKind,
        title: impl Into<String>,
        message: impl Into<String>,
        items: Vec<DisplayItem>,
        actions: Vec<InteractionAction>,
    ) -> Result<InteractionRequest, InteractionError> {
        if let Some(pending) = &self.pending {
            return Err(InteractionError::AlreadyPending {
                pending: pending.interaction_id,
            });
        }

        let request = InteractionRequest {
            interaction_id: Uuid::now_v7(),
            kind,
            title: title.into(),
            message: message.into(),
            items,
            actions,
            status: InteractionStatus::Pending,
            created_at: Utc::now(),
            resolved_at: None,
        };
        tracing::info!(
            interaction_id = %request.interaction_id,
            kind = %kind,
            "interaction requested"
        );
        self.pending = Some(request.clone());
        Ok(request)
    }

    /// Check a response against the pending request without resolving it.
    ///
    /// Lets the caller vet the payload (e.g. dry-run the patch) before the
    /// request is consumed.
    pub fn parse_response(
        &self,
        interaction_id: Uuid,
        action_id: &str,
        data: Option<&Value>,
    ) -> Result<InteractionResponse, InteractionError> {
        let request = self.pending_with_id(interaction_id)?;
        if !request.has_action(action_id) {
            return Err(InteractionError::InvalidAction {
                interaction_id,
                action_id: action_id.to_string(),
            });
        }

        let patch = match data {
            Some(value) => field_map_to_patch(value)?,
            None => ConfigPatch::new(),
        };

        match request.kind {
            InteractionKind::InformationRequest => Ok(InteractionResponse::Information { patch }),
            InteractionKind::Confirmation => {
                let action = action_id
                    .parse::<ConfirmAction>()
                    .map_err(InteractionError::MalformedResponse)?;
                Ok(InteractionResponse::Confirmation(ConfirmationResult {
                    action,
                    overrides: patch,
                }))
            }
        }
    }

    /// Mark the pending request answered.
    pub fn complete(&mut self, interaction_id: Uuid) -> Result<InteractionRequest, InteractionError> {
        self.finish(interaction_id, InteractionStatus::Answered)
    }

    /// Parse and resolve a response in one go.
    pub fn respond(
        &mut self,
        interaction_id: Uuid,
        action_id: &str,
        data: Option<&Value>,
    ) -> Result<InteractionResponse, InteractionError> {
        let response = self.parse_response(interaction_id, action_id, data)?;
        self.complete(interaction_id)?;
        Ok(response)
    }

    pub fn cancel(&mut self, interaction_id: Uuid) -> Result<InteractionRequest, InteractionError> {
        self.finish(interaction_id, InteractionStatus::Cancelled)
    }

    /// Expire the request if it has been pending for at least `after`.
    ///
    /// Returns whether it expired.
    pub fn expire(&mut self, interaction_id: Uuid, after: TimeDelta) -> Result<bool, InteractionError> {
        self.expire_at(interaction_id, after, Utc::now())
    }

    pub fn expire_at(
        &mut self,
        interaction_id: Uuid,
        after: TimeDelta,
        now: DateTime<Utc>,
    ) -> Result<bool, InteractionError> {
        let request = self.pending_with_id(interaction_id)?;
        if now - request.created_at < after {
            return Ok(false);
        }
        self.finish(interaction_id, InteractionStatus::Expired)?;
        Ok(true)
    }

    fn finish(
        &mut self,
        interaction_id: Uuid,
        status: InteractionStatus,
    ) -> Result<InteractionRequest, InteractionError> {
        self.pending_with_id(interaction_id)?;
        let Some(mut request) = self.pending.take() else {
            return Err(InteractionError::UnknownInteraction(interaction_id));
        };
        request.status = status;
        request.resolved_at = Some(Utc::now());
        tracing::info!(%interaction_id, status = %status, "interaction resolved");
        self.resolved.push(request.clone());
        Ok(request)
    }

    /// The pending request, if `interaction_id` names it.
    ///
    /// Answered, cancelled and expired ids are as unknown as ids never
    /// issued; a restored broker has no memory of them either.
    fn pending_with_id(&self, interaction_id: Uuid) -> Result<&InteractionRequest, InteractionError> {
        self.pending
            .as_ref()
            .filter(|p| p.interaction_id == interaction_id)
            .ok_or(InteractionError::UnknownInteraction(interaction_id))
    }
}

/// Convert a `{ "<field path>": value }` map into `set` operations.
pub fn field_map_to_patch(data: &Value) -> Result<ConfigPatch, InteractionError> {
    let map = match data {
        Value::Null => return Ok(ConfigPatch::new()),
        Value::Object(map) => map,
        other => {
            return Err(InteractionError::MalformedResponse(format!(
                "expected an object of field paths, got {other}"
            )));
        }
    };

    let mut patch = ConfigPatch::new();
    for (key, value) in map {
        let path = key
            .parse::<FieldPath>()
            .map_err(|e| InteractionError::MalformedResponse(e.to_string()))?;
        patch = patch.set(path, value.clone());
    }
    Ok(patch)
}
