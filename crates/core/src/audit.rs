use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An append-only record of an administrative mutation or a core booking
/// lifecycle event (C10). Writes never fail the caller; see §4.8 for the
/// best-effort policy outside an enclosing transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AuditEvent {
    pub id: i64,
    pub actor_user_id: Option<i64>,
    pub action: String,
    pub target: String,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// A new audit row prior to id assignment.
#[derive(Debug, Clone)]
pub struct NewAuditEvent {
    pub actor_user_id: Option<i64>,
    pub action: String,
    pub target: String,
    pub details: serde_json::Value,
}

impl NewAuditEvent {
    pub fn new(action: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            actor_user_id: None,
            action: action.into(),
            target: target.into(),
            details: serde_json::Value::Null,
        }
    }

    pub fn by(mut self, actor_user_id: i64) -> Self {
        self.actor_user_id = Some(actor_user_id);
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}
