use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The routing key the outbox dispatcher (C8) uses to pick a [`Transport`]
/// for an item; see the message-type/transport table in §4.5.
///
/// [`Transport`]: https://docs.rs/ (conceptual — defined in `nightwatch-notify`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum MessageType {
    OtpVerification,
    AdminShiftAssignment,
    ShiftReminder,
    Broadcast,
}

impl MessageType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OtpVerification => "OTP_VERIFICATION",
            Self::AdminShiftAssignment => "ADMIN_SHIFT_ASSIGNMENT",
            Self::ShiftReminder => "SHIFT_REMINDER",
            Self::Broadcast => "BROADCAST",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Delivery status of an [`OutboxItem`]; terminal once `Sent` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum OutboxStatus {
    Pending,
    Sent,
    Failed,
}

/// A queued, durable message awaiting delivery by a [`Transport`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct OutboxItem {
    pub outbox_id: i64,
    pub message_type: MessageType,
    pub recipient: String,
    pub payload: serde_json::Value,
    pub user_id: Option<i64>,
    pub send_at: DateTime<Utc>,
    pub status: OutboxStatus,
    pub retry_count: u32,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

/// A new outbox row prior to assignment of an id; the shape `Store::enqueue`
/// accepts.
#[derive(Debug, Clone)]
pub struct NewOutboxItem {
    pub message_type: MessageType,
    pub recipient: String,
    pub payload: serde_json::Value,
    pub user_id: Option<i64>,
    pub send_at: DateTime<Utc>,
}

impl NewOutboxItem {
    pub fn now(message_type: MessageType, recipient: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            message_type,
            recipient: recipient.into(),
            payload,
            user_id: None,
            send_at: Utc::now(),
        }
    }

    pub fn with_send_at(mut self, send_at: DateTime<Utc>) -> Self {
        self.send_at = send_at;
        self
    }

    pub fn with_user_id(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

/// Computes the exponential backoff with jitter for retry `n` (the post-
/// increment `retry_count`), per §4.5: `min(max_backoff, base * 2^n) *
/// uniform(0.5, 1.5)`.
///
/// `jitter` is injected so call sites and tests can control randomness;
/// production call sites pass a `rand`-drawn value.
pub fn backoff(base: chrono::Duration, max_backoff: chrono::Duration, retry_count: u32, jitter: f64) -> chrono::Duration {
    let exp = 2f64.powi(retry_count.min(32) as i32);
    let scaled_ms = (base.num_milliseconds() as f64 * exp).min(max_backoff.num_milliseconds() as f64);
    let jittered_ms = (scaled_ms * jitter).round() as i64;
    chrono::Duration::milliseconds(jittered_ms.max(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_type_wire_names_match_spec_table() {
        assert_eq!(MessageType::OtpVerification.as_str(), "OTP_VERIFICATION");
        assert_eq!(MessageType::AdminShiftAssignment.as_str(), "ADMIN_SHIFT_ASSIGNMENT");
        assert_eq!(MessageType::ShiftReminder.as_str(), "SHIFT_REMINDER");
        assert_eq!(MessageType::Broadcast.as_str(), "BROADCAST");
    }

    #[test]
    fn backoff_is_capped_by_max() {
        let base = chrono::Duration::seconds(1);
        let max = chrono::Duration::seconds(30);
        let d = backoff(base, max, 10, 1.0);
        assert_eq!(d, max);
    }

    #[test]
    fn backoff_grows_exponentially_before_cap() {
        let base = chrono::Duration::seconds(1);
        let max = chrono::Duration::seconds(1000);
        let d0 = backoff(base, max, 0, 1.0);
        let d1 = backoff(base, max, 1, 1.0);
        let d2 = backoff(base, max, 2, 1.0);
        assert_eq!(d0, chrono::Duration::seconds(1));
        assert_eq!(d1, chrono::Duration::seconds(2));
        assert_eq!(d2, chrono::Duration::seconds(4));
    }

    #[test]
    fn jitter_scales_linearly() {
        let base = chrono::Duration::seconds(10);
        let max = chrono::Duration::seconds(1000);
        let half = backoff(base, max, 0, 0.5);
        assert_eq!(half, chrono::Duration::seconds(5));
    }
}
