use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who a `BROADCAST` outbox item's web-push fan-out resolves against, per
/// the message-type table in §4.5. Resolved against the user table at send
/// time, not at enqueue time, so a broadcast always reaches the roster as it
/// stands when the dispatcher actually runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum BroadcastAudience {
    All,
    Admins,
    Owls,
    /// Users with at least one booking in the trailing 30 days.
    Active,
}

impl BroadcastAudience {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Admins => "admins",
            Self::Owls => "owls",
            Self::Active => "active",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Some(Self::All),
            "admins" => Some(Self::Admins),
            "owls" => Some(Self::Owls),
            "active" => Some(Self::Active),
            _ => None,
        }
    }
}

impl std::fmt::Display for BroadcastAudience {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A web-push broadcast and its own delivery tally, independent of the
/// outbox row that triggered it: the outbox item is terminal as soon as the
/// dispatcher hands it to the transport, but fan-out to individual
/// recipients can still be partially failing, which this row tracks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Broadcast {
    pub broadcast_id: i64,
    pub title: String,
    pub message: String,
    pub audience: BroadcastAudience,
    pub sent_count: u32,
    pub failed_count: u32,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_str() {
        for a in [
            BroadcastAudience::All,
            BroadcastAudience::Admins,
            BroadcastAudience::Owls,
            BroadcastAudience::Active,
        ] {
            assert_eq!(BroadcastAudience::from_str_loose(a.as_str()), Some(a));
        }
    }

    #[test]
    fn unknown_audience_is_none() {
        assert_eq!(BroadcastAudience::from_str_loose("bogus"), None);
    }
}
