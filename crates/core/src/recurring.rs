use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A standing declaration that a user patrols a given schedule on a given
/// day of the week, materialized into concrete [`crate::booking::Booking`]
/// rows by the recurring-assignment materializer (C7).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RecurringAssignment {
    pub id: i64,
    pub user_id: i64,
    /// Sunday = 0, per the specification's convention.
    pub day_of_week: u8,
    pub schedule_id: i64,
    pub time_slot: String,
    pub buddy_name: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecurringAssignment {
    /// Deletion is soft: flipping `is_active` to `false` preserves already
    /// materialized bookings while stopping future materialization.
    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        self.is_active = false;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn deactivate_flips_flag_and_bumps_updated_at() {
        let mut a = RecurringAssignment {
            id: 1,
            user_id: 1,
            day_of_week: 1,
            schedule_id: 1,
            time_slot: "18:00-20:00".into(),
            buddy_name: None,
            description: None,
            is_active: true,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        };
        let now = Utc.with_ymd_and_hms(2025, 1, 5, 0, 0, 0).unwrap();
        a.deactivate(now);
        assert!(!a.is_active);
        assert_eq!(a.updated_at, now);
    }
}
