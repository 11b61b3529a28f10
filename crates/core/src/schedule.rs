use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A recurrence definition that the calendar module expands into slots.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Schedule {
    pub schedule_id: i64,
    pub name: String,
    pub cron_expr: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub duration_minutes: u32,
    pub timezone: String,
}

impl Schedule {
    /// Whether `date` (already interpreted in the schedule's own timezone)
    /// falls within the schedule's validity window. A schedule with no
    /// bounds on either side is active for every date.
    pub fn covers_date(&self, date: NaiveDate) -> bool {
        if let Some(start) = self.start_date {
            if date < start {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if date > end {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule() -> Schedule {
        Schedule {
            schedule_id: 1,
            name: "s".into(),
            cron_expr: "0 2 * * *".into(),
            start_date: None,
            end_date: None,
            duration_minutes: 60,
            timezone: "UTC".into(),
        }
    }

    #[test]
    fn unbounded_schedule_covers_any_date() {
        let s = schedule();
        assert!(s.covers_date(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()));
    }

    #[test]
    fn bounded_schedule_rejects_outside_dates() {
        let mut s = schedule();
        s.start_date = Some(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        s.end_date = Some(NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());
        assert!(!s.covers_date(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()));
        assert!(s.covers_date(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()));
        assert!(!s.covers_date(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()));
    }
}
