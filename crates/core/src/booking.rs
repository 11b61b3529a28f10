use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A reservation of one slot by one user.
///
/// `(schedule_id, shift_start)` is unique across all bookings; that
/// uniqueness is the serialization point for concurrent creation attempts
/// and is enforced by the store, not by this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Booking {
    pub booking_id: i64,
    pub user_id: i64,
    pub schedule_id: i64,
    pub shift_start: DateTime<Utc>,
    pub shift_end: DateTime<Utc>,
    pub buddy_user_id: Option<i64>,
    pub buddy_name: Option<String>,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// `completed` has no column of its own; it is derived from check-in
    /// state plus either an existing report or the shift having ended.
    pub fn is_completed(&self, now: DateTime<Utc>, report_exists: bool) -> bool {
        self.checked_in_at.is_some() && (report_exists || now >= self.shift_end)
    }

    /// Classifies a check-in attempt at `now` against the configured
    /// `early_window`, per §4.3. Does not mutate the booking.
    pub fn checkin_window(&self, now: DateTime<Utc>, early_window: chrono::Duration) -> CheckinWindow {
        if self.checked_in_at.is_some() {
            return CheckinWindow::AlreadyCheckedIn;
        }
        let window_open = self.shift_start - early_window;
        if now < window_open {
            CheckinWindow::TooEarly
        } else if now >= self.shift_end {
            CheckinWindow::TooLate
        } else {
            CheckinWindow::Open
        }
    }
}

/// The outcome of evaluating a check-in attempt against the booking's
/// window, prior to any store mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckinWindow {
    TooEarly,
    TooLate,
    Open,
    AlreadyCheckedIn,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn booking() -> Booking {
        Booking {
            booking_id: 1,
            user_id: 1,
            schedule_id: 1,
            shift_start: Utc.with_ymd_and_hms(2025, 2, 1, 18, 0, 0).unwrap(),
            shift_end: Utc.with_ymd_and_hms(2025, 2, 1, 20, 0, 0).unwrap(),
            buddy_user_id: None,
            buddy_name: None,
            checked_in_at: None,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn checkin_window_boundaries() {
        let b = booking();
        let early_window = chrono::Duration::minutes(60);

        let just_before_open = Utc.with_ymd_and_hms(2025, 2, 1, 16, 59, 59).unwrap();
        assert_eq!(b.checkin_window(just_before_open, early_window), CheckinWindow::TooEarly);

        let at_open = Utc.with_ymd_and_hms(2025, 2, 1, 17, 0, 0).unwrap();
        assert_eq!(b.checkin_window(at_open, early_window), CheckinWindow::Open);

        let at_close = Utc.with_ymd_and_hms(2025, 2, 1, 20, 0, 0).unwrap();
        assert_eq!(b.checkin_window(at_close, early_window), CheckinWindow::TooLate);
    }

    #[test]
    fn already_checked_in_short_circuits() {
        let mut b = booking();
        b.checked_in_at = Some(b.shift_start);
        let now = Utc.with_ymd_and_hms(2025, 2, 1, 18, 30, 0).unwrap();
        assert_eq!(
            b.checkin_window(now, chrono::Duration::minutes(60)),
            CheckinWindow::AlreadyCheckedIn
        );
    }

    #[test]
    fn completion_requires_checkin_and_report_or_elapsed_shift() {
        let mut b = booking();
        let now = Utc.with_ymd_and_hms(2025, 2, 1, 19, 0, 0).unwrap();
        assert!(!b.is_completed(now, false));

        b.checked_in_at = Some(b.shift_start);
        assert!(!b.is_completed(now, false));
        assert!(b.is_completed(now, true));

        let after_shift = Utc.with_ymd_and_hms(2025, 2, 1, 20, 0, 0).unwrap();
        assert!(b.is_completed(after_shift, false));
    }
}
