//! Cron parsing, timezone handling, and slot enumeration (C1 + C4).

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use croner::Cron;
use thiserror::Error;

use crate::schedule::Schedule;

/// Errors raised while validating or evaluating a schedule's recurrence.
#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("invalid cron expression: {0}")]
    InvalidCron(String),

    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("cron expression has no future occurrence")]
    NoFutureOccurrence,
}

/// Parses a standard 5-field cron expression (`minute hour day-of-month month
/// day-of-week`).
pub fn parse_cron(expr: &str) -> Result<Cron, CalendarError> {
    Cron::new(expr)
        .parse()
        .map_err(|e| CalendarError::InvalidCron(e.to_string()))
}

/// Loads an IANA timezone by name.
pub fn load_tz(name: &str) -> Result<Tz, CalendarError> {
    name.parse::<Tz>()
        .map_err(|_| CalendarError::InvalidTimezone(name.to_string()))
}

/// Returns the next fire instant strictly after `after`, interpreted and
/// returned in UTC. `after` is converted into `tz` before the cron library
/// walks the local calendar so that DST transitions are handled in local
/// time, never in UTC.
pub fn next_after(cron: &Cron, tz: Tz, after: &DateTime<Utc>) -> Option<DateTime<Utc>> {
    let after_tz = after.with_timezone(&tz);
    let next_tz = cron.find_next_occurrence(&after_tz, false).ok()?;
    Some(next_tz.with_timezone(&Utc))
}

/// A concrete, derived shift slot. Never persisted; always recomputed from a
/// [`Schedule`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub schedule_id: i64,
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
}

/// Enumerates the concrete slots of `schedule` within `[from_utc, to_utc)`.
///
/// Implements the contract of §4.2: walk the cron forward in the schedule's
/// own timezone, converting to UTC only at the boundary, and drop any
/// occurrence whose local date falls outside the schedule's validity window.
pub fn expand(
    schedule: &Schedule,
    from_utc: DateTime<Utc>,
    to_utc: DateTime<Utc>,
) -> Result<Vec<Slot>, CalendarError> {
    if from_utc >= to_utc {
        return Ok(Vec::new());
    }

    let cron = parse_cron(&schedule.cron_expr)?;
    let tz = load_tz(&schedule.timezone)?;
    let duration = chrono::Duration::minutes(i64::from(schedule.duration_minutes));

    let mut slots = Vec::new();
    let mut cursor = from_utc;

    loop {
        let Some(next) = next_after(&cron, tz, &cursor) else {
            break;
        };
        if next >= to_utc {
            break;
        }
        cursor = next;

        let local_date = next.with_timezone(&tz).date_naive();
        if schedule.covers_date(local_date) {
            slots.push(Slot {
                schedule_id: schedule.schedule_id,
                start_utc: next,
                end_utc: next + duration,
            });
        }
    }

    Ok(slots)
}

/// Returns `true` if `instant` is an enumerated slot start of `schedule`.
///
/// Used by the booking coordinator to reject off-grid `shift_start` values;
/// re-expands a narrow one-second window around `instant` rather than
/// walking the whole range.
pub fn is_enumerated_slot_start(
    schedule: &Schedule,
    instant: DateTime<Utc>,
) -> Result<bool, CalendarError> {
    let window_end = instant + chrono::Duration::seconds(1);
    let probe_start = instant - chrono::Duration::seconds(1);
    let slots = expand(schedule, probe_start, window_end)?;
    Ok(slots.iter().any(|s| s.start_utc == instant))
}

/// Combines a calendar date with a `HH:MM` wall-clock time in `tz`, returning
/// the UTC instant. Used by the recurring-assignment materializer (C7) to
/// turn a `time_slot` field into a concrete slot start.
pub fn combine_date_and_time(
    date: NaiveDate,
    hh_mm: &str,
    tz: Tz,
) -> Result<DateTime<Utc>, CalendarError> {
    let (hour, minute) = parse_hh_mm(hh_mm)
        .ok_or_else(|| CalendarError::InvalidCron(format!("invalid time slot: {hh_mm}")))?;
    let naive_time = chrono::NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or_else(|| CalendarError::InvalidCron(format!("invalid time slot: {hh_mm}")))?;
    let naive_dt = date.and_time(naive_time);
    // `from_local_datetime` can be ambiguous or missing across a DST
    // transition; prefer the earliest valid mapping rather than erroring,
    // consistent with cron enumeration skipping the spring-forward gap.
    match tz.from_local_datetime(&naive_dt).earliest() {
        Some(local) => Ok(local.with_timezone(&Utc)),
        None => Err(CalendarError::InvalidCron(format!(
            "local time {naive_dt} does not exist in {tz} (DST gap)"
        ))),
    }
}

fn parse_hh_mm(s: &str) -> Option<(u32, u32)> {
    // `time_slot` is stored as "HH:MM-HH:MM"; only the start matters here.
    let start = s.split('-').next()?;
    let mut parts = start.splitn(2, ':');
    let hour: u32 = parts.next()?.trim().parse().ok()?;
    let minute: u32 = parts.next()?.trim().parse().ok()?;
    Some((hour, minute))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::Schedule;
    use chrono::TimeZone as _;

    fn nightly_schedule() -> Schedule {
        Schedule {
            schedule_id: 1,
            name: "Nightly patrol".into(),
            cron_expr: "0 2 * * *".into(),
            start_date: None,
            end_date: None,
            duration_minutes: 60,
            timezone: "America/New_York".into(),
        }
    }

    #[test]
    fn expand_skips_spring_forward_gap() {
        let schedule = nightly_schedule();
        let from = Utc.with_ymd_and_hms(2024, 3, 9, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 3, 11, 12, 0, 0).unwrap();

        let slots = expand(&schedule, from, to).unwrap();

        let starts: Vec<DateTime<Utc>> = slots.iter().map(|s| s.start_utc).collect();
        assert_eq!(
            starts,
            vec![
                Utc.with_ymd_and_hms(2024, 3, 9, 7, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 3, 11, 6, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn expand_respects_validity_window() {
        let mut schedule = nightly_schedule();
        schedule.start_date = Some(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        schedule.end_date = Some(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());

        let from = Utc.with_ymd_and_hms(2024, 3, 9, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 3, 12, 0, 0, 0).unwrap();
        let slots = expand(&schedule, from, to).unwrap();
        // The only candidate date in-window (2024-03-10) falls in the DST
        // gap, so nothing is emitted at all.
        assert!(slots.is_empty());
    }

    #[test]
    fn expand_empty_window_yields_empty_sequence() {
        let schedule = nightly_schedule();
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(expand(&schedule, t, t).unwrap().is_empty());
    }

    #[test]
    fn is_enumerated_slot_start_rejects_off_grid() {
        let schedule = nightly_schedule();
        let on_grid = Utc.with_ymd_and_hms(2024, 3, 9, 7, 0, 0).unwrap();
        let off_grid = on_grid + chrono::Duration::minutes(5);
        assert!(is_enumerated_slot_start(&schedule, on_grid).unwrap());
        assert!(!is_enumerated_slot_start(&schedule, off_grid).unwrap());
    }

    #[test]
    fn combine_date_and_time_parses_start_of_time_slot() {
        let tz = load_tz("America/New_York").unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        let instant = combine_date_and_time(date, "18:00-20:00", tz).unwrap();
        let local = instant.with_timezone(&tz);
        assert_eq!(local.format("%H:%M").to_string(), "18:00");
    }

    #[test]
    fn invalid_cron_is_rejected() {
        assert!(parse_cron("not a cron").is_err());
    }

    #[test]
    fn invalid_timezone_is_rejected() {
        assert!(load_tz("Not/A_Zone").is_err());
    }
}
