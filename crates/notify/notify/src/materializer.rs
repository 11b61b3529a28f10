use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Datelike, Utc};
use tracing::{error, info, warn};

use nightwatch_core::calendar::{combine_date_and_time, load_tz};
use nightwatch_core::{DomainError, NewAuditEvent, NewOutboxItem};
use nightwatch_store::{NewBooking, Store};

/// Tunables for the recurring-assignment materializer's periodic sweep,
/// per §4.4's "Scheduling" note: a coarser tick than the dispatcher,
/// extending a rolling horizon ahead of now.
#[derive(Debug, Clone)]
pub struct MaterializerConfig {
    pub tick_interval: StdDuration,
    pub horizon: chrono::Duration,
}

impl Default for MaterializerConfig {
    fn default() -> Self {
        Self {
            tick_interval: StdDuration::from_secs(3600),
            horizon: chrono::Duration::days(14),
        }
    }
}

/// Turns active [`nightwatch_core::RecurringAssignment`] rows into concrete
/// bookings over a rolling window. Conflicts (already materialized, or a
/// user booked the same slot directly) are swallowed per §4.4: the booking
/// table's uniqueness constraint is the only guard this needs, even under
/// overlapping ticks, because this deployment runs a single primary.
pub struct RecurringMaterializer {
    store: Arc<dyn Store>,
    config: MaterializerConfig,
}

impl RecurringMaterializer {
    pub fn new(store: Arc<dyn Store>, config: MaterializerConfig) -> Self {
        Self { store, config }
    }

    pub async fn run(&self, mut shutdown: tokio::sync::mpsc::Receiver<()>) {
        let mut interval = tokio::time::interval(self.config.tick_interval);
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("recurring-assignment materializer shutting down");
                    return;
                }
                _ = interval.tick() => {
                    let now = Utc::now();
                    match self.materialize(now, now + self.config.horizon).await {
                        Ok(stats) => info!(
                            created = stats.created,
                            conflicts = stats.conflicts,
                            "materializer tick complete"
                        ),
                        Err(err) => error!(error = %err, "materializer tick failed"),
                    }
                }
            }
        }
    }

    /// Materializes every active recurring assignment into bookings over
    /// `[from_utc, to_utc)`. Returns counts rather than erroring on
    /// individual conflicts, per §4.4 point 3.
    pub async fn materialize(
        &self,
        from_utc: DateTime<Utc>,
        to_utc: DateTime<Utc>,
    ) -> Result<MaterializeStats, DomainError> {
        let assignments = self.store.list_active_recurring_assignments().await?;
        let mut stats = MaterializeStats::default();

        for assignment in &assignments {
            let Some(schedule) = self.store.get_schedule(assignment.schedule_id).await? else {
                warn!(schedule_id = assignment.schedule_id, "recurring assignment references missing schedule");
                continue;
            };
            let tz = match load_tz(&schedule.timezone) {
                Ok(tz) => tz,
                Err(err) => {
                    warn!(schedule_id = schedule.schedule_id, error = %err, "invalid schedule timezone");
                    continue;
                }
            };

            let mut date = from_utc.with_timezone(&tz).date_naive();
            let end_date = to_utc.with_timezone(&tz).date_naive();

            while date < end_date {
                if date.weekday().num_days_from_sunday() as u8 == assignment.day_of_week
                    && schedule.covers_date(date)
                {
                    let slot_start = match combine_date_and_time(date, &assignment.time_slot, tz) {
                        Ok(start) => start,
                        Err(err) => {
                            warn!(assignment_id = assignment.id, error = %err, "could not compute slot start");
                            date = date.succ_opt().expect("date overflow");
                            continue;
                        }
                    };
                    let slot_end = slot_start + chrono::Duration::minutes(i64::from(schedule.duration_minutes));

                    let new_booking = NewBooking {
                        user_id: assignment.user_id,
                        schedule_id: schedule.schedule_id,
                        shift_start: slot_start,
                        shift_end: slot_end,
                        buddy_user_id: None,
                        buddy_name: assignment.buddy_name.clone(),
                    };
                    let outbox_items = vec![NewOutboxItem::now(
                        nightwatch_core::MessageType::ShiftReminder,
                        assignment.user_id.to_string(),
                        serde_json::json!({
                            "schedule_id": schedule.schedule_id,
                            "shift_start": slot_start,
                        }),
                    )];
                    let audit = NewAuditEvent {
                        actor_user_id: None,
                        action: "materialize_recurring_assignment".to_string(),
                        target: format!("recurring_assignment:{}", assignment.id),
                        details: serde_json::json!({ "shift_start": slot_start }),
                    };

                    match self.store.create_booking(new_booking, outbox_items, audit).await {
                        Ok(_) => stats.created += 1,
                        Err(DomainError::SlotTaken) => stats.conflicts += 1,
                        Err(err) => return Err(err),
                    }
                }
                date = date.succ_opt().expect("date overflow");
            }
        }

        Ok(stats)
    }
}

/// Outcome of one [`RecurringMaterializer::materialize`] call.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaterializeStats {
    pub created: u32,
    pub conflicts: u32,
}
