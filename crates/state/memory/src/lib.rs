//! An in-memory [`Store`] backend guarded by `dashmap`'s per-shard locking.
//!
//! Used as the default test fixture for the coordinator, materializer, and
//! dispatcher (no database required), and as the backend for local
//! development when `DevMode` is set.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use nightwatch_core::{
    AuditEvent, Booking, Broadcast, BroadcastAudience, DomainError, MessageType, NewAuditEvent,
    NewOutboxItem, OutboxItem, OutboxStatus, PointsLedgerEntry, PointsReason, RecurringAssignment,
    Report, Role, Schedule, User, UserPointsCache,
};
use nightwatch_store::{
    NewBooking, NewBroadcast, NewPointsLedgerEntry, NewRecurringAssignment, NewReport,
    NewSchedule, Store,
};

#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<i64, User>,
    users_by_phone: DashMap<String, i64>,
    next_user_id: AtomicI64,

    schedules: DashMap<i64, Schedule>,
    next_schedule_id: AtomicI64,

    bookings: DashMap<i64, Booking>,
    booking_slots: DashMap<(i64, DateTime<Utc>), i64>,
    next_booking_id: AtomicI64,

    recurring: DashMap<i64, RecurringAssignment>,
    recurring_active_keys: DashMap<(i64, u8, i64, String), i64>,
    next_recurring_id: AtomicI64,

    outbox: DashMap<i64, OutboxItem>,
    next_outbox_id: AtomicI64,

    reports: DashMap<i64, Report>,
    next_report_id: AtomicI64,

    next_ledger_id: AtomicI64,
    ledger: DashMap<i64, PointsLedgerEntry>,
    points_cache: DashMap<i64, UserPointsCache>,

    audit: DashMap<i64, AuditEvent>,
    next_audit_id: AtomicI64,

    broadcasts: DashMap<i64, Broadcast>,
    next_broadcast_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(counter: &AtomicI64) -> i64 {
        counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn apply_ledger_entry(&self, entry: &NewPointsLedgerEntry) -> i64 {
        let id = Self::next(&self.next_ledger_id);
        let amount = (f64::from(entry.reason.base_amount()) * entry.multiplier).round() as i64;

        self.ledger.insert(
            id,
            PointsLedgerEntry {
                id,
                user_id: entry.user_id,
                booking_id: entry.booking_id,
                points_awarded: amount as i32,
                reason: entry.reason,
                multiplier: entry.multiplier,
                created_at: Utc::now(),
            },
        );

        // Only a `ShiftCheckin` entry marks a shift as having happened; the
        // early/late bonus entries riding alongside it must not bump the
        // count a second time.
        let shift_delta = i64::from(entry.reason == PointsReason::ShiftCheckin);

        let mut cache = self.points_cache.entry(entry.user_id).or_insert(UserPointsCache {
            user_id: entry.user_id,
            total_points: 0,
            shift_count: 0,
            last_activity_date: None,
        });
        cache.total_points += amount;
        cache.shift_count += shift_delta;
        cache.last_activity_date = Some(Utc::now().date_naive());
        id
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, phone: &str, name: Option<&str>) -> Result<User, DomainError> {
        if self.users_by_phone.contains_key(phone) {
            return Err(DomainError::BadRequest(format!(
                "phone {phone} already registered"
            )));
        }
        let role = if self.users.is_empty() {
            nightwatch_core::Role::Admin
        } else {
            nightwatch_core::Role::Guest
        };
        let user_id = Self::next(&self.next_user_id);
        let user = User {
            user_id,
            phone: phone.to_string(),
            name: name.map(str::to_string),
            role,
            created_at: Utc::now(),
        };
        self.users_by_phone.insert(phone.to_string(), user_id);
        self.users.insert(user_id, user.clone());
        Ok(user)
    }

    async fn get_user_by_phone(&self, phone: &str) -> Result<Option<User>, DomainError> {
        Ok(self
            .users_by_phone
            .get(phone)
            .and_then(|id| self.users.get(&*id).map(|u| u.clone())))
    }

    async fn get_user(&self, user_id: i64) -> Result<Option<User>, DomainError> {
        Ok(self.users.get(&user_id).map(|u| u.clone()))
    }

    async fn user_count(&self) -> Result<i64, DomainError> {
        Ok(self.users.len() as i64)
    }

    async fn list_users_for_broadcast(&self, audience: BroadcastAudience) -> Result<Vec<User>, DomainError> {
        match audience {
            BroadcastAudience::All => Ok(self.users.iter().map(|e| e.value().clone()).collect()),
            BroadcastAudience::Admins => Ok(self
                .users
                .iter()
                .filter(|e| matches!(e.value().role, Role::Admin))
                .map(|e| e.value().clone())
                .collect()),
            BroadcastAudience::Owls => Ok(self
                .users
                .iter()
                .filter(|e| matches!(e.value().role, Role::Owl))
                .map(|e| e.value().clone())
                .collect()),
            BroadcastAudience::Active => {
                let since = Utc::now() - chrono::Duration::days(30);
                let active_ids: std::collections::HashSet<i64> = self
                    .bookings
                    .iter()
                    .filter(|e| e.value().created_at >= since)
                    .map(|e| e.value().user_id)
                    .collect();
                Ok(self
                    .users
                    .iter()
                    .filter(|e| active_ids.contains(&e.value().user_id))
                    .map(|e| e.value().clone())
                    .collect())
            }
        }
    }

    async fn create_schedule(&self, new: NewSchedule) -> Result<Schedule, DomainError> {
        let schedule_id = Self::next(&self.next_schedule_id);
        let schedule = Schedule {
            schedule_id,
            name: new.name,
            cron_expr: new.cron_expr,
            start_date: new.start_date,
            end_date: new.end_date,
            duration_minutes: new.duration_minutes,
            timezone: new.timezone,
        };
        self.schedules.insert(schedule_id, schedule.clone());
        Ok(schedule)
    }

    async fn update_schedule(&self, schedule: Schedule) -> Result<Schedule, DomainError> {
        if !self.schedules.contains_key(&schedule.schedule_id) {
            return Err(DomainError::NotFound(format!(
                "schedule {}",
                schedule.schedule_id
            )));
        }
        self.schedules.insert(schedule.schedule_id, schedule.clone());
        Ok(schedule)
    }

    async fn delete_schedule(&self, schedule_id: i64) -> Result<(), DomainError> {
        self.schedules
            .remove(&schedule_id)
            .ok_or_else(|| DomainError::NotFound(format!("schedule {schedule_id}")))?;
        Ok(())
    }

    async fn get_schedule(&self, schedule_id: i64) -> Result<Option<Schedule>, DomainError> {
        Ok(self.schedules.get(&schedule_id).map(|s| s.clone()))
    }

    async fn list_schedules(&self) -> Result<Vec<Schedule>, DomainError> {
        Ok(self.schedules.iter().map(|e| e.value().clone()).collect())
    }

    async fn create_booking(
        &self,
        new: NewBooking,
        outbox_items: Vec<NewOutboxItem>,
        audit: NewAuditEvent,
    ) -> Result<Booking, DomainError> {
        let slot_key = (new.schedule_id, new.shift_start);
        if self.booking_slots.contains_key(&slot_key) {
            return Err(DomainError::SlotTaken);
        }

        let booking_id = Self::next(&self.next_booking_id);
        let booking = Booking {
            booking_id,
            user_id: new.user_id,
            schedule_id: new.schedule_id,
            shift_start: new.shift_start,
            shift_end: new.shift_end,
            buddy_user_id: new.buddy_user_id,
            buddy_name: new.buddy_name,
            checked_in_at: None,
            created_at: Utc::now(),
        };

        // Re-check under the slot-key entry to close the race between the
        // contains_key probe above and this insert.
        use dashmap::mapref::entry::Entry;
        match self.booking_slots.entry(slot_key) {
            Entry::Occupied(_) => return Err(DomainError::SlotTaken),
            Entry::Vacant(v) => {
                v.insert(booking_id);
            }
        }

        self.bookings.insert(booking_id, booking.clone());

        for item in outbox_items {
            self.enqueue_outbox_item(item).await?;
        }
        self.append_audit_event(audit).await?;

        Ok(booking)
    }

    async fn get_booking(&self, booking_id: i64) -> Result<Option<Booking>, DomainError> {
        Ok(self.bookings.get(&booking_id).map(|b| b.clone()))
    }

    async fn list_bookings_for_user(&self, user_id: i64) -> Result<Vec<Booking>, DomainError> {
        Ok(self
            .bookings
            .iter()
            .filter(|e| e.value().user_id == user_id)
            .map(|e| e.value().clone())
            .collect())
    }

    async fn list_bookings_in_range(
        &self,
        schedule_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Booking>, DomainError> {
        Ok(self
            .bookings
            .iter()
            .filter(|e| {
                let b = e.value();
                b.schedule_id == schedule_id && b.shift_start >= from && b.shift_start < to
            })
            .map(|e| e.value().clone())
            .collect())
    }

    async fn delete_booking(&self, booking_id: i64, audit: NewAuditEvent) -> Result<(), DomainError> {
        let booking = self
            .bookings
            .remove(&booking_id)
            .ok_or_else(|| DomainError::NotFound(format!("booking {booking_id}")))?
            .1;
        self.booking_slots
            .remove(&(booking.schedule_id, booking.shift_start));
        self.append_audit_event(audit).await?;
        Ok(())
    }

    async fn check_in_booking(
        &self,
        booking_id: i64,
        checked_in_at: DateTime<Utc>,
        ledger_entries: Vec<NewPointsLedgerEntry>,
        audit: NewAuditEvent,
    ) -> Result<Booking, DomainError> {
        let mut entry = self
            .bookings
            .get_mut(&booking_id)
            .ok_or_else(|| DomainError::NotFound(format!("booking {booking_id}")))?;

        if entry.checked_in_at.is_some() {
            return Ok(entry.clone());
        }

        entry.checked_in_at = Some(checked_in_at);
        let booking = entry.clone();
        drop(entry);

        for ledger_entry in &ledger_entries {
            self.apply_ledger_entry(ledger_entry);
        }
        self.append_audit_event(audit).await?;

        Ok(booking)
    }

    async fn create_recurring_assignment(
        &self,
        new: NewRecurringAssignment,
    ) -> Result<RecurringAssignment, DomainError> {
        let key = (
            new.user_id,
            new.day_of_week,
            new.schedule_id,
            new.time_slot.clone(),
        );
        if self.recurring_active_keys.contains_key(&key) {
            return Err(DomainError::BadRequest(
                "recurring assignment already exists for this slot".to_string(),
            ));
        }

        let id = Self::next(&self.next_recurring_id);
        let now = Utc::now();
        let assignment = RecurringAssignment {
            id,
            user_id: new.user_id,
            day_of_week: new.day_of_week,
            schedule_id: new.schedule_id,
            time_slot: new.time_slot,
            buddy_name: new.buddy_name,
            description: new.description,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.recurring_active_keys.insert(key, id);
        self.recurring.insert(id, assignment.clone());
        Ok(assignment)
    }

    async fn list_active_recurring_assignments(
        &self,
    ) -> Result<Vec<RecurringAssignment>, DomainError> {
        Ok(self
            .recurring
            .iter()
            .filter(|e| e.value().is_active)
            .map(|e| e.value().clone())
            .collect())
    }

    async fn get_recurring_assignment(&self, id: i64) -> Result<Option<RecurringAssignment>, DomainError> {
        Ok(self.recurring.get(&id).map(|e| e.clone()))
    }

    async fn deactivate_recurring_assignment(&self, id: i64) -> Result<(), DomainError> {
        let mut entry = self
            .recurring
            .get_mut(&id)
            .ok_or_else(|| DomainError::NotFound(format!("recurring assignment {id}")))?;
        let key = (
            entry.user_id,
            entry.day_of_week,
            entry.schedule_id,
            entry.time_slot.clone(),
        );
        entry.deactivate(Utc::now());
        drop(entry);
        self.recurring_active_keys.remove(&key);
        Ok(())
    }

    async fn enqueue_outbox_item(&self, new: NewOutboxItem) -> Result<OutboxItem, DomainError> {
        let outbox_id = Self::next(&self.next_outbox_id);
        let item = OutboxItem {
            outbox_id,
            message_type: new.message_type,
            recipient: new.recipient,
            payload: new.payload,
            user_id: new.user_id,
            send_at: new.send_at,
            status: OutboxStatus::Pending,
            retry_count: 0,
            created_at: Utc::now(),
            sent_at: None,
        };
        self.outbox.insert(outbox_id, item.clone());
        Ok(item)
    }

    async fn select_due_outbox_items(
        &self,
        batch_size: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<OutboxItem>, DomainError> {
        let mut due: Vec<OutboxItem> = self
            .outbox
            .iter()
            .filter(|e| e.value().status == OutboxStatus::Pending && e.value().send_at <= now)
            .map(|e| e.value().clone())
            .collect();
        due.sort_by_key(|item| item.created_at);
        due.truncate(batch_size as usize);
        Ok(due)
    }

    async fn mark_outbox_sent(&self, outbox_id: i64, sent_at: DateTime<Utc>) -> Result<(), DomainError> {
        let mut entry = self
            .outbox
            .get_mut(&outbox_id)
            .ok_or_else(|| DomainError::NotFound(format!("outbox item {outbox_id}")))?;
        entry.status = OutboxStatus::Sent;
        entry.sent_at = Some(sent_at);
        Ok(())
    }

    async fn mark_outbox_retry(
        &self,
        outbox_id: i64,
        retry_count: u32,
        send_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let mut entry = self
            .outbox
            .get_mut(&outbox_id)
            .ok_or_else(|| DomainError::NotFound(format!("outbox item {outbox_id}")))?;
        entry.retry_count = retry_count;
        entry.send_at = send_at;
        Ok(())
    }

    async fn mark_outbox_failed(&self, outbox_id: i64, retry_count: u32) -> Result<(), DomainError> {
        let mut entry = self
            .outbox
            .get_mut(&outbox_id)
            .ok_or_else(|| DomainError::NotFound(format!("outbox item {outbox_id}")))?;
        entry.retry_count = retry_count;
        entry.status = OutboxStatus::Failed;
        Ok(())
    }

    async fn create_report(
        &self,
        new: NewReport,
        ledger_entries: Vec<NewPointsLedgerEntry>,
    ) -> Result<Report, DomainError> {
        let report_id = Self::next(&self.next_report_id);
        let report = Report {
            report_id,
            booking_id: new.booking_id,
            user_id: new.user_id,
            severity: new.severity,
            message: new.message,
            latitude: new.latitude,
            longitude: new.longitude,
            gps_accuracy: new.gps_accuracy,
            gps_timestamp: new.gps_timestamp,
            created_at: Utc::now(),
            archived_at: None,
        };
        self.reports.insert(report_id, report.clone());

        for ledger_entry in &ledger_entries {
            self.apply_ledger_entry(ledger_entry);
        }

        Ok(report)
    }

    async fn get_points_cache(&self, user_id: i64) -> Result<UserPointsCache, DomainError> {
        Ok(self
            .points_cache
            .get(&user_id)
            .map(|c| c.clone())
            .unwrap_or(UserPointsCache {
                user_id,
                total_points: 0,
                shift_count: 0,
                last_activity_date: None,
            }))
    }

    async fn append_audit_event(&self, new: NewAuditEvent) -> Result<AuditEvent, DomainError> {
        let id = Self::next(&self.next_audit_id);
        let event = AuditEvent {
            id,
            actor_user_id: new.actor_user_id,
            action: new.action,
            target: new.target,
            details: new.details,
            created_at: Utc::now(),
        };
        self.audit.insert(id, event.clone());
        Ok(event)
    }

    async fn list_recent_audit_events(&self, limit: u32) -> Result<Vec<AuditEvent>, DomainError> {
        let mut events: Vec<AuditEvent> = self.audit.iter().map(|e| e.value().clone()).collect();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        events.truncate(limit as usize);
        Ok(events)
    }

    async fn create_broadcast(&self, new: NewBroadcast) -> Result<Broadcast, DomainError> {
        let broadcast_id = Self::next(&self.next_broadcast_id);
        let broadcast = Broadcast {
            broadcast_id,
            title: new.title,
            message: new.message,
            audience: new.audience,
            sent_count: 0,
            failed_count: 0,
            created_at: Utc::now(),
        };
        self.broadcasts.insert(broadcast_id, broadcast.clone());
        Ok(broadcast)
    }

    async fn get_broadcast(&self, broadcast_id: i64) -> Result<Option<Broadcast>, DomainError> {
        Ok(self.broadcasts.get(&broadcast_id).map(|b| b.clone()))
    }

    async fn record_broadcast_delivery(
        &self,
        broadcast_id: i64,
        sent_delta: u32,
        failed_delta: u32,
    ) -> Result<(), DomainError> {
        let mut entry = self
            .broadcasts
            .get_mut(&broadcast_id)
            .ok_or_else(|| DomainError::NotFound(format!("broadcast {broadcast_id}")))?;
        entry.sent_count += sent_delta;
        entry.failed_count += failed_delta;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nightwatch_core::{NewOutboxItem as CoreNewOutboxItem, PointsReason};

    fn store() -> MemoryStore {
        MemoryStore::new()
    }

    #[tokio::test]
    async fn first_user_is_promoted_to_admin() {
        let s = store();
        let u1 = s.create_user("+14155550100", None).await.unwrap();
        let u2 = s.create_user("+14155550101", None).await.unwrap();
        assert!(u1.role.is_admin());
        assert!(!u2.role.is_admin());
    }

    #[tokio::test]
    async fn duplicate_phone_is_rejected() {
        let s = store();
        s.create_user("+14155550100", None).await.unwrap();
        assert!(s.create_user("+14155550100", None).await.is_err());
    }

    #[tokio::test]
    async fn booking_uniqueness_is_enforced() {
        let s = store();
        let schedule = s
            .create_schedule(NewSchedule {
                name: "n".into(),
                cron_expr: "0 2 * * *".into(),
                start_date: None,
                end_date: None,
                duration_minutes: 60,
                timezone: "UTC".into(),
            })
            .await
            .unwrap();
        let shift_start = Utc::now();
        let new = NewBooking {
            user_id: 1,
            schedule_id: schedule.schedule_id,
            shift_start,
            shift_end: shift_start + chrono::Duration::hours(1),
            buddy_user_id: None,
            buddy_name: None,
        };
        let first = s
            .create_booking(new.clone(), vec![], NewAuditEvent::new("booking.create", "booking:1"))
            .await;
        assert!(first.is_ok());
        let second = s
            .create_booking(new, vec![], NewAuditEvent::new("booking.create", "booking:2"))
            .await;
        assert!(matches!(second, Err(DomainError::SlotTaken)));
    }

    #[tokio::test]
    async fn check_in_is_idempotent() {
        let s = store();
        let schedule = s
            .create_schedule(NewSchedule {
                name: "n".into(),
                cron_expr: "0 2 * * *".into(),
                start_date: None,
                end_date: None,
                duration_minutes: 60,
                timezone: "UTC".into(),
            })
            .await
            .unwrap();
        let shift_start = Utc::now();
        let booking = s
            .create_booking(
                NewBooking {
                    user_id: 1,
                    schedule_id: schedule.schedule_id,
                    shift_start,
                    shift_end: shift_start + chrono::Duration::hours(1),
                    buddy_user_id: None,
                    buddy_name: None,
                },
                vec![],
                NewAuditEvent::new("booking.create", "booking:1"),
            )
            .await
            .unwrap();

        let now = Utc::now();
        let entries = vec![NewPointsLedgerEntry::new(1, PointsReason::ShiftCheckin).for_booking(booking.booking_id)];
        let first = s
            .check_in_booking(booking.booking_id, now, entries.clone(), NewAuditEvent::new("booking.checkin", "booking:1"))
            .await
            .unwrap();
        let second = s
            .check_in_booking(booking.booking_id, now + chrono::Duration::seconds(1), entries, NewAuditEvent::new("booking.checkin", "booking:1"))
            .await
            .unwrap();
        assert_eq!(first.checked_in_at, second.checked_in_at);

        let cache = s.get_points_cache(1).await.unwrap();
        assert_eq!(cache.total_points, 10);
        assert_eq!(cache.shift_count, 1);
    }

    #[tokio::test]
    async fn early_checkin_bonus_does_not_double_count_shift() {
        let s = store();
        let schedule = s
            .create_schedule(NewSchedule {
                name: "n".into(),
                cron_expr: "0 2 * * *".into(),
                start_date: None,
                end_date: None,
                duration_minutes: 60,
                timezone: "UTC".into(),
            })
            .await
            .unwrap();
        let shift_start = Utc::now();
        let booking = s
            .create_booking(
                NewBooking {
                    user_id: 1,
                    schedule_id: schedule.schedule_id,
                    shift_start,
                    shift_end: shift_start + chrono::Duration::hours(1),
                    buddy_user_id: None,
                    buddy_name: None,
                },
                vec![],
                NewAuditEvent::new("booking.create", "booking:1"),
            )
            .await
            .unwrap();

        // Mirrors the two ledger entries a real early check-in produces.
        let entries = vec![
            NewPointsLedgerEntry::new(1, PointsReason::ShiftCheckin).for_booking(booking.booking_id),
            NewPointsLedgerEntry::new(1, PointsReason::EarlyCheckin).for_booking(booking.booking_id),
        ];
        s.check_in_booking(booking.booking_id, Utc::now(), entries, NewAuditEvent::new("booking.checkin", "booking:1"))
            .await
            .unwrap();

        let cache = s.get_points_cache(1).await.unwrap();
        assert_eq!(cache.shift_count, 1);
        assert_eq!(cache.total_points, 13);
    }

    #[tokio::test]
    async fn outbox_select_due_respects_send_at_and_batch_size() {
        let s = store();
        for i in 0..5 {
            s.enqueue_outbox_item(CoreNewOutboxItem::now(
                MessageType::ShiftReminder,
                "+14155550100",
                serde_json::json!({ "i": i }),
            ))
            .await
            .unwrap();
        }
        let due = s.select_due_outbox_items(3, Utc::now()).await.unwrap();
        assert_eq!(due.len(), 3);
    }
}
