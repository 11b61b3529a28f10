use async_trait::async_trait;
use chrono::{DateTime, Utc};

use nightwatch_core::{
    AuditEvent, Booking, Broadcast, BroadcastAudience, DomainError, NewAuditEvent, NewOutboxItem,
    OutboxItem, PointsReason, RecurringAssignment, Report, Schedule, Severity, User,
    UserPointsCache,
};

/// Fields needed to create a [`Schedule`]; the store assigns `schedule_id`.
#[derive(Debug, Clone)]
pub struct NewSchedule {
    pub name: String,
    pub cron_expr: String,
    pub start_date: Option<chrono::NaiveDate>,
    pub end_date: Option<chrono::NaiveDate>,
    pub duration_minutes: u32,
    pub timezone: String,
}

/// Fields needed to create a [`Booking`]; the store enforces
/// `(schedule_id, shift_start)` uniqueness and assigns `booking_id`.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub user_id: i64,
    pub schedule_id: i64,
    pub shift_start: DateTime<Utc>,
    pub shift_end: DateTime<Utc>,
    pub buddy_user_id: Option<i64>,
    pub buddy_name: Option<String>,
}

/// Fields needed to create a [`RecurringAssignment`]; the store enforces
/// `(user_id, day_of_week, schedule_id, time_slot)` uniqueness among active
/// rows and assigns `id`.
#[derive(Debug, Clone)]
pub struct NewRecurringAssignment {
    pub user_id: i64,
    pub day_of_week: u8,
    pub schedule_id: i64,
    pub time_slot: String,
    pub buddy_name: Option<String>,
    pub description: Option<String>,
}

/// Fields needed to create a [`Report`]; the store assigns `report_id`.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub booking_id: Option<i64>,
    pub user_id: i64,
    pub severity: Severity,
    pub message: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub gps_accuracy: Option<f64>,
    pub gps_timestamp: Option<DateTime<Utc>>,
}

/// Fields needed to create a [`Broadcast`]; the store assigns `broadcast_id`
/// and starts both counters at zero.
#[derive(Debug, Clone)]
pub struct NewBroadcast {
    pub title: String,
    pub message: String,
    pub audience: BroadcastAudience,
}

/// A single points-ledger append; the store computes `points_awarded` from
/// `reason.base_amount() * multiplier`, assigns `id`, and folds the delta
/// into [`UserPointsCache`] within the same call.
#[derive(Debug, Clone)]
pub struct NewPointsLedgerEntry {
    pub user_id: i64,
    pub booking_id: Option<i64>,
    pub reason: PointsReason,
    pub multiplier: f64,
}

impl NewPointsLedgerEntry {
    pub fn new(user_id: i64, reason: PointsReason) -> Self {
        Self {
            user_id,
            booking_id: None,
            reason,
            multiplier: 1.0,
        }
    }

    pub fn for_booking(mut self, booking_id: i64) -> Self {
        self.booking_id = Some(booking_id);
        self
    }
}

/// Typed, transactional persistence for every entity in §3 of the
/// specification. Unlike a generic namespaced key-value abstraction, each
/// operation here names the entity and invariant it enforces directly —
/// uniqueness on `(schedule_id, shift_start)` and on active
/// `(user_id, day_of_week, schedule_id, time_slot)` tuples is the store's
/// job, not the caller's.
///
/// Implementations must run each method's multi-row writes (booking +
/// outbox + audit, or check-in + ledger + cache + audit) inside a single
/// transaction, per §5.
#[async_trait]
pub trait Store: Send + Sync {
    // -- Users ---------------------------------------------------------
    async fn create_user(&self, phone: &str, name: Option<&str>) -> Result<User, DomainError>;
    async fn get_user_by_phone(&self, phone: &str) -> Result<Option<User>, DomainError>;
    async fn get_user(&self, user_id: i64) -> Result<Option<User>, DomainError>;
    async fn user_count(&self) -> Result<i64, DomainError>;

    /// Resolves a [`BroadcastAudience`] against the user table, at call
    /// time, for the web-push fan-out transport.
    async fn list_users_for_broadcast(&self, audience: BroadcastAudience) -> Result<Vec<User>, DomainError>;

    // -- Schedules -------------------------------------------------------
    async fn create_schedule(&self, new: NewSchedule) -> Result<Schedule, DomainError>;
    async fn update_schedule(&self, schedule: Schedule) -> Result<Schedule, DomainError>;
    async fn delete_schedule(&self, schedule_id: i64) -> Result<(), DomainError>;
    async fn get_schedule(&self, schedule_id: i64) -> Result<Option<Schedule>, DomainError>;
    async fn list_schedules(&self) -> Result<Vec<Schedule>, DomainError>;

    // -- Bookings --------------------------------------------------------
    /// Inserts a booking plus its follow-up outbox rows and audit event in
    /// one transaction. Returns [`DomainError::SlotTaken`] on a
    /// `(schedule_id, shift_start)` unique violation rather than a generic
    /// store error.
    async fn create_booking(
        &self,
        new: NewBooking,
        outbox_items: Vec<NewOutboxItem>,
        audit: NewAuditEvent,
    ) -> Result<Booking, DomainError>;

    async fn get_booking(&self, booking_id: i64) -> Result<Option<Booking>, DomainError>;
    async fn list_bookings_for_user(&self, user_id: i64) -> Result<Vec<Booking>, DomainError>;
    async fn list_bookings_in_range(
        &self,
        schedule_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Booking>, DomainError>;
    async fn delete_booking(&self, booking_id: i64, audit: NewAuditEvent) -> Result<(), DomainError>;

    /// Sets `checked_in_at`, appends the ledger entries, folds them into the
    /// points cache, and writes the audit event, all in one transaction.
    /// Idempotent: if the booking is already checked in, returns its
    /// current state without writing anything further.
    async fn check_in_booking(
        &self,
        booking_id: i64,
        checked_in_at: DateTime<Utc>,
        ledger_entries: Vec<NewPointsLedgerEntry>,
        audit: NewAuditEvent,
    ) -> Result<Booking, DomainError>;

    // -- Recurring assignments --------------------------------------------
    async fn create_recurring_assignment(
        &self,
        new: NewRecurringAssignment,
    ) -> Result<RecurringAssignment, DomainError>;
    async fn list_active_recurring_assignments(&self) -> Result<Vec<RecurringAssignment>, DomainError>;
    async fn get_recurring_assignment(&self, id: i64) -> Result<Option<RecurringAssignment>, DomainError>;
    async fn deactivate_recurring_assignment(&self, id: i64) -> Result<(), DomainError>;

    // -- Outbox ------------------------------------------------------------
    async fn enqueue_outbox_item(&self, new: NewOutboxItem) -> Result<OutboxItem, DomainError>;
    async fn select_due_outbox_items(
        &self,
        batch_size: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<OutboxItem>, DomainError>;
    async fn mark_outbox_sent(&self, outbox_id: i64, sent_at: DateTime<Utc>) -> Result<(), DomainError>;
    async fn mark_outbox_retry(
        &self,
        outbox_id: i64,
        retry_count: u32,
        send_at: DateTime<Utc>,
    ) -> Result<(), DomainError>;
    async fn mark_outbox_failed(&self, outbox_id: i64, retry_count: u32) -> Result<(), DomainError>;

    // -- Reports -----------------------------------------------------------
    /// Inserts the report and its ledger entries (e.g. `report_filed`, and
    /// `shift_completion` when this report closes out the booking) in one
    /// transaction.
    async fn create_report(
        &self,
        new: NewReport,
        ledger_entries: Vec<NewPointsLedgerEntry>,
    ) -> Result<Report, DomainError>;

    // -- Points --------------------------------------------------------------
    async fn get_points_cache(&self, user_id: i64) -> Result<UserPointsCache, DomainError>;

    // -- Audit ---------------------------------------------------------------
    async fn append_audit_event(&self, new: NewAuditEvent) -> Result<AuditEvent, DomainError>;
    async fn list_recent_audit_events(&self, limit: u32) -> Result<Vec<AuditEvent>, DomainError>;

    // -- Broadcasts ------------------------------------------------------------
    async fn create_broadcast(&self, new: NewBroadcast) -> Result<Broadcast, DomainError>;
    async fn get_broadcast(&self, broadcast_id: i64) -> Result<Option<Broadcast>, DomainError>;
    /// Folds per-recipient fan-out outcomes into the broadcast's own tally;
    /// does not touch the triggering outbox row (§4.5 "Fan-out").
    async fn record_broadcast_delivery(
        &self,
        broadcast_id: i64,
        sent_delta: u32,
        failed_delta: u32,
    ) -> Result<(), DomainError>;
}
