use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Row};

use nightwatch_core::{
    AuditEvent, Booking, Broadcast, BroadcastAudience, DomainError, MessageType, NewAuditEvent,
    NewOutboxItem, OutboxItem, OutboxStatus, PointsReason, RecurringAssignment, Report, Role,
    Schedule, Severity, User, UserPointsCache,
};
use nightwatch_store::{
    NewBooking, NewBroadcast, NewPointsLedgerEntry, NewRecurringAssignment, NewReport, NewSchedule,
    Store,
};

use crate::config::PostgresConfig;
use crate::migrations::run_migrations;

/// Postgres-backed [`Store`] implementation. Multi-row writes that must be
/// atomic (§5) run inside an explicit `sqlx::Transaction`.
pub struct PostgresStore {
    pool: PgPool,
    config: Arc<PostgresConfig>,
}

fn to_domain(err: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(ref db_err) = err {
        // Postgres unique_violation.
        if db_err.code().as_deref() == Some("23505") {
            return DomainError::SlotTaken;
        }
    }
    DomainError::internal(err)
}

fn role_to_str(role: Role) -> &'static str {
    match role {
        Role::Admin => "admin",
        Role::Owl => "owl",
        Role::Guest => "guest",
    }
}

fn role_from_str(s: &str) -> Role {
    match s {
        "admin" => Role::Admin,
        "guest" => Role::Guest,
        _ => Role::Owl,
    }
}

fn message_type_to_str(mt: MessageType) -> &'static str {
    mt.as_str()
}

fn message_type_from_str(s: &str) -> MessageType {
    match s {
        "OTP_VERIFICATION" => MessageType::OtpVerification,
        "ADMIN_SHIFT_ASSIGNMENT" => MessageType::AdminShiftAssignment,
        "BROADCAST" => MessageType::Broadcast,
        _ => MessageType::ShiftReminder,
    }
}

fn status_to_str(status: OutboxStatus) -> &'static str {
    match status {
        OutboxStatus::Pending => "pending",
        OutboxStatus::Sent => "sent",
        OutboxStatus::Failed => "failed",
    }
}

fn status_from_str(s: &str) -> OutboxStatus {
    match s {
        "sent" => OutboxStatus::Sent,
        "failed" => OutboxStatus::Failed,
        _ => OutboxStatus::Pending,
    }
}

fn reason_to_str(reason: PointsReason) -> &'static str {
    match reason {
        PointsReason::ShiftCheckin => "shift_checkin",
        PointsReason::EarlyCheckin => "early_checkin",
        PointsReason::ShiftCompletion => "shift_completion",
        PointsReason::ReportFiled => "report_filed",
        PointsReason::LateCheckin => "late_checkin",
    }
}

fn severity_to_i16(severity: Severity) -> i16 {
    severity as i16
}

fn severity_from_i16(v: i16) -> Severity {
    match v {
        2 => Severity::Critical,
        1 => Severity::Warning,
        _ => Severity::Info,
    }
}

fn user_from_row(row: &sqlx::postgres::PgRow) -> Result<User, DomainError> {
    Ok(User {
        user_id: row.try_get("user_id").map_err(to_domain)?,
        phone: row.try_get("phone").map_err(to_domain)?,
        name: row.try_get("name").map_err(to_domain)?,
        role: role_from_str(&row.try_get::<String, _>("role").map_err(to_domain)?),
        created_at: row.try_get("created_at").map_err(to_domain)?,
    })
}

fn schedule_from_row(row: &sqlx::postgres::PgRow) -> Result<Schedule, DomainError> {
    Ok(Schedule {
        schedule_id: row.try_get("schedule_id").map_err(to_domain)?,
        name: row.try_get("name").map_err(to_domain)?,
        cron_expr: row.try_get("cron_expr").map_err(to_domain)?,
        start_date: row.try_get::<Option<NaiveDate>, _>("start_date").map_err(to_domain)?,
        end_date: row.try_get::<Option<NaiveDate>, _>("end_date").map_err(to_domain)?,
        duration_minutes: row.try_get::<i32, _>("duration_minutes").map_err(to_domain)? as u32,
        timezone: row.try_get("timezone").map_err(to_domain)?,
    })
}

fn booking_from_row(row: &sqlx::postgres::PgRow) -> Result<Booking, DomainError> {
    Ok(Booking {
        booking_id: row.try_get("booking_id").map_err(to_domain)?,
        user_id: row.try_get("user_id").map_err(to_domain)?,
        schedule_id: row.try_get("schedule_id").map_err(to_domain)?,
        shift_start: row.try_get("shift_start").map_err(to_domain)?,
        shift_end: row.try_get("shift_end").map_err(to_domain)?,
        buddy_user_id: row.try_get("buddy_user_id").map_err(to_domain)?,
        buddy_name: row.try_get("buddy_name").map_err(to_domain)?,
        checked_in_at: row.try_get::<Option<DateTime<Utc>>, _>("checked_in_at").map_err(to_domain)?,
        created_at: row.try_get("created_at").map_err(to_domain)?,
    })
}

fn recurring_from_row(row: &sqlx::postgres::PgRow) -> Result<RecurringAssignment, DomainError> {
    Ok(RecurringAssignment {
        id: row.try_get("id").map_err(to_domain)?,
        user_id: row.try_get("user_id").map_err(to_domain)?,
        day_of_week: row.try_get::<i16, _>("day_of_week").map_err(to_domain)? as u8,
        schedule_id: row.try_get("schedule_id").map_err(to_domain)?,
        time_slot: row.try_get("time_slot").map_err(to_domain)?,
        buddy_name: row.try_get("buddy_name").map_err(to_domain)?,
        description: row.try_get("description").map_err(to_domain)?,
        is_active: row.try_get("is_active").map_err(to_domain)?,
        created_at: row.try_get("created_at").map_err(to_domain)?,
        updated_at: row.try_get("updated_at").map_err(to_domain)?,
    })
}

fn outbox_from_row(row: &sqlx::postgres::PgRow) -> Result<OutboxItem, DomainError> {
    Ok(OutboxItem {
        outbox_id: row.try_get("outbox_id").map_err(to_domain)?,
        message_type: message_type_from_str(&row.try_get::<String, _>("message_type").map_err(to_domain)?),
        recipient: row.try_get("recipient").map_err(to_domain)?,
        payload: row.try_get("payload").map_err(to_domain)?,
        user_id: row.try_get("user_id").map_err(to_domain)?,
        send_at: row.try_get("send_at").map_err(to_domain)?,
        status: status_from_str(&row.try_get::<String, _>("status").map_err(to_domain)?),
        retry_count: row.try_get::<i32, _>("retry_count").map_err(to_domain)? as u32,
        created_at: row.try_get("created_at").map_err(to_domain)?,
        sent_at: row.try_get::<Option<DateTime<Utc>>, _>("sent_at").map_err(to_domain)?,
    })
}

fn report_from_row(row: &sqlx::postgres::PgRow) -> Result<Report, DomainError> {
    Ok(Report {
        report_id: row.try_get("report_id").map_err(to_domain)?,
        booking_id: row.try_get("booking_id").map_err(to_domain)?,
        user_id: row.try_get("user_id").map_err(to_domain)?,
        severity: severity_from_i16(row.try_get::<i16, _>("severity").map_err(to_domain)?),
        message: row.try_get("message").map_err(to_domain)?,
        latitude: row.try_get("latitude").map_err(to_domain)?,
        longitude: row.try_get("longitude").map_err(to_domain)?,
        gps_accuracy: row.try_get("gps_accuracy").map_err(to_domain)?,
        gps_timestamp: row.try_get::<Option<DateTime<Utc>>, _>("gps_timestamp").map_err(to_domain)?,
        created_at: row.try_get("created_at").map_err(to_domain)?,
        archived_at: row.try_get::<Option<DateTime<Utc>>, _>("archived_at").map_err(to_domain)?,
    })
}

fn audit_from_row(row: &sqlx::postgres::PgRow) -> Result<AuditEvent, DomainError> {
    Ok(AuditEvent {
        id: row.try_get("id").map_err(to_domain)?,
        actor_user_id: row.try_get("actor_user_id").map_err(to_domain)?,
        action: row.try_get("action").map_err(to_domain)?,
        target: row.try_get("target").map_err(to_domain)?,
        details: row.try_get("details").map_err(to_domain)?,
        created_at: row.try_get("created_at").map_err(to_domain)?,
    })
}

fn audience_to_str(audience: BroadcastAudience) -> &'static str {
    audience.as_str()
}

fn audience_from_str(s: &str) -> BroadcastAudience {
    BroadcastAudience::from_str_loose(s).unwrap_or(BroadcastAudience::All)
}

fn broadcast_from_row(row: &sqlx::postgres::PgRow) -> Result<Broadcast, DomainError> {
    let audience: String = row.try_get("audience").map_err(to_domain)?;
    let sent_count: i32 = row.try_get("sent_count").map_err(to_domain)?;
    let failed_count: i32 = row.try_get("failed_count").map_err(to_domain)?;
    Ok(Broadcast {
        broadcast_id: row.try_get("broadcast_id").map_err(to_domain)?,
        title: row.try_get("title").map_err(to_domain)?,
        message: row.try_get("message").map_err(to_domain)?,
        audience: audience_from_str(&audience),
        sent_count: sent_count as u32,
        failed_count: failed_count as u32,
        created_at: row.try_get("created_at").map_err(to_domain)?,
    })
}

impl PostgresStore {
    /// Connects, runs migrations, and returns a ready store.
    pub async fn new(config: PostgresConfig) -> Result<Self, DomainError> {
        let pool = PgPool::connect(&config.url).await.map_err(to_domain)?;
        Self::from_pool(pool, config).await
    }

    /// Builds a store from an already-connected pool, running migrations.
    /// Useful for tests that share a pool across fixtures.
    pub async fn from_pool(pool: PgPool, config: PostgresConfig) -> Result<Self, DomainError> {
        run_migrations(&pool, &config).await.map_err(to_domain)?;
        Ok(Self {
            pool,
            config: Arc::new(config),
        })
    }

    async fn insert_ledger_entry(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        config: &PostgresConfig,
        entry: &NewPointsLedgerEntry,
    ) -> Result<(), sqlx::Error> {
        let amount = (f64::from(entry.reason.base_amount()) * entry.multiplier).round() as i32;
        // Only a `ShiftCheckin` entry marks a shift as having happened; the
        // early/late bonus entries that ride alongside it in the same
        // check-in must not bump the count a second time.
        let shift_delta: i64 = i64::from(entry.reason == PointsReason::ShiftCheckin);
        sqlx::query(&format!(
            "INSERT INTO {} (user_id, booking_id, points_awarded, reason, multiplier) VALUES ($1, $2, $3, $4, $5)",
            config.points_ledger_table()
        ))
        .bind(entry.user_id)
        .bind(entry.booking_id)
        .bind(amount)
        .bind(reason_to_str(entry.reason))
        .bind(entry.multiplier)
        .execute(&mut **tx)
        .await?;

        sqlx::query(&format!(
            "INSERT INTO {cache} (user_id, total_points, shift_count, last_activity_date)
             VALUES ($1, $2, $3, CURRENT_DATE)
             ON CONFLICT (user_id) DO UPDATE SET
                total_points = {cache}.total_points + EXCLUDED.total_points,
                shift_count = {cache}.shift_count + EXCLUDED.shift_count,
                last_activity_date = CURRENT_DATE",
            cache = config.points_cache_table()
        ))
        .bind(entry.user_id)
        .bind(i64::from(amount))
        .bind(shift_delta)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn insert_audit_event(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        config: &PostgresConfig,
        new: &NewAuditEvent,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(&format!(
            "INSERT INTO {} (actor_user_id, action, target, details) VALUES ($1, $2, $3, $4)",
            config.audit_table()
        ))
        .bind(new.actor_user_id)
        .bind(&new.action)
        .bind(&new.target)
        .bind(&new.details)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn create_user(&self, phone: &str, name: Option<&str>) -> Result<User, DomainError> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", self.config.users_table()))
            .fetch_one(&self.pool)
            .await
            .map_err(to_domain)?;
        let role = if count == 0 { Role::Admin } else { Role::Guest };

        let row = sqlx::query(&format!(
            "INSERT INTO {} (phone, name, role) VALUES ($1, $2, $3) RETURNING *",
            self.config.users_table()
        ))
        .bind(phone)
        .bind(name)
        .bind(role_to_str(role))
        .fetch_one(&self.pool)
        .await
        .map_err(to_domain)?;
        user_from_row(&row)
    }

    async fn get_user_by_phone(&self, phone: &str) -> Result<Option<User>, DomainError> {
        let row = sqlx::query(&format!("SELECT * FROM {} WHERE phone = $1", self.config.users_table()))
            .bind(phone)
            .fetch_optional(&self.pool)
            .await
            .map_err(to_domain)?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn get_user(&self, user_id: i64) -> Result<Option<User>, DomainError> {
        let row = sqlx::query(&format!("SELECT * FROM {} WHERE user_id = $1", self.config.users_table()))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(to_domain)?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn user_count(&self) -> Result<i64, DomainError> {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", self.config.users_table()))
            .fetch_one(&self.pool)
            .await
            .map_err(to_domain)
    }

    async fn list_users_for_broadcast(&self, audience: BroadcastAudience) -> Result<Vec<User>, DomainError> {
        let rows = match audience {
            BroadcastAudience::All => {
                sqlx::query(&format!("SELECT * FROM {}", self.config.users_table()))
                    .fetch_all(&self.pool)
                    .await
            }
            BroadcastAudience::Admins | BroadcastAudience::Owls => {
                let role = if matches!(audience, BroadcastAudience::Admins) {
                    Role::Admin
                } else {
                    Role::Owl
                };
                sqlx::query(&format!(
                    "SELECT * FROM {} WHERE role = $1",
                    self.config.users_table()
                ))
                .bind(role_to_str(role))
                .fetch_all(&self.pool)
                .await
            }
            BroadcastAudience::Active => {
                sqlx::query(&format!(
                    "SELECT DISTINCT u.* FROM {} u JOIN {} b ON b.user_id = u.user_id
                     WHERE b.created_at >= $1",
                    self.config.users_table(),
                    self.config.bookings_table()
                ))
                .bind(Utc::now() - chrono::Duration::days(30))
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(to_domain)?;
        rows.iter().map(user_from_row).collect()
    }

    async fn create_schedule(&self, new: NewSchedule) -> Result<Schedule, DomainError> {
        let row = sqlx::query(&format!(
            "INSERT INTO {} (name, cron_expr, start_date, end_date, duration_minutes, timezone)
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
            self.config.schedules_table()
        ))
        .bind(new.name)
        .bind(new.cron_expr)
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(new.duration_minutes as i32)
        .bind(new.timezone)
        .fetch_one(&self.pool)
        .await
        .map_err(to_domain)?;
        schedule_from_row(&row)
    }

    async fn update_schedule(&self, schedule: Schedule) -> Result<Schedule, DomainError> {
        let row = sqlx::query(&format!(
            "UPDATE {} SET name = $2, cron_expr = $3, start_date = $4, end_date = $5,
                duration_minutes = $6, timezone = $7 WHERE schedule_id = $1 RETURNING *",
            self.config.schedules_table()
        ))
        .bind(schedule.schedule_id)
        .bind(&schedule.name)
        .bind(&schedule.cron_expr)
        .bind(schedule.start_date)
        .bind(schedule.end_date)
        .bind(schedule.duration_minutes as i32)
        .bind(&schedule.timezone)
        .fetch_optional(&self.pool)
        .await
        .map_err(to_domain)?
        .ok_or_else(|| DomainError::NotFound(format!("schedule {}", schedule.schedule_id)))?;
        schedule_from_row(&row)
    }

    async fn delete_schedule(&self, schedule_id: i64) -> Result<(), DomainError> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE schedule_id = $1", self.config.schedules_table()))
            .bind(schedule_id)
            .execute(&self.pool)
            .await
            .map_err(to_domain)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound(format!("schedule {schedule_id}")));
        }
        Ok(())
    }

    async fn get_schedule(&self, schedule_id: i64) -> Result<Option<Schedule>, DomainError> {
        let row = sqlx::query(&format!("SELECT * FROM {} WHERE schedule_id = $1", self.config.schedules_table()))
            .bind(schedule_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(to_domain)?;
        row.as_ref().map(schedule_from_row).transpose()
    }

    async fn list_schedules(&self) -> Result<Vec<Schedule>, DomainError> {
        let rows = sqlx::query(&format!("SELECT * FROM {} ORDER BY schedule_id", self.config.schedules_table()))
            .fetch_all(&self.pool)
            .await
            .map_err(to_domain)?;
        rows.iter().map(schedule_from_row).collect()
    }

    async fn create_booking(
        &self,
        new: NewBooking,
        outbox_items: Vec<NewOutboxItem>,
        audit: NewAuditEvent,
    ) -> Result<Booking, DomainError> {
        let mut tx = self.pool.begin().await.map_err(to_domain)?;

        let row = sqlx::query(&format!(
            "INSERT INTO {} (user_id, schedule_id, shift_start, shift_end, buddy_user_id, buddy_name)
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
            self.config.bookings_table()
        ))
        .bind(new.user_id)
        .bind(new.schedule_id)
        .bind(new.shift_start)
        .bind(new.shift_end)
        .bind(new.buddy_user_id)
        .bind(&new.buddy_name)
        .fetch_one(&mut *tx)
        .await
        .map_err(to_domain)?;
        let booking = booking_from_row(&row)?;

        for item in &outbox_items {
            sqlx::query(&format!(
                "INSERT INTO {} (message_type, recipient, payload, user_id, send_at)
                 VALUES ($1, $2, $3, $4, $5)",
                self.config.outbox_table()
            ))
            .bind(message_type_to_str(item.message_type))
            .bind(&item.recipient)
            .bind(&item.payload)
            .bind(item.user_id)
            .bind(item.send_at)
            .execute(&mut *tx)
            .await
            .map_err(to_domain)?;
        }

        Self::insert_audit_event(&mut tx, &self.config, &audit)
            .await
            .map_err(to_domain)?;

        tx.commit().await.map_err(to_domain)?;
        Ok(booking)
    }

    async fn get_booking(&self, booking_id: i64) -> Result<Option<Booking>, DomainError> {
        let row = sqlx::query(&format!("SELECT * FROM {} WHERE booking_id = $1", self.config.bookings_table()))
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(to_domain)?;
        row.as_ref().map(booking_from_row).transpose()
    }

    async fn list_bookings_for_user(&self, user_id: i64) -> Result<Vec<Booking>, DomainError> {
        let rows = sqlx::query(&format!(
            "SELECT * FROM {} WHERE user_id = $1 ORDER BY shift_start",
            self.config.bookings_table()
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(to_domain)?;
        rows.iter().map(booking_from_row).collect()
    }

    async fn list_bookings_in_range(
        &self,
        schedule_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Booking>, DomainError> {
        let rows = sqlx::query(&format!(
            "SELECT * FROM {} WHERE schedule_id = $1 AND shift_start >= $2 AND shift_start < $3 ORDER BY shift_start",
            self.config.bookings_table()
        ))
        .bind(schedule_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(to_domain)?;
        rows.iter().map(booking_from_row).collect()
    }

    async fn delete_booking(&self, booking_id: i64, audit: NewAuditEvent) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(to_domain)?;
        let result = sqlx::query(&format!("DELETE FROM {} WHERE booking_id = $1", self.config.bookings_table()))
            .bind(booking_id)
            .execute(&mut *tx)
            .await
            .map_err(to_domain)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound(format!("booking {booking_id}")));
        }
        Self::insert_audit_event(&mut tx, &self.config, &audit)
            .await
            .map_err(to_domain)?;
        tx.commit().await.map_err(to_domain)?;
        Ok(())
    }

    async fn check_in_booking(
        &self,
        booking_id: i64,
        checked_in_at: DateTime<Utc>,
        ledger_entries: Vec<NewPointsLedgerEntry>,
        audit: NewAuditEvent,
    ) -> Result<Booking, DomainError> {
        let mut tx = self.pool.begin().await.map_err(to_domain)?;

        let row = sqlx::query(&format!(
            "UPDATE {} SET checked_in_at = $2 WHERE booking_id = $1 AND checked_in_at IS NULL RETURNING *",
            self.config.bookings_table()
        ))
        .bind(booking_id)
        .bind(checked_in_at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(to_domain)?;

        let booking = match row {
            Some(row) => {
                for entry in &ledger_entries {
                    Self::insert_ledger_entry(&mut tx, &self.config, entry)
                        .await
                        .map_err(to_domain)?;
                }
                Self::insert_audit_event(&mut tx, &self.config, &audit)
                    .await
                    .map_err(to_domain)?;
                booking_from_row(&row)?
            }
            None => {
                // Either not found or already checked in; distinguish by a
                // plain read so the coordinator can return idempotently.
                let existing = sqlx::query(&format!(
                    "SELECT * FROM {} WHERE booking_id = $1",
                    self.config.bookings_table()
                ))
                .bind(booking_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(to_domain)?
                .ok_or_else(|| DomainError::NotFound(format!("booking {booking_id}")))?;
                booking_from_row(&existing)?
            }
        };

        tx.commit().await.map_err(to_domain)?;
        Ok(booking)
    }

    async fn create_recurring_assignment(
        &self,
        new: NewRecurringAssignment,
    ) -> Result<RecurringAssignment, DomainError> {
        let row = sqlx::query(&format!(
            "INSERT INTO {} (user_id, day_of_week, schedule_id, time_slot, buddy_name, description)
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
            self.config.recurring_assignments_table()
        ))
        .bind(new.user_id)
        .bind(i16::from(new.day_of_week))
        .bind(new.schedule_id)
        .bind(&new.time_slot)
        .bind(&new.buddy_name)
        .bind(&new.description)
        .fetch_one(&self.pool)
        .await
        .map_err(to_domain)?;
        recurring_from_row(&row)
    }

    async fn list_active_recurring_assignments(&self) -> Result<Vec<RecurringAssignment>, DomainError> {
        let rows = sqlx::query(&format!(
            "SELECT * FROM {} WHERE is_active ORDER BY id",
            self.config.recurring_assignments_table()
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(to_domain)?;
        rows.iter().map(recurring_from_row).collect()
    }

    async fn get_recurring_assignment(&self, id: i64) -> Result<Option<RecurringAssignment>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT * FROM {} WHERE id = $1",
            self.config.recurring_assignments_table()
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(to_domain)?;
        row.as_ref().map(recurring_from_row).transpose()
    }

    async fn deactivate_recurring_assignment(&self, id: i64) -> Result<(), DomainError> {
        let result = sqlx::query(&format!(
            "UPDATE {} SET is_active = false, updated_at = now() WHERE id = $1",
            self.config.recurring_assignments_table()
        ))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(to_domain)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound(format!("recurring assignment {id}")));
        }
        Ok(())
    }

    async fn enqueue_outbox_item(&self, new: NewOutboxItem) -> Result<OutboxItem, DomainError> {
        let row = sqlx::query(&format!(
            "INSERT INTO {} (message_type, recipient, payload, user_id, send_at) VALUES ($1, $2, $3, $4, $5) RETURNING *",
            self.config.outbox_table()
        ))
        .bind(message_type_to_str(new.message_type))
        .bind(&new.recipient)
        .bind(&new.payload)
        .bind(new.user_id)
        .bind(new.send_at)
        .fetch_one(&self.pool)
        .await
        .map_err(to_domain)?;
        outbox_from_row(&row)
    }

    async fn select_due_outbox_items(
        &self,
        batch_size: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<OutboxItem>, DomainError> {
        let rows = sqlx::query(&format!(
            "SELECT * FROM {} WHERE status = 'pending' AND send_at <= $1 ORDER BY created_at LIMIT $2",
            self.config.outbox_table()
        ))
        .bind(now)
        .bind(i64::from(batch_size))
        .fetch_all(&self.pool)
        .await
        .map_err(to_domain)?;
        rows.iter().map(outbox_from_row).collect()
    }

    async fn mark_outbox_sent(&self, outbox_id: i64, sent_at: DateTime<Utc>) -> Result<(), DomainError> {
        sqlx::query(&format!(
            "UPDATE {} SET status = 'sent', sent_at = $2 WHERE outbox_id = $1",
            self.config.outbox_table()
        ))
        .bind(outbox_id)
        .bind(sent_at)
        .execute(&self.pool)
        .await
        .map_err(to_domain)?;
        Ok(())
    }

    async fn mark_outbox_retry(
        &self,
        outbox_id: i64,
        retry_count: u32,
        send_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        sqlx::query(&format!(
            "UPDATE {} SET retry_count = $2, send_at = $3 WHERE outbox_id = $1",
            self.config.outbox_table()
        ))
        .bind(outbox_id)
        .bind(retry_count as i32)
        .bind(send_at)
        .execute(&self.pool)
        .await
        .map_err(to_domain)?;
        Ok(())
    }

    async fn mark_outbox_failed(&self, outbox_id: i64, retry_count: u32) -> Result<(), DomainError> {
        sqlx::query(&format!(
            "UPDATE {} SET status = 'failed', retry_count = $2 WHERE outbox_id = $1",
            self.config.outbox_table()
        ))
        .bind(outbox_id)
        .bind(retry_count as i32)
        .execute(&self.pool)
        .await
        .map_err(to_domain)?;
        Ok(())
    }

    async fn create_report(
        &self,
        new: NewReport,
        ledger_entries: Vec<NewPointsLedgerEntry>,
    ) -> Result<Report, DomainError> {
        let mut tx = self.pool.begin().await.map_err(to_domain)?;

        let row = sqlx::query(&format!(
            "INSERT INTO {} (booking_id, user_id, severity, message, latitude, longitude, gps_accuracy, gps_timestamp)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
            self.config.reports_table()
        ))
        .bind(new.booking_id)
        .bind(new.user_id)
        .bind(severity_to_i16(new.severity))
        .bind(&new.message)
        .bind(new.latitude)
        .bind(new.longitude)
        .bind(new.gps_accuracy)
        .bind(new.gps_timestamp)
        .fetch_one(&mut *tx)
        .await
        .map_err(to_domain)?;
        let report = report_from_row(&row)?;

        for entry in &ledger_entries {
            Self::insert_ledger_entry(&mut tx, &self.config, entry)
                .await
                .map_err(to_domain)?;
        }

        tx.commit().await.map_err(to_domain)?;
        Ok(report)
    }

    async fn get_points_cache(&self, user_id: i64) -> Result<UserPointsCache, DomainError> {
        let row = sqlx::query(&format!("SELECT * FROM {} WHERE user_id = $1", self.config.points_cache_table()))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(to_domain)?;
        match row {
            Some(row) => Ok(UserPointsCache {
                user_id: row.try_get("user_id").map_err(to_domain)?,
                total_points: row.try_get("total_points").map_err(to_domain)?,
                shift_count: row.try_get("shift_count").map_err(to_domain)?,
                last_activity_date: row.try_get("last_activity_date").map_err(to_domain)?,
            }),
            None => Ok(UserPointsCache {
                user_id,
                total_points: 0,
                shift_count: 0,
                last_activity_date: None,
            }),
        }
    }

    async fn append_audit_event(&self, new: NewAuditEvent) -> Result<AuditEvent, DomainError> {
        let row = sqlx::query(&format!(
            "INSERT INTO {} (actor_user_id, action, target, details) VALUES ($1, $2, $3, $4) RETURNING *",
            self.config.audit_table()
        ))
        .bind(new.actor_user_id)
        .bind(&new.action)
        .bind(&new.target)
        .bind(&new.details)
        .fetch_one(&self.pool)
        .await
        .map_err(to_domain)?;
        audit_from_row(&row)
    }

    async fn list_recent_audit_events(&self, limit: u32) -> Result<Vec<AuditEvent>, DomainError> {
        let rows = sqlx::query(&format!(
            "SELECT * FROM {} ORDER BY created_at DESC LIMIT $1",
            self.config.audit_table()
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(to_domain)?;
        rows.iter().map(audit_from_row).collect()
    }

    async fn create_broadcast(&self, new: NewBroadcast) -> Result<Broadcast, DomainError> {
        let row = sqlx::query(&format!(
            "INSERT INTO {} (title, message, audience) VALUES ($1, $2, $3) RETURNING *",
            self.config.broadcasts_table()
        ))
        .bind(new.title)
        .bind(new.message)
        .bind(audience_to_str(new.audience))
        .fetch_one(&self.pool)
        .await
        .map_err(to_domain)?;
        broadcast_from_row(&row)
    }

    async fn get_broadcast(&self, broadcast_id: i64) -> Result<Option<Broadcast>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT * FROM {} WHERE broadcast_id = $1",
            self.config.broadcasts_table()
        ))
        .bind(broadcast_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(to_domain)?;
        row.as_ref().map(broadcast_from_row).transpose()
    }

    async fn record_broadcast_delivery(
        &self,
        broadcast_id: i64,
        sent_delta: u32,
        failed_delta: u32,
    ) -> Result<(), DomainError> {
        sqlx::query(&format!(
            "UPDATE {} SET sent_count = sent_count + $1, failed_count = failed_count + $2
             WHERE broadcast_id = $3",
            self.config.broadcasts_table()
        ))
        .bind(sent_delta as i32)
        .bind(failed_delta as i32)
        .bind(broadcast_id)
        .execute(&self.pool)
        .await
        .map_err(to_domain)?;
        Ok(())
    }
}
