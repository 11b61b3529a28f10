use sqlx::PgPool;

use crate::config::PostgresConfig;

/// Creates the schema (if missing) and every table named in §3, plus the
/// one bit-exact index the whole protocol depends on:
/// `(schedule_id, shift_start)` uniqueness on the bookings table.
pub async fn run_migrations(pool: &PgPool, config: &PostgresConfig) -> Result<(), sqlx::Error> {
    sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", config.schema))
        .execute(pool)
        .await?;

    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {} (
            user_id BIGSERIAL PRIMARY KEY,
            phone TEXT NOT NULL UNIQUE,
            name TEXT,
            role TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
        config.users_table()
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {} (
            schedule_id BIGSERIAL PRIMARY KEY,
            name TEXT NOT NULL,
            cron_expr TEXT NOT NULL,
            start_date DATE,
            end_date DATE,
            duration_minutes INTEGER NOT NULL,
            timezone TEXT NOT NULL
        )",
        config.schedules_table()
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {} (
            booking_id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL REFERENCES {},
            schedule_id BIGINT NOT NULL REFERENCES {},
            shift_start TIMESTAMPTZ NOT NULL,
            shift_end TIMESTAMPTZ NOT NULL,
            buddy_user_id BIGINT,
            buddy_name TEXT,
            checked_in_at TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            UNIQUE (schedule_id, shift_start)
        )",
        config.bookings_table(),
        config.users_table(),
        config.schedules_table(),
    ))
    .execute(pool)
    .await?;
    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS {}_user_idx ON {} (user_id)",
        config.table_prefix.trim_end_matches('_'),
        config.bookings_table()
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {} (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL REFERENCES {},
            day_of_week SMALLINT NOT NULL,
            schedule_id BIGINT NOT NULL REFERENCES {},
            time_slot TEXT NOT NULL,
            buddy_name TEXT,
            description TEXT,
            is_active BOOLEAN NOT NULL DEFAULT true,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
        config.recurring_assignments_table(),
        config.users_table(),
        config.schedules_table(),
    ))
    .execute(pool)
    .await?;
    sqlx::query(&format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS {}_active_idx ON {} (user_id, day_of_week, schedule_id, time_slot) WHERE is_active",
        config.table_prefix.trim_end_matches('_'),
        config.recurring_assignments_table()
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {} (
            outbox_id BIGSERIAL PRIMARY KEY,
            message_type TEXT NOT NULL,
            recipient TEXT NOT NULL,
            payload JSONB NOT NULL,
            user_id BIGINT,
            send_at TIMESTAMPTZ NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            retry_count INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            sent_at TIMESTAMPTZ
        )",
        config.outbox_table()
    ))
    .execute(pool)
    .await?;
    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS {}_due_idx ON {} (status, send_at)",
        config.table_prefix.trim_end_matches('_'),
        config.outbox_table()
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {} (
            report_id BIGSERIAL PRIMARY KEY,
            booking_id BIGINT REFERENCES {},
            user_id BIGINT NOT NULL REFERENCES {},
            severity SMALLINT NOT NULL,
            message TEXT,
            latitude DOUBLE PRECISION,
            longitude DOUBLE PRECISION,
            gps_accuracy DOUBLE PRECISION,
            gps_timestamp TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            archived_at TIMESTAMPTZ
        )",
        config.reports_table(),
        config.bookings_table(),
        config.users_table(),
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {} (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL REFERENCES {},
            booking_id BIGINT,
            points_awarded INTEGER NOT NULL,
            reason TEXT NOT NULL,
            multiplier DOUBLE PRECISION NOT NULL DEFAULT 1.0,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
        config.points_ledger_table(),
        config.users_table(),
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {} (
            user_id BIGINT PRIMARY KEY REFERENCES {},
            total_points BIGINT NOT NULL DEFAULT 0,
            shift_count BIGINT NOT NULL DEFAULT 0,
            last_activity_date DATE
        )",
        config.points_cache_table(),
        config.users_table(),
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {} (
            id BIGSERIAL PRIMARY KEY,
            actor_user_id BIGINT,
            action TEXT NOT NULL,
            target TEXT NOT NULL,
            details JSONB NOT NULL DEFAULT '{{}}'::jsonb,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
        config.audit_table()
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {} (
            broadcast_id BIGSERIAL PRIMARY KEY,
            title TEXT NOT NULL,
            message TEXT NOT NULL,
            audience TEXT NOT NULL,
            sent_count INTEGER NOT NULL DEFAULT 0,
            failed_count INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
        config.broadcasts_table()
    ))
    .execute(pool)
    .await?;

    Ok(())
}
