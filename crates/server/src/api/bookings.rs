use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Extension;
use chrono::Utc;

use nightwatch_core::calendar::is_enumerated_slot_start;
use nightwatch_core::{CheckinWindow, DomainError, MessageType, NewAuditEvent, NewOutboxItem, PointsReason};
use nightwatch_store::{NewBooking, NewPointsLedgerEntry};

use crate::auth_middleware::CurrentUser;
use crate::error::ApiResult;
use crate::state::AppState;

use super::schemas::{CreateBookingRequest, ReportRequest};

/// `POST /bookings` -- reserves a slot for the caller, per §4.3's
/// create-booking algorithm. Rejects off-grid `shift_start` values and
/// relies on the store's `(schedule_id, shift_start)` uniqueness to
/// serialize concurrent attempts at the same slot.
#[utoipa::path(
    post,
    path = "/bookings",
    tag = "Bookings",
    request_body = CreateBookingRequest,
    responses((status = 201, description = "Booking created"))
)]
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateBookingRequest>,
) -> ApiResult<impl IntoResponse> {
    let schedule = state
        .store
        .get_schedule(req.schedule_id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("schedule {}", req.schedule_id)))?;

    let on_grid =
        is_enumerated_slot_start(&schedule, req.shift_start).map_err(|err| DomainError::BadRequest(err.to_string()))?;
    if !on_grid {
        return Err(DomainError::BadRequest("shift_start is not an enumerated slot".into()).into());
    }

    let shift_end = req.shift_start + chrono::Duration::minutes(i64::from(schedule.duration_minutes));

    let new_booking = NewBooking {
        user_id: user.user_id,
        schedule_id: req.schedule_id,
        shift_start: req.shift_start,
        shift_end,
        buddy_user_id: req.buddy_user_id,
        buddy_name: req.buddy_name,
    };

    // `booking_id` does not exist yet at enqueue time (the store assigns it
    // in the same transaction), so the reminder is addressed by slot rather
    // than by booking.
    let reminder = NewOutboxItem::now(
        MessageType::ShiftReminder,
        user.phone.clone(),
        serde_json::json!({
            "schedule_id": req.schedule_id,
            "shift_start": req.shift_start,
        }),
    )
    .with_send_at(req.shift_start - chrono::Duration::minutes(state.config.reminder_lead_minutes))
    .with_user_id(user.user_id);

    let audit = NewAuditEvent::new("booking.create", format!("schedule:{}", req.schedule_id))
        .by(user.user_id)
        .with_details(serde_json::json!({ "shift_start": req.shift_start }));

    let booking = state.store.create_booking(new_booking, vec![reminder], audit).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// `GET /bookings/my` -- the caller's own bookings, past and future.
#[utoipa::path(
    get,
    path = "/bookings/my",
    tag = "Bookings",
    responses((status = 200, description = "Caller's bookings"))
)]
pub async fn my_bookings(State(state): State<AppState>, Extension(user): Extension<CurrentUser>) -> ApiResult<impl IntoResponse> {
    let bookings = state.store.list_bookings_for_user(user.user_id).await?;
    Ok(Json(bookings))
}

/// `POST /bookings/{id}/checkin` -- idempotent check-in; awards
/// `shift_checkin` plus an early-bonus or late-penalty ledger entry per the
/// window classification in §4.3/§4.7.
#[utoipa::path(
    post,
    path = "/bookings/{id}/checkin",
    tag = "Bookings",
    responses((status = 200, description = "Checked in"))
)]
pub async fn check_in(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(booking_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let booking = state
        .store
        .get_booking(booking_id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("booking {booking_id}")))?;

    if booking.user_id != user.user_id {
        return Err(DomainError::Forbidden.into());
    }

    let now = Utc::now();
    let early_window = chrono::Duration::minutes(state.config.early_checkin_window_minutes);

    let mut ledger_entries = Vec::new();
    match booking.checkin_window(now, early_window) {
        CheckinWindow::AlreadyCheckedIn => {
            return Ok(Json(booking));
        }
        CheckinWindow::TooEarly => return Err(DomainError::TooEarly.into()),
        CheckinWindow::TooLate => return Err(DomainError::TooLate.into()),
        CheckinWindow::Open => {
            ledger_entries.push(NewPointsLedgerEntry::new(user.user_id, PointsReason::ShiftCheckin).for_booking(booking_id));
            if now < booking.shift_start {
                ledger_entries.push(NewPointsLedgerEntry::new(user.user_id, PointsReason::EarlyCheckin).for_booking(booking_id));
            } else if now >= booking.shift_start + chrono::Duration::minutes(15) {
                ledger_entries.push(NewPointsLedgerEntry::new(user.user_id, PointsReason::LateCheckin).for_booking(booking_id));
            }
        }
    }

    let audit = NewAuditEvent::new("booking.checkin", format!("booking:{booking_id}")).by(user.user_id);
    let updated = state.store.check_in_booking(booking_id, now, ledger_entries, audit).await?;
    Ok(Json(updated))
}

/// `POST /bookings/{id}/report` -- an incident report tied to an in-progress
/// or completed booking; awards `report_filed` and, when the booking is
/// checked in and not yet closed out, `shift_completion` as well.
#[utoipa::path(
    post,
    path = "/bookings/{id}/report",
    tag = "Bookings",
    request_body = ReportRequest,
    responses((status = 201, description = "Report filed"))
)]
pub async fn file_on_shift_report(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(booking_id): Path<i64>,
    Json(req): Json<ReportRequest>,
) -> ApiResult<impl IntoResponse> {
    let booking = state
        .store
        .get_booking(booking_id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("booking {booking_id}")))?;

    if booking.user_id != user.user_id {
        return Err(DomainError::Forbidden.into());
    }

    let new_report = nightwatch_store::NewReport {
        booking_id: Some(booking_id),
        user_id: user.user_id,
        severity: req.severity,
        message: req.message,
        latitude: req.latitude,
        longitude: req.longitude,
        gps_accuracy: req.gps_accuracy,
        gps_timestamp: req.gps_timestamp,
    };

    let mut ledger_entries = vec![NewPointsLedgerEntry::new(user.user_id, PointsReason::ReportFiled).for_booking(booking_id)];
    if booking.checked_in_at.is_some() {
        ledger_entries.push(NewPointsLedgerEntry::new(user.user_id, PointsReason::ShiftCompletion).for_booking(booking_id));
    }

    let report = state.store.create_report(new_report, ledger_entries).await?;
    Ok((StatusCode::CREATED, Json(report)))
}
