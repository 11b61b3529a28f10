use axum::Extension;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use nightwatch_core::calendar::is_enumerated_slot_start;
use nightwatch_core::{DomainError, MessageType, NewAuditEvent, NewOutboxItem};
use nightwatch_store::NewBooking;

use crate::auth_middleware::CurrentUser;
use crate::error::ApiResult;
use crate::state::AppState;

use super::schemas::AssignBookingRequest;

/// `POST /api/admin/bookings/assign` -- same shape as `POST /bookings`, but
/// `user_id` names the target rather than the actor, and the follow-up
/// outbox item is an `ADMIN_SHIFT_ASSIGNMENT`, not a reminder.
#[utoipa::path(
    post,
    path = "/api/admin/bookings/assign",
    tag = "Admin/Bookings",
    request_body = AssignBookingRequest,
    responses((status = 201, description = "Assignment created"))
)]
pub async fn assign_booking(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentUser>,
    Json(req): Json<AssignBookingRequest>,
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

    let target = state
        .store
        .get_user(req.user_id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("user {}", req.user_id)))?;

    let shift_end = req.shift_start + chrono::Duration::minutes(i64::from(schedule.duration_minutes));

    let new_booking = NewBooking {
        user_id: req.user_id,
        schedule_id: req.schedule_id,
        shift_start: req.shift_start,
        shift_end,
        buddy_user_id: None,
        buddy_name: req.buddy_name,
    };

    let assignment_notice = NewOutboxItem::now(
        MessageType::AdminShiftAssignment,
        target.phone,
        serde_json::json!({
            "schedule_id": req.schedule_id,
            "user_id": req.user_id,
            "assigned_by": admin.user_id,
            "shift_start": req.shift_start,
        }),
    )
    .with_user_id(req.user_id);

    let audit = NewAuditEvent::new("booking.admin_assign", format!("schedule:{}", req.schedule_id))
        .by(admin.user_id)
        .with_details(serde_json::json!({ "target_user_id": req.user_id, "shift_start": req.shift_start }));

    let booking = state.store.create_booking(new_booking, vec![assignment_notice], audit).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// `DELETE /api/admin/bookings/{id}` -- admin-only cancellation, per the
/// booking state machine's `cancel` transition.
#[utoipa::path(
    delete,
    path = "/api/admin/bookings/{id}",
    tag = "Admin/Bookings",
    responses((status = 204, description = "Booking cancelled"))
)]
pub async fn cancel_booking(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentUser>,
    Path(booking_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let audit = NewAuditEvent::new("booking.cancel", format!("booking:{booking_id}")).by(admin.user_id);
    state.store.delete_booking(booking_id, audit).await?;
    Ok(StatusCode::NO_CONTENT)
}
