use axum::Extension;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::warn;

use nightwatch_core::{DomainError, NewAuditEvent, Schedule};
use nightwatch_store::NewSchedule;

use crate::auth_middleware::CurrentUser;
use crate::error::ApiResult;
use crate::state::AppState;

use super::schemas::{CreateScheduleRequest, UpdateScheduleRequest};

/// Best-effort audit write outside a domain transaction, per §4.8: logs and
/// moves on rather than failing the admin request that triggered it.
async fn audit_best_effort(state: &AppState, audit: NewAuditEvent) {
    if let Err(err) = state.store.append_audit_event(audit).await {
        warn!(error = %err, "audit write failed for admin mutation");
    }
}

#[utoipa::path(
    post,
    path = "/api/admin/schedules",
    tag = "Admin/Schedules",
    request_body = CreateScheduleRequest,
    responses((status = 201, description = "Schedule created", body = Schedule))
)]
pub async fn create_schedule(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateScheduleRequest>,
) -> ApiResult<impl IntoResponse> {
    let new_schedule = NewSchedule {
        name: req.name,
        cron_expr: req.cron_expr,
        start_date: req.start_date,
        end_date: req.end_date,
        duration_minutes: req.duration_minutes,
        timezone: req.timezone,
    };
    let schedule = state.store.create_schedule(new_schedule).await?;

    audit_best_effort(
        &state,
        NewAuditEvent::new("schedule.create", format!("schedule:{}", schedule.schedule_id))
            .by(user.user_id)
            .with_details(serde_json::json!({ "name": schedule.name })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(schedule)))
}

#[utoipa::path(
    put,
    path = "/api/admin/schedules/{id}",
    tag = "Admin/Schedules",
    request_body = UpdateScheduleRequest,
    responses((status = 200, description = "Schedule updated", body = Schedule))
)]
pub async fn update_schedule(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(schedule_id): Path<i64>,
    Json(req): Json<UpdateScheduleRequest>,
) -> ApiResult<impl IntoResponse> {
    let existing = state
        .store
        .get_schedule(schedule_id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("schedule {schedule_id}")))?;

    let updated = Schedule {
        schedule_id: existing.schedule_id,
        name: req.name,
        cron_expr: req.cron_expr,
        start_date: req.start_date,
        end_date: req.end_date,
        duration_minutes: req.duration_minutes,
        timezone: req.timezone,
    };
    let saved = state.store.update_schedule(updated).await?;

    audit_best_effort(
        &state,
        NewAuditEvent::new("schedule.update", format!("schedule:{schedule_id}")).by(user.user_id),
    )
    .await;

    Ok(Json(saved))
}

#[utoipa::path(
    delete,
    path = "/api/admin/schedules/{id}",
    tag = "Admin/Schedules",
    responses((status = 204, description = "Schedule deleted"))
)]
pub async fn delete_schedule(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(schedule_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    state.store.delete_schedule(schedule_id).await?;

    audit_best_effort(
        &state,
        NewAuditEvent::new("schedule.delete", format!("schedule:{schedule_id}")).by(user.user_id),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/admin/schedules/{id}",
    tag = "Admin/Schedules",
    responses((status = 200, description = "Schedule detail", body = Schedule))
)]
pub async fn get_schedule(State(state): State<AppState>, Path(schedule_id): Path<i64>) -> ApiResult<impl IntoResponse> {
    let schedule = state
        .store
        .get_schedule(schedule_id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("schedule {schedule_id}")))?;
    Ok(Json(schedule))
}

#[utoipa::path(
    get,
    path = "/api/admin/schedules",
    tag = "Admin/Schedules",
    responses((status = 200, description = "All schedules", body = [Schedule]))
)]
pub async fn list_schedules(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let schedules = state.store.list_schedules().await?;
    Ok(Json(schedules))
}
