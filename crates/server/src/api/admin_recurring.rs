use axum::Extension;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::warn;

use nightwatch_core::{DomainError, NewAuditEvent};
use nightwatch_notify::{MaterializerConfig, RecurringMaterializer};
use nightwatch_store::NewRecurringAssignment;

use crate::auth_middleware::CurrentUser;
use crate::error::ApiResult;
use crate::state::AppState;

use super::schemas::{CreateRecurringAssignmentRequest, MaterializeRequest, MaterializeResponse};

#[utoipa::path(
    post,
    path = "/api/admin/recurring-assignments",
    tag = "Admin/Recurring",
    request_body = CreateRecurringAssignmentRequest,
    responses((status = 201, description = "Recurring assignment created"))
)]
pub async fn create_recurring_assignment(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentUser>,
    Json(req): Json<CreateRecurringAssignmentRequest>,
) -> ApiResult<impl IntoResponse> {
    let new = NewRecurringAssignment {
        user_id: req.user_id,
        day_of_week: req.day_of_week,
        schedule_id: req.schedule_id,
        time_slot: req.time_slot,
        buddy_name: req.buddy_name,
        description: req.description,
    };
    let assignment = state.store.create_recurring_assignment(new).await?;

    if let Err(err) = state
        .store
        .append_audit_event(
            NewAuditEvent::new("recurring_assignment.create", format!("recurring_assignment:{}", assignment.id))
                .by(admin.user_id),
        )
        .await
    {
        warn!(error = %err, "audit write failed for admin mutation");
    }

    Ok((StatusCode::CREATED, Json(assignment)))
}

#[utoipa::path(
    get,
    path = "/api/admin/recurring-assignments",
    tag = "Admin/Recurring",
    responses((status = 200, description = "Active recurring assignments"))
)]
pub async fn list_recurring_assignments(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let assignments = state.store.list_active_recurring_assignments().await?;
    Ok(Json(assignments))
}

#[utoipa::path(
    get,
    path = "/api/admin/recurring-assignments/{id}",
    tag = "Admin/Recurring",
    responses((status = 200, description = "Recurring assignment detail"))
)]
pub async fn get_recurring_assignment(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<impl IntoResponse> {
    let assignment = state
        .store
        .get_recurring_assignment(id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("recurring assignment {id}")))?;
    Ok(Json(assignment))
}

#[utoipa::path(
    delete,
    path = "/api/admin/recurring-assignments/{id}",
    tag = "Admin/Recurring",
    responses((status = 204, description = "Recurring assignment deactivated"))
)]
pub async fn deactivate_recurring_assignment(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    state.store.deactivate_recurring_assignment(id).await?;

    if let Err(err) = state
        .store
        .append_audit_event(NewAuditEvent::new("recurring_assignment.deactivate", format!("recurring_assignment:{id}")).by(admin.user_id))
        .await
    {
        warn!(error = %err, "audit write failed for admin mutation");
    }

    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/admin/recurring-assignments/materialize` -- triggers an
/// out-of-band sweep over `[from, to)`, independent of the background
/// materializer's own hourly tick.
#[utoipa::path(
    post,
    path = "/api/admin/recurring-assignments/materialize",
    tag = "Admin/Recurring",
    request_body = MaterializeRequest,
    responses((status = 200, description = "Materialization stats", body = MaterializeResponse))
)]
pub async fn materialize(
    State(state): State<AppState>,
    Json(req): Json<MaterializeRequest>,
) -> ApiResult<impl IntoResponse> {
    let materializer = RecurringMaterializer::new(state.store.clone(), MaterializerConfig::default());
    let stats = materializer.materialize(req.from, req.to).await?;
    Ok(Json(MaterializeResponse { created: stats.created, conflicts: stats.conflicts }))
}
