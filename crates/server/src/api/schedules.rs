use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;

use nightwatch_core::Schedule;

use crate::error::ApiResult;
use crate::state::AppState;

/// `GET /schedules` -- the full schedule roster, for clients building their
/// own slot picker against `/shifts/available`.
#[utoipa::path(
    get,
    path = "/schedules",
    tag = "Schedules",
    responses((status = 200, description = "All schedules", body = [Schedule]))
)]
pub async fn list_schedules(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let schedules = state.store.list_schedules().await?;
    Ok(Json(schedules))
}
