use axum::Extension;
use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;

use crate::auth_middleware::CurrentUser;
use crate::error::ApiResult;
use crate::state::AppState;

/// `GET /points/me` -- the caller's own points cache (ambient: the spec's
/// Non-goals exclude a leaderboard *UI*, not the data behind one).
#[utoipa::path(
    get,
    path = "/points/me",
    tag = "Points",
    responses((status = 200, description = "Caller's points cache"))
)]
pub async fn my_points(State(state): State<AppState>, Extension(user): Extension<CurrentUser>) -> ApiResult<impl IntoResponse> {
    let cache = state.store.get_points_cache(user.user_id).await?;
    Ok(Json(cache))
}
