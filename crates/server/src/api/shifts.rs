use std::collections::HashSet;

use axum::Json;
use axum::extract::{Query, State};
use axum::response::IntoResponse;

use nightwatch_core::DomainError;
use nightwatch_core::calendar::expand;

use crate::error::ApiResult;
use crate::state::AppState;

use super::schemas::{AvailableShift, AvailableShiftsQuery};

/// `GET /shifts/available` -- every schedule's enumerated slots in
/// `[from, to)` with already-booked starts removed, per §4.2/§4.3.
#[utoipa::path(
    get,
    path = "/shifts/available",
    tag = "Shifts",
    params(AvailableShiftsQuery),
    responses((status = 200, description = "Open slots", body = [AvailableShift]))
)]
pub async fn available_shifts(
    State(state): State<AppState>,
    Query(query): Query<AvailableShiftsQuery>,
) -> ApiResult<impl IntoResponse> {
    let schedules = state.store.list_schedules().await?;
    let mut open = Vec::new();

    for schedule in &schedules {
        let slots = expand(schedule, query.from, query.to).map_err(|err| DomainError::BadRequest(err.to_string()))?;
        if slots.is_empty() {
            continue;
        }

        let booked = state
            .store
            .list_bookings_in_range(schedule.schedule_id, query.from, query.to)
            .await?;
        let taken: HashSet<_> = booked.iter().map(|b| b.shift_start).collect();

        open.extend(slots.into_iter().filter(|slot| !taken.contains(&slot.start_utc)).map(|slot| {
            AvailableShift {
                schedule_id: slot.schedule_id,
                start_utc: slot.start_utc,
                end_utc: slot.end_utc,
            }
        }));
    }

    open.sort_by_key(|s| s.start_utc);
    if let Some(limit) = query.limit {
        open.truncate(limit);
    }

    Ok(Json(open))
}
