use axum::Extension;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use nightwatch_core::PointsReason;
use nightwatch_store::{NewPointsLedgerEntry, NewReport};

use crate::auth_middleware::CurrentUser;
use crate::error::ApiResult;
use crate::state::AppState;

use super::schemas::OffShiftReportRequest;

/// `POST /reports/off-shift` -- an incident report with no associated
/// booking. Still awards `report_filed`.
#[utoipa::path(
    post,
    path = "/reports/off-shift",
    tag = "Reports",
    request_body = OffShiftReportRequest,
    responses((status = 201, description = "Report filed"))
)]
pub async fn file_off_shift_report(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<OffShiftReportRequest>,
) -> ApiResult<impl IntoResponse> {
    let report = req.report;
    let new_report = NewReport {
        booking_id: None,
        user_id: user.user_id,
        severity: report.severity,
        message: report.message,
        latitude: report.latitude,
        longitude: report.longitude,
        gps_accuracy: report.gps_accuracy,
        gps_timestamp: report.gps_timestamp,
    };

    let ledger_entries = vec![NewPointsLedgerEntry::new(user.user_id, PointsReason::ReportFiled)];
    let created = state.store.create_report(new_report, ledger_entries).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
