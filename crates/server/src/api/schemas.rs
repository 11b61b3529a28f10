//! Request/response DTOs for the HTTP surface. Kept separate from the core
//! domain types so the wire shape can diverge from storage shape without
//! touching `nightwatch-core`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use nightwatch_core::{Role, Severity, User};

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub phone: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyRequest {
    pub phone: String,
    pub code: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub user_id: i64,
    pub phone: String,
    pub name: Option<String>,
    pub role: Role,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            phone: user.phone,
            name: user.name,
            role: user.role,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AvailableShiftsQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AvailableShift {
    pub schedule_id: i64,
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBookingRequest {
    pub schedule_id: i64,
    pub shift_start: DateTime<Utc>,
    pub buddy_user_id: Option<i64>,
    pub buddy_name: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReportRequest {
    pub severity: Severity,
    pub message: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub gps_accuracy: Option<f64>,
    pub gps_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OffShiftReportRequest {
    #[serde(flatten)]
    pub report: ReportRequest,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateScheduleRequest {
    pub name: String,
    pub cron_expr: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub duration_minutes: u32,
    pub timezone: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateScheduleRequest {
    pub name: String,
    pub cron_expr: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub duration_minutes: u32,
    pub timezone: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignBookingRequest {
    pub user_id: i64,
    pub schedule_id: i64,
    pub shift_start: DateTime<Utc>,
    pub buddy_name: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRecurringAssignmentRequest {
    pub user_id: i64,
    pub day_of_week: u8,
    pub schedule_id: i64,
    pub time_slot: String,
    pub buddy_name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MaterializeRequest {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MaterializeResponse {
    pub created: u32,
    pub conflicts: u32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBroadcastRequest {
    pub title: String,
    pub message: String,
    pub audience: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}
