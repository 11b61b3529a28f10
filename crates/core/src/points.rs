use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// An append-only award or penalty applied to a user's point total.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PointsLedgerEntry {
    pub id: i64,
    pub user_id: i64,
    pub booking_id: Option<i64>,
    pub points_awarded: i32,
    pub reason: PointsReason,
    pub multiplier: f64,
    pub created_at: DateTime<Utc>,
}

/// The cached aggregate over a user's ledger entries, recomputable but kept
/// current in the same transaction as each append (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UserPointsCache {
    pub user_id: i64,
    pub total_points: i64,
    pub shift_count: i64,
    pub last_activity_date: Option<NaiveDate>,
}

/// The fixed set of reasons a ledger entry can be awarded for, and their
/// base amounts, per the table in §4.7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum PointsReason {
    ShiftCheckin,
    EarlyCheckin,
    ShiftCompletion,
    ReportFiled,
    LateCheckin,
}

impl PointsReason {
    /// The base point amount before `multiplier` is applied.
    pub fn base_amount(self) -> i32 {
        match self {
            Self::ShiftCheckin => 10,
            Self::EarlyCheckin => 3,
            Self::ShiftCompletion => 15,
            Self::ReportFiled => 5,
            Self::LateCheckin => -2,
        }
    }
}
