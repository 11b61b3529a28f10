use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An incident report, optionally tied to a booking and optionally carrying
/// a GPS fix. A report with `booking_id == None` is "off-shift".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Report {
    pub report_id: i64,
    pub booking_id: Option<i64>,
    pub user_id: i64,
    pub severity: Severity,
    pub message: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub gps_accuracy: Option<f64>,
    pub gps_timestamp: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl Report {
    pub fn is_off_shift(&self) -> bool {
        self.booking_id.is_none()
    }
}

/// Report severity, low to high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum Severity {
    Info = 0,
    Warning = 1,
    Critical = 2,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_info_below_critical() {
        assert!(Severity::Info < Severity::Critical);
        assert!(Severity::Warning < Severity::Critical);
    }
}
