use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceType {
    OnTime,
    Late,
    /// Never stored; produced by reports for days without a record.
    Absent,
}

/// One row per user per school-local calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "id": 1,
    "userId": 12,
    "attendanceDate": "2025-01-02",
    "timeIn": "2025-01-02T00:14:00Z",
    "timeOut": "2025-01-02T09:05:00Z",
    "attendanceType": "ON_TIME"
}))]
pub struct AttendanceRecord {
    pub id: u64,
    pub user_id: u64,
    #[schema(example = "2025-01-02", format = "date", value_type = String)]
    pub attendance_date: NaiveDate,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub time_in: Option<DateTime<Utc>>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub time_out: Option<DateTime<Utc>>,
    pub attendance_type: Option<AttendanceType>,
}

impl AttendanceRecord {
    /// Clocked in and not yet clocked out.
    pub fn is_open(&self) -> bool {
        self.time_in.is_some() && self.time_out.is_none()
    }
}

/// Write model keyed by (`user_id`, `attendance_date`).
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceUpsert {
    pub user_id: u64,
    pub attendance_date: NaiveDate,
    pub time_in: Option<DateTime<Utc>>,
    pub time_out: Option<DateTime<Utc>>,
    pub attendance_type: Option<AttendanceType>,
}
