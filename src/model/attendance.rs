use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// The closed set of attendance values. Parsing ignores ASCII case so legacy
/// `present`/`absent`/`leave` rows map onto the same variants.
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumString,
    EnumIter,
    ToSchema,
)]
#[strum(ascii_case_insensitive)]
pub enum AttendanceStatus {
    Present,
    Absent,
    Leave,
    Sick,
}

impl AttendanceStatus {
    pub fn parse(raw: &str) -> AppResult<Self> {
        raw.trim().parse().map_err(|_| {
            let allowed: Vec<String> = Self::iter().map(|s| s.to_string()).collect();
            AppError::invalid(format!(
                "Invalid status '{}'. Allowed: {}",
                raw.trim(),
                allowed.join(", ")
            ))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: u64,
    /// Internal employee id.
    pub employee_id: u64,
    #[schema(example = "2024-03-05", value_type = String, format = "date")]
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

/// An attendance row joined with the employee's display fields.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceView {
    pub id: u64,
    pub employee_id: u64,
    #[schema(example = "EMP-001")]
    pub employee_code: String,
    #[schema(example = "John Doe")]
    pub employee_name: String,
    #[schema(example = "Engineering", nullable = true)]
    pub department_name: Option<String>,
    #[schema(example = "2024-03-05", value_type = String, format = "date")]
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

/// A validated write: the employee is resolved and the day is date-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttendanceMark {
    pub employee_id: u64,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}
