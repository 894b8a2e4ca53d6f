//! Storage seams for the attendance core.
//!
//! The attendance service only talks to these traits. `MySqlStore` backs the
//! running server; the in-memory store backs the unit tests.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::attendance::dates::DateWindow;
use crate::attendance::report::Page;
use crate::model::attendance::{AttendanceMark, AttendanceRecord, AttendanceView};
use crate::model::employee::EmployeeProfile;

#[cfg(test)]
pub mod memory;
pub mod mysql;

pub use mysql::MySqlStore;

/// Read-only employee lookups joined with user and department display names.
#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    async fn find_by_id(&self, id: u64) -> Result<Option<EmployeeProfile>>;

    /// Lookup by the human-facing employee code.
    async fn find_by_code(&self, code: &str) -> Result<Option<EmployeeProfile>>;
}

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Insert-or-update keyed by `(employee_id, date)` in one atomic write.
    async fn upsert(&self, mark: &AttendanceMark) -> Result<AttendanceRecord>;

    /// Upserts every mark or none of them.
    async fn upsert_all(&self, marks: &[AttendanceMark]) -> Result<Vec<AttendanceRecord>>;

    async fn list_for_day(&self, day: NaiveDate) -> Result<Vec<AttendanceView>>;

    /// Records of one employee inside `window`, oldest first.
    async fn list_for_employee(
        &self,
        employee_id: u64,
        window: DateWindow,
    ) -> Result<Vec<AttendanceView>>;

    /// Records sorted by date descending, `skip`/`limit` applied to records.
    async fn list_page(&self, day: Option<NaiveDate>, page: Page) -> Result<Vec<AttendanceView>>;

    /// Raw `(status, count)` rows of a `GROUP BY status` aggregation.
    async fn count_by_status(
        &self,
        employee_id: Option<u64>,
        window: Option<DateWindow>,
    ) -> Result<Vec<(String, i64)>>;
}
