use chrono::NaiveDate;

use super::AttendanceService;
use super::dates::month_window;
use crate::error::AppResult;
use crate::model::attendance::AttendanceView;

impl AttendanceService {
    /// Everyone's attendance for one day; an empty list is a valid answer.
    pub async fn day(&self, day: NaiveDate) -> AppResult<Vec<AttendanceView>> {
        self.guarded("list attendance for day", self.attendance.list_for_day(day))
            .await
    }

    /// One resolved employee's records for a calendar month, oldest first.
    pub async fn employee_month(
        &self,
        employee_id: u64,
        month: u32,
        year: i32,
    ) -> AppResult<Vec<AttendanceView>> {
        let window = month_window(month, year)?;
        self.guarded(
            "list attendance for employee",
            self.attendance.list_for_employee(employee_id, window),
        )
        .await
    }
}
