use tracing::info;

use super::AttendanceService;
use super::dates::parse_day_or_today;
use crate::error::{AppError, AppResult};
use crate::model::attendance::{AttendanceMark, AttendanceRecord, AttendanceStatus};

/// One `(employeeId, status)` pair of a batch mark, as received.
#[derive(Debug, Clone)]
pub struct BatchEntry {
    pub employee_id: String,
    pub status: String,
}

impl AttendanceService {
    /// Sets the status of `employee` for `day` (today when absent).
    ///
    /// Creates the day's record on first mark and overwrites its status on
    /// every later mark.
    pub async fn mark(
        &self,
        employee: &str,
        day: Option<&str>,
        status: &str,
    ) -> AppResult<AttendanceRecord> {
        let status = AttendanceStatus::parse(status)?;
        let date = parse_day_or_today(day)?;
        let profile = self.resolve_employee(employee).await?;

        let mark = AttendanceMark {
            employee_id: profile.id,
            date,
            status,
        };
        let record = self
            .guarded("mark attendance", self.attendance.upsert(&mark))
            .await?;

        info!(
            employee_id = profile.id,
            employee_code = %profile.employee_code,
            %date,
            %status,
            "Attendance marked"
        );
        Ok(record)
    }

    /// Marks every entry for one day, or none of them.
    ///
    /// All statuses are parsed and all employees resolved before the first
    /// write; the writes themselves go to the store as one transaction.
    /// A later entry for the same employee overrides an earlier one.
    pub async fn mark_batch(
        &self,
        day: Option<&str>,
        entries: &[BatchEntry],
    ) -> AppResult<Vec<AttendanceRecord>> {
        if entries.is_empty() {
            return Err(AppError::invalid("attendanceData must not be empty"));
        }
        let date = parse_day_or_today(day)?;

        let mut marks: Vec<AttendanceMark> = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let status = AttendanceStatus::parse(&entry.status).map_err(|e| {
                AppError::invalid(format!("attendanceData[{index}]: {e}"))
            })?;
            let profile = self.resolve_employee(&entry.employee_id).await?;

            match marks.iter_mut().find(|m| m.employee_id == profile.id) {
                Some(existing) => existing.status = status,
                None => marks.push(AttendanceMark {
                    employee_id: profile.id,
                    date,
                    status,
                }),
            }
        }

        let records = self
            .guarded("mark attendance batch", self.attendance.upsert_all(&marks))
            .await?;

        info!(%date, count = records.len(), "Attendance batch marked");
        Ok(records)
    }
}
