use std::sync::RwLock;

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use super::{AttendanceStore, EmployeeDirectory};
use crate::attendance::dates::DateWindow;
use crate::attendance::report::Page;
use crate::model::attendance::{AttendanceMark, AttendanceRecord, AttendanceView};
use crate::model::employee::EmployeeProfile;

#[derive(Default)]
struct Tables {
    employees: Vec<EmployeeProfile>,
    attendance: Vec<AttendanceRecord>,
    next_id: u64,
    /// Writes to this employee id fail, to exercise rollback paths.
    poisoned_employee: Option<u64>,
}

impl Tables {
    fn upsert(&mut self, mark: &AttendanceMark) -> Result<AttendanceRecord> {
        if self.poisoned_employee == Some(mark.employee_id) {
            bail!("simulated write failure for employee {}", mark.employee_id);
        }
        if !self.employees.iter().any(|e| e.id == mark.employee_id) {
            bail!("foreign key violation: employee {}", mark.employee_id);
        }

        let now = Utc::now();
        if let Some(existing) = self
            .attendance
            .iter_mut()
            .find(|r| r.employee_id == mark.employee_id && r.date == mark.date)
        {
            existing.status = mark.status;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        self.next_id += 1;
        let record = AttendanceRecord {
            id: self.next_id,
            employee_id: mark.employee_id,
            date: mark.date,
            status: mark.status,
            created_at: now,
            updated_at: now,
        };
        self.attendance.push(record.clone());
        Ok(record)
    }

    fn view(&self, record: &AttendanceRecord) -> Result<AttendanceView> {
        let employee = self
            .employees
            .iter()
            .find(|e| e.id == record.employee_id)
            .ok_or_else(|| anyhow!("dangling employee {}", record.employee_id))?;

        Ok(AttendanceView {
            id: record.id,
            employee_id: record.employee_id,
            employee_code: employee.employee_code.clone(),
            employee_name: employee.name.clone(),
            department_name: employee.department_name.clone(),
            date: record.date,
            status: record.status,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

/// In-process store with the same semantics as `MySqlStore`: one row per
/// (employee, day) and all-or-nothing batches.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn with_employees(employees: Vec<EmployeeProfile>) -> Self {
        Self {
            tables: RwLock::new(Tables {
                employees,
                ..Tables::default()
            }),
        }
    }

    pub fn fail_writes_for(&self, employee_id: u64) {
        if let Ok(mut t) = self.tables.write() {
            t.poisoned_employee = Some(employee_id);
        }
    }

    pub fn records(&self) -> Vec<AttendanceRecord> {
        self.tables
            .read()
            .map(|t| t.attendance.clone())
            .unwrap_or_default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|_| anyhow!("memory store poisoned"))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Tables>> {
        self.tables.write().map_err(|_| anyhow!("memory store poisoned"))
    }
}

#[async_trait]
impl EmployeeDirectory for MemoryStore {
    async fn find_by_id(&self, id: u64) -> Result<Option<EmployeeProfile>> {
        Ok(self.read()?.employees.iter().find(|e| e.id == id).cloned())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<EmployeeProfile>> {
        Ok(self
            .read()?
            .employees
            .iter()
            .find(|e| e.employee_code == code)
            .cloned())
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn upsert(&self, mark: &AttendanceMark) -> Result<AttendanceRecord> {
        self.write()?.upsert(mark)
    }

    async fn upsert_all(&self, marks: &[AttendanceMark]) -> Result<Vec<AttendanceRecord>> {
        let mut tables = self.write()?;
        let snapshot = (tables.attendance.clone(), tables.next_id);

        let mut records = Vec::with_capacity(marks.len());
        for mark in marks {
            match tables.upsert(mark) {
                Ok(r) => records.push(r),
                Err(e) => {
                    (tables.attendance, tables.next_id) = snapshot;
                    return Err(e);
                }
            }
        }
        Ok(records)
    }

    async fn list_for_day(&self, day: NaiveDate) -> Result<Vec<AttendanceView>> {
        let tables = self.read()?;
        let mut views = tables
            .attendance
            .iter()
            .filter(|r| r.date == day)
            .map(|r| tables.view(r))
            .collect::<Result<Vec<_>>>()?;
        views.sort_by(|a, b| a.employee_name.cmp(&b.employee_name).then(a.id.cmp(&b.id)));
        Ok(views)
    }

    async fn list_for_employee(
        &self,
        employee_id: u64,
        window: DateWindow,
    ) -> Result<Vec<AttendanceView>> {
        let tables = self.read()?;
        let mut views = tables
            .attendance
            .iter()
            .filter(|r| r.employee_id == employee_id && window.contains(r.date))
            .map(|r| tables.view(r))
            .collect::<Result<Vec<_>>>()?;
        views.sort_by_key(|v| v.date);
        Ok(views)
    }

    async fn list_page(&self, day: Option<NaiveDate>, page: Page) -> Result<Vec<AttendanceView>> {
        let tables = self.read()?;
        let mut matching: Vec<&AttendanceRecord> = tables
            .attendance
            .iter()
            .filter(|r| day.is_none_or(|d| r.date == d))
            .collect();
        matching.sort_by(|a, b| b.date.cmp(&a.date).then(a.id.cmp(&b.id)));

        matching
            .into_iter()
            .skip(page.skip as usize)
            .take(page.limit as usize)
            .map(|r| tables.view(r))
            .collect()
    }

    async fn count_by_status(
        &self,
        employee_id: Option<u64>,
        window: Option<DateWindow>,
    ) -> Result<Vec<(String, i64)>> {
        let tables = self.read()?;
        let mut rows: Vec<(String, i64)> = Vec::new();

        for r in tables.attendance.iter().filter(|r| {
            employee_id.is_none_or(|id| r.employee_id == id)
                && window.is_none_or(|w| w.contains(r.date))
        }) {
            let key = r.status.to_string();
            match rows.iter_mut().find(|(s, _)| *s == key) {
                Some((_, n)) => *n += 1,
                None => rows.push((key, 1)),
            }
        }
        Ok(rows)
    }
}
