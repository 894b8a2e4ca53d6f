use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, MySql, MySqlPool, Transaction};

use super::{AttendanceStore, EmployeeDirectory};
use crate::attendance::dates::DateWindow;
use crate::attendance::report::Page;
use crate::model::attendance::{AttendanceMark, AttendanceRecord, AttendanceStatus, AttendanceView};
use crate::model::employee::EmployeeProfile;

const PROFILE_SELECT: &str = r#"
    SELECT e.id, e.employee_code, u.name, d.name AS department_name
    FROM employees e
    JOIN users u ON u.id = e.user_id
    LEFT JOIN departments d ON d.id = e.department_id
"#;

const VIEW_SELECT: &str = r#"
    SELECT
        a.id,
        a.employee_id,
        e.employee_code,
        u.name AS employee_name,
        d.name AS department_name,
        a.date,
        a.status,
        a.created_at,
        a.updated_at
    FROM attendance a
    JOIN employees e ON e.id = a.employee_id
    JOIN users u ON u.id = e.user_id
    LEFT JOIN departments d ON d.id = e.department_id
"#;

#[derive(FromRow)]
struct RecordRow {
    id: u64,
    employee_id: u64,
    date: NaiveDate,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RecordRow> for AttendanceRecord {
    type Error = anyhow::Error;

    fn try_from(row: RecordRow) -> Result<Self> {
        Ok(AttendanceRecord {
            id: row.id,
            employee_id: row.employee_id,
            date: row.date,
            status: stored_status(&row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct ViewRow {
    id: u64,
    employee_id: u64,
    employee_code: String,
    employee_name: String,
    department_name: Option<String>,
    date: NaiveDate,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ViewRow> for AttendanceView {
    type Error = anyhow::Error;

    fn try_from(row: ViewRow) -> Result<Self> {
        Ok(AttendanceView {
            id: row.id,
            employee_id: row.employee_id,
            employee_code: row.employee_code,
            employee_name: row.employee_name,
            department_name: row.department_name,
            date: row.date,
            status: stored_status(&row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn stored_status(raw: &str) -> Result<AttendanceStatus> {
    raw.parse()
        .map_err(|_| anyhow!("unrecognised attendance status in store: {raw:?}"))
}

fn into_views(rows: Vec<ViewRow>) -> Result<Vec<AttendanceView>> {
    rows.into_iter().map(AttendanceView::try_from).collect()
}

// Helper enum for typed SQLx binding
enum FilterValue {
    U64(u64),
    Date(NaiveDate),
}

/// MySQL-backed record store. Owns the pool handle for the process lifetime.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn upsert_in(tx: &mut Transaction<'_, MySql>, mark: &AttendanceMark) -> Result<AttendanceRecord> {
        sqlx::query(
            r#"
            INSERT INTO attendance (employee_id, date, status)
            VALUES (?, ?, ?)
            ON DUPLICATE KEY UPDATE status = VALUES(status), updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(mark.employee_id)
        .bind(mark.date)
        .bind(mark.status.as_ref())
        .execute(&mut **tx)
        .await
        .context("attendance upsert failed")?;

        let row = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT id, employee_id, date, status, created_at, updated_at
            FROM attendance
            WHERE employee_id = ? AND date = ?
            "#,
        )
        .bind(mark.employee_id)
        .bind(mark.date)
        .fetch_one(&mut **tx)
        .await
        .context("reading back upserted attendance failed")?;

        row.try_into()
    }
}

#[async_trait]
impl EmployeeDirectory for MySqlStore {
    async fn find_by_id(&self, id: u64) -> Result<Option<EmployeeProfile>> {
        let sql = format!("{PROFILE_SELECT} WHERE e.id = ?");
        let profile = sqlx::query_as::<_, EmployeeProfile>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<EmployeeProfile>> {
        let sql = format!("{PROFILE_SELECT} WHERE e.employee_code = ?");
        let profile = sqlx::query_as::<_, EmployeeProfile>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }
}

#[async_trait]
impl AttendanceStore for MySqlStore {
    async fn upsert(&self, mark: &AttendanceMark) -> Result<AttendanceRecord> {
        let mut tx = self.pool.begin().await?;
        let record = Self::upsert_in(&mut tx, mark).await?;
        tx.commit().await?;
        Ok(record)
    }

    async fn upsert_all(&self, marks: &[AttendanceMark]) -> Result<Vec<AttendanceRecord>> {
        let mut tx = self.pool.begin().await?;
        let mut records = Vec::with_capacity(marks.len());
        for mark in marks {
            records.push(Self::upsert_in(&mut tx, mark).await?);
        }
        // Dropping `tx` on an early return rolls the whole batch back.
        tx.commit().await?;
        Ok(records)
    }

    async fn list_for_day(&self, day: NaiveDate) -> Result<Vec<AttendanceView>> {
        let sql = format!("{VIEW_SELECT} WHERE a.date = ? ORDER BY u.name ASC, a.id ASC");
        let rows = sqlx::query_as::<_, ViewRow>(&sql)
            .bind(day)
            .fetch_all(&self.pool)
            .await?;
        into_views(rows)
    }

    async fn list_for_employee(
        &self,
        employee_id: u64,
        window: DateWindow,
    ) -> Result<Vec<AttendanceView>> {
        let sql = format!(
            "{VIEW_SELECT} WHERE a.employee_id = ? AND a.date >= ? AND a.date <= ? ORDER BY a.date ASC"
        );
        let rows = sqlx::query_as::<_, ViewRow>(&sql)
            .bind(employee_id)
            .bind(window.start)
            .bind(window.end)
            .fetch_all(&self.pool)
            .await?;
        into_views(rows)
    }

    async fn list_page(&self, day: Option<NaiveDate>, page: Page) -> Result<Vec<AttendanceView>> {
        let where_clause = if day.is_some() { "WHERE a.date = ?" } else { "" };
        let sql = format!(
            "{VIEW_SELECT} {where_clause} ORDER BY a.date DESC, a.id ASC LIMIT ? OFFSET ?"
        );
        tracing::debug!(sql = %sql, ?day, limit = page.limit, skip = page.skip, "Fetching attendance page");

        let mut query = sqlx::query_as::<_, ViewRow>(&sql);
        if let Some(day) = day {
            query = query.bind(day);
        }
        let rows = query
            .bind(page.limit)
            .bind(page.skip)
            .fetch_all(&self.pool)
            .await?;
        into_views(rows)
    }

    async fn count_by_status(
        &self,
        employee_id: Option<u64>,
        window: Option<DateWindow>,
    ) -> Result<Vec<(String, i64)>> {
        let mut conditions = Vec::new();
        let mut args = Vec::new();

        if let Some(id) = employee_id {
            conditions.push("employee_id = ?");
            args.push(FilterValue::U64(id));
        }
        if let Some(w) = window {
            conditions.push("date >= ? AND date <= ?");
            args.push(FilterValue::Date(w.start));
            args.push(FilterValue::Date(w.end));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let sql = format!(
            "SELECT status, COUNT(*) AS total FROM attendance {where_clause} GROUP BY status"
        );

        let mut query = sqlx::query_as::<_, (String, i64)>(&sql);
        for arg in args {
            query = match arg {
                FilterValue::U64(v) => query.bind(v),
                FilterValue::Date(d) => query.bind(d),
            };
        }

        Ok(query.fetch_all(&self.pool).await?)
    }
}
