use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Salary {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1)]
    pub employee_id: u64,
    #[schema(example = "EMP-001")]
    pub employee_code: String,
    #[schema(example = 50000.0)]
    pub basic_salary: f64,
    #[schema(example = 5000.0)]
    pub allowances: f64,
    #[schema(example = 2000.0)]
    pub deductions: f64,
    #[schema(example = 53000.0)]
    pub net_salary: f64,
    #[schema(example = "2026-01-31", value_type = String, format = "date")]
    pub pay_date: NaiveDate,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

/// Net pay for one entry.
pub fn net_salary(basic: f64, allowances: f64, deductions: f64) -> f64 {
    basic + allowances - deductions
}
