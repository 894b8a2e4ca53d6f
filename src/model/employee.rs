use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "employee_code": "EMP-001",
        "user_id": 4,
        "name": "John Doe",
        "department_id": 10,
        "department_name": "Engineering",
        "dob": "1990-05-17",
        "gender": "male",
        "marital_status": "single",
        "designation": "Backend Engineer",
        "salary": 52000.0,
        "profile_image": "4f8e2c1a-6b1d-4c4e-9a55-0c2f4b7f3e21.png",
        "created_at": "2024-01-01T00:00:00Z"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    /// Human-facing employee id.
    #[schema(example = "EMP-001")]
    pub employee_code: String,

    #[schema(example = 4)]
    pub user_id: u64,

    #[schema(example = "John Doe")]
    pub name: String,

    #[schema(example = 10, nullable = true)]
    pub department_id: Option<u64>,

    #[schema(example = "Engineering", nullable = true)]
    pub department_name: Option<String>,

    #[schema(example = "1990-05-17", value_type = Option<String>, format = "date")]
    pub dob: Option<NaiveDate>,

    #[schema(example = "male", nullable = true)]
    pub gender: Option<String>,

    #[schema(example = "single", nullable = true)]
    pub marital_status: Option<String>,

    #[schema(example = "Backend Engineer", nullable = true)]
    pub designation: Option<String>,

    #[schema(example = 52000.0)]
    pub salary: f64,

    /// File name under `/public/uploads`.
    #[schema(nullable = true)]
    pub profile_image: Option<String>,

    #[schema(example = "2024-01-01T00:00:00Z", value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

/// Read-only display projection used by the attendance core.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct EmployeeProfile {
    pub id: u64,
    pub employee_code: String,
    pub name: String,
    pub department_name: Option<String>,
}
