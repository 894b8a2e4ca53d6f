use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::attendance::AttendanceService;
use crate::attendance::dates::parse_day_or_today;
use crate::auth::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::model::salary::{Salary, net_salary};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/salary")
            // /salary
            .service(
                web::resource("")
                    .route(web::post().to(add_salary))
                    .route(web::get().to(list_salaries)),
            )
            // /salary/employee/{employeeId}
            .service(
                web::resource("/employee/{employee_id}").route(web::get().to(employee_salaries)),
            ),
    );
}

const SALARY_SELECT: &str = r#"
    SELECT
        s.id,
        s.employee_id,
        e.employee_code,
        s.basic_salary,
        s.allowances,
        s.deductions,
        s.net_salary,
        s.pay_date,
        s.created_at
    FROM salaries s
    JOIN employees e ON e.id = s.employee_id
"#;

#[derive(Deserialize, ToSchema)]
pub struct CreateSalary {
    /// Employee code, or internal id
    #[schema(example = "EMP-001")]
    pub employee_id: String,

    #[schema(example = 50000.0)]
    pub basic_salary: Option<f64>,

    #[schema(example = 5000.0)]
    pub allowances: Option<f64>,

    #[schema(example = 2000.0)]
    pub deductions: Option<f64>,

    /// Defaults to today (UTC)
    #[schema(example = "2026-01-31")]
    pub pay_date: Option<String>,
}

/// Validated amounts of a salary entry.
#[derive(Debug, PartialEq)]
struct Amounts {
    basic: f64,
    allowances: f64,
    deductions: f64,
}

impl CreateSalary {
    fn amounts(&self) -> AppResult<Amounts> {
        let basic = self
            .basic_salary
            .ok_or_else(|| AppError::invalid("'basic_salary' is required"))?;

        let amounts = Amounts {
            basic,
            allowances: self.allowances.unwrap_or(0.0),
            deductions: self.deductions.unwrap_or(0.0),
        };
        for (field, value) in [
            ("basic_salary", amounts.basic),
            ("allowances", amounts.allowances),
            ("deductions", amounts.deductions),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(AppError::invalid(format!("'{field}' must not be negative")));
            }
        }
        Ok(amounts)
    }
}

#[derive(Deserialize, IntoParams)]
pub struct SalaryQuery {
    /// Page number (default 1)
    pub page: Option<u32>,
    /// Items per page (1-100, default 10)
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedSalaryResponse {
    pub success: bool,
    pub data: Vec<Salary>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

#[utoipa::path(
    post,
    path = "/api/salary",
    request_body = CreateSalary,
    responses(
        (status = 201, description = "Salary entry added", body = Object, example = json!({
            "success": true,
            "salary": {
                "id": 1, "employee_id": 1, "employee_code": "EMP-001",
                "basic_salary": 50000.0, "allowances": 5000.0, "deductions": 2000.0,
                "net_salary": 53000.0, "pay_date": "2026-01-31", "created_at": "2026-01-31T10:00:00Z"
            }
        })),
        (status = 400, description = "basic_salary missing or an amount is negative"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Salary"
)]
pub async fn add_salary(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    svc: web::Data<AttendanceService>,
    payload: web::Json<CreateSalary>,
) -> AppResult<HttpResponse> {
    auth.require_hr_or_admin()?;

    let amounts = payload.amounts()?;
    let pay_date = parse_day_or_today(payload.pay_date.as_deref())?;
    let employee = svc.resolve_employee(&payload.employee_id).await?;
    let net = net_salary(amounts.basic, amounts.allowances, amounts.deductions);

    let result = sqlx::query(
        r#"
        INSERT INTO salaries
        (employee_id, basic_salary, allowances, deductions, net_salary, pay_date)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee.id)
    .bind(amounts.basic)
    .bind(amounts.allowances)
    .bind(amounts.deductions)
    .bind(net)
    .bind(pay_date)
    .execute(pool.get_ref())
    .await?;

    let sql = format!("{SALARY_SELECT} WHERE s.id = ?");
    let salary = sqlx::query_as::<_, Salary>(&sql)
        .bind(result.last_insert_id())
        .fetch_one(pool.get_ref())
        .await?;

    info!(employee_id = employee.id, %pay_date, net_salary = net, "Salary entry added");

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "salary": salary
    })))
}

#[utoipa::path(
    get,
    path = "/api/salary/employee/{employee_id}",
    params(("employee_id", Path, description = "Employee code, or internal id")),
    responses(
        (status = 200, description = "Salary entries, newest pay date first", body = [Salary]),
        (status = 403, description = "Employees may only read their own salary"),
        (status = 404, description = "Employee not found (staff callers)")
    ),
    security(("bearer_auth" = [])),
    tag = "Salary"
)]
pub async fn employee_salaries(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    svc: web::Data<AttendanceService>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let employee = auth.readable_employee(&svc, &path).await?;

    let sql = format!("{SALARY_SELECT} WHERE s.employee_id = ? ORDER BY s.pay_date DESC, s.id DESC");
    let salaries = sqlx::query_as::<_, Salary>(&sql)
        .bind(employee.id)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "employeeId": employee.employee_code,
        "salaries": salaries
    })))
}

#[utoipa::path(
    get,
    path = "/api/salary",
    params(SalaryQuery),
    responses((status = 200, description = "Paginated salary entries", body = PaginatedSalaryResponse)),
    security(("bearer_auth" = [])),
    tag = "Salary"
)]
pub async fn list_salaries(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<SalaryQuery>,
) -> AppResult<HttpResponse> {
    auth.require_hr_or_admin()?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(10).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM salaries")
        .fetch_one(pool.get_ref())
        .await?;

    let sql = format!("{SALARY_SELECT} ORDER BY s.pay_date DESC, s.id DESC LIMIT ? OFFSET ?");
    let data = sqlx::query_as::<_, Salary>(&sql)
        .bind(i64::from(per_page))
        .bind(i64::from(offset))
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(PaginatedSalaryResponse {
        success: true,
        data,
        page,
        per_page,
        total,
    }))
}
