use actix_web::{HttpResponse, web};
use serde_json::json;
use sqlx::MySqlPool;

use crate::attendance::AttendanceService;
use crate::attendance::dates::{DateWindow, today};
use crate::auth::auth::AuthUser;
use crate::error::AppResult;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/dashboard")
            // /dashboard/summary
            .service(web::resource("/summary").route(web::get().to(summary))),
    );
}

/// Headline numbers for the HR landing page
#[utoipa::path(
    get,
    path = "/api/dashboard/summary",
    responses(
        (status = 200, description = "Totals and today's attendance", body = Object, example = json!({
            "success": true,
            "totalEmployees": 42,
            "totalDepartments": 5,
            "totalSalary": 2184000.0,
            "attendanceToday": {"present": 37, "absent": 2, "sick": 1, "leave": 2}
        })),
        (status = 403, description = "HR/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn summary(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    svc: web::Data<AttendanceService>,
) -> AppResult<HttpResponse> {
    auth.require_hr_or_admin()?;

    let (total_employees, total_salary) = sqlx::query_as::<_, (i64, f64)>(
        "SELECT COUNT(*), CAST(COALESCE(SUM(salary), 0) AS DOUBLE) FROM employees",
    )
    .fetch_one(pool.get_ref())
    .await?;

    let total_departments = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM departments")
        .fetch_one(pool.get_ref())
        .await?;

    let attendance_today = svc.window_summary(DateWindow::day(today())).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "totalEmployees": total_employees,
        "totalDepartments": total_departments,
        "totalSalary": total_salary,
        "attendanceToday": attendance_today
    })))
}
