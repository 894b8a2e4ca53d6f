use crate::attendance::AttendanceService;
use crate::attendance::dates::{optional_month_window, parse_day, parse_day_or_today};
use crate::attendance::report::{GroupedReport, Page};
use crate::attendance::writer::BatchEntry;
use crate::auth::auth::AuthUser;
use crate::error::{AppError, AppResult};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/attendance")
            // /attendance
            .service(web::resource("").route(web::get().to(get_attendance)))
            // /attendance/mark
            .service(web::resource("/mark").route(web::post().to(mark_attendance)))
            // /attendance/update/{employeeId}
            .service(
                web::resource("/update/{employee_id}").route(web::put().to(update_attendance)),
            )
            // /attendance/report
            .service(web::resource("/report").route(web::get().to(attendance_report)))
            // /attendance/monthly-summary
            .service(web::resource("/monthly-summary").route(web::get().to(monthly_summary)))
            // /attendance/employee/{employeeId}
            .service(
                web::resource("/employee/{employee_id}").route(web::get().to(employee_month)),
            )
            // /attendance/employee-total/{employeeId}
            .service(
                web::resource("/employee-total/{employee_id}")
                    .route(web::get().to(employee_totals)),
            ),
    );
}

#[derive(Deserialize, IntoParams)]
pub struct DayQuery {
    /// Day to show, `YYYY-MM-DD`; defaults to today (UTC)
    pub date: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct ReportQuery {
    /// Only this day, `YYYY-MM-DD`
    pub date: Option<String>,
    /// Records per page (1-100, default 5)
    pub limit: Option<i64>,
    /// Records to skip (default 0)
    pub skip: Option<i64>,
}

#[derive(Deserialize, IntoParams)]
pub struct MonthQuery {
    /// 1-12
    pub month: Option<u32>,
    pub year: Option<i32>,
}

impl MonthQuery {
    fn required(&self) -> AppResult<(u32, i32)> {
        match (self.month, self.year) {
            (Some(month), Some(year)) => Ok((month, year)),
            _ => Err(AppError::invalid("month and year are required")),
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateAttendance {
    #[schema(example = "Present")]
    pub status: String,
    /// Defaults to today (UTC)
    #[schema(example = "2024-03-05", nullable = true)]
    pub date: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkEntry {
    #[schema(example = "EMP-001")]
    pub employee_id: String,
    #[schema(example = "Absent")]
    pub status: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkAttendance {
    #[schema(example = "2024-03-05", nullable = true)]
    pub date: Option<String>,
    pub attendance_data: Vec<MarkEntry>,
}

/// Serialised directly so `groupData` keeps its newest-first key order.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportResponse<'a> {
    success: bool,
    group_data: &'a GroupedReport,
}

/// Day's attendance, employee-joined
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(DayQuery),
    responses(
        (status = 200, description = "Attendance of the day (possibly empty)", body = Object, example = json!({
            "success": true,
            "date": "2024-03-05",
            "attendance": [{
                "id": 1, "employeeId": 1, "employeeCode": "EMP-001", "employeeName": "John Doe",
                "departmentName": "Engineering", "date": "2024-03-05", "status": "Present",
                "createdAt": "2024-03-05T08:00:00Z", "updatedAt": "2024-03-05T08:00:00Z"
            }]
        })),
        (status = 400, description = "Malformed date"),
        (status = 403, description = "HR/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn get_attendance(
    auth: AuthUser,
    svc: web::Data<AttendanceService>,
    query: web::Query<DayQuery>,
) -> AppResult<HttpResponse> {
    auth.require_hr_or_admin()?;

    let day = parse_day_or_today(query.date.as_deref())?;
    let attendance = svc.day(day).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "date": day,
        "attendance": attendance
    })))
}

/// Upsert one day's status for an employee
#[utoipa::path(
    put,
    path = "/api/attendance/update/{employee_id}",
    params(("employee_id", Path, description = "Employee code, or internal id")),
    request_body = UpdateAttendance,
    responses(
        (status = 200, description = "Resulting record", body = Object, example = json!({
            "success": true,
            "attendance": {
                "id": 1, "employeeId": 1, "date": "2024-03-05", "status": "Absent",
                "createdAt": "2024-03-05T08:00:00Z", "updatedAt": "2024-03-05T09:30:00Z"
            }
        })),
        (status = 400, description = "Invalid status or date"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn update_attendance(
    auth: AuthUser,
    svc: web::Data<AttendanceService>,
    path: web::Path<String>,
    body: web::Json<UpdateAttendance>,
) -> AppResult<HttpResponse> {
    auth.require_hr_or_admin()?;

    let employee = path.into_inner();
    let attendance = svc
        .mark(&employee, body.date.as_deref(), &body.status)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "attendance": attendance
    })))
}

/// Mark many employees for one day, all or nothing
#[utoipa::path(
    post,
    path = "/api/attendance/mark",
    request_body = MarkAttendance,
    responses(
        (status = 201, description = "Every entry was marked", body = Object, example = json!({
            "success": true,
            "message": "Attendance marked successfully.",
            "attendance": []
        })),
        (status = 400, description = "Empty batch, invalid status or date; nothing was written"),
        (status = 404, description = "An employee was not found; nothing was written")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn mark_attendance(
    auth: AuthUser,
    svc: web::Data<AttendanceService>,
    body: web::Json<MarkAttendance>,
) -> AppResult<HttpResponse> {
    auth.require_hr_or_admin()?;

    let body = body.into_inner();
    let entries: Vec<BatchEntry> = body
        .attendance_data
        .into_iter()
        .map(|e| BatchEntry {
            employee_id: e.employee_id,
            status: e.status,
        })
        .collect();

    let attendance = svc.mark_batch(body.date.as_deref(), &entries).await?;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Attendance marked successfully.",
        "attendance": attendance
    })))
}

/// Paginated report grouped by day
#[utoipa::path(
    get,
    path = "/api/attendance/report",
    params(ReportQuery),
    responses(
        (status = 200, description = "Records grouped by date, newest first", body = Object, example = json!({
            "success": true,
            "groupData": {
                "2024-03-06": [{"employeeId": "EMP-001", "employeeName": "John Doe", "departmentName": "Engineering", "status": "Present"}],
                "2024-03-05": [{"employeeId": "EMP-002", "employeeName": "Jane Roe", "departmentName": null, "status": "Sick"}]
            }
        })),
        (status = 400, description = "Malformed date, limit or skip")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn attendance_report(
    auth: AuthUser,
    svc: web::Data<AttendanceService>,
    query: web::Query<ReportQuery>,
) -> AppResult<HttpResponse> {
    auth.require_hr_or_admin()?;

    let day = query.date.as_deref().map(parse_day).transpose()?;
    let page = Page::new(query.limit, query.skip)?;
    let group_data = svc.report(day, page).await?;

    Ok(HttpResponse::Ok().json(ReportResponse {
        success: true,
        group_data: &group_data,
    }))
}

/// Status counts for a month
#[utoipa::path(
    get,
    path = "/api/attendance/monthly-summary",
    params(MonthQuery),
    responses(
        (status = 200, description = "Counts per status", body = Object, example = json!({
            "success": true, "month": 3, "year": 2024,
            "summary": {"present": 12, "absent": 1, "sick": 0, "leave": 2}
        })),
        (status = 400, description = "month/year missing or out of range")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn monthly_summary(
    auth: AuthUser,
    svc: web::Data<AttendanceService>,
    query: web::Query<MonthQuery>,
) -> AppResult<HttpResponse> {
    auth.require_hr_or_admin()?;

    let (month, year) = query.required()?;
    let summary = svc.monthly_summary(month, year).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "month": month,
        "year": year,
        "summary": summary
    })))
}

/// An employee's records for one month
#[utoipa::path(
    get,
    path = "/api/attendance/employee/{employee_id}",
    params(("employee_id", Path, description = "Employee code, or internal id"), MonthQuery),
    responses(
        (status = 200, description = "Records inside the month, oldest first", body = Object),
        (status = 400, description = "month/year missing or out of range"),
        (status = 403, description = "Employees may only read their own records"),
        (status = 404, description = "Employee not found (staff callers)")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn employee_month(
    auth: AuthUser,
    svc: web::Data<AttendanceService>,
    path: web::Path<String>,
    query: web::Query<MonthQuery>,
) -> AppResult<HttpResponse> {
    let (month, year) = query.required()?;
    let profile = auth.readable_employee(&svc, &path).await?;
    let attendance = svc.employee_month(profile.id, month, year).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "employeeId": profile.employee_code,
        "employeeName": profile.name,
        "month": month,
        "year": year,
        "attendance": attendance
    })))
}

/// All-time (or one month's) status counts for an employee
#[utoipa::path(
    get,
    path = "/api/attendance/employee-total/{employee_id}",
    params(("employee_id", Path, description = "Employee code, or internal id"), MonthQuery),
    responses(
        (status = 200, description = "Counts per status", body = Object, example = json!({
            "success": true, "employeeId": "EMP-001",
            "totals": {"present": 120, "absent": 3, "sick": 2, "leave": 9}
        })),
        (status = 400, description = "Only one of month/year given, or out of range"),
        (status = 403, description = "Employees may only read their own totals"),
        (status = 404, description = "Employee not found (staff callers)")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn employee_totals(
    auth: AuthUser,
    svc: web::Data<AttendanceService>,
    path: web::Path<String>,
    query: web::Query<MonthQuery>,
) -> AppResult<HttpResponse> {
    let window = optional_month_window(query.month, query.year)?;
    let profile = auth.readable_employee(&svc, &path).await?;
    let totals = svc.employee_totals(profile.id, window).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "employeeId": profile.employee_code,
        "employeeName": profile.name,
        "totals": totals
    })))
}
