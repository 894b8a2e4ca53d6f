use crate::api::attendance::{MarkAttendance, MarkEntry, UpdateAttendance};
use crate::api::department::{CreateDepartment, UpdateDepartment};
use crate::api::employee::{CreateEmployee, EmployeeListResponse, UpdateEmployee};
use crate::api::salary::{CreateSalary, PaginatedSalaryResponse};
use crate::attendance::report::{ReportEntry, StatusCounts};
use crate::auth::handlers::LoginResponse;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, AttendanceView};
use crate::model::department::Department;
use crate::model::employee::Employee;
use crate::model::role::Role;
use crate::model::salary::Salary;
use crate::model::user::UserInfo;
use crate::models::{LoginReqDto, UserReq};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Employee Management System API",
        version = "1.0.0",
        description = r#"
## Employee Management System

Departments, employees, salaries and daily attendance for one organisation.

### Key Features
- **Attendance**
  - One record per employee per day; re-marking replaces the status
  - Batch marking for a whole team, all or nothing
  - Paginated reports grouped by day, monthly and per-employee summaries
- **Employee Management**
  - Employee profiles with a login account, departments
  - Profile images served from `/public/uploads`
- **Salaries**
  - Salary entries with allowances and deductions

### Security
Endpoints under `/api` require a **JWT Bearer** access token from `/auth/login`.
Writes are restricted to **Admin** or **HR**; employees may read their own
attendance and salary records.

### Response Format
Every JSON response carries `success`; failures add a `message`.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::register,
        crate::auth::handlers::verify,

        crate::api::attendance::get_attendance,
        crate::api::attendance::update_attendance,
        crate::api::attendance::mark_attendance,
        crate::api::attendance::attendance_report,
        crate::api::attendance::monthly_summary,
        crate::api::attendance::employee_month,
        crate::api::attendance::employee_totals,

        crate::api::employee::create_employee,
        crate::api::employee::get_employee,
        crate::api::employee::list_employees,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,
        crate::api::employee::my_details,
        crate::api::employee::upload_profile_image,

        crate::api::department::create_department,
        crate::api::department::list_departments,
        crate::api::department::get_department,
        crate::api::department::update_department,
        crate::api::department::delete_department,
        crate::api::department::department_employees,

        crate::api::salary::add_salary,
        crate::api::salary::employee_salaries,
        crate::api::salary::list_salaries,

        crate::api::dashboard::summary
    ),
    components(
        schemas(
            LoginReqDto,
            LoginResponse,
            UserReq,
            UserInfo,
            Role,
            AttendanceStatus,
            AttendanceRecord,
            AttendanceView,
            UpdateAttendance,
            MarkAttendance,
            MarkEntry,
            ReportEntry,
            StatusCounts,
            CreateEmployee,
            UpdateEmployee,
            Employee,
            EmployeeListResponse,
            CreateDepartment,
            UpdateDepartment,
            Department,
            CreateSalary,
            Salary,
            PaginatedSalaryResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login, token refresh and account APIs"),
        (name = "Attendance", description = "Attendance marking and reporting APIs"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Department", description = "Department management APIs"),
        (name = "Salary", description = "Salary APIs"),
        (name = "Dashboard", description = "Summary figures"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by the protected paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
