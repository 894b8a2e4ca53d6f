use crate::{
    attendance::{AttendanceService, dates::today},
    auth::{auth::AuthUser, password::hash_password},
    config::Config,
    error::{AppError, AppResult, is_unique_violation},
    model::{employee::Employee, role::Role},
    utils::db_utils::{Column, ColumnKind, build_update_sql, execute_update},
    utils::uploads::{self, UPLOADS_ROUTE},
};
use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use sqlx::{MySql, MySqlPool, Transaction};
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/employee")
            // /employee
            .service(
                web::resource("")
                    .route(web::post().to(create_employee))
                    .route(web::get().to(list_employees)),
            )
            // /employee/me (before /{id})
            .service(web::resource("/me").route(web::get().to(my_details)))
            // /employee/{id}/profile-image
            .service(
                web::resource("/{id}/profile-image").route(web::post().to(upload_profile_image)),
            )
            // /employee/{id}
            .service(
                web::resource("/{id}")
                    .route(web::put().to(update_employee))
                    .route(web::get().to(get_employee))
                    .route(web::delete().to(delete_employee)),
            ),
    );
}

pub(crate) const EMPLOYEE_SELECT: &str = r#"
    SELECT
        e.id,
        e.employee_code,
        e.user_id,
        u.name,
        e.department_id,
        d.name AS department_name,
        e.dob,
        e.gender,
        e.marital_status,
        e.designation,
        e.salary,
        u.profile_image,
        e.created_at
    FROM employees e
    JOIN users u ON u.id = e.user_id
    LEFT JOIN departments d ON d.id = e.department_id
"#;

/// Columns `PUT /employee/{id}` may change on the employee row.
const UPDATABLE: &[Column] = &[
    Column::nullable("marital_status", ColumnKind::Text),
    Column::nullable("designation", ColumnKind::Text),
    Column::nullable("department_id", ColumnKind::Id),
    Column::required("salary", ColumnKind::Money),
    Column::nullable("dob", ColumnKind::Date),
    Column::nullable("gender", ColumnKind::Text),
];

#[derive(Deserialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "John Doe")]
    pub name: String,
    #[schema(example = "john.doe")]
    pub username: String,
    #[schema(example = "change-me-please")]
    pub password: String,
    #[schema(example = "EMP-001")]
    pub employee_code: String,
    #[schema(example = "1990-05-17", value_type = Option<String>, format = "date")]
    pub dob: Option<NaiveDate>,
    #[schema(example = "male")]
    pub gender: Option<String>,
    #[schema(example = "single")]
    pub marital_status: Option<String>,
    #[schema(example = "Backend Engineer")]
    pub designation: Option<String>,
    #[schema(example = 10)]
    pub department_id: Option<u64>,
    #[schema(example = 52000.0)]
    pub salary: Option<f64>,
    /// Defaults to 3 (employee)
    #[schema(example = 3)]
    pub role_id: Option<u8>,
}

impl CreateEmployee {
    /// Checks required fields and returns the account role.
    fn validate(&self) -> AppResult<Role> {
        for (field, value) in [
            ("name", &self.name),
            ("username", &self.username),
            ("password", &self.password),
            ("employee_code", &self.employee_code),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::invalid(format!("'{field}' is required")));
            }
        }
        if self.salary.is_some_and(|s| s < 0.0) {
            return Err(AppError::invalid("'salary' must not be negative"));
        }

        match self.role_id {
            None => Ok(Role::Employee),
            Some(id) => Role::from_id(id).ok_or_else(|| AppError::invalid(format!("Unknown role_id {id}"))),
        }
    }
}

/// Validates the payload and checks the caller may grant the requested role.
fn account_role(auth: &AuthUser, payload: &CreateEmployee) -> AppResult<Role> {
    auth.require_hr_or_admin()?;
    let role = payload.validate()?;
    auth.require_can_grant(role)?;
    Ok(role)
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct EmployeeQuery {
    /// Page number (default 1)
    pub page: Option<u32>,
    /// Items per page (1-100, default 20)
    pub per_page: Option<u32>,
    pub department_id: Option<u64>,
    /// Matches name or employee code
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub success: bool,
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
}

#[derive(Deserialize, ToSchema)]
#[schema(example = json!({"designation": "Team Lead", "salary": 60000.0, "name": "John A. Doe"}))]
pub struct UpdateEmployee {
    pub name: Option<String>,
    pub marital_status: Option<String>,
    pub designation: Option<String>,
    pub department_id: Option<u64>,
    pub salary: Option<f64>,
    #[schema(value_type = Option<String>, format = "date")]
    pub dob: Option<NaiveDate>,
    pub gender: Option<String>,
}

pub(crate) async fn fetch_employee(pool: &MySqlPool, id: u64) -> AppResult<Employee> {
    let sql = format!("{EMPLOYEE_SELECT} WHERE e.id = ?");
    sqlx::query_as::<_, Employee>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Employee not found"))
}

pub(crate) async fn ensure_department<'c, E>(executor: E, department_id: u64) -> AppResult<()>
where
    E: sqlx::Executor<'c, Database = MySql>,
{
    let found = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM departments WHERE id = ?")
        .bind(department_id)
        .fetch_one(executor)
        .await?;

    if found > 0 {
        Ok(())
    } else {
        Err(AppError::not_found(format!("Department {department_id} not found")))
    }
}

async fn insert_employee(
    tx: &mut Transaction<'_, MySql>,
    payload: &CreateEmployee,
    role: Role,
    hashed: String,
) -> AppResult<u64> {
    let user = sqlx::query("INSERT INTO users (username, name, password, role_id) VALUES (?, ?, ?, ?)")
        .bind(payload.username.trim())
        .bind(payload.name.trim())
        .bind(hashed)
        .bind(role.id())
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Username already exists".into())
            } else {
                e.into()
            }
        })?;
    let user_id = user.last_insert_id();

    let employee = sqlx::query(
        r#"
        INSERT INTO employees
        (employee_code, user_id, department_id, dob, gender, marital_status, designation, salary)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.employee_code.trim())
    .bind(user_id)
    .bind(payload.department_id)
    .bind(payload.dob)
    .bind(&payload.gender)
    .bind(&payload.marital_status)
    .bind(&payload.designation)
    .bind(payload.salary.unwrap_or(0.0))
    .execute(&mut **tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("Employee code already exists".into())
        } else {
            e.into()
        }
    })?;
    let employee_id = employee.last_insert_id();

    sqlx::query("UPDATE users SET employee_id = ? WHERE id = ?")
        .bind(employee_id)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;

    Ok(employee_id)
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/employee",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee and login account created", body = Object, example = json!({
            "success": true,
            "message": "Employee created successfully",
            "employee": {"id": 1, "employee_code": "EMP-001", "name": "John Doe"}
        })),
        (status = 400, description = "Missing or invalid fields"),
        (status = 403, description = "Only an admin may create admin or HR accounts"),
        (status = 404, description = "Department not found"),
        (status = 409, description = "Username or employee code already exists")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateEmployee>,
) -> AppResult<HttpResponse> {
    let role = account_role(&auth, &payload)?;
    if let Some(department_id) = payload.department_id {
        ensure_department(pool.get_ref(), department_id).await?;
    }
    let hashed = hash_password(&payload.password)?;

    // User and employee rows commit together or not at all.
    let mut tx = pool.begin().await?;
    let employee_id = insert_employee(&mut tx, &payload, role, hashed).await?;
    tx.commit().await?;

    info!(employee_id, code = %payload.employee_code.trim(), "Employee created");

    let employee = fetch_employee(pool.get_ref(), employee_id).await?;
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Employee created successfully",
        "employee": employee
    })))
}

#[utoipa::path(
    get,
    path = "/api/employee",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse)
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn list_employees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeQuery>,
) -> AppResult<HttpResponse> {
    auth.require_hr_or_admin()?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    // ---------- build WHERE clause dynamically ----------
    let mut conditions = Vec::new();
    let mut department = None;
    let mut like = None;

    if let Some(department_id) = query.department_id {
        conditions.push("e.department_id = ?");
        department = Some(department_id);
    }

    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        conditions.push("(u.name LIKE ? OR e.employee_code LIKE ?)");
        like = Some(format!("%{search}%"));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    // ---------- total count ----------
    let count_sql = format!(
        "SELECT COUNT(*) FROM employees e JOIN users u ON u.id = e.user_id {where_clause}"
    );
    debug!(sql = %count_sql, "Counting employees");

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    if let Some(id) = department {
        count_query = count_query.bind(id);
    }
    if let Some(like) = &like {
        count_query = count_query.bind(like).bind(like);
    }
    let total = count_query.fetch_one(pool.get_ref()).await?;

    // ---------- data query ----------
    let data_sql = format!("{EMPLOYEE_SELECT} {where_clause} ORDER BY e.id DESC LIMIT ? OFFSET ?");
    debug!(sql = %data_sql, page, per_page, offset, "Fetching employees");

    let mut data_query = sqlx::query_as::<_, Employee>(&data_sql);
    if let Some(id) = department {
        data_query = data_query.bind(id);
    }
    if let Some(like) = &like {
        data_query = data_query.bind(like).bind(like);
    }
    let employees = data_query
        .bind(i64::from(per_page))
        .bind(i64::from(offset))
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        success: true,
        data: employees,
        page,
        per_page,
        total,
    }))
}

/// Get Employee by ID
#[utoipa::path(
    get,
    path = "/api/employee/{id}",
    params(("id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 403, description = "Employees may only read their own profile"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn get_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let employee_id = path.into_inner();
    auth.require_self_or_staff(employee_id)?;

    let employee = fetch_employee(pool.get_ref(), employee_id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "employee": employee
    })))
}

/// Employee record linked to the caller's token.
fn linked_employee(auth: &AuthUser) -> AppResult<u64> {
    auth.employee_id
        .ok_or_else(|| AppError::not_found("No employee record is linked to this account"))
}

/// Own profile with the current month's attendance
#[utoipa::path(
    get,
    path = "/api/employee/me",
    responses(
        (status = 200, description = "Caller's profile and current-month attendance", body = Object, example = json!({
            "success": true,
            "employee": {"id": 1, "employee_code": "EMP-001", "name": "John Doe", "salary": 52000.0},
            "totalAttendance": 2,
            "currentMonthAttendance": [
                {"employeeCode": "EMP-001", "date": "2026-10-01", "status": "Present"},
                {"employeeCode": "EMP-001", "date": "2026-10-02", "status": "Leave"}
            ]
        })),
        (status = 404, description = "No employee record is linked to this account")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn my_details(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    svc: web::Data<AttendanceService>,
) -> AppResult<HttpResponse> {
    let employee_id = linked_employee(&auth)?;
    let employee = fetch_employee(pool.get_ref(), employee_id).await?;

    let today = today();
    let attendance = svc.employee_month(employee_id, today.month(), today.year()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "employee": employee,
        "totalAttendance": attendance.len(),
        "currentMonthAttendance": attendance
    })))
}

/// Upload Profile Image
#[utoipa::path(
    post,
    path = "/api/employee/{id}/profile-image",
    params(("id", Path, description = "Employee ID")),
    request_body(
        content = String,
        content_type = "multipart/form-data",
        description = "Form with an `image` file part (jpg, png, gif or webp)"
    ),
    responses(
        (status = 200, description = "Image stored", body = Object, example = json!({
            "success": true,
            "profileImage": "/public/uploads/4f8e2c1a-6b1d-4c4e-9a55-0c2f4b7f3e21.png"
        })),
        (status = 400, description = "Missing, oversized or unsupported image"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn upload_profile_image(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    auth.require_hr_or_admin()?;

    let employee_id = path.into_inner();
    let user_id = sqlx::query_scalar::<_, u64>("SELECT user_id FROM employees WHERE id = ?")
        .bind(employee_id)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| AppError::not_found("Employee not found"))?;

    let image = uploads::read_image(payload, config.max_upload_bytes).await?;
    let file_name = uploads::store(&config.upload_dir, image).await?;

    sqlx::query("UPDATE users SET profile_image = ? WHERE id = ?")
        .bind(&file_name)
        .bind(user_id)
        .execute(pool.get_ref())
        .await?;

    info!(employee_id, file = %file_name, "Profile image stored");
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "profileImage": format!("{UPLOADS_ROUTE}/{file_name}")
    })))
}

/// Splits an update body into the user's new name and the employee columns.
fn split_update(body: Value) -> AppResult<(Option<String>, Map<String, Value>)> {
    let Value::Object(mut fields) = body else {
        return Err(AppError::invalid("Payload must be a JSON object"));
    };

    let name = match fields.remove("name") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(_) => return Err(AppError::invalid("'name' must be a non-empty string")),
    };

    if name.is_none() && fields.is_empty() {
        return Err(AppError::invalid("No fields provided for update"));
    }
    Ok((name, fields))
}

/// Update Employee
#[utoipa::path(
    put,
    path = "/api/employee/{id}",
    params(("id", Path, description = "Employee ID")),
    request_body = UpdateEmployee,
    responses(
        (status = 200, description = "Employee updated", body = Object),
        (status = 400, description = "Unknown field or invalid value"),
        (status = 404, description = "Employee or department not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> AppResult<HttpResponse> {
    auth.require_hr_or_admin()?;

    let employee_id = path.into_inner();
    let (name, fields) = split_update(body.into_inner())?;
    let update = build_update_sql("employees", &fields, UPDATABLE, "id", employee_id)?;

    if let Some(department_id) = fields.get("department_id").and_then(Value::as_u64) {
        ensure_department(pool.get_ref(), department_id).await?;
    }

    let mut tx = pool.begin().await?;

    let user_id = sqlx::query_scalar::<_, u64>("SELECT user_id FROM employees WHERE id = ? FOR UPDATE")
        .bind(employee_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Employee not found"))?;

    if let Some(update) = &update {
        execute_update(&mut *tx, update).await?;
    }
    if let Some(name) = &name {
        sqlx::query("UPDATE users SET name = ? WHERE id = ?")
            .bind(name)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    info!(employee_id, "Employee updated");

    let employee = fetch_employee(pool.get_ref(), employee_id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Employee updated successfully",
        "employee": employee
    })))
}

/// Delete Employee
///
/// Removes the login account too; attendance and salary rows cascade.
#[utoipa::path(
    delete,
    path = "/api/employee/{id}",
    params(("id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "success": true,
            "message": "Successfully deleted"
        })),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn delete_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;

    let employee_id = path.into_inner();

    let result = sqlx::query(
        r#"
        DELETE u FROM users u
        JOIN employees e ON e.user_id = u.id
        WHERE e.id = ?
        "#,
    )
    .bind(employee_id)
    .execute(pool.get_ref())
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Employee not found"));
    }

    info!(employee_id, "Employee deleted");
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Successfully deleted"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> CreateEmployee {
        CreateEmployee {
            name: "John Doe".into(),
            username: "john.doe".into(),
            password: "secret".into(),
            employee_code: "EMP-001".into(),
            dob: None,
            gender: None,
            marital_status: None,
            designation: None,
            department_id: None,
            salary: Some(1000.0),
            role_id: None,
        }
    }

    #[test]
    fn create_defaults_to_employee_role() {
        assert_eq!(payload().validate().unwrap(), Role::Employee);

        let hr = CreateEmployee {
            role_id: Some(2),
            ..payload()
        };
        assert_eq!(hr.validate().unwrap(), Role::Hr);
    }

    fn caller(role: Role) -> AuthUser {
        AuthUser {
            user_id: 2,
            username: "hr.one".into(),
            role,
            employee_id: None,
        }
    }

    #[test]
    fn hr_cannot_create_admin_or_hr_accounts() {
        let admin_account = CreateEmployee {
            role_id: Some(1),
            ..payload()
        };
        assert!(matches!(
            account_role(&caller(Role::Hr), &admin_account),
            Err(AppError::Forbidden(_))
        ));
        assert_eq!(account_role(&caller(Role::Admin), &admin_account).unwrap(), Role::Admin);

        let hr_account = CreateEmployee {
            role_id: Some(2),
            ..payload()
        };
        assert!(account_role(&caller(Role::Hr), &hr_account).is_err());
        assert_eq!(account_role(&caller(Role::Hr), &payload()).unwrap(), Role::Employee);
        assert!(account_role(&caller(Role::Employee), &payload()).is_err());
    }

    #[test]
    fn details_need_a_linked_employee() {
        let admin = caller(Role::Admin);
        assert!(matches!(linked_employee(&admin), Err(AppError::NotFound(_))));

        let employee = AuthUser {
            employee_id: Some(7),
            ..caller(Role::Employee)
        };
        assert_eq!(linked_employee(&employee).unwrap(), 7);
    }

    #[test]
    fn create_rejects_blank_fields_bad_role_and_negative_salary() {
        let blank = CreateEmployee {
            employee_code: "  ".into(),
            ..payload()
        };
        assert!(matches!(blank.validate(), Err(AppError::InvalidArgument(m)) if m.contains("employee_code")));

        let role = CreateEmployee {
            role_id: Some(9),
            ..payload()
        };
        assert!(role.validate().is_err());

        let salary = CreateEmployee {
            salary: Some(-5.0),
            ..payload()
        };
        assert!(salary.validate().is_err());
    }

    #[test]
    fn update_splits_user_name_from_employee_columns() {
        let (name, fields) = split_update(json!({"name": " Jane ", "designation": "Lead"})).unwrap();
        assert_eq!(name.as_deref(), Some("Jane"));
        assert_eq!(fields.len(), 1);
        assert!(fields.contains_key("designation"));

        let (name, fields) = split_update(json!({"name": "Jane"})).unwrap();
        assert!(name.is_some());
        assert!(build_update_sql("employees", &fields, UPDATABLE, "id", 1).unwrap().is_none());
    }

    #[test]
    fn update_rejects_empty_or_non_object_bodies() {
        assert!(split_update(json!({})).is_err());
        assert!(split_update(json!([1, 2])).is_err());
        assert!(split_update(json!({"name": ""})).is_err());
    }
}
