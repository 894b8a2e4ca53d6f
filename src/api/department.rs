use crate::{
    api::employee::{EMPLOYEE_SELECT, ensure_department},
    auth::auth::AuthUser,
    error::{AppError, AppResult, is_unique_violation},
    model::{department::Department, employee::Employee},
};
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::ToSchema;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/department")
            // /department
            .service(
                web::resource("")
                    .route(web::post().to(create_department))
                    .route(web::get().to(list_departments)),
            )
            // /department/{id}
            .service(
                web::resource("/{id}")
                    .route(web::get().to(get_department))
                    .route(web::put().to(update_department))
                    .route(web::delete().to(delete_department)),
            )
            // /department/{id}/employees
            .service(
                web::resource("/{id}/employees").route(web::get().to(department_employees)),
            ),
    );
}

#[derive(Deserialize, ToSchema)]
pub struct CreateDepartment {
    #[schema(example = "Engineering")]
    pub name: String,
    #[schema(example = "Product engineering")]
    pub description: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateDepartment {
    #[schema(example = "Platform Engineering")]
    pub name: Option<String>,
    pub description: Option<String>,
}

fn department_name(raw: &str) -> AppResult<&str> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::invalid("'name' is required"));
    }
    Ok(name)
}

fn conflict_on_duplicate(e: sqlx::Error) -> AppError {
    if is_unique_violation(&e) {
        AppError::Conflict("Department name already exists".into())
    } else {
        e.into()
    }
}

async fn fetch_department(pool: &MySqlPool, id: u64) -> AppResult<Department> {
    sqlx::query_as::<_, Department>(
        "SELECT id, name, description, created_at FROM departments WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Department not found"))
}

#[utoipa::path(
    post,
    path = "/api/department",
    request_body = CreateDepartment,
    responses(
        (status = 201, description = "Department created", body = Object, example = json!({
            "success": true,
            "department": {"id": 10, "name": "Engineering", "description": null, "created_at": "2026-01-01T00:00:00Z"}
        })),
        (status = 400, description = "Name missing"),
        (status = 409, description = "Name already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn create_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateDepartment>,
) -> AppResult<HttpResponse> {
    auth.require_hr_or_admin()?;

    let name = department_name(&payload.name)?;
    let result = sqlx::query("INSERT INTO departments (name, description) VALUES (?, ?)")
        .bind(name)
        .bind(&payload.description)
        .execute(pool.get_ref())
        .await
        .map_err(conflict_on_duplicate)?;

    let department = fetch_department(pool.get_ref(), result.last_insert_id()).await?;
    info!(department_id = department.id, department = name, "Department created");

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "department": department
    })))
}

#[utoipa::path(
    get,
    path = "/api/department",
    responses((status = 200, description = "All departments by name", body = [Department])),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn list_departments(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> AppResult<HttpResponse> {
    let departments = sqlx::query_as::<_, Department>(
        "SELECT id, name, description, created_at FROM departments ORDER BY name",
    )
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "departments": departments
    })))
}

#[utoipa::path(
    get,
    path = "/api/department/{id}",
    params(("id", Path, description = "Department ID")),
    responses(
        (status = 200, description = "Department found", body = Department),
        (status = 404, description = "Department not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn get_department(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let department = fetch_department(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "department": department
    })))
}

#[utoipa::path(
    put,
    path = "/api/department/{id}",
    params(("id", Path, description = "Department ID")),
    request_body = UpdateDepartment,
    responses(
        (status = 200, description = "Department updated", body = Object),
        (status = 404, description = "Department not found"),
        (status = 409, description = "Name already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn update_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<UpdateDepartment>,
) -> AppResult<HttpResponse> {
    auth.require_hr_or_admin()?;

    let id = path.into_inner();
    let current = fetch_department(pool.get_ref(), id).await?;

    let name = match &body.name {
        Some(raw) => department_name(raw)?.to_string(),
        None => current.name,
    };
    let description = body.description.clone().or(current.description);

    sqlx::query("UPDATE departments SET name = ?, description = ? WHERE id = ?")
        .bind(&name)
        .bind(&description)
        .bind(id)
        .execute(pool.get_ref())
        .await
        .map_err(conflict_on_duplicate)?;

    let department = fetch_department(pool.get_ref(), id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "department": department
    })))
}

/// Employees of a removed department keep their records with no department.
#[utoipa::path(
    delete,
    path = "/api/department/{id}",
    params(("id", Path, description = "Department ID")),
    responses(
        (status = 200, description = "Department deleted"),
        (status = 404, description = "Department not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn delete_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_hr_or_admin()?;

    let id = path.into_inner();
    let result = sqlx::query("DELETE FROM departments WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Department not found"));
    }

    info!(department_id = id, "Department deleted");
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Department deleted successfully"
    })))
}

#[utoipa::path(
    get,
    path = "/api/department/{id}/employees",
    params(("id", Path, description = "Department ID")),
    responses(
        (status = 200, description = "Employees of the department (possibly empty)", body = [Employee]),
        (status = 404, description = "Department not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn department_employees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_hr_or_admin()?;

    let id = path.into_inner();
    ensure_department(pool.get_ref(), id).await?;

    let sql = format!("{EMPLOYEE_SELECT} WHERE e.department_id = ? ORDER BY u.name");
    let employees = sqlx::query_as::<_, Employee>(&sql)
        .bind(id)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "employees": employees
    })))
}
