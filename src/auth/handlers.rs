use crate::{
    auth::{
        auth::{AuthUser, bearer_token},
        jwt::{TokenSubject, generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    error::{AppError, AppResult, is_unique_violation},
    model::{role::Role, user::UserInfo},
    models::{Claims, LoginReqDto, TokenType, UserReq, UserSql},
};
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Serialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    success: bool,
    access_token: String,
    refresh_token: String,
    user: UserInfo,
}

/// Issues an access/refresh pair and records the refresh token's `jti`.
async fn issue_tokens(
    pool: &MySqlPool,
    config: &Config,
    subject: &TokenSubject<'_>,
) -> AppResult<(String, String)> {
    let access_token = generate_access_token(subject, &config.jwt_secret, config.access_token_ttl)
        .map_err(|e| AppError::Internal(e.into()))?;
    let (refresh_token, refresh_claims) =
        generate_refresh_token(subject, &config.jwt_secret, config.refresh_token_ttl)
            .map_err(|e| AppError::Internal(e.into()))?;

    debug!(user_id = subject.user_id, jti = %refresh_claims.jti, "Storing refresh token");

    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(subject.user_id)
    .bind(&refresh_claims.jti)
    .bind(refresh_claims.exp as i64)
    .execute(pool)
    .await?;

    Ok((access_token, refresh_token))
}

/// Verifies a Bearer refresh token from the request.
fn refresh_claims(req: &HttpRequest, config: &Config) -> AppResult<Claims> {
    let token = bearer_token(req)?;
    let claims = verify_token(token, &config.jwt_secret)
        .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

    if claims.token_type != TokenType::Refresh {
        return Err(AppError::Unauthorized("Refresh token required".into()));
    }
    Ok(claims)
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Username or password missing"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return Err(AppError::invalid("Username and password are required"));
    }

    let db_user = sqlx::query_as::<_, UserSql>(
        r#"
        SELECT id, username, name, password, role_id, employee_id
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(user.username.trim())
    .fetch_optional(pool.get_ref())
    .await?;

    // Same answer for unknown users and wrong passwords.
    let db_user = match db_user {
        Some(u) if verify_password(&user.password, &u.password) => u,
        _ => {
            info!("Invalid credentials");
            return Err(AppError::Unauthorized("Invalid credentials".into()));
        }
    };

    let role = Role::from_id(db_user.role_id).ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!("user {} has unknown role {}", db_user.id, db_user.role_id))
    })?;

    let subject = TokenSubject {
        user_id: db_user.id,
        username: &db_user.username,
        role: db_user.role_id,
        employee_id: db_user.employee_id,
    };
    let (access_token, refresh_token) = issue_tokens(pool.get_ref(), &config, &subject).await?;

    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(db_user.id)
        .execute(pool.get_ref())
        .await
    {
        // intentionally not failing login
        error!(error = %e, "Failed to update last_login_at");
    }

    info!(user_id = db_user.id, "Login successful");

    Ok(HttpResponse::Ok().json(LoginResponse {
        success: true,
        access_token,
        refresh_token,
        user: UserInfo {
            id: db_user.id,
            username: db_user.username,
            name: db_user.name,
            role,
            employee_id: db_user.employee_id,
        },
    }))
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "Rotated token pair", body = Object, example = json!({
            "success": true, "access_token": "...", "refresh_token": "..."
        })),
        (status = 401, description = "Refresh token missing, invalid or revoked")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    let claims = refresh_claims(&req, &config)?;

    // Revoke-on-use: only the first refresh with a given jti succeeds.
    let revoked = sqlx::query(
        r#"
        UPDATE refresh_tokens
        SET revoked = TRUE
        WHERE jti = ? AND revoked = FALSE
        "#,
    )
    .bind(&claims.jti)
    .execute(pool.get_ref())
    .await?;

    if revoked.rows_affected() == 0 {
        info!(user_id = claims.user_id, "Refresh rejected: token unknown or revoked");
        return Err(AppError::Unauthorized("Refresh token revoked".into()));
    }

    let (access_token, refresh_token) =
        issue_tokens(pool.get_ref(), &config, &TokenSubject::from(&claims)).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "access_token": access_token,
        "refresh_token": refresh_token
    })))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Refresh token revoked (idempotent)")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> HttpResponse {
    let Ok(claims) = refresh_claims(&req, &config) else {
        return HttpResponse::NoContent().finish();
    };

    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to revoke refresh token");
    }

    // success even if token didn't exist
    HttpResponse::NoContent().finish()
}

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = UserReq,
    responses(
        (status = 201, description = "User registered"),
        (status = 400, description = "Missing fields or unknown role"),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Username already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn register(
    auth: AuthUser,
    user: web::Json<UserReq>,
    pool: web::Data<MySqlPool>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;

    let username = user.username.trim();
    if username.is_empty() || user.password.is_empty() || user.name.trim().is_empty() {
        return Err(AppError::invalid("Username, name and password must not be empty"));
    }
    let role = Role::from_id(user.role_id)
        .ok_or_else(|| AppError::invalid(format!("Unknown role_id {}", user.role_id)))?;

    let hashed = hash_password(&user.password)?;
    let result = sqlx::query("INSERT INTO users (username, name, password, role_id) VALUES (?, ?, ?, ?)")
        .bind(username)
        .bind(user.name.trim())
        .bind(hashed)
        .bind(role.id())
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(_) => {
            info!(username, %role, "User registered");
            Ok(HttpResponse::Created().json(json!({
                "success": true,
                "message": "User registered successfully"
            })))
        }
        Err(e) if is_unique_violation(&e) => Err(AppError::Conflict("Username already exists".into())),
        Err(e) => Err(e.into()),
    }
}

#[utoipa::path(
    get,
    path = "/api/auth/verify",
    responses(
        (status = 200, description = "The token holder", body = Object, example = json!({
            "success": true,
            "user": {"id": 1, "username": "admin", "name": "Administrator", "role": "admin", "employee_id": null}
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn verify(auth: AuthUser, pool: web::Data<MySqlPool>) -> AppResult<HttpResponse> {
    let name = sqlx::query_scalar::<_, String>("SELECT name FROM users WHERE id = ?")
        .bind(auth.user_id)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| AppError::Unauthorized("User no longer exists".into()))?;

    let user = UserInfo {
        id: auth.user_id,
        username: auth.username,
        name,
        role: auth.role,
        employee_id: auth.employee_id,
    };

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "user": user
    })))
}
