use crate::attendance::AttendanceService;
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::AppError;
use crate::model::employee::EmployeeProfile;
use crate::model::role::Role;
use crate::models::{Claims, TokenType};
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

impl AuthUser {
    /// Builds the caller from verified access-token claims.
    pub fn from_claims(claims: Claims) -> Result<Self, AppError> {
        if claims.token_type != TokenType::Access {
            return Err(AppError::Unauthorized("Access token required".into()));
        }

        let role = Role::from_id(claims.role)
            .ok_or_else(|| AppError::Unauthorized("Invalid role".into()))?;

        Ok(AuthUser {
            user_id: claims.user_id,
            username: claims.sub,
            role,
            employee_id: claims.employee_id,
        })
    }
}

/// Extracts `Bearer <token>` from the Authorization header.
pub fn bearer_token(req: &HttpRequest) -> Result<&str, AppError> {
    let header = req
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

    header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid Authorization header encoding".into()))?
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Authorization header must start with Bearer".into()))
}

fn authenticate(req: &HttpRequest) -> Result<AuthUser, AppError> {
    // Set by the auth middleware on protected scopes.
    if let Some(user) = req.extensions().get::<AuthUser>() {
        return Ok(user.clone());
    }

    let token = bearer_token(req)?;
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Config missing")))?;

    let claims = verify_token(token, &config.jwt_secret)
        .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

    AuthUser::from_claims(claims)
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

fn not_own_records() -> AppError {
    AppError::Forbidden("You can only view your own records".into())
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin only".into()))
        }
    }

    pub fn require_hr_or_admin(&self) -> Result<(), AppError> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(AppError::Forbidden("HR/Admin only".into()))
        }
    }

    /// Resolves `employee` for reading. Employees get 403 for anything but
    /// their own record, including codes that do not exist.
    pub async fn readable_employee(
        &self,
        svc: &AttendanceService,
        employee: &str,
    ) -> Result<EmployeeProfile, AppError> {
        match svc.resolve_employee(employee).await {
            Ok(profile) => {
                self.require_self_or_staff(profile.id)?;
                Ok(profile)
            }
            Err(AppError::NotFound(_)) if !self.is_staff() => Err(not_own_records()),
            Err(e) => Err(e),
        }
    }

    /// HR may create employee accounts; any other role needs an admin.
    pub fn require_can_grant(&self, role: Role) -> Result<(), AppError> {
        match role {
            Role::Employee => self.require_hr_or_admin(),
            Role::Hr | Role::Admin => self
                .require_admin()
                .map_err(|_| AppError::Forbidden(format!("Only an admin may create {role} accounts"))),
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Hr)
    }

    /// Staff may read anyone; employees only their own records.
    pub fn require_self_or_staff(&self, employee_id: u64) -> Result<(), AppError> {
        if self.is_staff() || self.employee_id == Some(employee_id) {
            Ok(())
        } else {
            Err(not_own_records())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: u8, token_type: TokenType) -> Claims {
        Claims {
            user_id: 1,
            sub: "jdoe".into(),
            role,
            exp: usize::MAX,
            jti: "j".into(),
            token_type,
            employee_id: Some(5),
        }
    }

    #[test]
    fn refresh_tokens_cannot_authenticate_requests() {
        assert!(AuthUser::from_claims(claims(1, TokenType::Refresh)).is_err());
        assert!(AuthUser::from_claims(claims(9, TokenType::Access)).is_err());
    }

    #[test]
    fn employees_only_reach_their_own_records() {
        let emp = AuthUser::from_claims(claims(3, TokenType::Access)).unwrap();
        assert!(emp.require_self_or_staff(5).is_ok());
        assert!(matches!(emp.require_self_or_staff(6), Err(AppError::Forbidden(_))));
        assert!(emp.require_hr_or_admin().is_err());

        let hr = AuthUser::from_claims(claims(2, TokenType::Access)).unwrap();
        assert!(hr.require_self_or_staff(6).is_ok());
        assert!(hr.require_hr_or_admin().is_ok());
        assert!(hr.require_admin().is_err());
    }

    #[test]
    fn only_admins_grant_elevated_roles() {
        let hr = AuthUser::from_claims(claims(2, TokenType::Access)).unwrap();
        assert!(hr.require_can_grant(Role::Employee).is_ok());
        assert!(matches!(hr.require_can_grant(Role::Admin), Err(AppError::Forbidden(_))));
        assert!(matches!(hr.require_can_grant(Role::Hr), Err(AppError::Forbidden(_))));

        let admin = AuthUser::from_claims(claims(1, TokenType::Access)).unwrap();
        assert!(admin.require_can_grant(Role::Admin).is_ok());

        let emp = AuthUser::from_claims(claims(3, TokenType::Access)).unwrap();
        assert!(emp.require_can_grant(Role::Employee).is_err());
    }
}
