use serde::Serialize;
use utoipa::ToSchema;

use crate::model::role::Role;

/// The user as exposed to API clients; never carries the password hash.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserInfo {
    #[schema(example = 4)]
    pub id: u64,
    #[schema(example = "jdoe")]
    pub username: String,
    #[schema(example = "John Doe")]
    pub name: String,
    pub role: Role,
    #[schema(example = 1, nullable = true)]
    pub employee_id: Option<u64>,
}
