use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// User entity resolved from the verified session's email.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `PUT /users/me`. The email always comes from the session.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpsertUserRequest {
    #[validate(length(max = 255, message = "Name must be at most 255 characters"))]
    #[serde(default)]
    pub name: Option<String>,
}
