use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

pub const ROLE_USER: &str = "user";

pub const PERM_ADMIN_DASHBOARD: &str = "admin.dashboard";

/// Organization membership roles allowed to open an organization session.
pub const ORG_MANAGER_ROLES: &[&str] = &["owner", "admin"];

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,                               // stored lowercased
    #[serde(skip_serializing)]
    pub password_hash: String,                       // argon2, never exposed
    pub role: String,
    pub is_verified: bool,
    #[serde(skip_serializing)]
    pub verification_token: Option<String>,          // SHA-256 digest
    #[serde(skip_serializing)]
    pub verification_expires_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Fields needed to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub verification_token: String,
    pub verification_expires_at: OffsetDateTime,
}

/// Pending password reset, at most one per user (keyed by user id).
#[derive(Debug, Clone, FromRow)]
pub struct PasswordResetToken {
    pub token_hash: String,
    pub expires_at: OffsetDateTime,
}
