use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, PasswordResetToken, User};

/// Persistence seam for credentials, reset tokens and permission lookups.
///
/// Email arguments are matched case-insensitively by every implementation.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;

    async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;

    /// Inserts the user; `None` when the email is already taken.
    async fn create_user(&self, user: NewUser) -> anyhow::Result<Option<User>>;

    async fn update_name(&self, id: Uuid, name: &str) -> anyhow::Result<Option<User>>;

    async fn update_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<()>;

    async fn set_verification_token(
        &self,
        id: Uuid,
        token_hash: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()>;

    /// Sets `is_verified` and clears the verification token fields.
    async fn mark_verified(&self, id: Uuid) -> anyhow::Result<()>;

    /// Drops any previous reset token for the user and stores the new one.
    async fn replace_reset_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()>;

    async fn find_reset_token(&self, user_id: Uuid) -> anyhow::Result<Option<PasswordResetToken>>;

    async fn delete_reset_token(&self, user_id: Uuid) -> anyhow::Result<()>;

    /// Consumes the reset token if it still has `token_hash` and has not expired, and stores
    /// the new password in the same step. `false` when nothing was consumed.
    async fn complete_password_reset(
        &self,
        user_id: Uuid,
        token_hash: &str,
        password_hash: &str,
    ) -> anyhow::Result<bool>;

    async fn role_has_permission(&self, role: &str, permission: &str) -> anyhow::Result<bool>;

    async fn organization_role(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<Option<String>>;
}
