use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    repo::CredentialStore,
    repo_types::{NewUser, PasswordResetToken, User},
};

/// In-process store for tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    reset_tokens: HashMap<Uuid, PasswordResetToken>,
    permissions: HashSet<(String, String)>,
    memberships: HashMap<(Uuid, Uuid), String>,
}

impl MemoryStore {
    /// Store seeded with the same role permissions as the initial migration.
    pub fn seeded() -> Self {
        let store = Self::default();
        store.grant("admin", "admin.dashboard");
        store.grant("superadmin", "admin.dashboard");
        store.grant("superadmin", "admin.users.manage");
        store
    }

    pub fn grant(&self, role: &str, permission: &str) {
        self.inner
            .lock()
            .unwrap()
            .permissions
            .insert((role.to_string(), permission.to_string()));
    }

    pub fn set_role(&self, user_id: Uuid, role: &str) {
        if let Some(u) = self.inner.lock().unwrap().users.get_mut(&user_id) {
            u.role = role.to_string();
        }
    }

    pub fn add_member(&self, organization_id: Uuid, user_id: Uuid, role: &str) {
        self.inner
            .lock()
            .unwrap()
            .memberships
            .insert((organization_id, user_id), role.to_string());
    }

    pub fn reset_token_count(&self) -> usize {
        self.inner.lock().unwrap().reset_tokens.len()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let needle = email.to_lowercase();
        Ok(self
            .inner
            .lock()
            .unwrap()
            .users
            .values()
            .find(|u| u.email.to_lowercase() == needle)
            .cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.inner.lock().unwrap().users.get(&id).cloned())
    }

    async fn create_user(&self, user: NewUser) -> anyhow::Result<Option<User>> {
        let mut inner = self.inner.lock().unwrap();
        let needle = user.email.to_lowercase();
        if inner.users.values().any(|u| u.email.to_lowercase() == needle) {
            return Ok(None);
        }
        let now = OffsetDateTime::now_utc();
        let created = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            is_verified: false,
            verification_token: Some(user.verification_token),
            verification_expires_at: Some(user.verification_expires_at),
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(created.id, created.clone());
        Ok(Some(created))
    }

    async fn update_name(&self, id: Uuid, name: &str) -> anyhow::Result<Option<User>> {
        let mut inner = self.inner.lock().unwrap();
        Ok(inner.users.get_mut(&id).map(|u| {
            u.name = name.to_string();
            u.updated_at = OffsetDateTime::now_utc();
            u.clone()
        }))
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        if let Some(u) = self.inner.lock().unwrap().users.get_mut(&id) {
            u.password_hash = password_hash.to_string();
            u.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }

    async fn set_verification_token(
        &self,
        id: Uuid,
        token_hash: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        if let Some(u) = self.inner.lock().unwrap().users.get_mut(&id) {
            u.verification_token = Some(token_hash.to_string());
            u.verification_expires_at = Some(expires_at);
        }
        Ok(())
    }

    async fn mark_verified(&self, id: Uuid) -> anyhow::Result<()> {
        if let Some(u) = self.inner.lock().unwrap().users.get_mut(&id) {
            u.is_verified = true;
            u.verification_token = None;
            u.verification_expires_at = None;
        }
        Ok(())
    }

    async fn replace_reset_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        self.inner.lock().unwrap().reset_tokens.insert(
            user_id,
            PasswordResetToken {
                token_hash: token_hash.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn find_reset_token(&self, user_id: Uuid) -> anyhow::Result<Option<PasswordResetToken>> {
        Ok(self.inner.lock().unwrap().reset_tokens.get(&user_id).cloned())
    }

    async fn delete_reset_token(&self, user_id: Uuid) -> anyhow::Result<()> {
        self.inner.lock().unwrap().reset_tokens.remove(&user_id);
        Ok(())
    }

    async fn complete_password_reset(
        &self,
        user_id: Uuid,
        token_hash: &str,
        password_hash: &str,
    ) -> anyhow::Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        let live = inner.reset_tokens.get(&user_id).is_some_and(|t| {
            t.token_hash == token_hash && t.expires_at > OffsetDateTime::now_utc()
        });
        if !live {
            return Ok(false);
        }
        inner.reset_tokens.remove(&user_id);
        if let Some(u) = inner.users.get_mut(&user_id) {
            u.password_hash = password_hash.to_string();
        }
        Ok(true)
    }

    async fn role_has_permission(&self, role: &str, permission: &str) -> anyhow::Result<bool> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .permissions
            .contains(&(role.to_string(), permission.to_string())))
    }

    async fn organization_role(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<Option<String>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .memberships
            .get(&(organization_id, user_id))
            .cloned())
    }
}
