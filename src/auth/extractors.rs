use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use axum_extra::extract::CookieJar;
use tracing::warn;
use uuid::Uuid;

use super::{claims::{Claims, SessionScope}, jwt::JwtKeys};
use crate::error::AppError;

/// Reads the session token for `scope`: its cookie first, then a bearer header.
pub(crate) fn session_token(headers: &HeaderMap, scope: SessionScope) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(c) = jar.get(scope.cookie_name()) {
        if !c.value().is_empty() {
            return Some(c.value().to_string());
        }
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
        .map(|t| t.trim().to_string())
}

pub(crate) fn verify_session(
    keys: &JwtKeys,
    headers: &HeaderMap,
    scope: SessionScope,
) -> Result<Claims, AppError> {
    let token = session_token(headers, scope)
        .ok_or_else(|| AppError::unauthorized("Not authenticated"))?;
    keys.verify_scoped(&token, scope).map_err(|e| {
        warn!(error = %e, scope = ?scope, "invalid session token");
        AppError::unauthorized("Invalid or expired session")
    })
}

/// Authenticated user from the `token` session.
pub struct AuthUser(pub Uuid);

/// Authenticated organization manager from the `org_token` session.
pub struct OrganizationSession {
    pub user_id: Uuid,
    pub organization_id: Uuid,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let claims = verify_session(&keys, &parts.headers, SessionScope::User)?;
        Ok(AuthUser(claims.sub))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for OrganizationSession
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let claims = verify_session(&keys, &parts.headers, SessionScope::Organization)?;
        let organization_id = claims
            .org
            .ok_or_else(|| AppError::unauthorized("Invalid or expired session"))?;
        Ok(OrganizationSession {
            user_id: claims.sub,
            organization_id,
        })
    }
}
