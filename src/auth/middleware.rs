use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::warn;
use uuid::Uuid;

use super::{claims::SessionScope, extractors::verify_session, jwt::JwtKeys, services};
use crate::{error::AppError, state::AppState};

/// Identity attached to request extensions by [`require_permission`].
#[derive(Debug, Clone, Copy)]
pub struct Identity {
    pub user_id: Uuid,
}

/// State for one permission-gated route group.
#[derive(Clone)]
pub struct PermissionGate {
    pub state: AppState,
    pub permission: &'static str,
}

impl PermissionGate {
    pub fn new(state: &AppState, permission: &'static str) -> Self {
        Self {
            state: state.clone(),
            permission,
        }
    }
}

/// Requires a valid admin session whose role currently holds `gate.permission`.
///
/// The permission is looked up on every request, so revoking a role takes effect before the
/// admin cookie expires.
pub async fn require_permission(
    State(gate): State<PermissionGate>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let keys = JwtKeys::from(&gate.state.config.jwt);
    let claims = verify_session(&keys, req.headers(), SessionScope::Admin)?;

    if !services::has_permission(&gate.state, claims.sub, gate.permission).await? {
        warn!(user_id = %claims.sub, permission = gate.permission, "permission denied");
        return Err(AppError::forbidden(services::ACCESS_DENIED));
    }

    req.extensions_mut().insert(Identity {
        user_id: claims.sub,
    });
    Ok(next.run(req).await)
}
