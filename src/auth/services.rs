//! Registration, login, verification and password-reset flows.
//!
//! Handlers stay thin: everything that touches the store, the token service or the mailer
//! lives here and returns `AppError` directly.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    claims::SessionScope,
    dto::{LoginRequest, OrganizationSessionInfo, PublicUser, RegisterRequest},
    jwt::JwtKeys,
    password::{self, MIN_PASSWORD_LEN},
    repo::CredentialStore,
    repo_types::{NewUser, User, ORG_MANAGER_ROLES, PERM_ADMIN_DASHBOARD, ROLE_USER},
    tokens,
};
use crate::{error::AppError, mailer::Email, state::AppState};

pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
pub const EMAIL_TAKEN: &str = "Email already registered";
pub const ALREADY_VERIFIED: &str = "Email already verified";
pub const INVALID_VERIFICATION: &str = "Invalid or expired verification link";
pub const INVALID_RESET: &str = "Invalid or expired password reset token";
pub const ACCESS_DENIED: &str = "Access denied";
pub const FORGOT_PASSWORD_SENT: &str =
    "If an account exists for that email, a password reset link has been sent";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_password_rule(plain: &str) -> Result<(), AppError> {
    if password::is_strong_enough(plain) {
        Ok(())
    } else {
        Err(AppError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )))
    }
}

/// Parses the `id` half of an emailed link.
fn parse_link_id(id: &str, invalid: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id.trim()).map_err(|_| AppError::bad_request(invalid))
}

/// A successful login: the user plus the signed session for its cookie.
#[derive(Debug)]
pub struct Session {
    pub user: PublicUser,
    pub scope: SessionScope,
    pub token: String,
}

#[instrument(skip(state, req), fields(email = %req.email.trim()))]
pub async fn register(state: &AppState, req: RegisterRequest) -> Result<PublicUser, AppError> {
    let name = req.name.trim().to_string();
    let email = normalize_email(&req.email);

    if name.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(AppError::bad_request(
            "Name, email and password are required",
        ));
    }
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::bad_request("Invalid email"));
    }
    check_password_rule(&req.password)?;

    if state.store.find_user_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::bad_request(EMAIL_TAKEN));
    }

    let password_hash = password::hash_password(&req.password)?;
    let verification = tokens::issue(state.config.tokens.verification_ttl_minutes);

    let user = state
        .store
        .create_user(NewUser {
            name,
            email,
            password_hash,
            role: ROLE_USER.to_string(),
            verification_token: verification.digest.clone(),
            verification_expires_at: verification.expires_at,
        })
        .await?
        .ok_or_else(|| AppError::bad_request(EMAIL_TAKEN))?;

    send_verification_email(state, &user, &verification.raw).await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user.into())
}

/// Looks the user up and checks the password. Both failure modes produce the same error.
async fn authenticate(state: &AppState, req: &LoginRequest) -> Result<User, AppError> {
    let email = normalize_email(&req.email);
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::bad_request("Email and password are required"));
    }

    let Some(user) = state.store.find_user_by_email(&email).await? else {
        password::verify_dummy(&req.password);
        warn!(email = %email, "login unknown email");
        return Err(AppError::unauthorized(INVALID_CREDENTIALS));
    };

    if !password::verify_password(&req.password, &user.password_hash)? {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(AppError::unauthorized(INVALID_CREDENTIALS));
    }
    Ok(user)
}

fn open_session(
    state: &AppState,
    user: User,
    scope: SessionScope,
    org: Option<Uuid>,
) -> Result<Session, AppError> {
    let token = JwtKeys::from(&state.config.jwt).sign(user.id, scope, org)?;
    Ok(Session {
        user: user.into(),
        scope,
        token,
    })
}

#[instrument(skip(state, req), fields(email = %req.email.trim()))]
pub async fn login(state: &AppState, req: LoginRequest) -> Result<Session, AppError> {
    let user = authenticate(state, &req).await?;
    info!(user_id = %user.id, "user logged in");
    open_session(state, user, SessionScope::User, None)
}

#[instrument(skip(state, req), fields(email = %req.email.trim()))]
pub async fn admin_login(state: &AppState, req: LoginRequest) -> Result<Session, AppError> {
    let user = authenticate(state, &req).await?;
    if !role_allows(state, &user.role, PERM_ADMIN_DASHBOARD).await? {
        warn!(user_id = %user.id, role = %user.role, "admin login without dashboard permission");
        return Err(AppError::forbidden(ACCESS_DENIED));
    }
    info!(user_id = %user.id, "admin logged in");
    open_session(state, user, SessionScope::Admin, None)
}

#[instrument(skip(state, req), fields(email = %req.email.trim()))]
pub async fn organization_login(
    state: &AppState,
    req: LoginRequest,
    organization_id: Uuid,
) -> Result<Session, AppError> {
    let user = authenticate(state, &req).await?;
    if !has_organization_access(state, user.id, organization_id).await? {
        warn!(user_id = %user.id, %organization_id, "organization login denied");
        return Err(AppError::forbidden(ACCESS_DENIED));
    }
    info!(user_id = %user.id, %organization_id, "organization session opened");
    open_session(state, user, SessionScope::Organization, Some(organization_id))
}

pub async fn current_user(state: &AppState, user_id: Uuid) -> Result<PublicUser, AppError> {
    state
        .store
        .find_user_by_id(user_id)
        .await?
        .map(PublicUser::from)
        .ok_or_else(|| AppError::not_found("User not found"))
}

#[instrument(skip(state, name))]
pub async fn update_profile(
    state: &AppState,
    user_id: Uuid,
    name: &str,
) -> Result<PublicUser, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("Name is required"));
    }
    let user = state
        .store
        .update_name(user_id, name)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    info!(user_id = %user.id, "profile updated");
    Ok(user.into())
}

#[instrument(skip(state, current, new))]
pub async fn change_password(
    state: &AppState,
    user_id: Uuid,
    current: &str,
    new: &str,
) -> Result<(), AppError> {
    let user = state
        .store
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    if !password::verify_password(current, &user.password_hash)? {
        return Err(AppError::unauthorized(INVALID_CREDENTIALS));
    }
    check_password_rule(new)?;
    let hash = password::hash_password(new)?;
    state.store.update_password(user.id, &hash).await?;
    info!(user_id = %user.id, "password changed");
    Ok(())
}

#[instrument(skip(state, token))]
pub async fn verify_email(state: &AppState, token: &str, id: &str) -> Result<(), AppError> {
    if token.is_empty() || id.is_empty() {
        return Err(AppError::bad_request("Token and id are required"));
    }
    let user_id = parse_link_id(id, INVALID_VERIFICATION)?;
    let user = state
        .store
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::bad_request(INVALID_VERIFICATION))?;

    if user.is_verified {
        return Err(AppError::bad_request(ALREADY_VERIFIED));
    }

    let valid = match (&user.verification_token, user.verification_expires_at) {
        (Some(digest), Some(expires_at)) => tokens::matches(token, digest, expires_at),
        _ => false,
    };
    if !valid {
        warn!(user_id = %user.id, "verification token rejected");
        return Err(AppError::bad_request(INVALID_VERIFICATION));
    }

    state.store.mark_verified(user.id).await?;
    info!(user_id = %user.id, "email verified");
    Ok(())
}

#[instrument(skip(state))]
pub async fn resend_verification(state: &AppState, email: &str) -> Result<(), AppError> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(AppError::bad_request("Email is required"));
    }
    let user = state
        .store
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    if user.is_verified {
        return Err(AppError::bad_request(ALREADY_VERIFIED));
    }

    let verification = tokens::issue(state.config.tokens.verification_ttl_minutes);
    state
        .store
        .set_verification_token(user.id, &verification.digest, verification.expires_at)
        .await?;
    send_verification_email(state, &user, &verification.raw).await?;
    info!(user_id = %user.id, "verification email re-sent");
    Ok(())
}

#[instrument(skip(state))]
pub async fn forgot_password(state: &AppState, email: &str) -> Result<(), AppError> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(AppError::bad_request("Email is required"));
    }
    let Some(user) = state.store.find_user_by_email(&email).await? else {
        warn!(email = %email, "password reset for unknown email");
        return Ok(());
    };

    let reset = tokens::issue(state.config.tokens.reset_ttl_minutes);
    state
        .store
        .replace_reset_token(user.id, &reset.digest, reset.expires_at)
        .await?;

    let link = format!(
        "{}/reset-password?token={}&id={}",
        state.config.mail.client_url, reset.raw, user.id
    );
    let email = Email {
        from: state.config.mail.from.clone(),
        to: user.email.clone(),
        subject: "Reset your password".into(),
        text: format!(
            "Hi {},\n\nUse this link to choose a new password:\n{}\n\nIt expires in {} minutes.\n",
            user.name, link, state.config.tokens.reset_ttl_minutes
        ),
    };
    state.mailer.send(&email).await?;
    info!(user_id = %user.id, "password reset email sent");
    Ok(())
}

#[instrument(skip(state, token, new_password))]
pub async fn reset_password(
    state: &AppState,
    token: &str,
    id: &str,
    new_password: &str,
) -> Result<(), AppError> {
    if token.is_empty() || id.is_empty() {
        return Err(AppError::bad_request("Token and id are required"));
    }
    let user_id = parse_link_id(id, INVALID_RESET)?;
    let record = state
        .store
        .find_reset_token(user_id)
        .await?
        .ok_or_else(|| AppError::bad_request(INVALID_RESET))?;

    if time::OffsetDateTime::now_utc() >= record.expires_at {
        state.store.delete_reset_token(user_id).await?;
        warn!(%user_id, "expired reset token");
        return Err(AppError::bad_request(INVALID_RESET));
    }
    if !tokens::matches(token, &record.token_hash, record.expires_at) {
        warn!(%user_id, "reset token mismatch");
        return Err(AppError::bad_request(INVALID_RESET));
    }
    check_password_rule(new_password)?;

    let hash = password::hash_password(new_password)?;
    // a concurrent reset or a newer forgot-password may have replaced the record meanwhile
    if !state
        .store
        .complete_password_reset(user_id, &record.token_hash, &hash)
        .await?
    {
        warn!(%user_id, "reset token already consumed");
        return Err(AppError::bad_request(INVALID_RESET));
    }
    info!(%user_id, "password reset");
    Ok(())
}

async fn role_allows(state: &AppState, role: &str, permission: &str) -> Result<bool, AppError> {
    Ok(state.store.role_has_permission(role, permission).await?)
}

/// Whether the user's role grants `permission`. Unknown users have no permissions.
pub async fn has_permission(
    state: &AppState,
    user_id: Uuid,
    permission: &str,
) -> Result<bool, AppError> {
    match state.store.find_user_by_id(user_id).await? {
        Some(user) => role_allows(state, &user.role, permission).await,
        None => Ok(false),
    }
}

pub async fn has_admin_access(state: &AppState, user_id: Uuid) -> Result<bool, AppError> {
    has_permission(state, user_id, PERM_ADMIN_DASHBOARD).await
}

pub async fn has_organization_access(
    state: &AppState,
    user_id: Uuid,
    organization_id: Uuid,
) -> Result<bool, AppError> {
    let role = state
        .store
        .organization_role(organization_id, user_id)
        .await?;
    Ok(role.is_some_and(|r| ORG_MANAGER_ROLES.contains(&r.as_str())))
}

/// Membership details behind an organization session. The manager role is re-checked on
/// every call, so a demoted member loses access before the cookie expires.
pub async fn organization_session(
    state: &AppState,
    user_id: Uuid,
    organization_id: Uuid,
) -> Result<OrganizationSessionInfo, AppError> {
    let role = state
        .store
        .organization_role(organization_id, user_id)
        .await?
        .filter(|r| ORG_MANAGER_ROLES.contains(&r.as_str()));
    let Some(role) = role else {
        warn!(%user_id, %organization_id, "organization access revoked");
        return Err(AppError::forbidden(ACCESS_DENIED));
    };
    let user = current_user(state, user_id).await?;
    Ok(OrganizationSessionInfo {
        organization_id,
        role,
        user,
    })
}

async fn send_verification_email(state: &AppState, user: &User, raw: &str) -> Result<(), AppError> {
    let link = format!(
        "{}/verify-email?token={}&id={}",
        state.config.mail.client_url, raw, user.id
    );
    let email = Email {
        from: state.config.mail.from.clone(),
        to: user.email.clone(),
        subject: "Verify your email".into(),
        text: format!(
            "Hi {},\n\nConfirm your email address with this link:\n{}\n",
            user.name, link
        ),
    };
    state.mailer.send(&email).await?;
    Ok(())
}
