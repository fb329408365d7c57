use axum::{
    extract::{Query, State},
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Extension, Json, Router,
};
use axum_extra::extract::CookieJar;
use tracing::instrument;

use crate::{
    auth::{
        cookies,
        dto::{
            ChangePasswordRequest, EmailRequest, LoginRequest, OrganizationLoginRequest,
            OrganizationSessionInfo, PublicUser, RegisterRequest, ResetPasswordRequest,
            TokenQuery, UpdateProfileRequest,
        },
        extractors::{AuthUser, OrganizationSession},
        middleware::{require_permission, Identity, PermissionGate},
        repo_types::PERM_ADMIN_DASHBOARD,
        services::{self, Session},
    },
    error::AppError,
    response::ApiResponse,
    state::AppState,
};

type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/admin/login", post(admin_login))
        .route("/auth/organization/login", post(organization_login))
        .route("/auth/logout", post(logout))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
        .route("/auth/verify-email", post(verify_email))
        .route("/auth/resend-verification", post(resend_verification))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(get_me).put(update_me))
        .route("/auth/change-password", put(change_password))
        .route("/auth/organization/me", get(organization_me))
}

pub fn admin_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/admin/me", get(admin_me))
        .route_layer(middleware::from_fn_with_state(
            PermissionGate::new(state, PERM_ADMIN_DASHBOARD),
            require_permission,
        ))
}

fn with_session(
    state: &AppState,
    jar: CookieJar,
    session: Session,
) -> (CookieJar, Json<ApiResponse<PublicUser>>) {
    let cookie = cookies::session_cookie(&state.config, session.scope, session.token);
    (
        jar.add(cookie),
        Json(ApiResponse::data(session.user).with_message("Logged in")),
    )
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PublicUser>>), AppError> {
    let user = services::register(&state, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(
            ApiResponse::data(user)
                .with_message("Registered. Check your email to verify your account"),
        ),
    ))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<ApiResponse<PublicUser>>), AppError> {
    let session = services::login(&state, payload).await?;
    Ok(with_session(&state, jar, session))
}

#[instrument(skip(state, jar, payload))]
pub async fn admin_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<ApiResponse<PublicUser>>), AppError> {
    let session = services::admin_login(&state, payload).await?;
    Ok(with_session(&state, jar, session))
}

#[instrument(skip(state, jar, payload), fields(organization_id = %payload.organization_id))]
pub async fn organization_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<OrganizationLoginRequest>,
) -> Result<(CookieJar, Json<ApiResponse<PublicUser>>), AppError> {
    let credentials = LoginRequest {
        email: payload.email,
        password: payload.password,
    };
    let session =
        services::organization_login(&state, credentials, payload.organization_id).await?;
    Ok(with_session(&state, jar, session))
}

#[instrument(skip(state, jar))]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<ApiResponse<()>>) {
    (
        cookies::clear_sessions(&state.config, jar),
        Json(ApiResponse::message("Logged out")),
    )
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<PublicUser> {
    let user = services::current_user(&state, user_id).await?;
    Ok(Json(ApiResponse::data(user)))
}

#[instrument(skip(state, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> ApiResult<PublicUser> {
    let user = services::update_profile(&state, user_id, &payload.name).await?;
    Ok(Json(ApiResponse::data(user).with_message("Profile updated")))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> ApiResult<()> {
    services::change_password(
        &state,
        user_id,
        &payload.current_password,
        &payload.new_password,
    )
    .await?;
    Ok(Json(ApiResponse::message("Password changed")))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<EmailRequest>,
) -> ApiResult<()> {
    services::forgot_password(&state, &payload.email).await?;
    Ok(Json(ApiResponse::message(services::FORGOT_PASSWORD_SENT)))
}

#[instrument(skip(state, query, payload), fields(id = %query.id))]
pub async fn reset_password(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
    Json(payload): Json<ResetPasswordRequest>,
) -> ApiResult<()> {
    services::reset_password(&state, &query.token, &query.id, &payload.password).await?;
    Ok(Json(ApiResponse::message("Password has been reset")))
}

#[instrument(skip(state, query), fields(id = %query.id))]
pub async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> ApiResult<()> {
    services::verify_email(&state, &query.token, &query.id).await?;
    Ok(Json(ApiResponse::message("Email verified")))
}

#[instrument(skip(state, payload))]
pub async fn resend_verification(
    State(state): State<AppState>,
    Json(payload): Json<EmailRequest>,
) -> ApiResult<()> {
    services::resend_verification(&state, &payload.email).await?;
    Ok(Json(ApiResponse::message("Verification email sent")))
}

#[instrument(skip(state))]
pub async fn admin_me(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<PublicUser> {
    let user = services::current_user(&state, identity.user_id).await?;
    Ok(Json(ApiResponse::data(user)))
}

#[instrument(skip(state, session), fields(organization_id = %session.organization_id))]
pub async fn organization_me(
    State(state): State<AppState>,
    session: OrganizationSession,
) -> ApiResult<OrganizationSessionInfo> {
    let info =
        services::organization_session(&state, session.user_id, session.organization_id).await?;
    Ok(Json(ApiResponse::data(info)))
}
