use axum::{Json, extract::State, http::StatusCode};

use crate::{
    api::middleware::AuthUser,
    error::ApiResult,
    management::{AccountManager, PasswordResetManager},
    state::AppState,
    types::{
        ForgotPasswordRequest, LoginRequest, MessageResponse, RegisterRequest,
        ResetPasswordRequest, TokenResponse, UpdateUserRequest, UserResponse,
    },
};

/// POST /api/auth/register
#[tracing::instrument(skip(state, req))]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<TokenResponse>)> {
    let accounts = AccountManager::new(&state);
    let user = accounts.register(req).await?;
    Ok((StatusCode::CREATED, Json(accounts.issue_token(&user)?)))
}

/// POST /api/auth/login
#[tracing::instrument(skip(state, req))]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let accounts = AccountManager::new(&state);
    let user = accounts.authenticate(req).await?;
    Ok(Json(accounts.issue_token(&user)?))
}

/// POST /api/auth/refresh
#[tracing::instrument(skip(state, auth))]
pub async fn refresh(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<TokenResponse>> {
    let accounts = AccountManager::new(&state);
    let user = accounts.current_user(auth.user_id()?).await?;
    Ok(Json(accounts.issue_token(&user)?))
}

/// GET /api/auth/me
#[tracing::instrument(skip(state, auth))]
pub async fn me(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<UserResponse>> {
    let user = AccountManager::new(&state)
        .current_user(auth.user_id()?)
        .await?;
    Ok(Json(user.to_response()))
}

/// PATCH /api/auth/me
#[tracing::instrument(skip(state, auth, req))]
pub async fn update_me(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    let accounts = AccountManager::new(&state);
    let user = accounts.current_user(auth.user_id()?).await?;
    let user = accounts.update_profile(user.id, req).await?;
    Ok(Json(user.to_response()))
}

/// POST /api/auth/forgot-password
#[tracing::instrument(skip(state, req))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let email = req.email.clone();
    PasswordResetManager::new(&state).request_code(req).await?;
    Ok(Json(MessageResponse::new(format!(
        "Recovery code sent. Check {email} for the code"
    ))))
}

/// POST /api/auth/reset-password
#[tracing::instrument(skip(state, req))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    PasswordResetManager::new(&state).reset_password(req).await?;
    Ok(Json(MessageResponse::new(
        "Password updated. You can now sign in with your new password",
    )))
}
