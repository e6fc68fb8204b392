use axum::{
    Json,
    extract::{Query, State},
    response::Redirect,
};
use reqwest::Url;
use serde::Deserialize;

use crate::{
    api::middleware::AuthUser,
    error::{ApiError, ApiResult},
    management::{AccountManager, SpotifyLinkManager},
    state::AppState,
    types::{AuthorizationUrl, CodeExchangeRequest, TokenResponse, UserResponse},
    utils,
};

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LinkParams {
    pub code: String,
    pub state: Option<String>,
}

/// Frontend URL with query parameters appended.
pub fn frontend_redirect(frontend_url: &str, path: &str, params: &[(&str, &str)]) -> String {
    let base = format!("{frontend_url}{path}");
    match Url::parse_with_params(&base, params) {
        Ok(url) => url.to_string(),
        Err(_) => base,
    }
}

/// GET /api/auth/spotify/login
pub async fn login(State(state): State<AppState>) -> ApiResult<Json<AuthorizationUrl>> {
    let csrf = utils::generate_state(state.jwt_secret());
    Ok(Json(AuthorizationUrl {
        authorization_url: state.spotify.authorization_url(&csrf)?,
        state: csrf,
    }))
}

/// GET /api/auth/spotify/callback
///
/// Sign-in completes here and redirects to the frontend with a token. For
/// the linking flow the code is forwarded to the profile page, which then
/// calls the authenticated link endpoint.
#[tracing::instrument(skip(state, params))]
pub async fn callback(State(state): State<AppState>, Query(params): Query<CallbackParams>) -> Redirect {
    let frontend = state.config.frontend_url.as_str();
    let login_error = |code: &str| Redirect::to(&frontend_redirect(frontend, "/login", &[("error", code)]));

    if let Some(error) = params.error.as_deref() {
        tracing::warn!("Spotify authorization failed: {}", error);
        return login_error(error);
    }
    let Some(code) = params.code.as_deref() else {
        return login_error("access_denied");
    };
    let csrf = params.state.as_deref().unwrap_or_default();
    if !utils::verify_state(csrf, state.jwt_secret()) {
        tracing::warn!("Spotify callback with invalid state");
        return login_error("invalid_state");
    }

    if utils::is_link_state(csrf) {
        return Redirect::to(&frontend_redirect(
            frontend,
            "/profile",
            &[("code", code), ("state", csrf)],
        ));
    }

    let user = match SpotifyLinkManager::new(&state).sign_in(code).await {
        Ok(user) => user,
        Err(e) => {
            tracing::error!("Spotify sign-in failed: {}", e);
            return login_error("spotify_auth_failed");
        }
    };

    match AccountManager::new(&state).issue_token(&user) {
        Ok(token) => Redirect::to(&frontend_redirect(
            frontend,
            "/auth/callback",
            &[("token", token.access_token.as_str())],
        )),
        Err(e) => {
            tracing::error!("Failed to issue token after Spotify sign-in: {}", e);
            login_error("token_error")
        }
    }
}

/// POST /api/auth/spotify/exchange
#[tracing::instrument(skip(state, req))]
pub async fn exchange(
    State(state): State<AppState>,
    Json(req): Json<CodeExchangeRequest>,
) -> ApiResult<Json<TokenResponse>> {
    if req.code.trim().is_empty() {
        return Err(ApiError::bad_request("code: is required"));
    }
    let user = SpotifyLinkManager::new(&state).sign_in(req.code.trim()).await?;
    Ok(Json(AccountManager::new(&state).issue_token(&user)?))
}

/// GET /api/auth/spotify/link
pub async fn link(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> ApiResult<Json<AuthorizationUrl>> {
    let csrf = utils::generate_link_state(state.jwt_secret());
    Ok(Json(AuthorizationUrl {
        authorization_url: state.spotify.authorization_url(&csrf)?,
        state: csrf,
    }))
}

/// POST /api/auth/spotify/link/callback
#[tracing::instrument(skip(state, auth, params))]
pub async fn link_callback(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<LinkParams>,
) -> ApiResult<Json<UserResponse>> {
    if let Some(csrf) = params.state.as_deref() {
        if !utils::verify_state(csrf, state.jwt_secret()) {
            return Err(ApiError::bad_request("Invalid OAuth state"));
        }
    }
    let user = AccountManager::new(&state)
        .current_user(auth.user_id()?)
        .await?;
    let user = SpotifyLinkManager::new(&state).link(user.id, &params.code).await?;
    Ok(Json(user.to_response()))
}

/// POST /api/auth/spotify/disconnect
#[tracing::instrument(skip(state, auth))]
pub async fn disconnect(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<UserResponse>> {
    let user = AccountManager::new(&state)
        .current_user(auth.user_id()?)
        .await?;
    let user = SpotifyLinkManager::new(&state).disconnect(&user).await?;
    Ok(Json(user.to_response()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frontend_redirect_encodes_params() {
        let url = frontend_redirect("http://localhost:5173", "/login", &[("error", "access denied")]);
        assert_eq!(url, "http://localhost:5173/login?error=access+denied");
    }

    #[test]
    fn test_frontend_redirect_keeps_link_state() {
        let url = frontend_redirect(
            "https://anima.app",
            "/profile",
            &[("code", "abc"), ("state", "link:n.s")],
        );
        assert!(url.starts_with("https://anima.app/profile?code=abc&state=link"));
    }
}
