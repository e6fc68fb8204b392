//! # API Module
//!
//! HTTP layer of the Ánima backend. Handlers stay thin: they extract and
//! validate input, call into [`crate::management`] and serialize the result.
//! Errors are returned as [`crate::error::ApiError`], which renders the
//! `{"detail": ...}` body together with the matching status code.
//!
//! ## Endpoints
//!
//! ### Health
//!
//! - `GET /`, `GET /health` - service name and version
//! - `GET /health/db` - database reachability, `503` when the ping fails
//!
//! ### Authentication
//!
//! - `/api/auth/*` - local register/login, token refresh, profile, password reset
//! - `/api/auth/spotify/*` - Spotify sign-in, account linking and disconnect
//!
//! ### Emotion and Music
//!
//! - `POST /api/emotion/analyze` - multipart photo upload, stored in history
//! - `GET /api/music/emotions` - supported emotions and their music profiles
//! - `GET /api/music/recommendations/{emotion}` - Spotify tracks for an emotion
//!
//! ### History and Playlists
//!
//! - `/api/history/*` - stored analyses, saved playlists and statistics
//! - `/api/spotify/playlists` - playlists on the user's Spotify account
//!
//! ### Contact
//!
//! - `POST /api/contact/send` - forwards the contact form to the support inbox
//!
//! Routes marked as authenticated use the [`middleware::AuthUser`] extractor,
//! which rejects requests without a valid `Authorization: Bearer` token.

mod auth;
mod contact;
mod emotion;
mod health;
mod history;
pub mod middleware;
mod music;
mod spotify;
mod spotify_auth;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::state::AppState;

pub use health::SERVICE_NAME;
pub use spotify_auth::frontend_redirect;

/// Slack on top of the image limit for multipart boundaries and headers.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Builds the complete application router.
///
/// # Example
///
/// ```rust,ignore
/// let app = api::build_router(state);
/// axum::serve(listener, app).await?;
/// ```
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let upload_limit = state.config.max_image_mb * 1024 * 1024 + MULTIPART_OVERHEAD;

    let api = Router::new()
        .nest("/auth", auth_routes())
        .nest(
            "/emotion",
            Router::new().route(
                "/analyze",
                post(emotion::analyze).layer(DefaultBodyLimit::max(upload_limit)),
            ),
        )
        .nest("/music", music_routes())
        .nest("/history", history_routes())
        .nest("/spotify", spotify_routes())
        .nest("/contact", contact_routes());

    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/health/db", get(health::health_db))
        .nest("/api", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/me", get(auth::me).patch(auth::update_me))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
        .route("/spotify/login", get(spotify_auth::login))
        .route("/spotify/callback", get(spotify_auth::callback))
        .route("/spotify/exchange", post(spotify_auth::exchange))
        .route("/spotify/link", get(spotify_auth::link))
        .route("/spotify/link/callback", post(spotify_auth::link_callback))
        .route("/spotify/disconnect", post(spotify_auth::disconnect))
}

fn music_routes() -> Router<AppState> {
    Router::new()
        .route("/emotions", get(music::emotions))
        .route("/recommendations/{emotion}", get(music::recommendations))
}

fn history_routes() -> Router<AppState> {
    Router::new()
        .route("/analyses", get(history::list_analyses))
        .route(
            "/analyses/{id}",
            get(history::get_analysis).delete(history::delete_analysis),
        )
        .route(
            "/playlists",
            get(history::list_playlists).post(history::save_playlist),
        )
        .route(
            "/playlists/{id}",
            get(history::get_playlist)
                .patch(history::update_playlist)
                .delete(history::delete_playlist),
        )
        .route("/stats", get(history::stats))
}

fn spotify_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/playlists",
            get(spotify::list_playlists).post(spotify::create_playlist),
        )
        .route("/playlists/{id}/owned", get(spotify::playlist_owned))
}

fn contact_routes() -> Router<AppState> {
    Router::new()
        .route("/send", post(contact::send))
        .route("/health", get(contact::health))
}
