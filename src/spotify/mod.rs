//! # Spotify Integration Module
//!
//! Client for the Spotify accounts service and Web API, plus the pure
//! heuristics that turn an emotion into a track selection.
//!
//! ## Architecture
//!
//! ```text
//! Management Layer (recommendations, account linking, user playlists)
//!          ↓
//! SpotifyClient
//!     ├── auth      (authorization URL, code exchange, refresh, profile)
//!     ├── catalog   (client-credentials search, playlists, top tracks, audio features)
//!     ├── playlist  (user playlists: list, create, add tracks, ownership)
//!     └── recommend (emotion profiles, feature filters, diversification)
//!          ↓
//! HTTP Layer (reqwest, JSON)
//! ```
//!
//! ## Token Handling
//!
//! Catalog calls use an application token obtained with the client
//! credentials grant and cached in memory until shortly before it expires.
//! User-scoped calls take the user's access token as an argument; keeping it
//! fresh is the job of [`crate::management::spotify_link`].
//!
//! ## Error Handling
//!
//! Every non-2xx response becomes [`SpotifyError::Api`] carrying the status
//! and the `error.message` Spotify returned. There is no retry: the first
//! failure is returned to the caller.
//!
//! ## Audio Features
//!
//! Spotify restricts `/audio-features` for newer applications and answers
//! 403. The first 403 switches feature filtering off for the remaining
//! lifetime of the client.

pub mod auth;
pub mod catalog;
pub mod playlist;
pub mod recommend;

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::{config::SpotifyConfig, error::ApiError};

#[derive(Debug, Error)]
pub enum SpotifyError {
    #[error("Spotify request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Spotify API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid Spotify configuration: {0}")]
    Config(String),
}

impl SpotifyError {
    pub fn status(&self) -> Option<u16> {
        match self {
            SpotifyError::Http(e) => e.status().map(|s| s.as_u16()),
            SpotifyError::Api { status, .. } => Some(*status),
            SpotifyError::Config(_) => None,
        }
    }

    pub fn is_forbidden(&self) -> bool {
        self.status() == Some(StatusCode::FORBIDDEN.as_u16())
    }
}

impl From<SpotifyError> for ApiError {
    fn from(e: SpotifyError) -> Self {
        ApiError::upstream(e.to_string())
    }
}

/// Application token from the client credentials grant.
#[derive(Debug, Clone)]
pub(crate) struct AppToken {
    pub access_token: String,
    pub expires_in: u64,
    pub obtained_at: u64,
}

impl AppToken {
    /// Expired, or expiring within four minutes.
    pub fn is_expired(&self) -> bool {
        let now = Utc::now().timestamp() as u64;
        now + 240 >= self.obtained_at + self.expires_in
    }
}

pub struct SpotifyClient {
    http: Client,
    config: SpotifyConfig,
    app_token: Mutex<Option<AppToken>>,
    features_available: AtomicBool,
}

impl SpotifyClient {
    pub fn new(http: Client, config: SpotifyConfig) -> Self {
        Self {
            http,
            config,
            app_token: Mutex::new(None),
            features_available: AtomicBool::new(true),
        }
    }

    pub fn config(&self) -> &SpotifyConfig {
        &self.config
    }

    pub fn features_available(&self) -> bool {
        self.features_available.load(Ordering::Relaxed)
    }

    pub(crate) fn disable_features(&self) {
        if self.features_available.swap(false, Ordering::Relaxed) {
            tracing::warn!("Spotify audio features returned 403; feature filtering disabled");
        }
    }

    pub(crate) fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url, path)
    }
}

/// Deserializes a successful response or converts the error payload.
pub(crate) async fn parse_response<T: DeserializeOwned>(res: Response) -> Result<T, SpotifyError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res.json::<T>().await?);
    }
    Err(api_error(status, res).await)
}

/// Like [`parse_response`] for endpoints whose body is irrelevant.
pub(crate) async fn ensure_success(res: Response) -> Result<(), SpotifyError> {
    let status = res.status();
    if status.is_success() {
        return Ok(());
    }
    Err(api_error(status, res).await)
}

async fn api_error(status: StatusCode, res: Response) -> SpotifyError {
    let body = res.text().await.unwrap_or_default();
    SpotifyError::Api {
        status: status.as_u16(),
        message: error_message(status, &body),
    }
}

/// Web API errors look like `{"error": {"status", "message"}}`, the accounts
/// service uses `{"error": "...", "error_description": "..."}`.
pub(crate) fn error_message(status: StatusCode, body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            v["error"]["message"]
                .as_str()
                .or_else(|| v["error_description"].as_str())
                .or_else(|| v["error"].as_str())
        })
        .map(str::to_string)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        })
}
