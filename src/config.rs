//! Configuration management for the Ánima API.
//!
//! This module handles loading configuration values from environment variables
//! and `.env` files into a typed [`AppConfig`]. It covers the HTTP listener,
//! the database, JWT signing, the Spotify application credentials, AWS, and
//! SMTP delivery.
//!
//! The configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the working directory
//! 3. `.env` file in the local data directory
//! 4. Application defaults (where applicable)

use std::{env, path::PathBuf, str::FromStr};

use thiserror::Error;

/// Default Spotify accounts authorize endpoint.
pub const SPOTIFY_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
/// Default Spotify accounts token endpoint.
pub const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
/// Default Spotify Web API base URL.
pub const SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";
/// Scopes requested when a user connects their Spotify account.
pub const SPOTIFY_SCOPE: &str = "user-read-email user-read-private playlist-modify-public playlist-modify-private playlist-read-private";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },

    #[error("failed to prepare config directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse .env file: {0}")]
    Dotenv(#[from] dotenv::Error),
}

/// Loads environment variables from `.env` files.
///
/// A `.env` in the current working directory is tried first. When none exists
/// the platform-specific local data directory is used instead, creating the
/// directory if needed:
/// - Linux: `~/.local/share/anima/.env`
/// - macOS: `~/Library/Application Support/anima/.env`
/// - Windows: `%LOCALAPPDATA%/anima/.env`
///
/// Variables already present in the process environment are never
/// overwritten. A missing file is not an error; a malformed one is.
///
/// # Example
///
/// ```
/// use anima::config;
///
/// #[tokio::main]
/// async fn main() {
///     if let Err(e) = config::load_env().await {
///         eprintln!("Configuration error: {}", e);
///     }
/// }
/// ```
pub async fn load_env() -> Result<(), ConfigError> {
    let local = PathBuf::from(".env");
    if local.is_file() {
        dotenv::from_path(&local)?;
        return Ok(());
    }

    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("anima/.env");
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    if path.is_file() {
        dotenv::from_path(&path)?;
    }
    Ok(())
}

/// Complete runtime configuration of the API server.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_addr: String,
    pub database_url: String,
    pub frontend_url: String,
    pub max_image_mb: usize,
    pub jwt: JwtConfig,
    pub spotify: SpotifyConfig,
    pub aws: AwsConfig,
    pub smtp: SmtpConfig,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expire_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scope: String,
    pub auth_url: String,
    pub token_url: String,
    pub api_url: String,
    pub market: String,
}

#[derive(Debug, Clone)]
pub struct AwsConfig {
    pub region: String,
}

/// SMTP delivery settings.
///
/// Credentials are optional so that the server can start without mail
/// delivery; [`SmtpConfig::is_configured`] reports whether sending can work.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub sender: Option<String>,
    pub support_email: Option<String>,
}

impl SmtpConfig {
    pub fn is_configured(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// Address used in the `From` header, falling back to the SMTP login.
    pub fn sender_address(&self) -> Option<&str> {
        self.sender.as_deref().or(self.username.as_deref())
    }

    /// Inbox receiving contact form messages, falling back to the sender.
    pub fn support_address(&self) -> Option<&str> {
        self.support_email.as_deref().or(self.sender_address())
    }
}

impl AppConfig {
    /// Builds the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when a required variable
    /// (`SECRET_KEY`, `SPOTIFY_CLIENT_ID`, `SPOTIFY_CLIENT_SECRET`, and the
    /// database settings) is absent, and [`ConfigError::Invalid`] when a
    /// numeric value cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            server_addr: server_addr(),
            database_url: database_url()?,
            frontend_url: or_default("FRONTEND_URL", "http://localhost:5173")
                .trim_end_matches('/')
                .to_string(),
            max_image_mb: parsed("MAX_IMAGE_MB", 5)?,
            jwt: JwtConfig {
                secret: required("SECRET_KEY")?,
                expire_minutes: parsed("ACCESS_TOKEN_EXPIRE_MINUTES", 1440)?,
            },
            spotify: SpotifyConfig {
                client_id: required("SPOTIFY_CLIENT_ID")?,
                client_secret: required("SPOTIFY_CLIENT_SECRET")?,
                redirect_uri: or_default(
                    "SPOTIFY_REDIRECT_URI",
                    "http://localhost:8000/api/auth/spotify/callback",
                ),
                scope: or_default("SPOTIFY_API_AUTH_SCOPE", SPOTIFY_SCOPE),
                auth_url: or_default("SPOTIFY_API_AUTH_URL", SPOTIFY_AUTH_URL),
                token_url: or_default("SPOTIFY_API_TOKEN_URL", SPOTIFY_TOKEN_URL),
                api_url: or_default("SPOTIFY_API_URL", SPOTIFY_API_URL)
                    .trim_end_matches('/')
                    .to_string(),
                market: or_default("SPOTIFY_MARKET", "US"),
            },
            aws: AwsConfig {
                region: or_default("AWS_REGION", "us-east-1"),
            },
            smtp: SmtpConfig {
                host: or_default("SMTP_HOST", "smtp.gmail.com"),
                port: parsed("SMTP_PORT", 587)?,
                username: optional("SMTP_USERNAME"),
                password: optional("SMTP_PASSWORD"),
                sender: optional("SMTP_SENDER"),
                support_email: optional("SUPPORT_EMAIL"),
            },
        })
    }
}

/// Returns the address the HTTP server binds to.
///
/// Reads `SERVER_ADDRESS`, defaulting to `0.0.0.0:8000`.
pub fn server_addr() -> String {
    or_default("SERVER_ADDRESS", "0.0.0.0:8000")
}

/// Returns the PostgreSQL connection URL.
///
/// `DATABASE_URL` is used as-is when present. Otherwise the URL is assembled
/// from `DB_HOST`, `DB_PORT`, `DB_USER`, `DB_PASSWORD` and `DB_NAME`, of which
/// host, user and name are required.
///
/// # Example
///
/// ```
/// // DB_HOST=db DB_USER=anima DB_PASSWORD=pw DB_NAME=anima
/// let url = database_url()?; // "postgres://anima:pw@db:5432/anima"
/// ```
pub fn database_url() -> Result<String, ConfigError> {
    if let Some(url) = optional("DATABASE_URL") {
        return Ok(url);
    }

    let host = required("DB_HOST")?;
    let port = or_default("DB_PORT", "5432");
    let user = required("DB_USER")?;
    let password = optional("DB_PASSWORD").unwrap_or_default();
    let name = required("DB_NAME")?;
    Ok(format!("postgres://{user}:{password}@{host}:{port}/{name}"))
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    optional(key).ok_or(ConfigError::Missing(key))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn or_default(key: &str, default: &str) -> String {
    optional(key).unwrap_or_else(|| default.to_string())
}

fn parsed<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}
