//! Ánima API Library
//!
//! Backend for a mood-based music recommendation service. Users sign in with
//! local credentials or Spotify, upload a photo whose facial emotion is
//! detected through AWS Rekognition, and receive Spotify tracks chosen to match
//! that emotion. Analyses and generated playlists are kept as history.
//!
//! # Modules
//!
//! - `api` - Axum handlers, the bearer-token extractor and the router
//! - `cli` - Command-line entry points (`serve`, `migrate`, `check-db`)
//! - `config` - Environment loading into a typed [`config::AppConfig`]
//! - `db` - PostgreSQL pool, migrations and repositories
//! - `emotion` - Image validation and facial emotion detection
//! - `error` - [`error::ApiError`] and its HTTP mapping
//! - `mail` - SMTP delivery for reset codes and the contact form
//! - `management` - Account, password reset, Spotify linkage and history workflows
//! - `security` - Password hashing and JWT handling
//! - `server` - Listener setup and graceful shutdown
//! - `spotify` - Spotify Web API clients and recommendation heuristics
//! - `state` - Shared [`state::AppState`]
//! - `types` - Request, response and Spotify wire types
//! - `utils` - Small helpers (OAuth state, reset codes, usernames, paging)

pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod emotion;
pub mod error;
pub mod mail;
pub mod management;
pub mod security;
pub mod server;
pub mod spotify;
pub mod state;
pub mod types;
pub mod utils;

/// Prints an informational message with a blue bullet point.
///
/// Creates a formatted output line with a distinctive blue "o" indicator
/// followed by the provided message. Used for general information and
/// status updates throughout the application.
///
/// # Arguments
///
/// The macro accepts the same arguments as `println!`, supporting format
/// strings and interpolation.
///
/// # Example
///
/// ```
/// info!("Running database migrations...");
/// info!("Listening on {}", addr);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
///
/// Creates a formatted output line with a green "✓" indicator to signify
/// successful completion of operations. Used to provide positive feedback
/// when operations complete successfully.
///
/// # Arguments
///
/// The macro accepts the same arguments as `println!`, supporting format
/// strings and interpolation.
///
/// # Example
///
/// ```
/// success!("Database is reachable");
/// success!("Applied migrations");
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Creates a formatted error output with a red "!" indicator and immediately
/// terminates the program with exit code 1. Used for unrecoverable errors
/// that require immediate program termination.
///
/// # Arguments
///
/// The macro accepts the same arguments as `println!`, supporting format
/// strings and interpolation.
///
/// # Behavior
///
/// This macro will cause the program to exit immediately after printing
/// the error message. It should only be used for fatal errors where
/// recovery is not possible.
///
/// # Example
///
/// ```
/// error!("Failed to load configuration");
/// error!("Missing required environment variable: {}", var_name);
/// // Program exits here - code after this will not execute
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// Creates a formatted output line with a yellow "!" indicator to highlight
/// potential issues or important notices that don't require program termination.
/// Used for recoverable issues or important information that users should notice.
///
/// # Arguments
///
/// The macro accepts the same arguments as `println!`, supporting format
/// strings and interpolation.
///
/// # Example
///
/// ```
/// warning!("No .env file found, using process environment");
/// warning!("SMTP is not configured; mail delivery will fail");
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
