use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use reqwest::Client;

use crate::{
    api,
    config::AppConfig,
    db,
    emotion::RekognitionDetector,
    mail::SmtpMailer,
    spotify::SpotifyClient,
    state::AppState,
};

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Wires the application together and serves HTTP until a shutdown signal.
///
/// Connects to PostgreSQL and applies pending migrations before the listener
/// is bound, so a broken database fails startup instead of the first request.
pub async fn serve(config: AppConfig) -> Result<()> {
    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config.database_url)
        .await
        .context("Failed to create database pool")?;

    tracing::info!("Running database migrations...");
    db::run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    let http = Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")?;
    let spotify = SpotifyClient::new(http, config.spotify.clone());
    let detector = RekognitionDetector::from_config(&config.aws).await;
    let mailer = SmtpMailer::new(&config.smtp).context("Failed to configure SMTP")?;

    let addr = config.server_addr.clone();
    let state = AppState::new(pool, config, spotify, Arc::new(detector), Arc::new(mailer));
    let app = api::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping...");
}
