use crate::{config::AppConfig, error, info, server, success, warning};

/// Starts the HTTP API server.
///
/// Reads the full [`AppConfig`] from the environment and hands it to
/// [`server::serve`], which blocks until Ctrl+C or SIGTERM.
///
/// # Arguments
///
/// * `addr` - Optional listen address overriding `SERVER_ADDRESS`
///
/// # Error Handling
///
/// Missing or invalid configuration and fatal server errors terminate the
/// process with a non-zero exit code.
///
/// # Example Usage
///
/// ```bash
/// anima serve
/// anima serve --addr 127.0.0.1:9000
/// ```
pub async fn serve(addr: Option<String>) {
    let mut config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => error!("Invalid configuration: {}", e),
    };
    if let Some(addr) = addr {
        config.server_addr = addr;
    }

    if !config.smtp.is_configured() {
        warning!("SMTP is not configured; password reset and contact mail are disabled");
    }

    info!("Starting Ánima API on {}", config.server_addr);
    if let Err(e) = server::serve(config).await {
        error!("Server failed: {:#}", e);
    }
    success!("Server shut down cleanly");
}
