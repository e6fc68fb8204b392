use sqlx::PgPool;

use crate::{config, db, error, info, success};

async fn connect() -> PgPool {
    let url = match config::database_url() {
        Ok(url) => url,
        Err(e) => error!("Database is not configured: {}", e),
    };

    match db::create_pool(&url).await {
        Ok(pool) => pool,
        Err(e) => error!("Cannot connect to database: {:#}", e),
    }
}

/// Applies all pending SQL migrations and exits.
///
/// Useful in deployment pipelines where migrations run as a separate step
/// before new server instances start.
pub async fn migrate() {
    let pool = connect().await;

    info!("Running database migrations...");
    if let Err(e) = db::run_migrations(&pool).await {
        error!("Migration failed: {:#}", e);
    }
    success!("Database schema is up to date");
}

/// Verifies that the database is reachable.
pub async fn check_db() {
    let pool = connect().await;

    match db::ping(&pool).await {
        Ok(()) => success!("Database is reachable"),
        Err(e) => error!("Database check failed: {:#}", e),
    }
}
