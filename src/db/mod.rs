//! PostgreSQL persistence.
//!
//! One repository per table. Repositories are unit structs with async
//! associated functions; read paths take the pool, write paths that take part
//! in multi-statement workflows accept any [`sqlx::PgExecutor`] so they can
//! run on a transaction.

mod analysis;
mod playlist;
mod reset_code;
mod user;

pub use analysis::{AnalysisRepo, AnalysisRow, DailyCountRow, EmotionCountRow, NewAnalysis};
pub use playlist::{NewPlaylist, PlaylistChanges, PlaylistRepo, PlaylistRow};
pub use reset_code::{RESET_CODE_TTL_MINUTES, ResetCodeRepo, ResetCodeRow};
pub use user::{NewUser, ProfileChanges, SpotifyLink, UserRepo, UserRow};

use anyhow::{Context, Result};
use sqlx::{PgPool, postgres::PgPoolOptions};

/// Create a PostgreSQL connection pool
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("Failed to connect to database")?;
    Ok(pool)
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("Failed to run migrations")?;
    Ok(())
}

/// Name of the unique constraint a failed write ran into, if that is why it
/// failed. Works through `.context(...)` layers.
pub fn unique_violation(err: &anyhow::Error) -> Option<&str> {
    let db_err = err.downcast_ref::<sqlx::Error>()?.as_database_error()?;
    db_err
        .is_unique_violation()
        .then(|| db_err.constraint().unwrap_or_default())
}

/// Round-trips a trivial query.
pub async fn ping(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .context("Database ping failed")?;
    Ok(())
}
