use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::types::SavedPlaylistItem;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlaylistRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub analysis_id: Option<Uuid>,
    pub playlist_name: String,
    pub emotion: String,
    pub description: Option<String>,
    pub tracks: Value,
    pub music_params: Option<Value>,
    pub is_favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PlaylistRow> for SavedPlaylistItem {
    fn from(row: PlaylistRow) -> Self {
        Self {
            id: row.id,
            analysis_id: row.analysis_id,
            playlist_name: row.playlist_name,
            emotion: row.emotion,
            description: row.description,
            tracks: row.tracks,
            music_params: row.music_params,
            is_favorite: row.is_favorite,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewPlaylist<'a> {
    pub user_id: Uuid,
    pub analysis_id: Option<Uuid>,
    pub playlist_name: &'a str,
    pub emotion: &'a str,
    pub description: Option<&'a str>,
    pub tracks: Value,
    pub music_params: Option<Value>,
    pub is_favorite: bool,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct PlaylistChanges<'a> {
    pub playlist_name: Option<&'a str>,
    pub description: Option<&'a str>,
    pub is_favorite: Option<bool>,
}

const PLAYLIST_COLUMNS: &str = "id, user_id, analysis_id, playlist_name, emotion, description, \
     tracks, music_params, is_favorite, created_at, updated_at";

pub struct PlaylistRepo;

impl PlaylistRepo {
    pub async fn create(pool: &PgPool, playlist: NewPlaylist<'_>) -> Result<PlaylistRow> {
        let sql = format!(
            "INSERT INTO saved_playlists \
                (id, user_id, analysis_id, playlist_name, emotion, description, tracks, music_params, is_favorite) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {PLAYLIST_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PlaylistRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(playlist.user_id)
            .bind(playlist.analysis_id)
            .bind(playlist.playlist_name)
            .bind(playlist.emotion)
            .bind(playlist.description)
            .bind(playlist.tracks)
            .bind(playlist.music_params)
            .bind(playlist.is_favorite)
            .fetch_one(pool)
            .await
            .context("Failed to save playlist")?;
        Ok(row)
    }

    pub async fn get(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<Option<PlaylistRow>> {
        let sql =
            format!("SELECT {PLAYLIST_COLUMNS} FROM saved_playlists WHERE id = $1 AND user_id = $2");
        let row = sqlx::query_as::<_, PlaylistRow>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
            .context("Failed to get playlist")?;
        Ok(row)
    }

    pub async fn list(
        pool: &PgPool,
        user_id: Uuid,
        emotion: Option<&str>,
        is_favorite: Option<bool>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PlaylistRow>> {
        let sql = format!(
            "SELECT {PLAYLIST_COLUMNS} FROM saved_playlists \
             WHERE user_id = $1 \
               AND ($2::text IS NULL OR emotion = $2) \
               AND ($3::boolean IS NULL OR is_favorite = $3) \
             ORDER BY created_at DESC LIMIT $4 OFFSET $5"
        );
        let rows = sqlx::query_as::<_, PlaylistRow>(&sql)
            .bind(user_id)
            .bind(emotion)
            .bind(is_favorite)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
            .context("Failed to list playlists")?;
        Ok(rows)
    }

    pub async fn count(
        pool: &PgPool,
        user_id: Uuid,
        emotion: Option<&str>,
        is_favorite: Option<bool>,
    ) -> Result<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM saved_playlists \
             WHERE user_id = $1 \
               AND ($2::text IS NULL OR emotion = $2) \
               AND ($3::boolean IS NULL OR is_favorite = $3)",
        )
        .bind(user_id)
        .bind(emotion)
        .bind(is_favorite)
        .fetch_one(pool)
        .await
        .context("Failed to count playlists")?;
        Ok(total)
    }

    /// Returns `None` when no playlist with that id belongs to the user.
    pub async fn update(
        pool: &PgPool,
        user_id: Uuid,
        id: Uuid,
        changes: &PlaylistChanges<'_>,
    ) -> Result<Option<PlaylistRow>> {
        let sql = format!(
            "UPDATE saved_playlists SET \
                playlist_name = COALESCE($3, playlist_name), \
                description = COALESCE($4, description), \
                is_favorite = COALESCE($5, is_favorite), \
                updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 RETURNING {PLAYLIST_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PlaylistRow>(&sql)
            .bind(id)
            .bind(user_id)
            .bind(changes.playlist_name)
            .bind(changes.description)
            .bind(changes.is_favorite)
            .fetch_optional(pool)
            .await
            .context("Failed to update playlist")?;
        Ok(row)
    }

    pub async fn delete(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM saved_playlists WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await
            .context("Failed to delete playlist")?;
        Ok(result.rows_affected() > 0)
    }
}
