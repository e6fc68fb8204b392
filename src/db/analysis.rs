use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::types::AnalysisItem;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AnalysisRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub dominant_emotion: String,
    pub confidence: f64,
    pub emotion_details: Value,
    pub photo_metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub has_saved_playlist: bool,
}

impl From<AnalysisRow> for AnalysisItem {
    fn from(row: AnalysisRow) -> Self {
        Self {
            analysis_id: row.id,
            dominant_emotion: row.dominant_emotion,
            confidence: row.confidence,
            emotion_details: row.emotion_details,
            photo_metadata: row.photo_metadata,
            analyzed_at: row.created_at,
            has_saved_playlist: row.has_saved_playlist,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewAnalysis<'a> {
    pub user_id: Uuid,
    pub dominant_emotion: &'a str,
    pub confidence: f64,
    pub emotion_details: Value,
    pub photo_metadata: Option<Value>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EmotionCountRow {
    pub emotion: String,
    pub count: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DailyCountRow {
    pub day: NaiveDate,
    pub count: i64,
}

const ANALYSIS_SELECT: &str = "SELECT a.id, a.user_id, a.dominant_emotion, a.confidence, \
     a.emotion_details, a.photo_metadata, a.created_at, \
     EXISTS(SELECT 1 FROM saved_playlists p WHERE p.analysis_id = a.id) AS has_saved_playlist \
     FROM emotion_analyses a";

pub struct AnalysisRepo;

impl AnalysisRepo {
    pub async fn create(pool: &PgPool, analysis: NewAnalysis<'_>) -> Result<AnalysisRow> {
        let row = sqlx::query_as::<_, AnalysisRow>(
            "INSERT INTO emotion_analyses \
                (id, user_id, dominant_emotion, confidence, emotion_details, photo_metadata) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, user_id, dominant_emotion, confidence, emotion_details, \
                photo_metadata, created_at, FALSE AS has_saved_playlist",
        )
        .bind(Uuid::new_v4())
        .bind(analysis.user_id)
        .bind(analysis.dominant_emotion)
        .bind(analysis.confidence)
        .bind(analysis.emotion_details)
        .bind(analysis.photo_metadata)
        .fetch_one(pool)
        .await
        .context("Failed to save emotion analysis")?;
        Ok(row)
    }

    pub async fn get(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<Option<AnalysisRow>> {
        let sql = format!("{ANALYSIS_SELECT} WHERE a.id = $1 AND a.user_id = $2");
        let row = sqlx::query_as::<_, AnalysisRow>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
            .context("Failed to get emotion analysis")?;
        Ok(row)
    }

    pub async fn list(
        pool: &PgPool,
        user_id: Uuid,
        emotion: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AnalysisRow>> {
        let sql = format!(
            "{ANALYSIS_SELECT} WHERE a.user_id = $1 AND ($2::text IS NULL OR a.dominant_emotion = $2) \
             ORDER BY a.created_at DESC LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query_as::<_, AnalysisRow>(&sql)
            .bind(user_id)
            .bind(emotion)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
            .context("Failed to list emotion analyses")?;
        Ok(rows)
    }

    pub async fn count(pool: &PgPool, user_id: Uuid, emotion: Option<&str>) -> Result<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM emotion_analyses \
             WHERE user_id = $1 AND ($2::text IS NULL OR dominant_emotion = $2)",
        )
        .bind(user_id)
        .bind(emotion)
        .fetch_one(pool)
        .await
        .context("Failed to count emotion analyses")?;
        Ok(total)
    }

    /// Returns `false` when no analysis with that id belongs to the user.
    pub async fn delete(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM emotion_analyses WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await
            .context("Failed to delete emotion analysis")?;
        Ok(result.rows_affected() > 0)
    }

    /// Analyses per dominant emotion, most frequent first.
    pub async fn count_by_emotion(pool: &PgPool, user_id: Uuid) -> Result<Vec<EmotionCountRow>> {
        let rows = sqlx::query_as::<_, EmotionCountRow>(
            "SELECT dominant_emotion AS emotion, COUNT(*) AS count FROM emotion_analyses \
             WHERE user_id = $1 GROUP BY dominant_emotion ORDER BY count DESC, emotion ASC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
        .context("Failed to count analyses by emotion")?;
        Ok(rows)
    }

    /// Analyses per UTC day since `since`. Days without analyses are absent.
    pub async fn count_by_day(
        pool: &PgPool,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<DailyCountRow>> {
        let rows = sqlx::query_as::<_, DailyCountRow>(
            "SELECT (created_at AT TIME ZONE 'UTC')::date AS day, COUNT(*) AS count \
             FROM emotion_analyses WHERE user_id = $1 AND created_at >= $2 \
             GROUP BY day ORDER BY day ASC",
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(pool)
        .await
        .context("Failed to count analyses by day")?;
        Ok(rows)
    }
}
