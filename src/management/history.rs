use chrono::{Duration, NaiveDate, Utc};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{
        AnalysisRepo, AnalysisRow, DailyCountRow, EmotionCountRow, NewAnalysis, NewPlaylist,
        PlaylistChanges, PlaylistRepo,
    },
    error::{ApiError, ApiResult},
    state::AppState,
    types::{
        AnalysisItem, DailyCount, Emotion, EmotionCount, EmotionResult, HistoryStats, Page,
        SavePlaylistRequest, SavedPlaylistItem, UpdatePlaylistRequest,
    },
    utils,
};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Days covered by the daily activity series in [`HistoryStats`].
pub const ACTIVITY_DAYS: i64 = 7;

const RECENT_ACTIVITY: i64 = 5;

/// Validated page request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    /// `page` starts at 1; `page_size` must be in `1..=100`.
    pub fn new(page: Option<u32>, page_size: Option<u32>) -> ApiResult<Self> {
        let page = page.unwrap_or(1);
        let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page < 1 {
            return Err(ApiError::bad_request("page: must be at least 1"));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(ApiError::bad_request("page_size: must be between 1 and 100"));
        }
        Ok(Self { page, page_size })
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.page_size)
    }

    pub fn wrap<T>(&self, total: i64, items: Vec<T>) -> Page<T> {
        Page {
            total,
            page: self.page,
            page_size: self.page_size,
            total_pages: utils::total_pages(total, self.page_size),
            items,
        }
    }
}

/// Sums analyses into positive and negative emotion buckets. Labels that
/// are not known emotions count toward neither.
pub fn split_by_polarity(counts: &[EmotionCountRow]) -> (i64, i64) {
    counts.iter().fold((0, 0), |(pos, neg), row| {
        match row.emotion.parse::<Emotion>() {
            Ok(e) if e.is_positive() => (pos + row.count, neg),
            Ok(_) => (pos, neg + row.count),
            Err(_) => (pos, neg),
        }
    })
}

/// One entry per day from `today - days + 1` to `today`, zero-filled.
pub fn daily_series(rows: &[DailyCountRow], today: NaiveDate, days: i64) -> Vec<DailyCount> {
    (0..days)
        .rev()
        .map(|back| {
            let date = today - Duration::days(back);
            let count = rows
                .iter()
                .find(|r| r.day == date)
                .map(|r| r.count)
                .unwrap_or(0);
            DailyCount { date, count }
        })
        .collect()
}

/// Emotion analyses and saved playlists of one user.
pub struct HistoryManager<'a> {
    state: &'a AppState,
}

impl<'a> HistoryManager<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    pub async fn record_analysis(
        &self,
        user_id: Uuid,
        result: &EmotionResult,
        photo_metadata: Option<Value>,
    ) -> ApiResult<AnalysisRow> {
        let details = serde_json::json!({
            "faces_detected": result.faces_detected,
            "all_emotions": result.all_emotions,
            "face_details": result.face_details,
        });
        let row = AnalysisRepo::create(
            &self.state.pool,
            NewAnalysis {
                user_id,
                dominant_emotion: &result.dominant_emotion.label,
                confidence: result.dominant_emotion.confidence,
                emotion_details: details,
                photo_metadata,
            },
        )
        .await?;
        Ok(row)
    }

    pub async fn list_analyses(
        &self,
        user_id: Uuid,
        page: PageRequest,
        emotion: Option<Emotion>,
    ) -> ApiResult<Page<AnalysisItem>> {
        let pool = &self.state.pool;
        let emotion = emotion.map(|e| e.as_str());
        let total = AnalysisRepo::count(pool, user_id, emotion).await?;
        let rows = AnalysisRepo::list(pool, user_id, emotion, page.limit(), page.offset()).await?;
        Ok(page.wrap(total, rows.into_iter().map(AnalysisItem::from).collect()))
    }

    pub async fn get_analysis(&self, user_id: Uuid, id: Uuid) -> ApiResult<AnalysisItem> {
        AnalysisRepo::get(&self.state.pool, user_id, id)
            .await?
            .map(AnalysisItem::from)
            .ok_or_else(|| ApiError::not_found("Analysis not found"))
    }

    pub async fn delete_analysis(&self, user_id: Uuid, id: Uuid) -> ApiResult<()> {
        if !AnalysisRepo::delete(&self.state.pool, user_id, id).await? {
            return Err(ApiError::not_found("Analysis not found"));
        }
        Ok(())
    }

    /// Stores a generated playlist. A referenced analysis must belong to the
    /// same user.
    pub async fn save_playlist(
        &self,
        user_id: Uuid,
        req: SavePlaylistRequest,
    ) -> ApiResult<SavedPlaylistItem> {
        req.validate()?;
        let pool = &self.state.pool;

        if let Some(analysis_id) = req.analysis_id {
            if AnalysisRepo::get(pool, user_id, analysis_id).await?.is_none() {
                return Err(ApiError::not_found("Analysis not found"));
            }
        }

        let row = PlaylistRepo::create(
            pool,
            NewPlaylist {
                user_id,
                analysis_id: req.analysis_id,
                playlist_name: req.playlist_name.trim(),
                emotion: req.emotion.as_str(),
                description: req.description.as_deref(),
                tracks: Value::Array(req.tracks),
                music_params: req.music_params,
                is_favorite: req.is_favorite,
            },
        )
        .await?;
        Ok(row.into())
    }

    pub async fn list_playlists(
        &self,
        user_id: Uuid,
        page: PageRequest,
        emotion: Option<Emotion>,
        is_favorite: Option<bool>,
    ) -> ApiResult<Page<SavedPlaylistItem>> {
        let pool = &self.state.pool;
        let emotion = emotion.map(|e| e.as_str());
        let total = PlaylistRepo::count(pool, user_id, emotion, is_favorite).await?;
        let rows = PlaylistRepo::list(
            pool,
            user_id,
            emotion,
            is_favorite,
            page.limit(),
            page.offset(),
        )
        .await?;
        Ok(page.wrap(total, rows.into_iter().map(SavedPlaylistItem::from).collect()))
    }

    pub async fn get_playlist(&self, user_id: Uuid, id: Uuid) -> ApiResult<SavedPlaylistItem> {
        PlaylistRepo::get(&self.state.pool, user_id, id)
            .await?
            .map(SavedPlaylistItem::from)
            .ok_or_else(|| ApiError::not_found("Playlist not found"))
    }

    pub async fn update_playlist(
        &self,
        user_id: Uuid,
        id: Uuid,
        req: UpdatePlaylistRequest,
    ) -> ApiResult<SavedPlaylistItem> {
        req.validate()?;
        let changes = PlaylistChanges {
            playlist_name: req.playlist_name.as_deref().map(str::trim),
            description: req.description.as_deref(),
            is_favorite: req.is_favorite,
        };
        PlaylistRepo::update(&self.state.pool, user_id, id, &changes)
            .await?
            .map(SavedPlaylistItem::from)
            .ok_or_else(|| ApiError::not_found("Playlist not found"))
    }

    pub async fn delete_playlist(&self, user_id: Uuid, id: Uuid) -> ApiResult<()> {
        if !PlaylistRepo::delete(&self.state.pool, user_id, id).await? {
            return Err(ApiError::not_found("Playlist not found"));
        }
        Ok(())
    }

    pub async fn stats(&self, user_id: Uuid) -> ApiResult<HistoryStats> {
        let pool = &self.state.pool;
        let now = Utc::now();
        let today = now.date_naive();
        let since = (today - Duration::days(ACTIVITY_DAYS - 1))
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or(now);

        let total_analyses = AnalysisRepo::count(pool, user_id, None).await?;
        let total_saved_playlists = PlaylistRepo::count(pool, user_id, None, None).await?;
        let favorite_playlists_count = PlaylistRepo::count(pool, user_id, None, Some(true)).await?;
        let by_emotion = AnalysisRepo::count_by_emotion(pool, user_id).await?;
        let recent = AnalysisRepo::list(pool, user_id, None, RECENT_ACTIVITY, 0).await?;
        let by_day = AnalysisRepo::count_by_day(pool, user_id, since).await?;

        let (positive_count, negative_count) = split_by_polarity(&by_emotion);

        Ok(HistoryStats {
            total_analyses,
            total_saved_playlists,
            favorite_playlists_count,
            most_common_emotion: by_emotion.first().map(|r| r.emotion.clone()),
            emotions_breakdown: by_emotion
                .into_iter()
                .map(|r| EmotionCount {
                    emotion: r.emotion,
                    count: r.count,
                })
                .collect(),
            recent_activity: recent.into_iter().map(AnalysisItem::from).collect(),
            positive_count,
            negative_count,
            daily_analyses: daily_series(&by_day, today, ACTIVITY_DAYS),
        })
    }
}
