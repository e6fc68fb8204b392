use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    error::{ApiError, ApiResult},
    management::RecommendationManager,
    spotify::recommend,
    state::AppState,
    types::{Emotion, RecommendationResponse, UnknownEmotion},
};

pub const DEFAULT_LIMIT: usize = 20;

#[derive(Debug, Deserialize)]
pub struct RecommendationParams {
    pub limit: Option<usize>,
}

/// GET /api/music/emotions
pub async fn emotions() -> Json<Value> {
    let items: Vec<Value> = Emotion::ALL
        .into_iter()
        .map(|e| {
            let profile = recommend::profile(e);
            json!({
                "emotion": e,
                "genres": profile.genres,
                "music_params": profile.params,
                "description": profile.description,
                "positive": e.is_positive(),
            })
        })
        .collect();

    Json(json!({
        "total": items.len(),
        "emotions": items,
    }))
}

/// GET /api/music/recommendations/{emotion}
#[tracing::instrument(skip(state))]
pub async fn recommendations(
    State(state): State<AppState>,
    Path(emotion): Path<String>,
    Query(params): Query<RecommendationParams>,
) -> ApiResult<Json<RecommendationResponse>> {
    let emotion: Emotion = emotion
        .parse()
        .map_err(|e: UnknownEmotion| ApiError::bad_request(e.to_string()))?;
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);

    let response = RecommendationManager::new(&state.spotify)
        .recommend(emotion, limit)
        .await?;
    Ok(Json(response))
}
