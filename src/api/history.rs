use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    api::middleware::AuthUser,
    error::{ApiError, ApiResult},
    management::{HistoryManager, PageRequest},
    state::AppState,
    types::{
        AnalysisItem, Emotion, HistoryStats, MessageResponse, Page, SavePlaylistRequest,
        SavedPlaylistItem, UpdatePlaylistRequest,
    },
};

#[derive(Debug, Deserialize)]
pub struct AnalysisFilter {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub emotion: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistFilter {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub emotion: Option<String>,
    pub is_favorite: Option<bool>,
}

fn parse_emotion(raw: Option<&str>) -> ApiResult<Option<Emotion>> {
    raw.filter(|s| !s.trim().is_empty())
        .map(|s| s.parse::<Emotion>().map_err(|e| ApiError::bad_request(e.to_string())))
        .transpose()
}

/// GET /api/history/analyses
#[tracing::instrument(skip(state, auth))]
pub async fn list_analyses(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(filter): Query<AnalysisFilter>,
) -> ApiResult<Json<Page<AnalysisItem>>> {
    let page = PageRequest::new(filter.page, filter.page_size)?;
    let emotion = parse_emotion(filter.emotion.as_deref())?;
    let items = HistoryManager::new(&state)
        .list_analyses(auth.user_id()?, page, emotion)
        .await?;
    Ok(Json(items))
}

/// GET /api/history/analyses/{id}
#[tracing::instrument(skip(state, auth))]
pub async fn get_analysis(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AnalysisItem>> {
    let item = HistoryManager::new(&state)
        .get_analysis(auth.user_id()?, id)
        .await?;
    Ok(Json(item))
}

/// DELETE /api/history/analyses/{id}
#[tracing::instrument(skip(state, auth))]
pub async fn delete_analysis(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    HistoryManager::new(&state)
        .delete_analysis(auth.user_id()?, id)
        .await?;
    Ok(Json(MessageResponse::new("Analysis deleted")))
}

/// POST /api/history/playlists
#[tracing::instrument(skip(state, auth, req))]
pub async fn save_playlist(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<SavePlaylistRequest>,
) -> ApiResult<(StatusCode, Json<SavedPlaylistItem>)> {
    let item = HistoryManager::new(&state)
        .save_playlist(auth.user_id()?, req)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// GET /api/history/playlists
#[tracing::instrument(skip(state, auth))]
pub async fn list_playlists(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(filter): Query<PlaylistFilter>,
) -> ApiResult<Json<Page<SavedPlaylistItem>>> {
    let page = PageRequest::new(filter.page, filter.page_size)?;
    let emotion = parse_emotion(filter.emotion.as_deref())?;
    let items = HistoryManager::new(&state)
        .list_playlists(auth.user_id()?, page, emotion, filter.is_favorite)
        .await?;
    Ok(Json(items))
}

/// GET /api/history/playlists/{id}
#[tracing::instrument(skip(state, auth))]
pub async fn get_playlist(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SavedPlaylistItem>> {
    let item = HistoryManager::new(&state)
        .get_playlist(auth.user_id()?, id)
        .await?;
    Ok(Json(item))
}

/// PATCH /api/history/playlists/{id}
#[tracing::instrument(skip(state, auth, req))]
pub async fn update_playlist(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePlaylistRequest>,
) -> ApiResult<Json<SavedPlaylistItem>> {
    let item = HistoryManager::new(&state)
        .update_playlist(auth.user_id()?, id, req)
        .await?;
    Ok(Json(item))
}

/// DELETE /api/history/playlists/{id}
#[tracing::instrument(skip(state, auth))]
pub async fn delete_playlist(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    HistoryManager::new(&state)
        .delete_playlist(auth.user_id()?, id)
        .await?;
    Ok(Json(MessageResponse::new("Playlist deleted")))
}

/// GET /api/history/stats
#[tracing::instrument(skip(state, auth))]
pub async fn stats(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<HistoryStats>> {
    let stats = HistoryManager::new(&state).stats(auth.user_id()?).await?;
    Ok(Json(stats))
}
