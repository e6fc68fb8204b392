use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    api::middleware::AuthUser,
    error::ApiResult,
    management::{AccountManager, SpotifyPlaylistManager},
    state::AppState,
    types::{CreatePlaylistRequest, CreatedPlaylist, PlaylistList},
};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<u32>,
}

/// GET /api/spotify/playlists
#[tracing::instrument(skip(state, auth))]
pub async fn list_playlists(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<PlaylistList>> {
    let user = AccountManager::new(&state)
        .current_user(auth.user_id()?)
        .await?;
    let list = SpotifyPlaylistManager::new(&state)
        .list(&user, params.limit.unwrap_or(50))
        .await?;
    Ok(Json(list))
}

/// POST /api/spotify/playlists
#[tracing::instrument(skip(state, auth, req))]
pub async fn create_playlist(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreatePlaylistRequest>,
) -> ApiResult<(StatusCode, Json<CreatedPlaylist>)> {
    let user = AccountManager::new(&state)
        .current_user(auth.user_id()?)
        .await?;
    let created = SpotifyPlaylistManager::new(&state).create(&user, req).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/spotify/playlists/{id}/owned
#[tracing::instrument(skip(state, auth))]
pub async fn playlist_owned(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(playlist_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let user = AccountManager::new(&state)
        .current_user(auth.user_id()?)
        .await?;
    let owned = SpotifyPlaylistManager::new(&state)
        .owns(&user, &playlist_id)
        .await?;
    Ok(Json(json!({ "playlist_id": playlist_id, "owned": owned })))
}
