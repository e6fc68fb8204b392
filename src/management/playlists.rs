use validator::Validate;

use crate::{
    db::UserRow,
    error::{ApiError, ApiResult},
    management::spotify_link::SpotifyLinkManager,
    state::AppState,
    types::{CreatePlaylistRequest, CreatedPlaylist, PlaylistList, PlaylistSummary},
    utils,
};

/// Playlists in the user's own Spotify library.
pub struct SpotifyPlaylistManager<'a> {
    state: &'a AppState,
}

impl<'a> SpotifyPlaylistManager<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    pub async fn list(&self, user: &UserRow, limit: u32) -> ApiResult<PlaylistList> {
        if !(1..=50).contains(&limit) {
            return Err(ApiError::bad_request("limit: must be between 1 and 50"));
        }
        let token = SpotifyLinkManager::new(self.state).valid_access_token(user).await?;
        let items: Vec<PlaylistSummary> = self
            .state
            .spotify
            .user_playlists(&token, limit)
            .await?
            .into_iter()
            .map(PlaylistSummary::from)
            .collect();

        Ok(PlaylistList {
            total: items.len(),
            items,
        })
    }

    /// Creates a playlist owned by the user and fills it with `req.tracks`.
    ///
    /// Tracks may be bare ids, `spotify:track:` URIs or open.spotify.com
    /// links.
    pub async fn create(&self, user: &UserRow, req: CreatePlaylistRequest) -> ApiResult<CreatedPlaylist> {
        req.validate()?;
        let name = req.name.trim();
        if name.is_empty() {
            return Err(ApiError::bad_request("name: is required"));
        }

        let uris = req
            .tracks
            .iter()
            .map(|t| {
                utils::normalize_track_uri(t)
                    .ok_or_else(|| ApiError::bad_request(format!("tracks: invalid track id or URI '{t}'")))
            })
            .collect::<ApiResult<Vec<String>>>()?;

        let token = SpotifyLinkManager::new(self.state).valid_access_token(user).await?;
        let spotify_user_id = match user.spotify_id.as_deref() {
            Some(id) => id.to_string(),
            None => self.state.spotify.current_user(&token).await?.id,
        };

        let playlist = self
            .state
            .spotify
            .create_playlist(
                &token,
                &spotify_user_id,
                name,
                req.description.as_deref(),
                req.public,
            )
            .await?;
        let tracks_added = self.state.spotify.add_tracks(&token, &playlist.id, &uris).await?;

        tracing::info!(
            "Created Spotify playlist {} with {} tracks for user {}",
            playlist.id,
            tracks_added,
            user.id
        );

        Ok(CreatedPlaylist {
            success: true,
            playlist: playlist.into(),
            tracks_added,
        })
    }

    /// Whether the user owns `playlist_id` on Spotify.
    pub async fn owns(&self, user: &UserRow, playlist_id: &str) -> ApiResult<bool> {
        let Some(spotify_id) = user.spotify_id.as_deref() else {
            return Ok(false);
        };
        let token = SpotifyLinkManager::new(self.state).valid_access_token(user).await?;
        Ok(self
            .state
            .spotify
            .playlist_owned_by(&token, playlist_id, spotify_id)
            .await)
    }
}
