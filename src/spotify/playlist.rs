use serde_json::json;

use super::{SpotifyClient, SpotifyError, ensure_success, parse_response};
use crate::types::{Paging, SpotifyPlaylist};

/// Spotify accepts at most this many URIs per add-tracks request.
pub const ADD_TRACKS_BATCH: usize = 100;

impl SpotifyClient {
    /// Creates a playlist in the user's library.
    ///
    /// # Arguments
    ///
    /// * `access_token` - user token with `playlist-modify-*` scope
    /// * `user_id` - Spotify id of the playlist owner
    /// * `name` - playlist name
    /// * `description` - optional description shown in Spotify
    /// * `public` - whether the playlist is listed on the user's profile
    pub async fn create_playlist(
        &self,
        access_token: &str,
        user_id: &str,
        name: &str,
        description: Option<&str>,
        public: bool,
    ) -> Result<SpotifyPlaylist, SpotifyError> {
        let res = self
            .http
            .post(self.api_url(&format!("/users/{user_id}/playlists")))
            .bearer_auth(access_token)
            .json(&json!({
                "name": name,
                "description": description.unwrap_or_default(),
                "public": public,
            }))
            .send()
            .await?;

        parse_response(res).await
    }

    /// Appends tracks to a playlist in batches of [`ADD_TRACKS_BATCH`].
    ///
    /// Stops at the first failing batch; earlier batches stay added.
    pub async fn add_tracks(
        &self,
        access_token: &str,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<usize, SpotifyError> {
        let mut added = 0;
        for batch in uris.chunks(ADD_TRACKS_BATCH) {
            let res = self
                .http
                .post(self.api_url(&format!("/playlists/{playlist_id}/tracks")))
                .bearer_auth(access_token)
                .json(&json!({ "uris": batch }))
                .send()
                .await?;

            ensure_success(res).await?;
            added += batch.len();
        }
        Ok(added)
    }

    /// Lists the current user's playlists (`GET /me/playlists`).
    pub async fn user_playlists(
        &self,
        access_token: &str,
        limit: u32,
    ) -> Result<Vec<SpotifyPlaylist>, SpotifyError> {
        let limit = limit.to_string();
        let res = self
            .http
            .get(self.api_url("/me/playlists"))
            .bearer_auth(access_token)
            .query(&[("limit", limit.as_str())])
            .send()
            .await?;

        let page: Paging<Option<SpotifyPlaylist>> = parse_response(res).await?;
        Ok(page.items.into_iter().flatten().collect())
    }

    /// Whether `playlist_id` is owned by `user_id`. Any failure counts as `false`.
    pub async fn playlist_owned_by(&self, access_token: &str, playlist_id: &str, user_id: &str) -> bool {
        let res = match self
            .http
            .get(self.api_url(&format!("/playlists/{playlist_id}")))
            .bearer_auth(access_token)
            .query(&[("fields", "id,name,owner(id),public,collaborative")])
            .send()
            .await
        {
            Ok(res) => res,
            Err(e) => {
                tracing::warn!("Playlist ownership check failed: {}", e);
                return false;
            }
        };

        match parse_response::<serde_json::Value>(res).await {
            Ok(body) => body["owner"]["id"].as_str() == Some(user_id),
            Err(e) => {
                tracing::warn!("Playlist ownership check failed: {}", e);
                false
            }
        }
    }
}
