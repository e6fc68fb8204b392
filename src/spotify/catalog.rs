use std::collections::HashMap;

use chrono::Utc;

use super::{AppToken, SpotifyClient, SpotifyError, parse_response};
use crate::types::{
    AudioFeatures, AudioFeaturesResponse, Paging, PlaylistItem, SearchResponse, SimplePlaylist,
    SpotifyArtist, SpotifyTrack, TopTracksResponse,
};

/// `/audio-features` accepts at most this many ids per call.
pub const AUDIO_FEATURES_BATCH: usize = 100;

impl SpotifyClient {
    /// Returns a valid application token, requesting a new one when the cached
    /// token is missing or about to expire.
    pub async fn app_token(&self) -> Result<String, SpotifyError> {
        let mut cached = self.app_token.lock().await;
        if let Some(token) = cached.as_ref() {
            if !token.is_expired() {
                return Ok(token.access_token.clone());
            }
        }

        let fresh = self.client_credentials().await?;
        let token = AppToken {
            access_token: fresh.access_token,
            expires_in: fresh.expires_in.max(0) as u64,
            obtained_at: Utc::now().timestamp() as u64,
        };
        let access = token.access_token.clone();
        *cached = Some(token);
        Ok(access)
    }

    async fn search(&self, query: &str, kind: &str, limit: u32) -> Result<SearchResponse, SpotifyError> {
        let token = self.app_token().await?;
        let limit = limit.to_string();
        let res = self
            .http
            .get(self.api_url("/search"))
            .bearer_auth(token)
            .query(&[
                ("q", query),
                ("type", kind),
                ("limit", limit.as_str()),
                ("market", self.config.market.as_str()),
            ])
            .send()
            .await?;

        parse_response(res).await
    }

    pub async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<SpotifyTrack>, SpotifyError> {
        let found = self.search(query, "track", limit).await?;
        Ok(flatten(found.tracks))
    }

    pub async fn search_playlists(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<SimplePlaylist>, SpotifyError> {
        let found = self.search(query, "playlist", limit).await?;
        Ok(flatten(found.playlists))
    }

    pub async fn search_artists(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<SpotifyArtist>, SpotifyError> {
        let found = self.search(query, "artist", limit).await?;
        Ok(flatten(found.artists))
    }

    /// Tracks of a public playlist. Episodes and removed tracks are skipped.
    pub async fn playlist_tracks(
        &self,
        playlist_id: &str,
        limit: u32,
    ) -> Result<Vec<SpotifyTrack>, SpotifyError> {
        let token = self.app_token().await?;
        let limit = limit.to_string();
        let res = self
            .http
            .get(self.api_url(&format!("/playlists/{playlist_id}/tracks")))
            .bearer_auth(token)
            .query(&[
                ("limit", limit.as_str()),
                ("market", self.config.market.as_str()),
            ])
            .send()
            .await?;

        let page: Paging<PlaylistItem> = parse_response(res).await?;
        Ok(page
            .items
            .into_iter()
            .filter_map(|item| item.track)
            .filter(|t| t.id.is_some())
            .collect())
    }

    pub async fn artist_top_tracks(&self, artist_id: &str) -> Result<Vec<SpotifyTrack>, SpotifyError> {
        let token = self.app_token().await?;
        let res = self
            .http
            .get(self.api_url(&format!("/artists/{artist_id}/top-tracks")))
            .bearer_auth(token)
            .query(&[("market", self.config.market.as_str())])
            .send()
            .await?;

        let top: TopTracksResponse = parse_response(res).await?;
        Ok(top.tracks)
    }

    /// Audio features keyed by track id, fetched in batches of 100.
    ///
    /// Returns `Ok(None)` once features have been disabled by an earlier 403.
    /// A 403 on this call disables them and also yields `Ok(None)`; any other
    /// failure is returned as an error.
    pub async fn audio_features(
        &self,
        ids: &[String],
    ) -> Result<Option<HashMap<String, AudioFeatures>>, SpotifyError> {
        if !self.features_available() {
            return Ok(None);
        }

        let token = self.app_token().await?;
        let mut out = HashMap::with_capacity(ids.len());

        for batch in ids.chunks(AUDIO_FEATURES_BATCH) {
            let joined = batch.join(",");
            let res = self
                .http
                .get(self.api_url("/audio-features"))
                .bearer_auth(&token)
                .query(&[("ids", joined.as_str())])
                .send()
                .await?;

            match parse_response::<AudioFeaturesResponse>(res).await {
                Ok(parsed) => {
                    for features in parsed.audio_features.into_iter().flatten() {
                        out.insert(features.id.clone(), features);
                    }
                }
                Err(e) if e.is_forbidden() => {
                    self.disable_features();
                    return Ok(None);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(Some(out))
    }
}

fn flatten<T>(page: Option<Paging<Option<T>>>) -> Vec<T> {
    page.map(|p| p.items.into_iter().flatten().collect())
        .unwrap_or_default()
}
