//! Recommendation workflow.
//!
//! Gathers candidates from several Spotify catalog queries, narrows them with
//! audio features when Spotify still serves them, and diversifies the result
//! across artists. The heuristics themselves live in
//! [`crate::spotify::recommend`].

use crate::{
    error::{ApiError, ApiResult},
    spotify::{
        SpotifyClient, SpotifyError,
        recommend::{self, LIMIT_RANGE, MAX_PER_ARTIST, MusicProfile},
    },
    types::{Emotion, RecommendationResponse, SpotifyTrack, Track},
};

const TRACKS_PER_GENRE: u32 = 20;
const TRACKS_PER_PLAYLIST: u32 = 30;

pub struct RecommendationManager<'a> {
    spotify: &'a SpotifyClient,
}

impl<'a> RecommendationManager<'a> {
    pub fn new(spotify: &'a SpotifyClient) -> Self {
        Self { spotify }
    }

    /// Recommends up to `limit` tracks for `emotion`.
    ///
    /// # Errors
    ///
    /// * `BadRequest` - `limit` outside `1..=50`
    /// * `Upstream` - every candidate source failed
    pub async fn recommend(&self, emotion: Emotion, limit: usize) -> ApiResult<RecommendationResponse> {
        if !LIMIT_RANGE.contains(&limit) {
            return Err(ApiError::bad_request("limit: must be between 1 and 50"));
        }

        let profile = recommend::profile(emotion);
        let candidates = self.candidates(&profile, limit).await?;
        tracing::debug!("{} candidate tracks for {}", candidates.len(), emotion);

        let ids: Vec<String> = candidates.iter().map(|t| t.id.clone()).collect();
        let features = match self.spotify.audio_features(&ids).await {
            Ok(features) => features,
            Err(e) => {
                tracing::warn!("Audio features unavailable for this request: {}", e);
                None
            }
        };

        let (pool, features_filtered) = match &features {
            Some(map) => {
                let filtered = recommend::filter_by_features(&candidates, map, &profile.filters);
                if filtered.len() >= limit {
                    (filtered, true)
                } else {
                    tracing::debug!(
                        "Only {} tracks passed the {} filters; using the unfiltered pool",
                        filtered.len(),
                        emotion
                    );
                    (candidates, false)
                }
            }
            None => (candidates, false),
        };

        let tracks = recommend::diversify(pool, limit, MAX_PER_ARTIST);
        let audio_features = recommend::summarize(&tracks, features.as_ref());

        Ok(RecommendationResponse {
            success: true,
            emotion,
            total: tracks.len(),
            tracks,
            genres_used: profile.genres.iter().map(|g| g.to_string()).collect(),
            music_params: profile.params,
            audio_features,
            features_filtered,
            playlist_description: profile.description.to_string(),
        })
    }

    /// Deduplicated candidate pool. A failing source is skipped; the call
    /// fails only when no source succeeded.
    async fn candidates(&self, profile: &MusicProfile, limit: usize) -> Result<Vec<Track>, SpotifyError> {
        let mut found = Vec::new();
        let mut last_error = None;
        let mut succeeded = 0;

        for genre in profile.genres {
            match self
                .spotify
                .search_tracks(&format!("genre:\"{genre}\""), TRACKS_PER_GENRE)
                .await
            {
                Ok(tracks) => {
                    succeeded += 1;
                    found.extend(tracks);
                }
                Err(e) => {
                    tracing::warn!("Track search for genre {} failed: {}", genre, e);
                    last_error = Some(e);
                }
            }
        }

        for keyword in profile.playlist_keywords {
            match self.playlist_candidates(keyword).await {
                Ok(tracks) => {
                    succeeded += 1;
                    found.extend(tracks);
                }
                Err(e) => {
                    tracing::warn!("Playlist search for {:?} failed: {}", keyword, e);
                    last_error = Some(e);
                }
            }
        }

        let mut tracks = recommend::dedup_tracks(
            found.into_iter().filter_map(recommend::process_track).collect(),
        );

        if tracks.len() < limit {
            if let Some(genre) = profile.genres.first() {
                match self.artist_candidates(genre).await {
                    Ok(extra) => {
                        succeeded += 1;
                        tracks.extend(extra.into_iter().filter_map(recommend::process_track));
                        tracks = recommend::dedup_tracks(tracks);
                    }
                    Err(e) => {
                        tracing::warn!("Artist fallback for genre {} failed: {}", genre, e);
                        last_error = Some(e);
                    }
                }
            }
        }

        match (succeeded, last_error) {
            (0, Some(e)) => Err(e),
            _ => Ok(tracks),
        }
    }

    async fn playlist_candidates(&self, keyword: &str) -> Result<Vec<SpotifyTrack>, SpotifyError> {
        let playlists = self.spotify.search_playlists(keyword, 1).await?;
        match playlists.first() {
            Some(playlist) => self.spotify.playlist_tracks(&playlist.id, TRACKS_PER_PLAYLIST).await,
            None => Ok(Vec::new()),
        }
    }

    async fn artist_candidates(&self, genre: &str) -> Result<Vec<SpotifyTrack>, SpotifyError> {
        let artists = self.spotify.search_artists(genre, 1).await?;
        match artists.first() {
            Some(artist) => self.spotify.artist_top_tracks(&artist.id).await,
            None => Ok(Vec::new()),
        }
    }
}
