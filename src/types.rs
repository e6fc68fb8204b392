use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

// ---------------------------------------------------------------------------
// Emotions
// ---------------------------------------------------------------------------

/// Facial emotion labels as reported by AWS Rekognition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Emotion {
    Happy,
    Sad,
    Angry,
    Calm,
    Surprised,
    Fear,
    Disgusted,
    Confused,
}

impl Emotion {
    pub const ALL: [Emotion; 8] = [
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Angry,
        Emotion::Calm,
        Emotion::Surprised,
        Emotion::Fear,
        Emotion::Disgusted,
        Emotion::Confused,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Happy => "HAPPY",
            Emotion::Sad => "SAD",
            Emotion::Angry => "ANGRY",
            Emotion::Calm => "CALM",
            Emotion::Surprised => "SURPRISED",
            Emotion::Fear => "FEAR",
            Emotion::Disgusted => "DISGUSTED",
            Emotion::Confused => "CONFUSED",
        }
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, Emotion::Happy | Emotion::Calm | Emotion::Surprised)
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEmotion(pub String);

impl fmt::Display for UnknownEmotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid emotion '{}'. Valid emotions: {}",
            self.0,
            Emotion::ALL.map(|e| e.as_str()).join(", ")
        )
    }
}

impl std::error::Error for UnknownEmotion {}

impl FromStr for Emotion {
    type Err = UnknownEmotion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Emotion::ALL
            .into_iter()
            .find(|e| e.as_str() == upper)
            .ok_or_else(|| UnknownEmotion(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Spotify wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpotifyImage {
    pub url: String,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternalUrls {
    #[serde(default)]
    pub spotify: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyProfile {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub images: Vec<SpotifyImage>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpleArtist {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpotifyAlbum {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub images: Vec<SpotifyImage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyTrack {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artists: Vec<SimpleArtist>,
    #[serde(default)]
    pub album: Option<SpotifyAlbum>,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub popularity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyArtist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimplePlaylist {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paging<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub next: Option<String>,
}

/// `/search` response. Spotify may return `null` entries inside `items`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub tracks: Option<Paging<Option<SpotifyTrack>>>,
    #[serde(default)]
    pub playlists: Option<Paging<Option<SimplePlaylist>>>,
    #[serde(default)]
    pub artists: Option<Paging<Option<SpotifyArtist>>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistItem {
    #[serde(default)]
    pub track: Option<SpotifyTrack>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopTracksResponse {
    #[serde(default)]
    pub tracks: Vec<SpotifyTrack>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudioFeatures {
    pub id: String,
    #[serde(default)]
    pub valence: Option<f64>,
    #[serde(default)]
    pub energy: Option<f64>,
    #[serde(default)]
    pub danceability: Option<f64>,
    #[serde(default)]
    pub acousticness: Option<f64>,
    #[serde(default)]
    pub tempo: Option<f64>,
    #[serde(default)]
    pub mode: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioFeaturesResponse {
    #[serde(default)]
    pub audio_features: Vec<Option<AudioFeatures>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistOwner {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracksRef {
    #[serde(default)]
    pub total: u64,
}

/// A playlist as returned by `/me/playlists` and `POST /users/{id}/playlists`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyPlaylist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub public: Option<bool>,
    #[serde(default)]
    pub collaborative: bool,
    pub owner: PlaylistOwner,
    #[serde(default)]
    pub images: Option<Vec<SpotifyImage>>,
    #[serde(default)]
    pub tracks: Option<TracksRef>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyErrorBody {
    pub error: SpotifyErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyErrorDetail {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
}

// ---------------------------------------------------------------------------
// Recommendation output
// ---------------------------------------------------------------------------

/// A track reduced to the fields the frontend renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
    pub album: String,
    pub album_image: Option<String>,
    pub preview_url: Option<String>,
    pub external_url: Option<String>,
    pub duration_ms: u64,
    pub popularity: u32,
}

impl Track {
    pub fn primary_artist(&self) -> &str {
        self.artists.first().map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicParams {
    pub valence: String,
    pub energy: String,
    pub tempo: String,
    pub mode: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSummary {
    pub avg_valence: Option<f64>,
    pub avg_energy: Option<f64>,
    pub avg_tempo: Option<f64>,
    pub mode: String,
    pub analyzed_tracks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub success: bool,
    pub emotion: Emotion,
    pub tracks: Vec<Track>,
    pub total: usize,
    pub genres_used: Vec<String>,
    pub music_params: MusicParams,
    pub audio_features: AudioSummary,
    pub features_filtered: bool,
    pub playlist_description: String,
}

// ---------------------------------------------------------------------------
// Emotion analysis output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DominantEmotion {
    #[serde(rename = "type")]
    pub label: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceDetail {
    pub emotions: Vec<DominantEmotion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_low: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_high: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smile: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eyeglasses: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionResult {
    pub faces_detected: usize,
    pub dominant_emotion: DominantEmotion,
    pub all_emotions: BTreeMap<String, f64>,
    pub face_details: Vec<FaceDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    #[serde(flatten)]
    pub result: EmotionResult,
    pub analysis_id: Option<Uuid>,
}

// ---------------------------------------------------------------------------
// Auth requests / responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 3, max = 50, message = "must be between 3 and 50 characters"))]
    pub username: String,
    #[validate(length(min = 8, max = 128, message = "must be at least 8 characters"))]
    pub password: String,
    #[validate(length(max = 100))]
    pub first_name: Option<String>,
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub username_or_email: String,
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 3, max = 50, message = "must be between 3 and 50 characters"))]
    pub username: Option<String>,
    #[validate(length(max = 100))]
    pub first_name: Option<String>,
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(equal = 6, message = "must be 6 digits"))]
    pub code: String,
    #[validate(length(min = 8, max = 128, message = "must be at least 8 characters"))]
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CodeExchangeRequest {
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub display_name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_picture: Option<String>,
    pub is_active: bool,
    pub is_verified: bool,
    pub has_password: bool,
    pub spotify_connected: bool,
    pub spotify_id: Option<String>,
    pub spotify_display_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: UserResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationUrl {
    pub authorization_url: String,
    pub state: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub items: Vec<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisItem {
    pub analysis_id: Uuid,
    pub dominant_emotion: String,
    pub confidence: f64,
    pub emotion_details: Value,
    pub photo_metadata: Option<Value>,
    pub analyzed_at: DateTime<Utc>,
    pub has_saved_playlist: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedPlaylistItem {
    pub id: Uuid,
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

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SavePlaylistRequest {
    pub analysis_id: Option<Uuid>,
    #[validate(length(min = 1, max = 255, message = "must be between 1 and 255 characters"))]
    pub playlist_name: String,
    pub emotion: Emotion,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(length(min = 1, message = "must contain at least one track"))]
    pub tracks: Vec<Value>,
    pub music_params: Option<Value>,
    #[serde(default)]
    pub is_favorite: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdatePlaylistRequest {
    #[validate(length(min = 1, max = 255, message = "must be between 1 and 255 characters"))]
    pub playlist_name: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub is_favorite: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionCount {
    pub emotion: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: chrono::NaiveDate,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryStats {
    pub total_analyses: i64,
    pub total_saved_playlists: i64,
    pub favorite_playlists_count: i64,
    pub most_common_emotion: Option<String>,
    pub emotions_breakdown: Vec<EmotionCount>,
    pub recent_activity: Vec<AnalysisItem>,
    pub positive_count: i64,
    pub negative_count: i64,
    pub daily_analyses: Vec<DailyCount>,
}

// ---------------------------------------------------------------------------
// Spotify user playlists
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePlaylistRequest {
    #[validate(length(min = 1, max = 100, message = "must be between 1 and 100 characters"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 300))]
    pub description: Option<String>,
    #[validate(length(min = 1, message = "must contain at least one track"))]
    pub tracks: Vec<String>,
    #[serde(default)]
    pub public: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub public: Option<bool>,
    pub collaborative: bool,
    pub owner: String,
    pub image: Option<String>,
    pub external_url: Option<String>,
    pub tracks_total: u64,
}

impl From<SpotifyPlaylist> for PlaylistSummary {
    fn from(p: SpotifyPlaylist) -> Self {
        Self {
            image: p
                .images
                .as_ref()
                .and_then(|imgs| imgs.first())
                .map(|i| i.url.clone()),
            owner: p.owner.display_name.unwrap_or(p.owner.id),
            tracks_total: p.tracks.map(|t| t.total).unwrap_or(0),
            external_url: p.external_urls.spotify,
            id: p.id,
            name: p.name,
            description: p.description,
            public: p.public,
            collaborative: p.collaborative,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistList {
    pub total: usize,
    pub items: Vec<PlaylistSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedPlaylist {
    pub success: bool,
    #[serde(flatten)]
    pub playlist: PlaylistSummary,
    pub tracks_added: usize,
}

// ---------------------------------------------------------------------------
// Contact
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ContactRequest {
    #[validate(length(min = 2, max = 100, message = "must be between 2 and 100 characters"))]
    pub name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 3, max = 200, message = "must be between 3 and 200 characters"))]
    pub subject: String,
    #[validate(length(min = 10, max = 2000, message = "must be between 10 and 2000 characters"))]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emotion_parse_is_case_insensitive() {
        assert_eq!("happy".parse::<Emotion>().unwrap(), Emotion::Happy);
        assert_eq!(" Calm ".parse::<Emotion>().unwrap(), Emotion::Calm);
        assert!("joyful".parse::<Emotion>().is_err());
    }

    #[test]
    fn test_unknown_emotion_lists_valid_labels() {
        let err = "meh".parse::<Emotion>().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("'meh'"));
        assert!(msg.contains("HAPPY"));
        assert!(msg.contains("CONFUSED"));
    }

    #[test]
    fn test_emotion_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Emotion::Fear).unwrap(), "\"FEAR\"");
        let e: Emotion = serde_json::from_str("\"DISGUSTED\"").unwrap();
        assert_eq!(e, Emotion::Disgusted);
    }

    #[test]
    fn test_positive_emotions() {
        let positive: Vec<_> = Emotion::ALL.into_iter().filter(|e| e.is_positive()).collect();
        assert_eq!(positive, vec![Emotion::Happy, Emotion::Calm, Emotion::Surprised]);
    }

    #[test]
    fn test_playlist_summary_from_spotify() {
        let raw = serde_json::json!({
            "id": "pl1",
            "name": "Mood",
            "description": null,
            "public": false,
            "collaborative": false,
            "owner": {"id": "owner1", "display_name": "Ana"},
            "images": [{"url": "https://img/1"}],
            "tracks": {"total": 12},
            "external_urls": {"spotify": "https://open.spotify.com/playlist/pl1"}
        });
        let playlist: SpotifyPlaylist = serde_json::from_value(raw).unwrap();
        let summary = PlaylistSummary::from(playlist);
        assert_eq!(summary.owner, "Ana");
        assert_eq!(summary.tracks_total, 12);
        assert_eq!(summary.image.as_deref(), Some("https://img/1"));
    }

    #[test]
    fn test_search_response_tolerates_null_items() {
        let raw = serde_json::json!({
            "playlists": {"items": [null, {"id": "p", "name": "x"}], "total": 2}
        });
        let parsed: SearchResponse = serde_json::from_value(raw).unwrap();
        let items = parsed.playlists.unwrap().items;
        assert!(items[0].is_none());
        assert_eq!(items[1].as_ref().unwrap().id, "p");
    }
}
