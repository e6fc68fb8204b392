use std::collections::HashMap;

use anima::{
    config::SpotifyConfig,
    error::ApiError,
    management::RecommendationManager,
    spotify::{SpotifyClient, SpotifyError, recommend::MAX_PER_ARTIST},
    types::Emotion,
};
use mockito::{Matcher, Mock, ServerGuard};
use reqwest::Url;
use serde_json::{Value, json};

fn spotify_config(base: &str) -> SpotifyConfig {
    SpotifyConfig {
        client_id: "client-id".to_string(),
        client_secret: "client-secret".to_string(),
        redirect_uri: "http://localhost:8000/api/auth/spotify/callback".to_string(),
        scope: "user-read-email playlist-modify-public".to_string(),
        auth_url: format!("{base}/authorize"),
        token_url: format!("{base}/api/token"),
        api_url: base.to_string(),
        market: "US".to_string(),
    }
}

fn client(server: &ServerGuard) -> SpotifyClient {
    SpotifyClient::new(reqwest::Client::new(), spotify_config(&server.url()))
}

async fn token_mock(server: &mut ServerGuard, hits: usize) -> Mock {
    server
        .mock("POST", "/api/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"app-token","token_type":"Bearer","expires_in":3600}"#)
        .expect(hits)
        .create_async()
        .await
}

/// Twelve tracks spread over three artists, four each.
fn track_items() -> Vec<Value> {
    (0..12)
        .map(|i| {
            let artist = i % 3;
            json!({
                "id": format!("t{i}"),
                "name": format!("Song {i}"),
                "artists": [{"id": format!("a{artist}"), "name": format!("Artist {artist}")}],
                "album": {"name": "Album", "images": [{"url": "https://img/cover.jpg"}]},
                "external_urls": {"spotify": format!("https://open.spotify.com/track/t{i}")},
                "duration_ms": 200000,
                "popularity": 50 + i
            })
        })
        .collect()
}

async fn search_mocks(server: &mut ServerGuard) -> (Mock, Mock) {
    let tracks = server
        .mock("GET", "/search")
        .match_query(Matcher::UrlEncoded("type".into(), "track".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"tracks": {"items": track_items(), "total": 12}}).to_string())
        .expect(4)
        .create_async()
        .await;
    let playlists = server
        .mock("GET", "/search")
        .match_query(Matcher::UrlEncoded("type".into(), "playlist".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"playlists":{"items":[null]}}"#)
        .expect(2)
        .create_async()
        .await;
    (tracks, playlists)
}

fn count_per_artist(artists: impl Iterator<Item = String>) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for artist in artists {
        *counts.entry(artist).or_insert(0) += 1;
    }
    counts
}

#[tokio::test]
async fn test_app_token_is_cached() {
    let mut server = mockito::Server::new_async().await;
    let token = token_mock(&mut server, 1).await;
    let spotify = client(&server);

    assert_eq!(spotify.app_token().await.unwrap(), "app-token");
    assert_eq!(spotify.app_token().await.unwrap(), "app-token");

    token.assert_async().await;
}

#[tokio::test]
async fn test_audio_features_forbidden_disables_filtering() {
    let mut server = mockito::Server::new_async().await;
    let _token = token_mock(&mut server, 1).await;
    let features = server
        .mock("GET", "/audio-features")
        .match_query(Matcher::Any)
        .with_status(403)
        .with_body(r#"{"error":{"status":403,"message":"Forbidden"}}"#)
        .expect(1)
        .create_async()
        .await;
    let spotify = client(&server);
    let ids = vec!["t1".to_string(), "t2".to_string()];

    assert!(spotify.features_available());
    assert!(spotify.audio_features(&ids).await.unwrap().is_none());
    assert!(!spotify.features_available());

    // No second request once disabled
    assert!(spotify.audio_features(&ids).await.unwrap().is_none());
    features.assert_async().await;
}

#[tokio::test]
async fn test_audio_features_other_errors_propagate() {
    let mut server = mockito::Server::new_async().await;
    let _token = token_mock(&mut server, 1).await;
    let _features = server
        .mock("GET", "/audio-features")
        .match_query(Matcher::Any)
        .with_status(429)
        .with_body(r#"{"error":{"status":429,"message":"API rate limit exceeded"}}"#)
        .create_async()
        .await;
    let spotify = client(&server);

    let err = spotify
        .audio_features(&["t1".to_string()])
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(429));
    assert!(spotify.features_available());
}

#[tokio::test]
async fn test_add_tracks_batches_by_hundred() {
    let mut server = mockito::Server::new_async().await;
    let add = server
        .mock("POST", "/playlists/pl1/tracks")
        .match_header("authorization", "Bearer user-token")
        .with_status(201)
        .with_body(r#"{"snapshot_id":"abc"}"#)
        .expect(2)
        .create_async()
        .await;
    let spotify = client(&server);
    let uris: Vec<String> = (0..150).map(|i| format!("spotify:track:t{i}")).collect();

    let added = spotify.add_tracks("user-token", "pl1", &uris).await.unwrap();

    assert_eq!(added, 150);
    add.assert_async().await;
}

#[tokio::test]
async fn test_api_error_message_is_kept() {
    let mut server = mockito::Server::new_async().await;
    let _me = server
        .mock("GET", "/me")
        .with_status(401)
        .with_body(r#"{"error":{"status":401,"message":"The access token expired"}}"#)
        .create_async()
        .await;
    let spotify = client(&server);

    match spotify.current_user("stale").await {
        Err(SpotifyError::Api { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "The access token expired");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_exchange_code_reports_invalid_grant() {
    let mut server = mockito::Server::new_async().await;
    let _token = server
        .mock("POST", "/api/token")
        .match_header("authorization", Matcher::Regex("^Basic ".to_string()))
        .match_body(Matcher::UrlEncoded(
            "grant_type".into(),
            "authorization_code".into(),
        ))
        .with_status(400)
        .with_body(r#"{"error":"invalid_grant","error_description":"Invalid authorization code"}"#)
        .create_async()
        .await;
    let spotify = client(&server);

    let err = spotify.exchange_code("used-code").await.unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert!(err.to_string().contains("Invalid authorization code"));
}

#[tokio::test]
async fn test_playlist_ownership() {
    let mut server = mockito::Server::new_async().await;
    let _playlist = server
        .mock("GET", "/playlists/pl1")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"id":"pl1","name":"Mine","owner":{"id":"alice"}}"#)
        .create_async()
        .await;
    let _missing = server
        .mock("GET", "/playlists/gone")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"error":{"status":404,"message":"Not found"}}"#)
        .create_async()
        .await;
    let spotify = client(&server);

    assert!(spotify.playlist_owned_by("token", "pl1", "alice").await);
    assert!(!spotify.playlist_owned_by("token", "pl1", "bob").await);
    assert!(!spotify.playlist_owned_by("token", "gone", "alice").await);
}

#[test]
fn test_authorization_url_parameters() {
    let spotify = SpotifyClient::new(
        reqwest::Client::new(),
        spotify_config("https://accounts.example.com"),
    );

    let url = Url::parse(&spotify.authorization_url("link:nonce.sig&x=1").unwrap()).unwrap();
    let params: HashMap<String, String> = url.query_pairs().into_owned().collect();

    assert_eq!(url.path(), "/authorize");
    assert_eq!(params["client_id"], "client-id");
    assert_eq!(params["response_type"], "code");
    assert_eq!(params["state"], "link:nonce.sig&x=1");
    assert!(!params.contains_key("x"));
    assert_eq!(params["scope"], "user-read-email playlist-modify-public");
    assert_eq!(params["show_dialog"], "true");
    assert_eq!(
        params["redirect_uri"],
        "http://localhost:8000/api/auth/spotify/callback"
    );
}

#[test]
fn test_authorization_url_rejects_bad_auth_url() {
    let spotify = SpotifyClient::new(reqwest::Client::new(), spotify_config("not a url"));

    let err = spotify.authorization_url("nonce.sig").unwrap_err();
    assert!(matches!(err, SpotifyError::Config(_)));
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn test_recommend_without_audio_features() {
    let mut server = mockito::Server::new_async().await;
    let token = token_mock(&mut server, 1).await;
    let (tracks, playlists) = search_mocks(&mut server).await;
    let _features = server
        .mock("GET", "/audio-features")
        .match_query(Matcher::Any)
        .with_status(403)
        .create_async()
        .await;
    let spotify = client(&server);

    let res = RecommendationManager::new(&spotify)
        .recommend(Emotion::Happy, 5)
        .await
        .unwrap();

    assert!(res.success);
    assert_eq!(res.emotion, Emotion::Happy);
    assert_eq!(res.total, 5);
    assert_eq!(res.tracks.len(), 5);
    assert!(!res.features_filtered);
    assert_eq!(res.audio_features.mode, "N/A");
    assert_eq!(res.audio_features.analyzed_tracks, 0);
    assert_eq!(res.genres_used, vec!["pop", "dance", "funk", "disco"]);

    let counts = count_per_artist(res.tracks.iter().map(|t| t.primary_artist().to_string()));
    assert!(counts.values().all(|&n| n <= MAX_PER_ARTIST));

    token.assert_async().await;
    tracks.assert_async().await;
    playlists.assert_async().await;
}

#[tokio::test]
async fn test_recommend_filters_by_audio_features() {
    let mut server = mockito::Server::new_async().await;
    let _token = token_mock(&mut server, 1).await;
    let _search = search_mocks(&mut server).await;
    let features: Vec<Value> = (0..12)
        .map(|i| {
            json!({
                "id": format!("t{i}"),
                "valence": 0.8,
                "energy": 0.7,
                "danceability": 0.75,
                "tempo": 120.0,
                "mode": 1
            })
        })
        .collect();
    let _features = server
        .mock("GET", "/audio-features")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "audio_features": features }).to_string())
        .create_async()
        .await;
    let spotify = client(&server);

    let res = RecommendationManager::new(&spotify)
        .recommend(Emotion::Happy, 6)
        .await
        .unwrap();

    assert!(res.features_filtered);
    assert_eq!(res.total, 6);
    assert_eq!(res.audio_features.analyzed_tracks, 6);
    assert_eq!(res.audio_features.mode, "Major");
    assert_eq!(res.audio_features.avg_valence, Some(0.8));
}

#[tokio::test]
async fn test_recommend_rejects_limit_out_of_range() {
    let server = mockito::Server::new_async().await;
    let spotify = client(&server);
    let manager = RecommendationManager::new(&spotify);

    assert!(matches!(
        manager.recommend(Emotion::Sad, 0).await,
        Err(ApiError::BadRequest(_))
    ));
    assert!(matches!(
        manager.recommend(Emotion::Sad, 51).await,
        Err(ApiError::BadRequest(_))
    ));
}

#[tokio::test]
async fn test_recommend_fails_when_every_source_fails() {
    let mut server = mockito::Server::new_async().await;
    let _token = token_mock(&mut server, 1).await;
    let _search = server
        .mock("GET", "/search")
        .match_query(Matcher::Any)
        .with_status(503)
        .with_body(r#"{"error":{"status":503,"message":"Service unavailable"}}"#)
        .create_async()
        .await;
    let spotify = client(&server);

    let err = RecommendationManager::new(&spotify)
        .recommend(Emotion::Calm, 10)
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Upstream(_)));
    assert!(err.to_string().contains("Service unavailable"));
}
