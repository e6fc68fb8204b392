mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;

use common::{SECRET, body_json, get, json_request, lazy_app, upload_request};

#[tokio::test]
async fn test_root_and_health() {
    let (app, _) = lazy_app();

    let response = app.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["service"], "anima-api");

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_health_db_unreachable() {
    let (app, _) = lazy_app();

    let response = app.oneshot(get("/health/db")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["status"], "unhealthy");
}

#[tokio::test]
async fn test_protected_routes_require_bearer() {
    let (app, _) = lazy_app();

    for uri in ["/api/auth/me", "/api/history/stats", "/api/spotify/playlists"] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        let body = body_json(response).await;
        assert!(body["detail"].is_string());
    }

    let request = Request::builder()
        .uri("/api/auth/me")
        .header("Authorization", "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_emotions_catalog() {
    let (app, _) = lazy_app();

    let response = app.oneshot(get("/api/music/emotions")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total"], 8);

    let happy = &body["emotions"][0];
    assert_eq!(happy["emotion"], "HAPPY");
    assert_eq!(happy["positive"], true);
    assert!(happy["genres"].as_array().is_some_and(|g| !g.is_empty()));
}

#[tokio::test]
async fn test_recommendations_reject_bad_input() {
    let (app, _) = lazy_app();

    let response = app
        .clone()
        .oneshot(get("/api/music/recommendations/bored"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["detail"].as_str().unwrap().contains("bored"));

    for limit in [0, 51] {
        let uri = format!("/api/music/recommendations/happy?limit={limit}");
        let response = app.clone().oneshot(get(&uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "limit={limit}");
    }
}

#[tokio::test]
async fn test_register_validation_runs_before_database() {
    let (app, _) = lazy_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            json!({"email": "not-an-email", "username": "ana", "password": "longenough"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["detail"].as_str().unwrap().contains("email"));
}

#[tokio::test]
async fn test_contact_send() {
    let (app, mailer) = lazy_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/contact/send",
            json!({
                "name": "Ana",
                "email": "ana@example.com",
                "subject": "Feedback",
                "message": "Loving the calm playlists so far."
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);

    let sent = mailer.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "help@example.com");
    assert_eq!(sent[0].reply_to.as_deref(), Some("ana@example.com"));
    assert!(sent[0].subject.contains("Feedback"));
}

#[tokio::test]
async fn test_contact_send_rejects_short_message() {
    let (app, mailer) = lazy_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/contact/send",
            json!({
                "name": "Ana",
                "email": "ana@example.com",
                "subject": "Hi",
                "message": "short"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(mailer.sent.lock().await.is_empty());
}

#[tokio::test]
async fn test_contact_health() {
    let (app, _) = lazy_app();

    let response = app.oneshot(get("/api/contact/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["email_configured"], true);
    assert_eq!(body["service"], "contact");
}

#[tokio::test]
async fn test_analyze_rejects_non_image() {
    let (app, _) = lazy_app();

    let response = app
        .oneshot(upload_request(b"definitely not an image"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["detail"].as_str().unwrap().contains("JPEG"));
}

#[tokio::test]
async fn test_analyze_returns_result_when_history_is_unavailable() {
    let (app, _) = lazy_app();
    let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

    let response = app.oneshot(upload_request(&jpeg)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["faces_detected"], 1);
    assert_eq!(body["dominant_emotion"]["type"], "HAPPY");
    assert_eq!(body["dominant_emotion"]["confidence"], 91.23);
    assert!(body["analysis_id"].is_null());
}

#[tokio::test]
async fn test_spotify_login_returns_signed_state() {
    let (app, _) = lazy_app();

    let response = app.oneshot(get("/api/auth/spotify/login")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    let state = body["state"].as_str().unwrap();
    assert!(anima::utils::verify_state(state, SECRET));
    assert!(
        body["authorization_url"]
            .as_str()
            .unwrap()
            .starts_with("https://accounts.spotify.com/authorize?")
    );
}

#[tokio::test]
async fn test_spotify_callback_redirects_errors_to_login() {
    let (app, _) = lazy_app();

    let response = app
        .clone()
        .oneshot(get("/api/auth/spotify/callback?error=access_denied"))
        .await
        .unwrap();
    assert!(response.status().is_redirection());
    assert_eq!(
        response.headers()["location"],
        "http://localhost:5173/login?error=access_denied"
    );

    let response = app
        .oneshot(get("/api/auth/spotify/callback?code=abc&state=forged.state"))
        .await
        .unwrap();
    assert_eq!(
        response.headers()["location"],
        "http://localhost:5173/login?error=invalid_state"
    );
}

#[tokio::test]
async fn test_spotify_callback_forwards_link_flow_to_profile() {
    let (app, _) = lazy_app();
    let state = anima::utils::generate_link_state(SECRET);

    let response = app
        .oneshot(get(&format!(
            "/api/auth/spotify/callback?code=abc&state={state}"
        )))
        .await
        .unwrap();

    let location = response.headers()["location"].to_str().unwrap();
    assert!(location.starts_with("http://localhost:5173/profile?code=abc&state=link"));
}
