use axum::{
    Json,
    extract::{Multipart, State},
};
use serde_json::json;

use crate::{
    api::middleware::AuthUser,
    emotion,
    error::{ApiError, ApiResult},
    management::HistoryManager,
    state::AppState,
    types::AnalyzeResponse,
};

struct Upload {
    bytes: Vec<u8>,
    filename: Option<String>,
    content_type: Option<String>,
}

async fn read_file_field(mut multipart: Multipart) -> ApiResult<Upload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {e}")))?;
        return Ok(Upload {
            bytes: bytes.to_vec(),
            filename,
            content_type,
        });
    }
    Err(ApiError::bad_request("file: is required"))
}

/// POST /api/emotion/analyze
///
/// The analysis is stored in the user's history; a storage failure is
/// logged and the result is still returned without `analysis_id`.
#[tracing::instrument(skip(state, auth, multipart))]
pub async fn analyze(
    State(state): State<AppState>,
    auth: AuthUser,
    multipart: Multipart,
) -> ApiResult<Json<AnalyzeResponse>> {
    let user_id = auth.user_id()?;
    let upload = read_file_field(multipart).await?;

    emotion::validate_image(&upload.bytes, state.config.max_image_mb)?;

    let faces = state.detector.detect(&upload.bytes).await.map_err(|e| {
        tracing::warn!("Emotion detection failed: {} (code {:?})", e, e.error_code());
        e
    })?;
    let result = emotion::summarize(faces)?;

    let metadata = json!({
        "filename": upload.filename,
        "content_type": upload.content_type,
        "size_bytes": upload.bytes.len(),
    });
    let analysis_id = match HistoryManager::new(&state)
        .record_analysis(user_id, &result, Some(metadata))
        .await
    {
        Ok(row) => Some(row.id),
        Err(e) => {
            tracing::error!("Failed to store emotion analysis: {}", e);
            None
        }
    };

    tracing::info!(
        "Analyzed photo for user {}: {} ({:.2})",
        user_id,
        result.dominant_emotion.label,
        result.dominant_emotion.confidence
    );

    Ok(Json(AnalyzeResponse {
        success: true,
        result,
        analysis_id,
    }))
}
