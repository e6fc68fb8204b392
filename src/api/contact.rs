use axum::{Json, extract::State};
use serde_json::{Value, json};
use validator::Validate;

use crate::{
    error::{ApiError, ApiResult},
    mail,
    state::AppState,
    types::ContactRequest,
};

/// POST /api/contact/send
#[tracing::instrument(skip(state, req))]
pub async fn send(State(state): State<AppState>, Json(req): Json<ContactRequest>) -> ApiResult<Json<Value>> {
    req.validate()?;

    let support = state
        .config
        .smtp
        .support_address()
        .ok_or_else(|| ApiError::upstream("Email service is not configured"))?;

    tracing::info!("Contact message from {} <{}>", req.name, req.email);
    state.mailer.send(mail::contact_mail(support, &req)).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Message sent. We will get back to you soon."
    })))
}

/// GET /api/contact/health
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "contact",
        "email_configured": state.mailer.is_configured()
    }))
}
