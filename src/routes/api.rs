// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users: profile and Gmail connection.

use crate::error::{AppError, Result};
use crate::models::SessionUser;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/gmail", get(gmail_status).delete(gmail_disconnect))
        .route("/api/gmail/token", post(gmail_store_token))
}

// ─── User Profile ────────────────────────────────────────────

/// Get current user profile (from the session).
async fn get_me(Extension(user): Extension<SessionUser>) -> Json<SessionUser> {
    Json(user)
}

// ─── Gmail Connection ────────────────────────────────────────

/// Gmail connection status. Tokens are never returned.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GmailStatusResponse {
    pub connected: bool,
    /// Access token expiry (RFC3339); a refresh happens on next use after this
    pub expires_at: Option<String>,
    pub can_refresh: bool,
}

async fn gmail_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<GmailStatusResponse>> {
    let credential = state.credentials.status(&user.uid).await?;

    Ok(Json(match credential {
        Some(c) => GmailStatusResponse {
            connected: true,
            expires_at: DateTime::from_timestamp_millis(c.expires_at).map(format_utc_rfc3339),
            can_refresh: !c.refresh_token.is_empty(),
        },
        None => GmailStatusResponse {
            connected: false,
            expires_at: None,
            can_refresh: false,
        },
    }))
}

async fn gmail_disconnect(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
) -> Result<StatusCode> {
    state.credentials.revoke(&user.uid).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// A grant obtained by the browser (popup sign-in with the Gmail scope).
#[derive(Deserialize, Validate)]
pub struct StoreTokenRequest {
    #[validate(length(min = 1, message = "access_token is required"))]
    access_token: String,
    #[serde(default)]
    refresh_token: String,
}

async fn gmail_store_token(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    Json(body): Json<StoreTokenRequest>,
) -> Result<Json<GmailStatusResponse>> {
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    if body.refresh_token.is_empty() {
        tracing::warn!(uid = %user.uid, "Gmail grant stored without refresh token");
    }

    let credential = state
        .credentials
        .store(&user.uid, &body.access_token, &body.refresh_token)
        .await?;

    tracing::info!(uid = %user.uid, "Gmail credential stored");
    Ok(Json(GmailStatusResponse {
        connected: true,
        expires_at: DateTime::from_timestamp_millis(credential.expires_at)
            .map(format_utc_rfc3339),
        can_refresh: !credential.refresh_token.is_empty(),
    }))
}
