// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sign-in sessions and the Gmail OAuth grant.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, SESSION_COOKIE, SESSION_TTL_SECS};
use crate::models::SessionUser;
use crate::services::credentials::CREDENTIAL_TTL_MS;
use crate::services::IdTokenError;
use crate::time_utils::now_millis;
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

/// How long a Gmail consent round trip may take (10 minutes).
const OAUTH_STATE_TTL_MS: i64 = 10 * 60 * 1000;

/// Routes that establish or end a session.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/session", post(create_session))
        .route("/auth/logout", post(logout))
        .route("/auth/gmail/callback", get(gmail_callback))
}

/// Routes that need a session (mounted behind `require_auth`).
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/gmail", get(gmail_start))
}

// ─── Session ─────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SessionRequest {
    id_token: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionResponse {
    pub user: SessionUser,
    /// Same JWT as the session cookie, for clients that send a Bearer header
    pub token: String,
}

/// Exchange an identity provider ID token for a session.
async fn create_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<SessionRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let user = state
        .id_token_verifier
        .verify(body.id_token.trim())
        .await
        .map_err(|e| match e {
            IdTokenError::Invalid(msg) => {
                tracing::warn!(error = %msg, "Rejected sign-in ID token");
                AppError::InvalidToken
            }
            IdTokenError::Transient(msg) => AppError::Upstream(msg),
        })?;

    let token = create_jwt(&user, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    tracing::info!(uid = %user.uid, "Session created");

    let jar = jar.add(session_cookie(
        &state.config,
        token.clone(),
        time::Duration::seconds(SESSION_TTL_SECS as i64),
    ));
    Ok((jar, Json(SessionResponse { user, token })))
}

/// End the session by expiring the cookie.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, StatusCode) {
    let jar = jar.add(session_cookie(
        &state.config,
        String::new(),
        time::Duration::ZERO,
    ));
    (jar, StatusCode::NO_CONTENT)
}

fn session_cookie(config: &Config, value: String, max_age: time::Duration) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .secure(config.secure_cookies())
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .build()
}

// ─── Gmail grant ─────────────────────────────────────────────

/// Start the Gmail consent flow for the signed-in user.
async fn gmail_start(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
) -> Result<Redirect> {
    let oauth_state = sign_state(&user.uid, now_millis(), &state.config.oauth_state_key)?;
    let auth_url = state.gmail_oauth.authorization_url(&oauth_state);

    tracing::info!(uid = %user.uid, "Starting Gmail OAuth flow");
    Ok(Redirect::temporary(&auth_url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Google redirects here after consent. Always lands back on the frontend.
async fn gmail_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    let outcome = match complete_gmail_grant(&state, params).await {
        Ok(uid) => {
            tracing::info!(uid = %uid, "Gmail connected");
            "connected"
        }
        Err(e) => {
            tracing::warn!(error = %e, "Gmail OAuth callback failed");
            "error"
        }
    };

    Redirect::temporary(&format!("{}?gmail={}", state.config.frontend_url, outcome))
}

async fn complete_gmail_grant(state: &AppState, params: CallbackParams) -> Result<String> {
    if let Some(error) = params.error {
        return Err(AppError::BadRequest(format!("Consent denied: {error}")));
    }

    let uid = params
        .state
        .as_deref()
        .and_then(|s| verify_state(s, &state.config.oauth_state_key, now_millis()))
        .ok_or_else(|| AppError::BadRequest("Invalid or expired OAuth state".to_string()))?;

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;

    let grant = state.gmail_oauth.exchange_code(&code).await?;

    if let Some(expires_in) = grant.expires_in {
        if differs_from_credential_ttl(expires_in) {
            tracing::info!(
                uid = %uid,
                provider_expires_in = expires_in,
                "Provider token lifetime differs from fixed credential TTL"
            );
        }
    }

    // Google omits the refresh token on some repeat grants; keep the old one
    let refresh_token = match grant.refresh_token.filter(|t| !t.is_empty()) {
        Some(token) => token,
        None => state
            .credentials
            .status(&uid)
            .await?
            .map(|c| c.refresh_token)
            .unwrap_or_default(),
    };

    state
        .credentials
        .store(&uid, &grant.access_token, &refresh_token)
        .await?;
    Ok(uid)
}

/// Build the signed `state` parameter: base64url("uid|timestamp_hex|signature_hex").
fn sign_state(uid: &str, now_ms: i64, secret: &[u8]) -> Result<String> {
    let payload = format!("{}|{:x}", uid, now_ms);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = mac.finalize().into_bytes();

    let signed = format!("{}|{}", payload, hex::encode(signature));
    Ok(URL_SAFE_NO_PAD.encode(signed.as_bytes()))
}

/// Verify the HMAC and age of a `state` parameter and return its uid.
fn verify_state(state: &str, secret: &[u8], now_ms: i64) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    // uid may not contain '|', so split from the right
    let mut parts = state_str.rsplitn(3, '|');
    let signature_hex = parts.next()?;
    let timestamp_hex = parts.next()?;
    let uid = parts.next()?;
    if uid.is_empty() {
        return None;
    }

    let payload = format!("{}|{}", uid, timestamp_hex);
    let signature = hex::decode(signature_hex).ok()?;

    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());
    if mac.verify_slice(&signature).is_err() {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    let issued_at = i64::from_str_radix(timestamp_hex, 16).ok()?;
    let age = now_ms - issued_at;
    if !(0..=OAUTH_STATE_TTL_MS).contains(&age) {
        tracing::warn!(age_ms = age, "OAuth state expired");
        return None;
    }

    Some(uid.to_string())
}

/// Whether a provider `expires_in` (seconds) disagrees with the fixed TTL.
fn differs_from_credential_ttl(expires_in: i64) -> bool {
    expires_in.checked_mul(1000) != Some(CREDENTIAL_TTL_MS)
}
