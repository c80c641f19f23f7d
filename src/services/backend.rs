// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP client for the matching/drafting/delivery backend.
//!
//! Handles:
//! - Professor matching (`POST /api/scraping`)
//! - Email drafting (`POST /api/email`)
//! - Email delivery through Gmail (`POST /api/send-email`)
//! - Gmail token refresh (`POST /auth/refresh`)
//!
//! Failures surface the server's `message` field when present, otherwise a
//! static fallback. Nothing is retried.

use crate::error::AppError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backend API client.
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// Create a client for `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Find professors matching a research interest. The response is loosely
    /// typed and returned as raw JSON for normalization by the caller.
    pub async fn scraping(
        &self,
        prompt: &str,
        fallback: &str,
    ) -> Result<serde_json::Value, AppError> {
        let body = serde_json::json!({ "prompt": prompt });
        self.post_json("/api/scraping", &body, fallback).await
    }

    /// Ask the drafting service for a personalized email.
    pub async fn draft_email(
        &self,
        request: &DraftRequest<'_>,
        fallback: &str,
    ) -> Result<DraftResponse, AppError> {
        self.post_json("/api/email", request, fallback).await
    }

    /// Deliver an email through the user's Gmail account.
    pub async fn send_email(
        &self,
        request: &SendEmailRequest<'_>,
        fallback: &str,
    ) -> Result<(), AppError> {
        self.post("/api/send-email", request, fallback).await?;
        Ok(())
    }

    /// Exchange a refresh token for a new Gmail access token.
    pub async fn refresh_token(
        &self,
        refresh_token: &str,
        fallback: &str,
    ) -> Result<RefreshResponse, AppError> {
        let body = serde_json::json!({ "refresh_token": refresh_token });
        self.post_json("/auth/refresh", &body, fallback).await
    }

    /// POST a JSON body and check the response status.
    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        fallback: &str,
    ) -> Result<reqwest::Response, AppError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, path, "Backend request failed");
                AppError::Upstream(fallback.to_string())
            })?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = %status, path, "Backend returned error status");

        Err(AppError::Upstream(upstream_message(&body, fallback)))
    }

    /// POST and parse the JSON response.
    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        fallback: &str,
    ) -> Result<T, AppError> {
        let response = self.post(path, body, fallback).await?;

        response.json().await.map_err(|e| {
            tracing::warn!(error = %e, path, "Backend returned malformed JSON");
            AppError::Upstream(fallback.to_string())
        })
    }
}

/// Extract the server-provided `message` from an error body.
fn upstream_message(body: &str, fallback: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// Request body for `POST /api/email`.
#[derive(Debug, Serialize)]
pub struct DraftRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub user_prompt: &'a str,
    pub user_data: String,
    pub data: &'a [String],
}

/// Response from `POST /api/email`. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DraftResponse {
    pub subject: Option<String>,
    pub body: Option<String>,
    pub message: Option<String>,
    pub to: Option<String>,
}

/// Request body for `POST /api/send-email`.
#[derive(Debug, Serialize)]
pub struct SendEmailRequest<'a> {
    pub access_token: &'a str,
    pub to: &'a str,
    pub subject: &'a str,
    pub body: &'a str,
}

/// Response from `POST /auth/refresh`.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
}
