// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Email history and follow-up actions.

use crate::error::Result;
use crate::models::{DeliveryRecord, SessionUser};
use crate::services::outreach::EditedEmail;
use crate::services::DeliveryOutcome;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/emails", get(list_emails))
        .route("/api/emails/{id}/resend", post(resend))
        .route("/api/emails/{id}/edit-resend", post(edit_and_resend))
        .route("/api/emails/{id}/reminder", post(send_reminder))
        .route("/api/emails/{id}/schedule", post(schedule_resend))
}

async fn list_emails(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<Vec<DeliveryRecord>>> {
    Ok(Json(state.outreach.history(&user.uid).await?))
}

/// 200 with the new `sent` record, or 502 with the new `failed` one.
fn delivery_response(outcome: DeliveryOutcome) -> (StatusCode, Json<DeliveryOutcome>) {
    let status = if outcome.succeeded() {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };
    (status, Json(outcome))
}

async fn resend(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<DeliveryOutcome>)> {
    let outcome = state.outreach.resend(&user.uid, &id).await?;
    Ok(delivery_response(outcome))
}

async fn edit_and_resend(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    Path(id): Path<String>,
    Json(body): Json<EditedEmail>,
) -> Result<(StatusCode, Json<DeliveryOutcome>)> {
    let outcome = state.outreach.edit_and_resend(&user.uid, &id, body).await?;
    Ok(delivery_response(outcome))
}

async fn send_reminder(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<DeliveryOutcome>)> {
    let outcome = state.outreach.send_reminder(&user.uid, &id).await?;
    Ok(delivery_response(outcome))
}

#[derive(Deserialize)]
pub struct ScheduleResendRequest {
    scheduled_at: DateTime<Utc>,
}

async fn schedule_resend(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    Path(id): Path<String>,
    Json(body): Json<ScheduleResendRequest>,
) -> Result<Json<DeliveryRecord>> {
    let record = state
        .outreach
        .schedule_resend(&user.uid, &id, body.scheduled_at)
        .await?;
    Ok(Json(record))
}
