// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Outreach wizard endpoints. Every response carries the resulting wizard.

use crate::error::Result;
use crate::flow::Wizard;
use crate::models::SessionUser;
use crate::services::outreach::FlowDelivery;
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/flow", get(get_flow))
        .route("/api/flow/search", post(search))
        .route("/api/flow/select", post(select))
        .route("/api/flow/draft", put(edit_draft))
        .route("/api/flow/back", post(back))
        .route("/api/flow/reset", post(reset))
        .route("/api/flow/send", post(send))
        .route("/api/flow/schedule", post(schedule))
}

async fn get_flow(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
) -> Json<Wizard> {
    Json(state.outreach.wizard(&user.uid))
}

#[derive(Deserialize)]
pub struct SearchRequest {
    research_interest: String,
}

async fn search(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    Json(body): Json<SearchRequest>,
) -> Result<Json<Wizard>> {
    let wizard = state
        .outreach
        .search(&user.uid, &body.research_interest)
        .await?;
    Ok(Json(wizard))
}

#[derive(Deserialize)]
pub struct SelectRequest {
    professor_id: String,
}

async fn select(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    Json(body): Json<SelectRequest>,
) -> Result<Json<Wizard>> {
    let wizard = state.outreach.select(&user, &body.professor_id).await?;
    Ok(Json(wizard))
}

/// Partial draft edit; absent fields are left as they are.
#[derive(Deserialize)]
pub struct EditDraftRequest {
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    to: Option<String>,
}

async fn edit_draft(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    Json(body): Json<EditDraftRequest>,
) -> Result<Json<Wizard>> {
    let wizard = state
        .outreach
        .edit_draft(&user.uid, body.subject, body.body, body.to)?;
    Ok(Json(wizard))
}

async fn back(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<Wizard>> {
    Ok(Json(state.outreach.back(&user.uid)?))
}

async fn reset(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
) -> Json<Wizard> {
    Json(state.outreach.reset(&user.uid))
}

/// Send now. A delivery failure still returns the failed record, with 502.
async fn send(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
) -> Result<(StatusCode, Json<FlowDelivery>)> {
    let delivery = state.outreach.send(&user).await?;
    let status = if delivery.error.is_none() {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };
    Ok((status, Json(delivery)))
}

#[derive(Deserialize)]
pub struct ScheduleRequest {
    scheduled_at: DateTime<Utc>,
}

async fn schedule(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    Json(body): Json<ScheduleRequest>,
) -> Result<Json<FlowDelivery>> {
    let delivery = state.outreach.schedule(&user, body.scheduled_at).await?;
    Ok(Json(delivery))
}
