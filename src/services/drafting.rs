// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Email drafting for a selected professor.

use crate::error::AppError;
use crate::models::{EmailDraft, Professor, SessionUser};
use crate::services::backend::{BackendClient, DraftRequest, DraftResponse};

const DRAFT_FALLBACK: &str = "Failed to generate email draft. Please try again.";

/// Drafting service client.
#[derive(Clone)]
pub struct DraftClient {
    backend: BackendClient,
}

impl DraftClient {
    pub fn new(backend: BackendClient) -> Self {
        Self { backend }
    }

    /// Draft an outreach email from `user` to `professor` about `query`.
    pub async fn draft_email(
        &self,
        professor: &Professor,
        query: &str,
        user: &SessionUser,
    ) -> Result<EmailDraft, AppError> {
        let request = DraftRequest {
            name: &professor.name,
            email: &professor.email,
            user_prompt: query,
            user_data: format!("name:{}", user.display_name),
            data: &professor.additional_data,
        };

        let response = self.backend.draft_email(&request, DRAFT_FALLBACK).await?;

        tracing::info!(professor = %professor.name, "Email draft generated");
        Ok(draft_from_response(response, professor, query))
    }
}

/// Fill in whatever the drafting service left out.
fn draft_from_response(response: DraftResponse, professor: &Professor, query: &str) -> EmailDraft {
    let non_empty = |s: Option<String>| s.filter(|s| !s.trim().is_empty());

    EmailDraft {
        subject: non_empty(response.subject)
            .unwrap_or_else(|| format!("Research Collaboration Opportunity - {}", query)),
        body: non_empty(response.body)
            .or_else(|| non_empty(response.message))
            .unwrap_or_default(),
        to: Some(non_empty(response.to).unwrap_or_else(|| professor.email.clone())),
    }
}
