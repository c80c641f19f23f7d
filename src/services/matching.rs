// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Professor matching: research interest in, candidate list out.

use crate::error::AppError;
use crate::models::Professor;
use crate::services::backend::BackendClient;
use serde_json::Value;

const MATCH_FALLBACK: &str = "Failed to find matching professors. Please try again.";

/// Matching service client.
#[derive(Clone)]
pub struct MatchingClient {
    backend: BackendClient,
}

impl MatchingClient {
    pub fn new(backend: BackendClient) -> Self {
        Self { backend }
    }

    /// Find candidate professors for a free-text research interest.
    ///
    /// Blank input is rejected before any request is made.
    pub async fn match_professors(&self, query: &str) -> Result<Vec<Professor>, AppError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::BadRequest(
                "Research interest must not be empty".to_string(),
            ));
        }

        let response = self.backend.scraping(query, MATCH_FALLBACK).await?;
        let professors = normalize_professors(&response)?;

        tracing::info!(count = professors.len(), "Matching professors found");
        Ok(professors)
    }
}

/// Normalize the matching service's loosely typed array into [`Professor`]s.
pub fn normalize_professors(response: &Value) -> Result<Vec<Professor>, AppError> {
    let items = response.as_array().ok_or_else(|| {
        tracing::warn!("Matching response is not an array");
        AppError::Upstream(MATCH_FALLBACK.to_string())
    })?;

    Ok(items
        .iter()
        .enumerate()
        .map(|(index, item)| normalize_professor(index, item))
        .collect())
}

fn normalize_professor(index: usize, item: &Value) -> Professor {
    let text = |field: &str| -> Option<String> {
        item.get(field)
            .and_then(scalar_to_string)
            .filter(|s| !s.is_empty())
    };

    let research_areas = match item.get("research_areas") {
        Some(Value::Array(areas)) => areas.iter().filter_map(scalar_to_string).collect(),
        Some(other) => vec![scalar_to_string(other)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "General Research".to_string())],
        None => vec!["General Research".to_string()],
    };

    let additional_data = match item.get("additional_data") {
        Some(Value::Array(data)) => data.iter().map(stringify).collect(),
        Some(Value::Null) | None => vec![String::new()],
        Some(other) => vec![stringify(other)],
    };

    Professor {
        id: text("id").unwrap_or_else(|| format!("prof_{}", index)),
        name: text("name").unwrap_or_else(|| "Unknown Professor".to_string()),
        department: text("department").unwrap_or_else(|| "Unknown Department".to_string()),
        research_areas,
        email: text("email").unwrap_or_default(),
        additional_data,
    }
}

/// Strings and numbers as text; anything else is absent.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Any JSON value as text (objects and arrays as compact JSON).
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
