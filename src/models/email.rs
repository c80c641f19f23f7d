// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Outreach email records (the `emails` collection).

use crate::time_utils::{rfc3339, rfc3339_option};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Delivery status of a record.
///
/// A send attempt moves `Scheduled -> Sent | Failed` on the same record.
/// `Delivered` is part of the stored vocabulary but is never written here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum EmailStatus {
    Sent,
    Scheduled,
    Delivered,
    Failed,
}

impl EmailStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailStatus::Sent => "sent",
            EmailStatus::Scheduled => "scheduled",
            EmailStatus::Delivered => "delivered",
            EmailStatus::Failed => "failed",
        }
    }
}

/// Stored delivery attempt. Document ID is `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRecord {
    pub id: String,
    /// Owner (identity provider uid)
    pub user_id: String,
    pub professor_name: String,
    pub professor_email: String,
    pub user_email: String,
    pub subject: String,
    pub body: String,
    pub research_interest: String,
    pub status: EmailStatus,
    /// When delivery succeeded
    #[serde(with = "rfc3339_option", default)]
    pub sent_at: Option<DateTime<Utc>>,
    /// When delivery was requested for
    #[serde(with = "rfc3339_option", default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Recipient override (defaults to `professor_email`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(with = "rfc3339")]
    pub created_at: DateTime<Utc>,
}

impl DeliveryRecord {
    /// Recipient address, falling back to the professor's email.
    pub fn recipient(&self) -> &str {
        self.to
            .as_deref()
            .filter(|to| !to.trim().is_empty())
            .unwrap_or(&self.professor_email)
    }

    /// When this record last changed hands: `sent_at` once delivered,
    /// otherwise `created_at`.
    pub fn activity_at(&self) -> DateTime<Utc> {
        self.sent_at.unwrap_or(self.created_at)
    }

    /// History display order: activity time descending, ties broken by
    /// `created_at` descending.
    pub fn display_cmp(&self, other: &Self) -> Ordering {
        other
            .activity_at()
            .cmp(&self.activity_at())
            .then_with(|| other.created_at.cmp(&self.created_at))
    }

    /// Content of this record as a new outgoing email.
    pub fn to_outgoing(&self) -> OutgoingEmail {
        OutgoingEmail {
            user_id: self.user_id.clone(),
            professor_name: self.professor_name.clone(),
            professor_email: self.professor_email.clone(),
            user_email: self.user_email.clone(),
            subject: self.subject.clone(),
            body: self.body.clone(),
            research_interest: self.research_interest.clone(),
            to: self.to.clone(),
        }
    }
}

/// An email about to be sent or scheduled, before it has a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub user_id: String,
    pub professor_name: String,
    pub professor_email: String,
    pub user_email: String,
    pub subject: String,
    pub body: String,
    pub research_interest: String,
    pub to: Option<String>,
}

impl OutgoingEmail {
    /// Build a new record with a fresh id.
    pub fn into_record(
        self,
        status: EmailStatus,
        scheduled_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> DeliveryRecord {
        DeliveryRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: self.user_id,
            professor_name: self.professor_name,
            professor_email: self.professor_email,
            user_email: self.user_email,
            subject: self.subject,
            body: self.body,
            research_interest: self.research_interest,
            status,
            sent_at: None,
            scheduled_at,
            to: self.to,
            created_at: now,
        }
    }
}
