// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Email delivery with an audit record per attempt.
//!
//! A send writes its record before calling the delivery endpoint, then moves
//! that same record from `scheduled` to `sent` or `failed`. A schedule only
//! writes a record: nothing in this service fires delivery when the
//! scheduled time arrives.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::{DeliveryRecord, EmailStatus, OutgoingEmail};
use crate::services::backend::{BackendClient, SendEmailRequest};
use chrono::{DateTime, Utc};
use serde::Serialize;

const SEND_FALLBACK: &str = "Failed to send email";

/// Result of a send attempt. The record exists whether or not delivery
/// succeeded.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryOutcome {
    pub record: DeliveryRecord,
    /// Delivery error message when `record.status` is `failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeliveryOutcome {
    pub fn succeeded(&self) -> bool {
        self.record.status == EmailStatus::Sent
    }
}

/// Delivery client plus the record store.
#[derive(Clone)]
pub struct DeliveryService {
    backend: BackendClient,
    db: FirestoreDb,
}

impl DeliveryService {
    pub fn new(backend: BackendClient, db: FirestoreDb) -> Self {
        Self { backend, db }
    }

    /// Send `email` now with a valid Gmail access token.
    ///
    /// Fails only if the audit record cannot be written; a delivery failure
    /// is reported through the returned outcome.
    pub async fn send(
        &self,
        email: OutgoingEmail,
        access_token: &str,
    ) -> Result<DeliveryOutcome, AppError> {
        let now = Utc::now();
        let mut record = email.into_record(EmailStatus::Scheduled, Some(now), now);

        // No send without an audit trail
        self.db.put_email(&record).await?;

        let request = SendEmailRequest {
            access_token,
            to: record.recipient(),
            subject: &record.subject,
            body: &record.body,
        };
        let result = self.backend.send_email(&request, SEND_FALLBACK).await;

        let error = match result {
            Ok(()) => {
                record.status = EmailStatus::Sent;
                record.sent_at = Some(Utc::now());
                tracing::info!(record_id = %record.id, to = %record.recipient(), "Email sent");
                None
            }
            Err(e) => {
                record.status = EmailStatus::Failed;
                let msg = match e {
                    AppError::Upstream(msg) => msg,
                    other => other.to_string(),
                };
                tracing::warn!(record_id = %record.id, error = %msg, "Email delivery failed");
                Some(msg)
            }
        };

        if let Err(e) = self.db.put_email(&record).await {
            tracing::error!(
                record_id = %record.id,
                status = record.status.as_str(),
                error = %e,
                "Failed to record delivery status"
            );
        }

        Ok(DeliveryOutcome { record, error })
    }

    /// Record `email` as scheduled for `at`, which must be in the future.
    pub async fn schedule(
        &self,
        email: OutgoingEmail,
        at: DateTime<Utc>,
    ) -> Result<DeliveryRecord, AppError> {
        let now = Utc::now();
        if at <= now {
            return Err(AppError::BadRequest(
                "Please select a future date and time.".to_string(),
            ));
        }

        let record = email.into_record(EmailStatus::Scheduled, Some(at), now);
        self.db.put_email(&record).await?;

        tracing::info!(
            record_id = %record.id,
            scheduled_at = %at,
            "Email scheduled (record only, no dispatcher)"
        );
        Ok(record)
    }
}
