// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Credentials (Gmail OAuth tokens, one document per user)
//! - Emails (append-only delivery history)
//!
//! An in-memory backend with the same semantics backs tests and local
//! development without the emulator.

use crate::db::collections;
use crate::error::AppError;
use crate::models::{DeliveryRecord, UserCredential};
use dashmap::DashMap;
use std::sync::Arc;

/// In-process document storage.
#[derive(Default)]
struct MemoryStore {
    tokens: DashMap<String, UserCredential>,
    emails: DashMap<String, DeliveryRecord>,
}

#[derive(Clone)]
enum Backend {
    Firestore(firestore::FirestoreDb),
    Memory(Arc<MemoryStore>),
    Offline,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    backend: Backend,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            backend: Backend::Firestore(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            backend: Backend::Firestore(client),
        })
    }

    /// Create an in-memory database (tests and local development).
    pub fn new_in_memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(MemoryStore::default())),
        }
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self {
            backend: Backend::Offline,
        }
    }

    fn offline() -> AppError {
        AppError::Database("Database not connected (offline mode)".to_string())
    }

    // ─── Credential Operations ───────────────────────────────────

    /// Get the Gmail credential for a user.
    pub async fn get_credential(&self, uid: &str) -> Result<Option<UserCredential>, AppError> {
        match &self.backend {
            Backend::Firestore(client) => client
                .fluent()
                .select()
                .by_id_in(collections::USER_TOKENS)
                .obj()
                .one(uid)
                .await
                .map_err(|e| AppError::Database(e.to_string())),
            Backend::Memory(store) => Ok(store.tokens.get(uid).map(|c| c.clone())),
            Backend::Offline => Err(Self::offline()),
        }
    }

    /// Create or replace the Gmail credential for a user.
    pub async fn set_credential(
        &self,
        uid: &str,
        credential: &UserCredential,
    ) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(client) => {
                let _: () = client
                    .fluent()
                    .update()
                    .in_col(collections::USER_TOKENS)
                    .document_id(uid)
                    .object(credential)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(())
            }
            Backend::Memory(store) => {
                store.tokens.insert(uid.to_string(), credential.clone());
                Ok(())
            }
            Backend::Offline => Err(Self::offline()),
        }
    }

    // ─── Email Record Operations ─────────────────────────────────

    /// Get a single email record by id.
    pub async fn get_email(&self, id: &str) -> Result<Option<DeliveryRecord>, AppError> {
        match &self.backend {
            Backend::Firestore(client) => client
                .fluent()
                .select()
                .by_id_in(collections::EMAILS)
                .obj()
                .one(id)
                .await
                .map_err(|e| AppError::Database(e.to_string())),
            Backend::Memory(store) => Ok(store.emails.get(id).map(|r| r.clone())),
            Backend::Offline => Err(Self::offline()),
        }
    }

    /// Store an email record under its id.
    ///
    /// Used both for new records and for the in-place status transition of
    /// a send attempt.
    pub async fn put_email(&self, record: &DeliveryRecord) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(client) => {
                let _: () = client
                    .fluent()
                    .update()
                    .in_col(collections::EMAILS)
                    .document_id(&record.id)
                    .object(record)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(())
            }
            Backend::Memory(store) => {
                store.emails.insert(record.id.clone(), record.clone());
                Ok(())
            }
            Backend::Offline => Err(Self::offline()),
        }
    }

    /// Get a user's email history, newest activity first.
    ///
    /// A record's activity time is `sentAt`, or `createdAt` for records that
    /// were never sent (scheduled or failed). Firestore cannot order by a
    /// fallback field, so the user's records are sorted after the query.
    pub async fn list_emails_for_user(&self, uid: &str) -> Result<Vec<DeliveryRecord>, AppError> {
        match &self.backend {
            Backend::Firestore(client) => {
                let mut records: Vec<DeliveryRecord> = client
                    .fluent()
                    .select()
                    .from(collections::EMAILS)
                    .filter(|q| q.for_all([q.field("userId").eq(uid)]))
                    .obj()
                    .query()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                records.sort_by(|a, b| a.display_cmp(b));
                Ok(records)
            }
            Backend::Memory(store) => {
                let mut records: Vec<DeliveryRecord> = store
                    .emails
                    .iter()
                    .filter(|r| r.user_id == uid)
                    .map(|r| r.clone())
                    .collect();
                records.sort_by(|a, b| a.display_cmp(b));
                Ok(records)
            }
            Backend::Offline => Err(Self::offline()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EmailStatus, OutgoingEmail};
    use chrono::{Duration, Utc};

    fn outgoing(uid: &str) -> OutgoingEmail {
        OutgoingEmail {
            user_id: uid.to_string(),
            professor_name: "Barbara Liskov".to_string(),
            professor_email: "liskov@example.edu".to_string(),
            user_email: "me@example.com".to_string(),
            subject: "Distributed systems".to_string(),
            body: "Hello".to_string(),
            research_interest: "distributed systems".to_string(),
            to: None,
        }
    }

    #[tokio::test]
    async fn test_memory_credentials_round_trip() {
        let db = FirestoreDb::new_in_memory();
        assert!(db.get_credential("u1").await.unwrap().is_none());

        let credential = UserCredential {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_at: 42,
        };
        db.set_credential("u1", &credential).await.unwrap();

        assert_eq!(db.get_credential("u1").await.unwrap(), Some(credential));
        assert!(db.get_credential("u2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_history_is_per_user_and_ordered() {
        let db = FirestoreDb::new_in_memory();
        let now = Utc::now();

        let mut first = outgoing("u1").into_record(EmailStatus::Sent, None, now);
        first.sent_at = Some(now);
        let mut second = outgoing("u1").into_record(EmailStatus::Sent, None, now);
        second.sent_at = Some(now + Duration::seconds(5));
        let other_user = outgoing("u2").into_record(EmailStatus::Failed, None, now);

        for record in [&first, &second, &other_user] {
            db.put_email(record).await.unwrap();
        }

        let history = db.list_emails_for_user("u1").await.unwrap();
        let ids: Vec<_> = history.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn test_offline_mode_errors() {
        let db = FirestoreDb::new_mock();
        assert!(matches!(
            db.get_credential("u1").await,
            Err(AppError::Database(_))
        ));
        assert!(matches!(
            db.list_emails_for_user("u1").await,
            Err(AppError::Database(_))
        ));
    }
}
