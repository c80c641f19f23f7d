// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Gmail credential lifecycle: store, validate, refresh, revoke.
//!
//! Every access token has a fixed one-hour lifetime counted from when it was
//! stored. The lifetime reported by Google is deliberately not used; it may
//! differ from the real token lifetime and that divergence is logged.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::UserCredential;
use crate::services::backend::BackendClient;
use crate::time_utils::now_millis;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Fixed access-token lifetime (1 hour).
pub const CREDENTIAL_TTL_MS: i64 = 60 * 60 * 1000;

const REFRESH_FALLBACK: &str = "Failed to refresh Gmail access";

/// Shared refresh locks type for use in AppState.
pub type RefreshLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Credential manager for Gmail delegated access.
#[derive(Clone)]
pub struct CredentialManager {
    backend: BackendClient,
    db: FirestoreDb,
    /// Per-user mutex to serialize refresh operations.
    refresh_locks: RefreshLocks,
}

impl CredentialManager {
    pub fn new(backend: BackendClient, db: FirestoreDb) -> Self {
        Self {
            backend,
            db,
            refresh_locks: Arc::new(DashMap::new()),
        }
    }

    /// Get a usable access token for `uid`.
    ///
    /// Returns `None` when no credential was ever granted or it was revoked.
    /// An expired token is refreshed first; a refresh failure is an error.
    /// A token that is still valid is returned without any write.
    pub async fn get_valid_credential(&self, uid: &str) -> Result<Option<String>, AppError> {
        let Some(credential) = self.db.get_credential(uid).await? else {
            return Ok(None);
        };
        if credential.is_empty() {
            return Ok(None);
        }
        if !credential.is_expired_at(now_millis()) {
            return Ok(Some(credential.access_token));
        }

        // Serialize refreshes for this user; a concurrent caller may already
        // have replaced the credential while we waited.
        let lock = self
            .refresh_locks
            .entry(uid.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let result = {
            let _guard = lock.lock().await;
            self.refresh_if_expired(uid).await
        };

        // Drop the entry once no other caller holds or waits on it
        drop(lock);
        self.refresh_locks
            .remove_if(uid, |_, lock| Arc::strong_count(lock) == 1);

        result
    }

    /// Re-read under the refresh lock and refresh only if still expired.
    async fn refresh_if_expired(&self, uid: &str) -> Result<Option<String>, AppError> {
        let Some(credential) = self.db.get_credential(uid).await? else {
            return Ok(None);
        };
        if credential.is_empty() {
            return Ok(None);
        }
        if !credential.is_expired_at(now_millis()) {
            return Ok(Some(credential.access_token));
        }

        tracing::info!(uid, "Gmail access token expired, refreshing");
        self.refresh(uid, &credential.refresh_token).await.map(Some)
    }

    /// Phase one of a send: a valid access token or a reconnect prompt.
    pub async fn acquire(&self, uid: &str) -> Result<String, AppError> {
        match self.get_valid_credential(uid).await {
            Ok(Some(token)) => Ok(token),
            Ok(None) => Err(AppError::GmailReconnect(
                "Please connect your Gmail account first.".to_string(),
            )),
            Err(AppError::Upstream(msg)) => {
                tracing::warn!(uid, error = %msg, "Gmail token refresh failed");
                Err(AppError::GmailReconnect(msg))
            }
            Err(e) => Err(e),
        }
    }

    /// Refresh the access token. The stored credential is replaced only on
    /// success.
    pub async fn refresh(&self, uid: &str, refresh_token: &str) -> Result<String, AppError> {
        if refresh_token.is_empty() {
            return Err(AppError::Upstream(
                "No refresh token stored; reconnect Gmail".to_string(),
            ));
        }

        let response = self
            .backend
            .refresh_token(refresh_token, REFRESH_FALLBACK)
            .await?;

        self.store(uid, &response.access_token, refresh_token)
            .await?;

        tracing::info!(uid, "Gmail access token refreshed");
        Ok(response.access_token)
    }

    /// Create or replace the credential, expiring one TTL from now.
    pub async fn store(
        &self,
        uid: &str,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<UserCredential, AppError> {
        let credential = UserCredential {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
            expires_at: now_millis() + CREDENTIAL_TTL_MS,
        };

        self.db.set_credential(uid, &credential).await?;
        Ok(credential)
    }

    /// Overwrite the credential with empty tokens.
    pub async fn revoke(&self, uid: &str) -> Result<(), AppError> {
        self.db
            .set_credential(uid, &UserCredential::revoked())
            .await?;
        tracing::info!(uid, "Gmail credential revoked");
        Ok(())
    }

    /// The stored credential, if any (status display).
    pub async fn status(&self, uid: &str) -> Result<Option<UserCredential>, AppError> {
        Ok(self
            .db
            .get_credential(uid)
            .await?
            .filter(|c| !c.is_empty()))
    }
}
