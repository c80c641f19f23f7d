// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Gmail delegated-access credential.

use serde::{Deserialize, Serialize};

/// User's Gmail OAuth tokens, stored in `userTokens/{uid}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCredential {
    /// Gmail access token
    pub access_token: String,
    /// Refresh token (empty if the grant did not include one)
    pub refresh_token: String,
    /// When the access token expires (epoch milliseconds)
    pub expires_at: i64,
}

impl UserCredential {
    /// A revoked credential: empty tokens, expired at the epoch.
    pub fn revoked() -> Self {
        Self {
            access_token: String::new(),
            refresh_token: String::new(),
            expires_at: 0,
        }
    }

    /// Whether this record holds no usable token (never granted or revoked).
    pub fn is_empty(&self) -> bool {
        self.access_token.is_empty()
    }

    /// Whether the access token is expired at `now_ms`.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at
    }
}
