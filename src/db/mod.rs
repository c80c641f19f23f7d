// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    /// Gmail credentials (keyed by uid)
    pub const USER_TOKENS: &str = "userTokens";
    /// Delivery history (keyed by generated record id)
    pub const EMAILS: &str = "emails";
}
