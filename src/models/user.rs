// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session user model.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// The signed-in user, as asserted by the identity provider.
///
/// Never stored by this service; it travels inside the session JWT and is
/// handed to handlers by the auth middleware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionUser {
    /// Identity provider subject id (Firebase uid)
    pub uid: String,
    /// Display name (may be empty)
    pub display_name: String,
    /// Email address (may be empty if not shared)
    pub email: String,
    /// Avatar URL
    pub avatar_url: Option<String>,
}
