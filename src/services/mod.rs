// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod backend;
pub mod credentials;
pub mod delivery;
pub mod drafting;
pub mod gmail_oauth;
pub mod identity;
pub mod matching;
pub mod outreach;

pub use backend::BackendClient;
pub use credentials::CredentialManager;
pub use delivery::{DeliveryOutcome, DeliveryService};
pub use drafting::DraftClient;
pub use gmail_oauth::GmailOAuthClient;
pub use identity::{IdTokenError, IdTokenVerifier};
pub use matching::MatchingClient;
pub use outreach::OutreachService;
