// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod credential;
pub mod email;
pub mod professor;
pub mod user;

pub use credential::UserCredential;
pub use email::{DeliveryRecord, EmailStatus, OutgoingEmail};
pub use professor::{EmailDraft, Professor};
pub use user::SessionUser;
