// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Professor Connect: find professors by research interest and reach out
//! to them from your own Gmail account.
//!
//! This crate provides the backend API: sign-in sessions, the Gmail grant,
//! the outreach wizard and the history of sent emails.

pub mod config;
pub mod db;
pub mod error;
pub mod flow;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{
    BackendClient, CredentialManager, DeliveryService, DraftClient, GmailOAuthClient,
    IdTokenVerifier, MatchingClient, OutreachService,
};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub id_token_verifier: Arc<IdTokenVerifier>,
    pub gmail_oauth: GmailOAuthClient,
    pub credentials: CredentialManager,
    pub outreach: OutreachService,
}

impl AppState {
    /// Wire up the services around one backend client.
    pub fn new(
        config: Config,
        db: FirestoreDb,
        id_token_verifier: Arc<IdTokenVerifier>,
    ) -> anyhow::Result<Self> {
        let backend = BackendClient::new(&config.api_base_url, config.backend_timeout)?;
        let credentials = CredentialManager::new(backend.clone(), db.clone());
        let outreach = OutreachService::new(
            MatchingClient::new(backend.clone()),
            DraftClient::new(backend.clone()),
            credentials.clone(),
            DeliveryService::new(backend, db.clone()),
            db.clone(),
        );

        Ok(Self {
            gmail_oauth: GmailOAuthClient::new(&config),
            config,
            db,
            id_token_verifier,
            credentials,
            outreach,
        })
    }
}
