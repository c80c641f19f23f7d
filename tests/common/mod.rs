// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request};
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use professor_connect::config::Config;
use professor_connect::db::FirestoreDb;
use professor_connect::middleware::auth::create_jwt;
use professor_connect::models::{SessionUser, UserCredential};
use professor_connect::routes::create_router;
use professor_connect::services::IdTokenVerifier;
use professor_connect::time_utils::now_millis;
use professor_connect::AppState;
use serde::Serialize;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Key id used for ID tokens minted by tests.
#[allow(dead_code)]
pub const TEST_KID: &str = "test-kid";

const SIGNING_KEY_PEM: &[u8] = include_bytes!("../fixtures/id_token_signing_key.pem");
const PUBLIC_KEY_PEM: &[u8] = include_bytes!("../fixtures/id_token_public_key.pem");

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline, every call fails).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Create a test app with an in-memory database and the backend at
/// `api_base_url` (usually a wiremock server).
#[allow(dead_code)]
pub fn create_test_app_with_backend(api_base_url: &str) -> (axum::Router, Arc<AppState>) {
    let mut config = Config::test_default();
    config.api_base_url = api_base_url.to_string();
    create_test_app_with_config(config, FirestoreDb::new_in_memory())
}

/// Create a test app whose backend is unreachable.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with_config(Config::test_default(), FirestoreDb::new_in_memory())
}

#[allow(dead_code)]
pub fn create_test_app_with_config(
    config: Config,
    db: FirestoreDb,
) -> (axum::Router, Arc<AppState>) {
    let verifier = IdTokenVerifier::new_with_static_key(
        &config,
        TEST_KID,
        DecodingKey::from_rsa_pem(PUBLIC_KEY_PEM).expect("test public key"),
    )
    .expect("static verifier");

    let state = Arc::new(
        AppState::new(config, db, Arc::new(verifier)).expect("Failed to build app state"),
    );
    (create_router(state.clone()), state)
}

/// A signed-in user.
#[allow(dead_code)]
pub fn test_user(uid: &str) -> SessionUser {
    SessionUser {
        uid: uid.to_string(),
        display_name: "Ada Student".to_string(),
        email: format!("{uid}@students.example.edu"),
        avatar_url: None,
    }
}

/// Session JWT for `user`, signed with the app's key.
#[allow(dead_code)]
pub fn create_test_jwt(state: &AppState, user: &SessionUser) -> String {
    create_jwt(user, &state.config.jwt_signing_key).expect("JWT creation")
}

/// Build a request authenticated with a Bearer session token.
#[allow(dead_code)]
pub fn authed_request(
    state: &AppState,
    user: &SessionUser,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::AUTHORIZATION,
            format!("Bearer {}", create_test_jwt(state, user)),
        );

    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("JSON body")
}

/// Store a Gmail credential that expires `expires_in_ms` from now
/// (negative for an already expired one).
#[allow(dead_code)]
pub async fn seed_credential(
    db: &FirestoreDb,
    uid: &str,
    access_token: &str,
    expires_in_ms: i64,
) -> UserCredential {
    let credential = UserCredential {
        access_token: access_token.to_string(),
        refresh_token: "refresh-token".to_string(),
        expires_at: now_millis() + expires_in_ms,
    };
    db.set_credential(uid, &credential)
        .await
        .expect("seed credential");
    credential
}

#[derive(Serialize)]
struct IdTokenClaims<'a> {
    iss: String,
    aud: &'a str,
    sub: &'a str,
    iat: usize,
    exp: usize,
    name: &'a str,
    email: &'a str,
}

/// Mint an identity provider ID token for `audience` with the test key.
#[allow(dead_code)]
pub fn create_test_id_token(audience: &str, user: &SessionUser) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize;

    let claims = IdTokenClaims {
        iss: format!("https://securetoken.google.com/{audience}"),
        aud: audience,
        sub: &user.uid,
        iat: now,
        exp: now + 3600,
        name: &user.display_name,
        email: &user.email,
    };

    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(TEST_KID.to_string());

    encode(
        &header,
        &claims,
        &EncodingKey::from_rsa_pem(SIGNING_KEY_PEM).expect("test signing key"),
    )
    .unwrap()
}
