// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Gmail grant tests: consent redirect, callback, manual token storage and
//! disconnect.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use professor_connect::config::Config;
use professor_connect::db::FirestoreDb;
use professor_connect::routes::create_router;
use professor_connect::services::{GmailOAuthClient, IdTokenVerifier};
use professor_connect::AppState;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;

/// App whose Google token endpoint is the mock server.
fn app_with_token_endpoint(server: &MockServer) -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let verifier = Arc::new(IdTokenVerifier::new(&config).unwrap());
    let mut state = AppState::new(config, FirestoreDb::new_in_memory(), verifier).unwrap();
    state.gmail_oauth =
        GmailOAuthClient::new(&state.config).with_token_url(format!("{}/token", server.uri()));

    let state = Arc::new(state);
    (create_router(state.clone()), state)
}

fn location(response: &axum::response::Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("redirect location")
        .to_str()
        .unwrap()
        .to_string()
}

fn query_param(url: &str, name: &str) -> Option<String> {
    let query = url.split_once('?')?.1;
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| urlencoding::decode(value).unwrap().into_owned())
    })
}

#[tokio::test]
async fn test_consent_round_trip_stores_credential() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("code=auth-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.access",
            "refresh_token": "1//refresh",
            "expires_in": 3599,
            "scope": "https://www.googleapis.com/auth/gmail.send",
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (app, state) = app_with_token_endpoint(&server);
    let user = common::test_user("u1");

    let response = app
        .clone()
        .oneshot(common::authed_request(&state, &user, "GET", "/auth/gmail", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let consent_url = location(&response);
    assert!(consent_url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
    let oauth_state = query_param(&consent_url, "state").expect("state parameter");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!(
                    "/auth/gmail/callback?code=auth-code&state={}",
                    urlencoding::encode(&oauth_state)
                ))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(location(&response), "http://localhost:5173?gmail=connected");

    let stored = state.db.get_credential("u1").await.unwrap().unwrap();
    assert_eq!(stored.access_token, "ya29.access");
    assert_eq!(stored.refresh_token, "1//refresh");

    let response = app
        .oneshot(common::authed_request(&state, &user, "GET", "/api/gmail", None))
        .await
        .unwrap();
    let status = common::body_json(response).await;
    assert_eq!(status["connected"], true);
    assert_eq!(status["can_refresh"], true);
}

#[tokio::test]
async fn test_callback_tolerates_out_of_range_expires_in() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.access",
            "refresh_token": "1//refresh",
            "expires_in": i64::MAX,
            "scope": "https://www.googleapis.com/auth/gmail.send",
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (app, state) = app_with_token_endpoint(&server);
    let user = common::test_user("u1");

    let response = app
        .clone()
        .oneshot(common::authed_request(&state, &user, "GET", "/auth/gmail", None))
        .await
        .unwrap();
    let oauth_state = query_param(&location(&response), "state").expect("state parameter");

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!(
                    "/auth/gmail/callback?code=auth-code&state={}",
                    urlencoding::encode(&oauth_state)
                ))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(location(&response), "http://localhost:5173?gmail=connected");
    let stored = state.db.get_credential("u1").await.unwrap().unwrap();
    assert_eq!(stored.access_token, "ya29.access");
}

#[tokio::test]
async fn test_callback_with_forged_state_never_exchanges() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (app, state) = app_with_token_endpoint(&server);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/gmail/callback?code=auth-code&state=dTF8MTIzfGRlYWRiZWVm")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(location(&response), "http://localhost:5173?gmail=error");
    assert!(state.db.get_credential("u1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_callback_consent_denied() {
    let server = MockServer::start().await;
    let (app, _) = app_with_token_endpoint(&server);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/gmail/callback?error=access_denied")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(location(&response), "http://localhost:5173?gmail=error");
}

#[tokio::test]
async fn test_manual_token_store_and_disconnect() {
    let (app, state) = common::create_test_app();
    let user = common::test_user("u1");

    let response = app
        .clone()
        .oneshot(common::authed_request(
            &state,
            &user,
            "POST",
            "/api/gmail/token",
            Some(json!({ "access_token": "", "refresh_token": "r" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(common::authed_request(
            &state,
            &user,
            "POST",
            "/api/gmail/token",
            Some(json!({ "access_token": "a", "refresh_token": "r" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(common::body_json(response).await["connected"], true);

    let response = app
        .clone()
        .oneshot(common::authed_request(&state, &user, "DELETE", "/api/gmail", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let stored = state.db.get_credential("u1").await.unwrap().unwrap();
    assert!(stored.access_token.is_empty());
    assert_eq!(stored.expires_at, 0);

    let response = app
        .oneshot(common::authed_request(&state, &user, "GET", "/api/gmail", None))
        .await
        .unwrap();
    assert_eq!(common::body_json(response).await["connected"], false);
}
