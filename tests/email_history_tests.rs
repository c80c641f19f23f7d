// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Email history tests: listing, resend, edit & resend, reminders.

use axum::http::StatusCode;
use chrono::{Duration as ChronoDuration, Utc};
use professor_connect::db::FirestoreDb;
use professor_connect::models::{DeliveryRecord, EmailStatus, OutgoingEmail};
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;

fn outgoing(uid: &str) -> OutgoingEmail {
    OutgoingEmail {
        user_id: uid.to_string(),
        professor_name: "Daphne Koller".to_string(),
        professor_email: "koller@example.edu".to_string(),
        user_email: format!("{uid}@students.example.edu"),
        subject: "Probabilistic models".to_string(),
        body: "Dear Professor Koller".to_string(),
        research_interest: "graphical models".to_string(),
        to: None,
    }
}

async fn seed_record(db: &FirestoreDb, uid: &str, status: EmailStatus) -> DeliveryRecord {
    let now = Utc::now();
    let mut record = outgoing(uid).into_record(status, Some(now), now);
    if status == EmailStatus::Sent {
        record.sent_at = Some(now);
    }
    db.put_email(&record).await.unwrap();
    record
}

async fn mount_send_ok(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/api/send-email"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_edit_and_resend_creates_new_record() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/send-email"))
        .and(body_partial_json(json!({
            "to": "koller.office@example.edu",
            "subject": "Probabilistic models (corrected)"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let (app, state) = common::create_test_app_with_backend(&server.uri());
    let user = common::test_user("u1");
    common::seed_credential(&state.db, "u1", "gmail-access", 30 * 60 * 1000).await;
    let failed = seed_record(&state.db, "u1", EmailStatus::Failed).await;

    let response = app
        .oneshot(common::authed_request(
            &state,
            &user,
            "POST",
            &format!("/api/emails/{}/edit-resend", failed.id),
            Some(json!({
                "subject": "Probabilistic models (corrected)",
                "body": "Dear Professor Koller, apologies for the earlier email.",
                "to": "koller.office@example.edu"
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let outcome = common::body_json(response).await;
    assert_eq!(outcome["record"]["status"], "sent");
    assert_ne!(outcome["record"]["id"], failed.id.as_str());

    // The original failed record is untouched
    assert_eq!(state.db.get_email(&failed.id).await.unwrap(), Some(failed));

    let history = state.outreach.history("u1").await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].status, EmailStatus::Sent);
    assert_eq!(history[0].to.as_deref(), Some("koller.office@example.edu"));
    assert_eq!(history[1].status, EmailStatus::Failed);
}

#[tokio::test]
async fn test_edit_and_resend_validates_fields() {
    let server = MockServer::start().await;
    mount_send_ok(&server, 0).await;

    let (app, state) = common::create_test_app_with_backend(&server.uri());
    let user = common::test_user("u1");
    common::seed_credential(&state.db, "u1", "gmail-access", 30 * 60 * 1000).await;
    let failed = seed_record(&state.db, "u1", EmailStatus::Failed).await;

    for body in [
        json!({ "subject": "", "body": "b", "to": "a@example.edu" }),
        json!({ "subject": "s", "body": "", "to": "a@example.edu" }),
        json!({ "subject": "s", "body": "b", "to": "not-an-email" }),
    ] {
        let response = app
            .clone()
            .oneshot(common::authed_request(
                &state,
                &user,
                "POST",
                &format!("/api/emails/{}/edit-resend", failed.id),
                Some(body),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    assert_eq!(state.outreach.history("u1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_resend_failed_goes_to_professor_address() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/send-email"))
        .and(body_partial_json(json!({ "to": "koller@example.edu" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let (app, state) = common::create_test_app_with_backend(&server.uri());
    let user = common::test_user("u1");
    common::seed_credential(&state.db, "u1", "gmail-access", 30 * 60 * 1000).await;

    let mut failed = outgoing("u1").into_record(EmailStatus::Failed, None, Utc::now());
    failed.to = Some("typo@exmaple.edu".to_string());
    state.db.put_email(&failed).await.unwrap();

    let response = app
        .oneshot(common::authed_request(
            &state,
            &user,
            "POST",
            &format!("/api/emails/{}/resend", failed.id),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(state.outreach.history("u1").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_concurrent_resends_deliver_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/send-email"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "ok": true }))
                .set_delay(std::time::Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (app, state) = common::create_test_app_with_backend(&server.uri());
    let user = common::test_user("u1");
    common::seed_credential(&state.db, "u1", "gmail-access", 30 * 60 * 1000).await;
    let failed = seed_record(&state.db, "u1", EmailStatus::Failed).await;
    let uri = format!("/api/emails/{}/resend", failed.id);

    let (first, second) = tokio::join!(
        app.clone()
            .oneshot(common::authed_request(&state, &user, "POST", &uri, None)),
        app.clone()
            .oneshot(common::authed_request(&state, &user, "POST", &uri, None)),
    );

    let mut statuses = vec![first.unwrap().status(), second.unwrap().status()];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::OK, StatusCode::CONFLICT]);
    assert_eq!(state.outreach.history("u1").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_reminder_prefixes_subject() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/send-email"))
        .and(body_partial_json(json!({ "subject": "Re: Probabilistic models" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let (app, state) = common::create_test_app_with_backend(&server.uri());
    let user = common::test_user("u1");
    common::seed_credential(&state.db, "u1", "gmail-access", 30 * 60 * 1000).await;
    let sent = seed_record(&state.db, "u1", EmailStatus::Sent).await;

    let response = app
        .oneshot(common::authed_request(
            &state,
            &user,
            "POST",
            &format!("/api/emails/{}/reminder", sent.id),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let outcome = common::body_json(response).await;
    assert_eq!(outcome["record"]["subject"], "Re: Probabilistic models");
}

#[tokio::test]
async fn test_reminder_requires_sent_record() {
    let server = MockServer::start().await;
    mount_send_ok(&server, 0).await;

    let (app, state) = common::create_test_app_with_backend(&server.uri());
    let user = common::test_user("u1");
    common::seed_credential(&state.db, "u1", "gmail-access", 30 * 60 * 1000).await;
    let scheduled = seed_record(&state.db, "u1", EmailStatus::Scheduled).await;

    let response = app
        .oneshot(common::authed_request(
            &state,
            &user,
            "POST",
            &format!("/api/emails/{}/reminder", scheduled.id),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_other_users_emails_are_hidden() {
    let server = MockServer::start().await;
    mount_send_ok(&server, 0).await;

    let (app, state) = common::create_test_app_with_backend(&server.uri());
    let owner_record = seed_record(&state.db, "owner", EmailStatus::Failed).await;
    let intruder = common::test_user("intruder");
    common::seed_credential(&state.db, "intruder", "gmail-access", 30 * 60 * 1000).await;

    let response = app
        .clone()
        .oneshot(common::authed_request(
            &state,
            &intruder,
            "POST",
            &format!("/api/emails/{}/resend", owner_record.id),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(common::authed_request(&state, &intruder, "GET", "/api/emails", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(common::body_json(response).await, json!([]));
}

#[tokio::test]
async fn test_history_lists_newest_activity_first() {
    let (app, state) = common::create_test_app();
    let user = common::test_user("u1");

    let now = Utc::now();
    let mut older = outgoing("u1").into_record(EmailStatus::Sent, None, now - ChronoDuration::hours(3));
    older.sent_at = Some(now - ChronoDuration::hours(3));
    let mut newer = outgoing("u1").into_record(EmailStatus::Sent, None, now - ChronoDuration::hours(1));
    newer.sent_at = Some(now - ChronoDuration::hours(1));
    let scheduled = outgoing("u1").into_record(
        EmailStatus::Scheduled,
        Some(now + ChronoDuration::days(1)),
        now,
    );
    for record in [&scheduled, &older, &newer] {
        state.db.put_email(record).await.unwrap();
    }

    let response = app
        .oneshot(common::authed_request(&state, &user, "GET", "/api/emails", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    // The scheduled record was created after both sends
    assert_eq!(ids, vec![scheduled.id.as_str(), newer.id.as_str(), older.id.as_str()]);
    assert_eq!(body[0]["status"], "scheduled");
}

#[tokio::test]
async fn test_schedule_resend_rejects_past_time() {
    let (app, state) = common::create_test_app();
    let user = common::test_user("u1");
    let sent = seed_record(&state.db, "u1", EmailStatus::Sent).await;

    let response = app
        .oneshot(common::authed_request(
            &state,
            &user,
            "POST",
            &format!("/api/emails/{}/schedule", sent.id),
            Some(json!({ "scheduled_at": (Utc::now() - ChronoDuration::hours(1)).to_rfc3339() })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(state.outreach.history("u1").await.unwrap().len(), 1);
}
