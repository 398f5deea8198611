//! HTTP-level tests for session listing, the concurrent session cap and
//! user / admin revocation.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{access, body_json, build_test_app, delete, get, login, post, ALICE, BOB};

async fn sessions(app: &axum::Router, token: &str) -> Vec<serde_json::Value> {
    let response = get(app, "/api/v1/auth/sessions", Some(token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["data"].as_array().unwrap().clone()
}

async fn logins(app: &axum::Router, username: &str, n: usize) -> Vec<serde_json::Value> {
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        out.push(login(app, username).await);
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    out
}

#[tokio::test]
async fn listing_flags_the_current_session() {
    let app = build_test_app();
    let both = logins(&app.router, "alice", 2).await;

    let listed = sessions(&app.router, &access(&both[1])).await;
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["id"], both[0]["session_id"]);
    assert_eq!(listed[0]["current"], false);
    assert_eq!(listed[1]["id"], both[1]["session_id"]);
    assert_eq!(listed[1]["current"], true);
}

#[tokio::test]
async fn sixth_login_evicts_the_oldest_session() {
    let app = build_test_app();
    let all = logins(&app.router, "alice", 6).await;

    let listed = sessions(&app.router, &access(&all[5])).await;
    assert_eq!(listed.len(), 5);
    assert!(listed.iter().all(|s| s["id"] != all[0]["session_id"]));

    let response = get(&app.router, "/api/v1/auth/sessions", Some(&access(&all[0]))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["code"], "MAX_SESSIONS_EXCEEDED");
    assert_eq!(body["reason"], "MAX_SESSIONS_EXCEEDED");

    // The second oldest survived.
    let response = get(&app.router, "/api/v1/auth/sessions", Some(&access(&all[1]))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn cap_is_per_user() {
    let app = build_test_app();
    let bob = login(&app.router, "bob").await;
    logins(&app.router, "alice", 6).await;

    let response = get(&app.router, "/api/v1/auth/sessions", Some(&access(&bob))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn logout_others_keeps_the_caller() {
    let app = build_test_app();
    let all = logins(&app.router, "alice", 3).await;
    let me = access(&all[2]);

    let response = post(&app.router, "/api/v1/auth/sessions/logout-others", Some(&me)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let revoked = body_json(response).await["revoked"].as_array().unwrap().len();
    assert_eq!(revoked, 2);

    let listed = sessions(&app.router, &me).await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["current"], true);

    let response = get(&app.router, "/api/v1/auth/sessions", Some(&access(&all[0]))).await;
    let body = body_json(response).await;
    assert_eq!(body["code"], "SESSION_REVOKED");
    assert_eq!(body["reason"], "LOGGED_OUT_ELSEWHERE");
}

#[tokio::test]
async fn user_can_end_another_own_session() {
    let app = build_test_app();
    let all = logins(&app.router, "alice", 2).await;
    let lost = all[0]["session_id"].as_str().unwrap();

    let uri = format!("/api/v1/auth/sessions/{lost}");
    let response = delete(&app.router, &uri, Some(&access(&all[1]))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["revoked"], true);

    // Already gone: still a success, nothing revoked.
    let response = delete(&app.router, &uri, Some(&access(&all[1]))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["revoked"], false);
}

#[tokio::test]
async fn foreign_session_is_not_found() {
    let app = build_test_app();
    let alice = login(&app.router, "alice").await;
    let bob = login(&app.router, "bob").await;

    let uri = format!(
        "/api/v1/auth/sessions/{}",
        alice["session_id"].as_str().unwrap()
    );
    let response = delete(&app.router, &uri, Some(&access(&bob))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "SESSION_NOT_FOUND");

    let response = get(&app.router, "/api/v1/auth/sessions", Some(&access(&alice))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Admin revocation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn admin_revoke_all_requires_permission() {
    let app = build_test_app();
    let alice = access(&login(&app.router, "alice").await);

    let uri = format!("/api/v1/admin/users/{BOB}/sessions");
    let response = delete(&app.router, &uri, Some(&alice)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_revoke_all_ends_every_session() {
    let app = build_test_app();
    let all = logins(&app.router, "alice", 2).await;
    let admin = access(&login(&app.router, "admin").await);

    let uri = format!("/api/v1/admin/users/{ALICE}/sessions?reason=PASSWORD_CHANGED");
    let response = delete(&app.router, &uri, Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["revoked"].as_array().unwrap().len(), 2);

    for body in &all {
        let response = get(&app.router, "/api/v1/auth/sessions", Some(&access(body))).await;
        let rejected = body_json(response).await;
        assert_eq!(rejected["code"], "SESSION_REVOKED");
        assert_eq!(rejected["reason"], "PASSWORD_CHANGED");
    }

    // The admin's own session is untouched.
    assert_eq!(sessions(&app.router, &admin).await.len(), 1);
}

#[tokio::test]
async fn admin_cannot_pick_a_system_reason() {
    let app = build_test_app();
    let admin = access(&login(&app.router, "admin").await);

    let uri = format!("/api/v1/admin/users/{ALICE}/sessions?reason=ROTATED");
    let response = delete(&app.router, &uri, Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_revoke_one_checks_ownership() {
    let app = build_test_app();
    let alice = login(&app.router, "alice").await;
    let admin = access(&login(&app.router, "admin").await);
    let sid = alice["session_id"].as_str().unwrap();

    let wrong_owner = format!("/api/v1/admin/users/{BOB}/sessions/{sid}");
    let response = delete(&app.router, &wrong_owner, Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let uri = format!("/api/v1/admin/users/{ALICE}/sessions/{sid}");
    let response = delete(&app.router, &uri, Some(&admin)).await;
    assert_eq!(body_json(response).await["revoked"], true);

    let response = get(&app.router, "/api/v1/auth/sessions", Some(&access(&alice))).await;
    let rejected = body_json(response).await;
    assert_eq!(rejected["code"], "SESSION_REVOKED");
    assert_eq!(rejected["reason"], "ADMIN_REVOKED");
}
