//! Tests for refresh token rotation, revocation, and logout.
//!
//! Tests cover:
//! - Rotation on refresh and single-use semantics of the old token
//! - Refresh via cookie and via body fallback
//! - Non-rotating deployments
//! - Logout revocation and idempotence
//! - A second login invalidating the previous refresh chain
//! - The expiry sweep

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::*;
use staffgate::cleanup;
use staffgate::db::{AccountStatus, Role};
use tower::ServiceExt;

async fn login_cookies(app: &axum::Router) -> (String, String) {
    let response = do_login(app, "alice@example.com", "correct-secret").await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookies = extract_set_cookies(&response);
    (
        cookie_value(&cookies, "access_token").unwrap(),
        cookie_value(&cookies, "refresh_token").unwrap(),
    )
}

fn refresh_with_cookie(refresh_token: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/auth/refresh-token")
        .header("cookie", format!("refresh_token={}", refresh_token))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_refresh_rotates_and_sets_new_cookies() {
    let (app, db) = create_test_app().await;
    seed_account(
        &db,
        "alice@example.com",
        "correct-secret",
        Role::Recruiter,
        AccountStatus::Active,
    )
    .await;
    let (_, refresh) = login_cookies(&app).await;

    let response = app
        .oneshot(refresh_with_cookie(&refresh))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = extract_set_cookies(&response);
    let new_access = cookie_value(&cookies, "access_token").expect("new access cookie");
    let new_refresh = cookie_value(&cookies, "refresh_token").expect("rotated refresh cookie");
    assert!(!new_access.is_empty());
    assert_ne!(new_refresh, refresh, "Refresh token should rotate");

    let body = body_json(response).await;
    assert_eq!(body["email"], "alice@example.com");
    assert!(body.get("refresh_token").is_none());
}

#[tokio::test]
async fn test_old_refresh_token_is_single_use() {
    let (app, db) = create_test_app().await;
    seed_account(
        &db,
        "alice@example.com",
        "correct-secret",
        Role::Recruiter,
        AccountStatus::Active,
    )
    .await;
    let (_, token_a) = login_cookies(&app).await;

    // First use succeeds and produces token B.
    let response = app
        .clone()
        .oneshot(refresh_with_cookie(&token_a))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let token_b = cookie_value(&extract_set_cookies(&response), "refresh_token").unwrap();

    // Replaying token A fails: it was revoked by the rotation.
    let response = app
        .clone()
        .oneshot(refresh_with_cookie(&token_a))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Token B is the live end of the chain.
    let response = app.oneshot(refresh_with_cookie(&token_b)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_via_body_fallback() {
    let (app, db) = create_test_app().await;
    seed_account(
        &db,
        "alice@example.com",
        "correct-secret",
        Role::Recruiter,
        AccountStatus::Active,
    )
    .await;
    let (_, refresh) = login_cookies(&app).await;

    // No cookie; the token rides in the body instead.
    let response = app
        .oneshot(json_request(
            "POST",
            "/auth/refresh-token",
            serde_json::json!({ "refresh_token": refresh }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_without_token_unauthorized() {
    let (app, _db) = create_test_app().await;

    let response = app
        .oneshot(empty_request("POST", "/auth/refresh-token"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_with_garbage_token_unauthorized() {
    let (app, _db) = create_test_app().await;

    let response = app
        .oneshot(refresh_with_cookie("not-a-real-token"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_non_rotating_refresh_keeps_token_usable() {
    let (app, db) = create_test_app_with_rotation(false).await;
    seed_account(
        &db,
        "alice@example.com",
        "correct-secret",
        Role::Recruiter,
        AccountStatus::Active,
    )
    .await;
    let (_, refresh) = login_cookies(&app).await;

    let response = app
        .clone()
        .oneshot(refresh_with_cookie(&refresh))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // No rotated refresh cookie in the response.
    let cookies = extract_set_cookies(&response);
    assert!(cookie_value(&cookies, "access_token").is_some());
    assert!(cookie_value(&cookies, "refresh_token").is_none());

    // The same token keeps working.
    let response = app.oneshot(refresh_with_cookie(&refresh)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_second_login_invalidates_previous_refresh_chain() {
    let (app, db) = create_test_app().await;
    seed_account(
        &db,
        "alice@example.com",
        "correct-secret",
        Role::Recruiter,
        AccountStatus::Active,
    )
    .await;

    let (_, first_refresh) = login_cookies(&app).await;
    let (_, second_refresh) = login_cookies(&app).await;

    // The first chain was revoked by the second login.
    let response = app
        .clone()
        .oneshot(refresh_with_cookie(&first_refresh))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(refresh_with_cookie(&second_refresh))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_logout_clears_cookies_and_revokes() {
    let (app, db) = create_test_app().await;
    seed_account(
        &db,
        "alice@example.com",
        "correct-secret",
        Role::Recruiter,
        AccountStatus::Active,
    )
    .await;
    let (access, refresh) = login_cookies(&app).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/logout")
                .header(
                    "cookie",
                    format!("access_token={}; refresh_token={}", access, refresh),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = extract_set_cookies(&response);
    assert!(
        has_cleared_cookie(&cookies, "access_token"),
        "Should clear access_token cookie"
    );
    assert!(
        has_cleared_cookie(&cookies, "refresh_token"),
        "Should clear refresh_token cookie"
    );

    // The revocation stuck: the refresh token is dead.
    let response = app.oneshot(refresh_with_cookie(&refresh)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_without_token_succeeds() {
    let (app, _db) = create_test_app().await;

    // Logout without any token should still succeed (idempotent).
    let response = app
        .oneshot(empty_request("POST", "/auth/logout"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_cleanup_sweeps_expired_rows() {
    let (_app, db) = create_test_app().await;
    let id = seed_account(
        &db,
        "alice@example.com",
        "correct-secret",
        Role::Recruiter,
        AccountStatus::Active,
    )
    .await;

    let now = staffgate::jwt::now_secs().unwrap() as i64;
    db.tokens()
        .insert(&id, "long-gone", now - 7200, now - 3600)
        .await
        .unwrap();

    // Unusable before the sweep, by the validity predicate alone.
    assert!(db.tokens().find_valid("long-gone", now).await.unwrap().is_none());

    cleanup::run_cleanup(&db).await;

    // Deleted after the sweep.
    assert!(db.tokens().find_by_token("long-gone").await.unwrap().is_none());
}
