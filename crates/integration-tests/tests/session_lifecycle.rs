//! Session lifecycle against a stub API: login, restart, logout, 401s.

#![allow(clippy::unwrap_used)]

use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use gavel_client::api::UserApi;
use gavel_client::models::Credentials;
use gavel_client::stores::SessionError;
use gavel_core::{Email, Role};
use gavel_integration_tests::{Recorder, TestContext, login_json};
use serde_json::json;

fn credentials() -> Credentials {
    Credentials::new(Email::parse("ana@example.com").unwrap(), "hunter22")
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

/// Login endpoint plus a profile endpoint that records the bearer header.
fn auth_routes(role: &'static str, seen: &Recorder<Option<String>>) -> Router {
    let seen = seen.clone();
    Router::new()
        .route(
            "/users/login",
            post(move || async move { Json(login_json("tok-1", "u1", role)) }),
        )
        .route(
            "/users/user/{id}",
            get(move |Path(id): Path<String>, headers: HeaderMap| {
                let seen = seen.clone();
                async move {
                    seen.push(bearer(&headers));
                    Json(json!({
                        "_id": id,
                        "username": "ana",
                        "email": "ana@example.com",
                        "role": role
                    }))
                }
            }),
        )
}

// =============================================================================
// Login / restore / logout
// =============================================================================

#[tokio::test]
async fn test_login_survives_restart_and_logout_clears() {
    let seen = Recorder::default();
    let routes = auth_routes("admin", &seen).route(
        "/users/logout",
        post(|| async { Json(json!({ "message": "Logged out" })) }),
    );
    let ctx = TestContext::new(routes).await.unwrap();

    let market = ctx.open().unwrap();
    let response = market.session().login(&credentials()).await.unwrap();
    assert_eq!(response.role, Role::Admin);
    assert!(market.session().is_admin());
    assert_eq!(
        market.session().current_user().unwrap().username.as_deref(),
        Some("ana")
    );
    // The profile fetch already carried the fresh token.
    assert_eq!(seen.snapshot(), vec![Some("Bearer tok-1".to_string())]);

    let restarted = ctx.open().unwrap();
    assert!(restarted.session().is_authenticated());
    assert_eq!(restarted.session().token().unwrap().as_str(), "tok-1");

    restarted.session().logout().await;
    assert!(!restarted.session().is_authenticated());
    assert!(!ctx.has_record("token"));
    assert!(!ctx.has_record("user"));
    assert!(!ctx.has_record("role"));
    assert!(!ctx.open().unwrap().session().is_authenticated());
}

#[tokio::test]
async fn test_logout_clears_when_server_fails() {
    let routes = auth_routes("user", &Recorder::default()).route(
        "/users/logout",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let ctx = TestContext::new(routes).await.unwrap();

    let market = ctx.open().unwrap();
    market.session().login(&credentials()).await.unwrap();
    market.session().logout().await;

    assert!(!market.session().is_authenticated());
    assert!(!ctx.open().unwrap().session().is_authenticated());
}

#[tokio::test]
async fn test_profile_failure_keeps_minimal_user() {
    let routes = Router::new()
        .route(
            "/users/login",
            post(|| async { Json(login_json("tok-1", "u1", "user")) }),
        )
        .route(
            "/users/user/{id}",
            get(|| async {
                (
                    StatusCode::NOT_FOUND,
                    Json(json!({ "message": "User not found" })),
                )
            }),
        );
    let ctx = TestContext::new(routes).await.unwrap();

    let market = ctx.open().unwrap();
    market.session().login(&credentials()).await.unwrap();

    let user = market.session().current_user().unwrap();
    assert_eq!(user.id.as_str(), "u1");
    assert!(user.username.is_none());
    assert!(ctx.open().unwrap().session().is_authenticated());
}

#[tokio::test]
async fn test_rejected_login_surfaces_server_message() {
    let routes = Router::new().route(
        "/users/login",
        post(|| async {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "message": "Invalid credentials" })),
            )
        }),
    );
    let ctx = TestContext::new(routes).await.unwrap();

    let market = ctx.open().unwrap();
    let err = market.session().login(&credentials()).await.unwrap_err();

    assert!(matches!(&err, SessionError::Api(e) if e.is_unauthorized()));
    assert_eq!(err.user_message(), "Invalid credentials");
    assert!(!market.session().is_authenticated());
    assert!(!ctx.has_record("token"));
}

// =============================================================================
// 401 handling
// =============================================================================

#[tokio::test]
async fn test_unauthorized_response_drops_token() {
    let routes = auth_routes("admin", &Recorder::default()).route(
        "/users/users",
        get(|| async {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "message": "Token expired" })),
            )
        }),
    );
    let ctx = TestContext::new(routes).await.unwrap();

    let market = ctx.open().unwrap();
    market.session().login(&credentials()).await.unwrap();
    assert!(ctx.has_record("token"));

    let err = market.api().list_users().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(!ctx.has_record("token"));

    // What is left on disk is a partial session, which a restart discards.
    let restarted = ctx.open().unwrap();
    assert!(!restarted.session().is_authenticated());
    assert!(!ctx.has_record("user"));
    assert!(!ctx.has_record("role"));
}

#[tokio::test]
async fn test_anonymous_requests_carry_no_token() {
    let seen = Recorder::default();
    let routes = Router::new().route(
        "/users/user/{id}",
        get({
            let seen = seen.clone();
            move |Path(id): Path<String>, headers: HeaderMap| {
                let seen = seen.clone();
                async move {
                    seen.push(bearer(&headers));
                    Json(json!({ "user": { "_id": id, "username": "bo" } }))
                }
            }
        }),
    );
    let ctx = TestContext::new(routes).await.unwrap();

    let market = ctx.open().unwrap();
    let user = market.api().get_user(&"u7".into()).await.unwrap();
    assert_eq!(user.display_name(), "bo");
    assert_eq!(seen.snapshot(), vec![None]);
}
