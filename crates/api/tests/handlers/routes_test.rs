//! Router-level checks that are decided before any database access.

use axum::http::{header::AUTHORIZATION, HeaderValue, StatusCode};
use barbershop_api::middleware::auth;
use barbershop_core::models::user::Role;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::test_utils::{bearer, user_with_role, TestContext, TEST_SECRET};

#[tokio::test]
async fn test_health_check() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server.get("/health").await;

    response.assert_status(StatusCode::OK);
    assert_eq!(
        response.json::<Value>(),
        json!({ "status": "ok", "calendar_sync": false })
    );
}

#[tokio::test]
async fn test_version() {
    let ctx = TestContext::new();

    let response = ctx.server().get("/version").await;

    response.assert_status(StatusCode::OK);
    let body = response.json::<Value>();
    assert_eq!(body["name"], "barbershop-api");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_protected_routes_require_a_token() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let id = Uuid::new_v4();

    let responses = vec![
        server.get("/api/account").await,
        server.put("/api/account/password").await,
        server.post("/api/auth/logout").await,
        server.get("/api/appointments").await,
        server.get("/api/appointments/all").await,
        server.get(&format!("/api/appointments/{}", id)).await,
        server.delete(&format!("/api/appointments/{}", id)).await,
        server.delete(&format!("/api/services/{}", id)).await,
    ];

    for response in responses {
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.json::<Value>()["error"],
            "Authentication error: Authentication required"
        );
    }
}

#[tokio::test]
async fn test_authentication_runs_before_body_parsing() {
    let ctx = TestContext::new();

    let response = ctx
        .server()
        .post("/api/appointments")
        .json(&json!({ "service_id": "not-a-uuid" }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_non_bearer_authorization_is_rejected() {
    let ctx = TestContext::new();

    let response = ctx
        .server()
        .get("/api/account")
        .add_header(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_forged_token_is_rejected() {
    let ctx = TestContext::new();
    let issued = auth::issue_token(&user_with_role(Role::Superuser), "not-the-server-secret", 1).unwrap();

    let response = ctx
        .server()
        .post("/api/staff/managers")
        .add_header(AUTHORIZATION, bearer(&issued.token))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.json::<Value>()["error"],
        "Authentication error: Invalid or expired token"
    );
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let ctx = TestContext::new();
    let issued = auth::issue_token(&user_with_role(Role::Client), TEST_SECRET, -1).unwrap();

    let response = ctx
        .server()
        .get("/api/appointments")
        .add_header(AUTHORIZATION, bearer(&issued.token))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_registration_is_validated_before_storage() {
    let ctx = TestContext::new();

    let response = ctx
        .server()
        .post("/api/auth/register")
        .json(&json!({
            "username": "joao",
            "email": "joao@example.com",
            "first_name": "João",
            "last_name": "Silva",
            "password": "s3cret-pass",
            "password_confirmation": "different-pass"
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let message = response.json::<Value>()["error"].as_str().unwrap().to_string();
    assert!(message.contains("didn't match"), "unexpected message: {}", message);
}

#[tokio::test]
async fn test_registration_rejects_numeric_password() {
    let ctx = TestContext::new();

    let response = ctx
        .server()
        .post("/api/auth/register")
        .json(&json!({
            "username": "maria",
            "email": "maria@example.com",
            "first_name": "Maria",
            "last_name": "Souza",
            "password": "12345678901",
            "password_confirmation": "12345678901"
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_json_is_unprocessable() {
    let ctx = TestContext::new();

    let response = ctx
        .server()
        .post("/api/auth/register")
        .json(&json!({ "username": "missing-fields" }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_invalid_path_id_is_a_bad_request() {
    let ctx = TestContext::new();

    let response = ctx.server().get("/api/services/not-a-uuid").await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_media_is_not_found() {
    let ctx = TestContext::new();

    let response = ctx.server().get("/media/profile_pictures/nobody.png").await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_uploaded_media_is_served() {
    let ctx = TestContext::new();
    let dir = ctx.media_root.path().join("profile_pictures");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("someone.png"), b"\x89PNG fake").unwrap();

    let response = ctx.server().get("/media/profile_pictures/someone.png").await;

    response.assert_status(StatusCode::OK);
    assert_eq!(response.as_bytes().to_vec(), b"\x89PNG fake".to_vec());
}
