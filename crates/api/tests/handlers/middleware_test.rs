use axum::{body::to_bytes, http::StatusCode};
use barbershop_api::middleware::{auth, error_handling::map_error};
use barbershop_core::{errors::BookingError, models::user::Role};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::Value;

use crate::test_utils::{user_with_role, TEST_SECRET};

#[rstest]
#[case(BookingError::NotFound("Service not found".into()), StatusCode::NOT_FOUND)]
#[case(BookingError::Validation("Invalid input".into()), StatusCode::BAD_REQUEST)]
#[case(BookingError::Conflict("Slot taken".into()), StatusCode::CONFLICT)]
#[case(BookingError::Authentication("Invalid token".into()), StatusCode::UNAUTHORIZED)]
#[case(BookingError::Authorization("Not allowed".into()), StatusCode::FORBIDDEN)]
#[case(BookingError::Calendar("timeout".into()), StatusCode::BAD_GATEWAY)]
#[case(BookingError::Database(eyre::eyre!("Database error")), StatusCode::INTERNAL_SERVER_ERROR)]
#[tokio::test]
async fn test_error_status_mapping(#[case] error: BookingError, #[case] expected: StatusCode) {
    let response = map_error(error);

    assert_eq!(response.status(), expected);
}

#[tokio::test]
async fn test_error_handling_internal() {
    let error = BookingError::Internal(Box::new(std::io::Error::new(
        std::io::ErrorKind::Other,
        "disk on fire",
    )));

    let response = map_error(error);

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_error_body_carries_message() {
    let response = map_error(BookingError::Conflict(
        "This time slot is already booked".to_string(),
    ));

    let body = body_json(response).await;
    assert_eq!(
        body["error"],
        "Scheduling conflict: This time slot is already booked"
    );
}

#[tokio::test]
async fn test_database_errors_are_not_leaked() {
    let response = map_error(BookingError::Database(eyre::eyre!(
        "relation \"users\" does not exist"
    )));

    let body = body_json(response).await;
    assert_eq!(body["error"], "Internal server error");
}

#[tokio::test]
async fn test_hash_password() {
    let password = "test_password";
    let hashed = auth::hash_password(password).unwrap();

    assert_ne!(hashed, password);
    assert!(hashed.starts_with("$argon2"));
}

#[tokio::test]
async fn test_verify_password() {
    let hashed = auth::hash_password("correct horse").unwrap();

    assert!(auth::verify_password("correct horse", &hashed).unwrap());
    assert!(!auth::verify_password("wrong horse", &hashed).unwrap());
}

#[test]
fn test_verify_password_rejects_malformed_hash() {
    assert!(auth::verify_password("anything", "not-a-phc-string").is_err());
}

#[test]
fn test_token_round_trip() {
    let user = user_with_role(Role::Manager);
    let issued = auth::issue_token(&user, TEST_SECRET, 12).unwrap();

    let claims = auth::decode_token(&issued.token, TEST_SECRET).unwrap();

    assert_eq!(claims, issued.claims);
    assert_eq!(claims.sub, user.id);
    assert_eq!(claims.role, Role::Manager);
    assert_eq!(claims.exp - claims.iat, 12 * 3600);
}

#[test]
fn test_tokens_have_unique_ids() {
    let user = user_with_role(Role::Client);

    let first = auth::issue_token(&user, TEST_SECRET, 1).unwrap();
    let second = auth::issue_token(&user, TEST_SECRET, 1).unwrap();

    assert_ne!(first.claims.jti, second.claims.jti);
}

#[test]
fn test_token_with_wrong_secret_is_rejected() {
    let user = user_with_role(Role::Client);
    let issued = auth::issue_token(&user, "another-secret", 1).unwrap();

    let err = auth::decode_token(&issued.token, TEST_SECRET).unwrap_err();
    assert!(matches!(err, BookingError::Authentication(_)));
}

#[test]
fn test_expired_token_is_rejected() {
    let user = user_with_role(Role::Client);
    let issued = auth::issue_token(&user, TEST_SECRET, -1).unwrap();

    let err = auth::decode_token(&issued.token, TEST_SECRET).unwrap_err();
    assert!(matches!(err, BookingError::Authentication(_)));
}

#[test]
fn test_garbage_token_is_rejected() {
    let err = auth::decode_token("not.a.jwt", TEST_SECRET).unwrap_err();
    assert!(matches!(err, BookingError::Authentication(_)));
}
