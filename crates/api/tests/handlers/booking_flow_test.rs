//! Booking flows against a real PostgreSQL instance with a mocked calendar.
//!
//! Run with `TEST_DATABASE_URL=postgres://... cargo test -p barbershop-api -- --ignored`.

use std::sync::Arc;

use axum::http::{header::AUTHORIZATION, StatusCode};
use axum_test::{TestResponse, TestServer};
use barbershop_calendar::{CalendarClient, CalendarError, MockCalendarClient};
use barbershop_core::models::{
    appointment::{AppointmentResponse, AppointmentStatus},
    service::Service,
    user::Role,
};
use barbershop_db::repositories::appointment;
use chrono::{DateTime, TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::test_utils::{bearer, TestContext};

// São Paulo is UTC-3 all year.
fn local(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2035, 6, 5, hour + 3, minute, 0).unwrap()
}

fn event_id_for(start: DateTime<Utc>) -> String {
    format!("evt-{}", start.timestamp())
}

fn calendar(mock: MockCalendarClient) -> Option<Arc<dyn CalendarClient>> {
    Some(Arc::new(mock))
}

/// A calendar expecting exactly `inserts` event creations and `deletes`
/// deletions of whatever id.
fn counting_calendar(inserts: usize, deletes: usize) -> MockCalendarClient {
    let mut mock = MockCalendarClient::new();
    mock.expect_timezone()
        .return_const("America/Sao_Paulo".to_string());
    mock.expect_insert_event()
        .times(inserts)
        .returning(|event| Ok(event_id_for(event.start)));
    mock.expect_delete_event().times(deletes).returning(|_| Ok(()));
    mock
}

async fn book(server: &TestServer, token: &str, service_id: Uuid, start: DateTime<Utc>) -> TestResponse {
    server
        .post("/api/appointments")
        .add_header(AUTHORIZATION, bearer(token))
        .json(&json!({ "service_id": service_id, "date_time": start }))
        .await
}

async fn set_status(server: &TestServer, token: &str, id: Uuid, status: &str) -> TestResponse {
    server
        .put(&format!("/api/appointments/{}/status", id))
        .add_header(AUTHORIZATION, bearer(token))
        .json(&json!({ "status": status }))
        .await
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_calendar_failure_rolls_back_booking() {
    let mut mock = MockCalendarClient::new();
    mock.expect_timezone()
        .return_const("America/Sao_Paulo".to_string());
    mock.expect_insert_event().times(1).returning(|_| {
        Err(CalendarError::Api {
            status: 503,
            body: "backend unavailable".to_string(),
        })
    });
    let ctx = TestContext::with_database(calendar(mock)).await;
    let server = ctx.server();
    let (client, token) = ctx.account(Role::Client).await;
    let haircut = ctx.service("Corte", 30).await;

    let response = book(&server, &token, haircut.id, local(10, 0)).await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    assert_eq!(
        appointment::count_for_client(ctx.pool(), client.id).await.unwrap(),
        0
    );
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_booking_creates_event_and_blocks_overlaps() {
    let ctx = TestContext::with_database(calendar(counting_calendar(2, 0))).await;
    let server = ctx.server();
    let (first_client, first_token) = ctx.account(Role::Client).await;
    let (_, second_token) = ctx.account(Role::Client).await;
    let haircut = ctx.service("Corte", 30).await;

    let response = book(&server, &first_token, haircut.id, local(10, 0)).await;
    response.assert_status(StatusCode::CREATED);
    let booked = response.json::<AppointmentResponse>();
    assert_eq!(booked.client_id, first_client.id);
    assert_eq!(booked.status, AppointmentStatus::Active);
    assert_eq!(booked.ends_at, local(10, 30));
    assert_eq!(booked.calendar_event_id, Some(event_id_for(local(10, 0))));

    let overlapping = book(&server, &second_token, haircut.id, local(10, 15)).await;
    overlapping.assert_status(StatusCode::CONFLICT);
    assert_eq!(
        overlapping.json::<Value>()["error"],
        "Scheduling conflict: This time slot is already booked for the selected service"
    );

    book(&server, &second_token, haircut.id, local(10, 30))
        .await
        .assert_status(StatusCode::CREATED);

    // Runs past closing time
    book(&server, &second_token, haircut.id, local(16, 45))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_reschedule_replaces_calendar_event() {
    let original_event = event_id_for(local(10, 0));
    let mut mock = MockCalendarClient::new();
    mock.expect_timezone()
        .return_const("America/Sao_Paulo".to_string());
    mock.expect_insert_event()
        .times(3)
        .returning(|event| Ok(event_id_for(event.start)));
    mock.expect_delete_event()
        .withf(move |id| id == original_event.as_str())
        .times(1)
        .returning(|_| Ok(()));

    let ctx = TestContext::with_database(calendar(mock)).await;
    let server = ctx.server();
    let (_, owner_token) = ctx.account(Role::Client).await;
    let (_, other_token) = ctx.account(Role::Client).await;
    let haircut = ctx.service("Corte", 30).await;

    let booked = book(&server, &owner_token, haircut.id, local(10, 0))
        .await
        .json::<AppointmentResponse>();
    book(&server, &other_token, haircut.id, local(11, 0))
        .await
        .assert_status(StatusCode::CREATED);
    let path = format!("/api/appointments/{}", booked.id);

    // A conflict leaves the existing event alone
    server
        .put(&path)
        .add_header(AUTHORIZATION, bearer(&owner_token))
        .json(&json!({ "date_time": local(11, 15) }))
        .await
        .assert_status(StatusCode::CONFLICT);

    server
        .put(&path)
        .add_header(AUTHORIZATION, bearer(&other_token))
        .json(&json!({ "date_time": local(14, 0) }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let response = server
        .put(&path)
        .add_header(AUTHORIZATION, bearer(&owner_token))
        .json(&json!({ "date_time": local(14, 0), "notes": "degradê" }))
        .await;

    response.assert_status(StatusCode::OK);
    let moved = response.json::<AppointmentResponse>();
    assert_eq!(moved.date_time, local(14, 0));
    assert_eq!(moved.notes.as_deref(), Some("degradê"));
    assert_eq!(moved.calendar_event_id, Some(event_id_for(local(14, 0))));
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_cancel_retracts_event_and_reopen_rechecks_conflicts() {
    let ctx = TestContext::with_database(calendar(counting_calendar(2, 1))).await;
    let server = ctx.server();
    let (_, first_token) = ctx.account(Role::Client).await;
    let (_, second_token) = ctx.account(Role::Client).await;
    let (_, staff_token) = ctx.account(Role::Employee).await;
    let haircut = ctx.service("Corte", 30).await;

    let first = book(&server, &first_token, haircut.id, local(10, 0))
        .await
        .json::<AppointmentResponse>();

    set_status(&server, &first_token, first.id, "canceled")
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let response = set_status(&server, &staff_token, first.id, "canceled").await;
    response.assert_status(StatusCode::OK);
    let canceled = response.json::<AppointmentResponse>();
    assert_eq!(canceled.status, AppointmentStatus::Canceled);
    assert_eq!(canceled.calendar_event_id, None);

    // The freed slot is booked by someone else
    let second = book(&server, &second_token, haircut.id, local(10, 0))
        .await
        .json::<AppointmentResponse>();

    set_status(&server, &staff_token, first.id, "active")
        .await
        .assert_status(StatusCode::CONFLICT);

    set_status(&server, &staff_token, second.id, "completed")
        .await
        .assert_status(StatusCode::OK);
    set_status(&server, &staff_token, second.id, "active")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_reopening_on_inactive_service_is_rejected() {
    let ctx = TestContext::with_database(calendar(counting_calendar(1, 1))).await;
    let server = ctx.server();
    let (_, client_token) = ctx.account(Role::Client).await;
    let (_, manager_token) = ctx.account(Role::Manager).await;
    let haircut = ctx.service("Corte", 30).await;

    let booked = book(&server, &client_token, haircut.id, local(10, 0))
        .await
        .json::<AppointmentResponse>();
    set_status(&server, &manager_token, booked.id, "canceled")
        .await
        .assert_status(StatusCode::OK);

    server
        .put(&format!("/api/services/{}", haircut.id))
        .add_header(AUTHORIZATION, bearer(&manager_token))
        .json(&json!({ "is_active": false }))
        .await
        .assert_status(StatusCode::OK);

    let response = set_status(&server, &manager_token, booked.id, "active").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let message = response.json::<Value>()["error"].as_str().unwrap().to_string();
    assert!(message.contains("not available for booking"), "unexpected message: {}", message);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_delete_removes_row_and_event() {
    let booked_event = event_id_for(local(9, 0));
    let mut mock = MockCalendarClient::new();
    mock.expect_timezone()
        .return_const("America/Sao_Paulo".to_string());
    mock.expect_insert_event()
        .times(1)
        .returning(|event| Ok(event_id_for(event.start)));
    mock.expect_delete_event()
        .withf(move |id| id == booked_event.as_str())
        .times(1)
        .returning(|_| Ok(()));

    let ctx = TestContext::with_database(calendar(mock)).await;
    let server = ctx.server();
    let (owner, owner_token) = ctx.account(Role::Client).await;
    let (_, stranger_token) = ctx.account(Role::Client).await;
    let beard = ctx.service("Barba", 20).await;

    let booked = book(&server, &owner_token, beard.id, local(9, 0))
        .await
        .json::<AppointmentResponse>();
    let path = format!("/api/appointments/{}", booked.id);

    server
        .delete(&path)
        .add_header(AUTHORIZATION, bearer(&stranger_token))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    server
        .delete(&path)
        .add_header(AUTHORIZATION, bearer(&owner_token))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    server
        .get(&path)
        .add_header(AUTHORIZATION, bearer(&owner_token))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    assert_eq!(
        appointment::count_for_client(ctx.pool(), owner.id).await.unwrap(),
        0
    );
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_role_guards() {
    let ctx = TestContext::with_database(None).await;
    let server = ctx.server();
    let (_, client_token) = ctx.account(Role::Client).await;
    let (_, other_token) = ctx.account(Role::Client).await;
    let (_, employee_token) = ctx.account(Role::Employee).await;
    let (_, manager_token) = ctx.account(Role::Manager).await;
    let haircut = ctx.service("Corte", 30).await;

    // Without a calendar the booking is stored without an event
    let response = book(&server, &client_token, haircut.id, local(8, 0)).await;
    response.assert_status(StatusCode::CREATED);
    let booked = response.json::<AppointmentResponse>();
    assert_eq!(booked.calendar_event_id, None);
    let path = format!("/api/appointments/{}", booked.id);

    for (token, expected) in [
        (&client_token, StatusCode::OK),
        (&employee_token, StatusCode::OK),
        (&other_token, StatusCode::FORBIDDEN),
    ] {
        server
            .get(&path)
            .add_header(AUTHORIZATION, bearer(token))
            .await
            .assert_status(expected);
    }

    for (token, expected) in [
        (&client_token, StatusCode::FORBIDDEN),
        (&employee_token, StatusCode::OK),
    ] {
        server
            .get("/api/appointments/all")
            .add_header(AUTHORIZATION, bearer(token))
            .await
            .assert_status(expected);
    }

    let new_service = json!({ "name": "Sobrancelha", "price_cents": 2000, "duration_minutes": 15 });
    server
        .post("/api/services")
        .add_header(AUTHORIZATION, bearer(&employee_token))
        .json(&new_service)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    server
        .post("/api/services")
        .add_header(AUTHORIZATION, bearer(&manager_token))
        .json(&new_service)
        .await
        .assert_status(StatusCode::CREATED);

    server
        .post("/api/staff/managers")
        .add_header(AUTHORIZATION, bearer(&manager_token))
        .json(&json!({
            "username": "novo_gerente",
            "email": "novo_gerente@barbershop.test",
            "first_name": "Novo",
            "last_name": "Gerente",
            "password": "s3cret-pass",
            "password_confirmation": "s3cret-pass"
        }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_lengthening_service_keeps_bookings_apart() {
    let ctx = TestContext::with_database(None).await;
    let server = ctx.server();
    let (_, client_token) = ctx.account(Role::Client).await;
    let (_, manager_token) = ctx.account(Role::Manager).await;
    let haircut = ctx.service("Corte", 30).await;
    let service_path = format!("/api/services/{}", haircut.id);

    book(&server, &client_token, haircut.id, local(10, 0))
        .await
        .assert_status(StatusCode::CREATED);
    book(&server, &client_token, haircut.id, local(10, 30))
        .await
        .assert_status(StatusCode::CREATED);

    for duration in [45, 60] {
        server
            .put(&service_path)
            .add_header(AUTHORIZATION, bearer(&manager_token))
            .json(&json!({ "duration_minutes": duration }))
            .await
            .assert_status(StatusCode::CONFLICT);
    }
    let unchanged = server.get(&service_path).await.json::<Service>();
    assert_eq!(unchanged.duration_minutes, 30);

    let response = server
        .put(&service_path)
        .add_header(AUTHORIZATION, bearer(&manager_token))
        .json(&json!({ "duration_minutes": 20 }))
        .await;
    response.assert_status(StatusCode::OK);
    assert_eq!(response.json::<Service>().duration_minutes, 20);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_lengthening_service_past_closing_is_rejected() {
    let ctx = TestContext::with_database(None).await;
    let server = ctx.server();
    let (_, client_token) = ctx.account(Role::Client).await;
    let (_, manager_token) = ctx.account(Role::Manager).await;
    let beard = ctx.service("Barba", 30).await;
    let last_slot = local(16, 30);

    book(&server, &client_token, beard.id, last_slot)
        .await
        .assert_status(StatusCode::CREATED);

    let response = server
        .put(&format!("/api/services/{}", beard.id))
        .add_header(AUTHORIZATION, bearer(&manager_token))
        .json(&json!({ "duration_minutes": 60 }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let message = response.json::<Value>()["error"].as_str().unwrap().to_string();
    assert!(message.contains("past business hours"), "unexpected message: {}", message);
}
