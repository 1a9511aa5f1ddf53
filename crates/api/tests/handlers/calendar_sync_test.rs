use barbershop_api::calendar_sync;
use barbershop_calendar::{CalendarClient, CalendarError, MockCalendarClient};
use barbershop_core::errors::BookingError;
use chrono::{TimeZone, Utc};
use mockall::predicate::eq;
use pretty_assertions::assert_eq;

fn mock_with_timezone() -> MockCalendarClient {
    let mut mock = MockCalendarClient::new();
    mock.expect_timezone()
        .return_const("America/Sao_Paulo".to_string());
    mock
}

#[tokio::test]
async fn test_publish_without_calendar_is_skipped() {
    let start = Utc.with_ymd_and_hms(2030, 3, 12, 13, 0, 0).unwrap();

    let event_id = calendar_sync::publish_appointment(None, "Corte", start, 30, None)
        .await
        .unwrap();

    assert_eq!(event_id, None);
}

#[tokio::test]
async fn test_publish_creates_event() {
    let start = Utc.with_ymd_and_hms(2030, 3, 12, 13, 0, 0).unwrap();
    let mut mock = mock_with_timezone();
    mock.expect_insert_event()
        .withf(move |event| {
            event.summary == "Scheduled service - Corte"
                && event.description == "Máquina 2"
                && event.start == start
                && event.end == start + chrono::Duration::minutes(30)
                && event.timezone == "America/Sao_Paulo"
        })
        .times(1)
        .returning(|_| Ok("evt-123".to_string()));

    let calendar: &dyn CalendarClient = &mock;
    let event_id =
        calendar_sync::publish_appointment(Some(calendar), "Corte", start, 30, Some("Máquina 2"))
            .await
            .unwrap();

    assert_eq!(event_id.as_deref(), Some("evt-123"));
}

#[tokio::test]
async fn test_publish_failure_becomes_calendar_error() {
    let start = Utc.with_ymd_and_hms(2030, 3, 12, 13, 0, 0).unwrap();
    let mut mock = mock_with_timezone();
    mock.expect_insert_event().times(1).returning(|_| {
        Err(CalendarError::Api {
            status: 503,
            body: "backend unavailable".to_string(),
        })
    });

    let err = calendar_sync::publish_appointment(Some(&mock), "Barba", start, 20, None)
        .await
        .unwrap_err();

    assert!(matches!(err, BookingError::Calendar(ref msg) if msg.contains("503")));
}

#[tokio::test]
async fn test_retract_without_event_id_makes_no_call() {
    let mut mock = MockCalendarClient::new();
    mock.expect_delete_event().never();

    calendar_sync::retract_event(Some(&mock), None).await.unwrap();
}

#[tokio::test]
async fn test_retract_deletes_event() {
    let mut mock = MockCalendarClient::new();
    mock.expect_delete_event()
        .with(eq("evt-9"))
        .times(1)
        .returning(|_| Ok(()));

    calendar_sync::retract_event(Some(&mock), Some("evt-9"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_retract_failure_becomes_calendar_error() {
    let mut mock = MockCalendarClient::new();
    mock.expect_delete_event()
        .returning(|_| Err(CalendarError::Token("expired key".to_string())));

    let err = calendar_sync::retract_event(Some(&mock), Some("evt-9"))
        .await
        .unwrap_err();

    assert!(matches!(err, BookingError::Calendar(_)));
}

#[tokio::test]
async fn test_best_effort_retraction_counts_successes() {
    let mut mock = MockCalendarClient::new();
    mock.expect_delete_event().returning(|id| {
        if id == "broken" {
            Err(CalendarError::Api {
                status: 500,
                body: String::new(),
            })
        } else {
            Ok(())
        }
    });

    let ids = vec!["a".to_string(), "broken".to_string(), "b".to_string()];
    let removed = calendar_sync::retract_events_best_effort(Some(&mock), &ids).await;

    assert_eq!(removed, 2);
    assert_eq!(calendar_sync::retract_events_best_effort(None, &ids).await, 0);
}
