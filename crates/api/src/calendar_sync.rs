//! Calendar side effects of appointment writes.
//!
//! Handlers call these while their database transaction is still open, so a
//! calendar failure surfaces as [`BookingError::Calendar`] and the write is
//! rolled back. With no calendar configured every call is a logged no-op.

use barbershop_calendar::{CalendarClient, CalendarError, CalendarEvent};
use barbershop_core::errors::{BookingError, BookingResult};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

fn calendar_error(err: CalendarError) -> BookingError {
    warn!("Calendar request failed: {}", err);
    BookingError::Calendar(err.to_string())
}

/// Creates the event for an appointment and returns its id.
pub async fn publish_appointment(
    calendar: Option<&dyn CalendarClient>,
    service_name: &str,
    start: DateTime<Utc>,
    duration_minutes: i32,
    notes: Option<&str>,
) -> BookingResult<Option<String>> {
    let Some(calendar) = calendar else {
        info!("Calendar sync disabled, not creating event for {} at {}", service_name, start);
        return Ok(None);
    };

    let event = CalendarEvent::for_appointment(
        service_name,
        start,
        duration_minutes,
        notes,
        &calendar.timezone(),
    )
    .map_err(calendar_error)?;
    let event_id = calendar.insert_event(&event).await.map_err(calendar_error)?;

    Ok(Some(event_id))
}

/// Deletes an appointment's event, if it has one.
pub async fn retract_event(
    calendar: Option<&dyn CalendarClient>,
    event_id: Option<&str>,
) -> BookingResult<()> {
    let Some(event_id) = event_id else {
        return Ok(());
    };
    let Some(calendar) = calendar else {
        info!("Calendar sync disabled, leaving event {} in place", event_id);
        return Ok(());
    };

    calendar.delete_event(event_id).await.map_err(calendar_error)
}

/// Deletes events whose rows are already gone; failures are only logged.
///
/// Returns how many events were removed.
pub async fn retract_events_best_effort(
    calendar: Option<&dyn CalendarClient>,
    event_ids: &[String],
) -> usize {
    let Some(calendar) = calendar else {
        return 0;
    };

    let mut removed = 0;
    for event_id in event_ids {
        match calendar.delete_event(event_id).await {
            Ok(()) => removed += 1,
            Err(err) => warn!("Could not delete calendar event {}: {}", event_id, err),
        }
    }
    removed
}
