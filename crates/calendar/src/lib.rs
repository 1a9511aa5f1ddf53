//! # Calendar Synchronization
//!
//! Keeps the shop's external calendar in step with booked appointments.
//! [`CalendarClient`] is the seam the API crate depends on; [`GoogleCalendar`]
//! implements it against the Google Calendar v3 REST API using a service
//! account, and [`MockCalendarClient`] is generated for tests.

use async_trait::async_trait;
use thiserror::Error;

pub mod config;
pub mod event;
pub mod google;

pub use event::CalendarEvent;
pub use google::GoogleCalendar;

#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("invalid service-account credentials: {0}")]
    Credentials(String),

    #[error("could not obtain access token: {0}")]
    Token(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid event: {0}")]
    Event(String),

    #[error("calendar API returned {status}: {body}")]
    Api { status: u16, body: String },
}

pub type CalendarResult<T> = Result<T, CalendarError>;

/// External calendar operations needed by the booking flow.
#[mockall::automock]
#[async_trait]
pub trait CalendarClient: Send + Sync {
    /// Creates the event and returns its external id.
    async fn insert_event(&self, event: &CalendarEvent) -> CalendarResult<String>;

    /// Removes an event. Deleting an event that no longer exists succeeds.
    async fn delete_event(&self, event_id: &str) -> CalendarResult<()>;

    /// Timezone name attached to events created by this client.
    fn timezone(&self) -> String;
}
