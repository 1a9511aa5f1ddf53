use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::{CalendarError, CalendarResult};

pub const SUMMARY_PREFIX: &str = "Scheduled service - ";

/// An event to place on the shop calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub summary: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub timezone: String,
}

impl CalendarEvent {
    /// Event covering an appointment for `service_name` lasting
    /// `duration_minutes` from `start`.
    pub fn for_appointment(
        service_name: &str,
        start: DateTime<Utc>,
        duration_minutes: i32,
        notes: Option<&str>,
        timezone: &str,
    ) -> CalendarResult<Self> {
        let end = start
            .checked_add_signed(Duration::minutes(i64::from(duration_minutes)))
            .ok_or_else(|| CalendarError::Event(format!("end of event starting {} is out of range", start)))?;

        Ok(Self {
            summary: format!("{}{}", SUMMARY_PREFIX, service_name),
            description: notes.unwrap_or_default().to_string(),
            start,
            end,
            timezone: timezone.to_string(),
        })
    }

    pub fn to_body(&self) -> EventBody {
        EventBody {
            summary: self.summary.clone(),
            description: self.description.clone(),
            start: EventTime {
                date_time: self.start.to_rfc3339_opts(SecondsFormat::Secs, true),
                time_zone: self.timezone.clone(),
            },
            end: EventTime {
                date_time: self.end.to_rfc3339_opts(SecondsFormat::Secs, true),
                time_zone: self.timezone.clone(),
            },
        }
    }
}

/// Request body of `events.insert`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventBody {
    pub summary: String,
    pub description: String,
    pub start: EventTime,
    pub end: EventTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    pub date_time: String,
    pub time_zone: String,
}

/// The part of the `events.insert` response we keep.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedEvent {
    pub id: String,
    pub html_link: Option<String>,
}
