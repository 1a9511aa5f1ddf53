//! # Booking Rules
//!
//! Pure checks applied to every new or rescheduled appointment before it is
//! written: business hours in the shop's local timezone, a minimum lead time,
//! and overlap between half-open time windows.
//!
//! The database crate runs the same overlap predicate in SQL inside the
//! booking transaction; [`find_conflict`] is the in-memory equivalent.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{BookingError, BookingResult};

/// A half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> BookingResult<Self> {
        if end <= start {
            return Err(BookingError::Validation(
                "End time must be after start time".to_string(),
            ));
        }
        Ok(Self { start, end })
    }

    pub fn from_duration(start: DateTime<Utc>, duration_minutes: i32) -> BookingResult<Self> {
        let end = start
            .checked_add_signed(Duration::minutes(i64::from(duration_minutes)))
            .ok_or_else(|| BookingError::Validation("Appointment date is out of range".to_string()))?;
        Self::new(start, end)
    }

    /// Back-to-back windows do not overlap.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Clone)]
pub struct BookingRules {
    pub timezone: Tz,
    pub opening: NaiveTime,
    pub closing: NaiveTime,
    pub min_lead_time: Duration,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::America::Sao_Paulo,
            opening: NaiveTime::from_hms_opt(7, 0, 0).unwrap_or_default(),
            closing: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default(),
            min_lead_time: Duration::minutes(60),
        }
    }
}

impl BookingRules {
    pub fn new(
        timezone: Tz,
        opening_hour: u32,
        closing_hour: u32,
        min_lead_time_minutes: i64,
    ) -> BookingResult<Self> {
        let hour = |h: u32| {
            NaiveTime::from_hms_opt(h, 0, 0)
                .ok_or_else(|| BookingError::Validation(format!("Invalid business hour: {}", h)))
        };
        let opening = hour(opening_hour)?;
        let closing = hour(closing_hour)?;

        if closing <= opening {
            return Err(BookingError::Validation(
                "Closing hour must be after opening hour".to_string(),
            ));
        }
        if min_lead_time_minutes < 0 {
            return Err(BookingError::Validation(
                "Minimum lead time cannot be negative".to_string(),
            ));
        }

        Ok(Self {
            timezone,
            opening,
            closing,
            min_lead_time: Duration::minutes(min_lead_time_minutes),
        })
    }

    /// Checks that an appointment of `duration_minutes` starting at `start`
    /// is bookable at `now`, returning its window.
    pub fn validate(
        &self,
        start: DateTime<Utc>,
        duration_minutes: i32,
        now: DateTime<Utc>,
    ) -> BookingResult<TimeWindow> {
        if duration_minutes <= 0 {
            return Err(BookingError::Validation(
                "Service duration must be positive".to_string(),
            ));
        }
        let window = TimeWindow::from_duration(start, duration_minutes)?;

        let earliest = now
            .checked_add_signed(self.min_lead_time)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        if start < earliest {
            return Err(BookingError::Validation(format!(
                "Appointments must be booked at least {} minutes in advance",
                self.min_lead_time.num_minutes()
            )));
        }

        if !self.within_business_hours(&window) {
            return Err(BookingError::Validation(format!(
                "Appointments must be within business hours ({} - {})",
                self.opening.format("%H:%M"),
                self.closing.format("%H:%M")
            )));
        }

        Ok(window)
    }

    /// Whether `window` starts and ends on one local day between opening
    /// and closing.
    pub fn within_business_hours(&self, window: &TimeWindow) -> bool {
        let local_start = window.start.with_timezone(&self.timezone);
        let local_end = window.end.with_timezone(&self.timezone);

        local_start.date_naive() == local_end.date_naive()
            && local_start.time() >= self.opening
            && local_end.time() <= self.closing
    }
}

/// First existing window that overlaps `candidate`, skipping `exclude`.
pub fn find_conflict<I>(candidate: &TimeWindow, existing: I, exclude: Option<Uuid>) -> Option<Uuid>
where
    I: IntoIterator<Item = (Uuid, TimeWindow)>,
{
    existing
        .into_iter()
        .filter(|(id, _)| Some(*id) != exclude)
        .find(|(_, window)| window.overlaps(candidate))
        .map(|(id, _)| id)
}
