use eyre::{eyre, Result};
use std::{env, path::PathBuf};

pub const DEFAULT_CREDENTIALS_FILE: &str = "secrets/barber_service.json";
pub const DEFAULT_TIMEZONE: &str = "America/Sao_Paulo";
pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Configuration for calendar synchronization.
///
/// Sync is optional: without `CALENDAR_ID` the service runs with no calendar
/// and appointments are stored without an external event.
#[derive(Debug, Clone)]
pub struct CalendarConfig {
    /// Target calendar (usually an e-mail-like id) (required)
    pub calendar_id: String,
    /// Path to the Google service-account JSON key
    pub credentials_file: PathBuf,
    /// IANA timezone name attached to created events
    pub timezone: String,
    /// Calendar API root, overridable for testing
    pub api_base_url: String,
    /// Upper bound on each token or event request
    pub request_timeout_secs: u64,
}

impl CalendarConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Option<Self>> {
        Self::from_source(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, returning `None` when no calendar
    /// is configured.
    pub fn from_source<F>(lookup: F) -> Result<Option<Self>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let calendar_id = match lookup("CALENDAR_ID").filter(|id| !id.trim().is_empty()) {
            Some(id) => id.trim().to_string(),
            None => return Ok(None),
        };

        let credentials_file = lookup("GOOGLE_CREDENTIALS_FILE")
            .unwrap_or_else(|| DEFAULT_CREDENTIALS_FILE.to_string())
            .into();

        let timezone = lookup("CALENDAR_TIMEZONE").unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|_| eyre!("CALENDAR_TIMEZONE is not a valid IANA timezone: {}", timezone))?;

        let api_base_url = lookup("CALENDAR_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let request_timeout_secs = match lookup("CALENDAR_REQUEST_TIMEOUT_SECONDS") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| eyre!("CALENDAR_REQUEST_TIMEOUT_SECONDS must be a positive integer: {}", raw))?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        Ok(Some(Self {
            calendar_id,
            credentials_file,
            timezone,
            api_base_url,
            request_timeout_secs,
        }))
    }
}
