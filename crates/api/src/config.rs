//! # API Configuration Module
//!
//! Loads the settings of the booking API server from environment variables,
//! with defaults where appropriate.
//!
//! ## Environment Variables
//!
//! - `API_HOST`: The host address to bind the server to (default: "0.0.0.0")
//! - `API_PORT`: The port to listen on (default: 3000)
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `LOG_LEVEL`: Logging level (default: "info")
//! - `API_CORS_ORIGINS`: Comma-separated list of allowed CORS origins
//! - `JWT_SECRET`: Secret used to sign session tokens (required)
//! - `JWT_TTL_HOURS`: Session token lifetime (default: 12)
//! - `API_REQUEST_TIMEOUT_SECONDS`: Per-request timeout (default: 30)
//! - `MEDIA_ROOT`: Directory holding uploaded files (default: "media")
//! - `MAX_UPLOAD_BYTES`: Largest accepted upload (default: 5 MiB)
//! - `BUSINESS_TIMEZONE`: Timezone of the shop (default: "America/Sao_Paulo")
//! - `BUSINESS_OPEN_HOUR` / `BUSINESS_CLOSE_HOUR`: Opening hours (default: 7 / 17)
//! - `MIN_LEAD_TIME_MINUTES`: How far ahead bookings must be made (default: 60)

use std::{env, path::PathBuf};

use barbershop_core::scheduling::BookingRules;
use eyre::{eyre, Result, WrapErr};
use tracing::Level;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Configuration for the booking API server
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host address for the API server (e.g., "127.0.0.1", "0.0.0.0")
    pub host: String,

    /// Port for the API server to listen on
    pub port: u16,

    /// PostgreSQL database connection string
    pub database_url: String,

    /// Log level for the application
    pub log_level: Level,

    /// CORS allowed origins (optional)
    pub cors_origins: Option<Vec<String>>,

    /// HMAC secret for session tokens
    pub jwt_secret: String,

    /// Session token lifetime in hours
    pub jwt_ttl_hours: i64,

    /// Request timeout in seconds
    pub request_timeout: u64,

    /// Directory uploaded pictures are written to and served from
    pub media_root: PathBuf,

    /// Body limit for multipart uploads
    pub max_upload_bytes: usize,

    pub business_timezone: String,
    pub business_open_hour: u32,
    pub business_close_hour: u32,
    pub min_lead_time_minutes: i64,
}

impl ApiConfig {
    /// Creates a new ApiConfig from environment variables
    ///
    /// # Errors
    ///
    /// Fails when `DATABASE_URL` or `JWT_SECRET` is missing, or when a numeric
    /// or timezone value cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_source(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_source<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Network settings
        let host = lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = lookup("API_PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .wrap_err("Invalid API_PORT value")?;

        // Database settings
        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| eyre!("DATABASE_URL environment variable must be set"))?;

        // Logging settings
        let log_level = match lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()).as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };

        // CORS settings
        let cors_origins = lookup("API_CORS_ORIGINS").map(|origins| {
            origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        // Security settings
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| eyre!("JWT_SECRET environment variable must be set"))?;
        let jwt_ttl_hours = parse_or(&lookup, "JWT_TTL_HOURS", 12)?;
        if jwt_ttl_hours <= 0 {
            return Err(eyre!("JWT_TTL_HOURS must be positive"));
        }

        // Performance settings
        let request_timeout = parse_or(&lookup, "API_REQUEST_TIMEOUT_SECONDS", 30)?;
        if request_timeout == 0 {
            return Err(eyre!("API_REQUEST_TIMEOUT_SECONDS must be positive"));
        }

        // Uploads
        let media_root = lookup("MEDIA_ROOT").unwrap_or_else(|| "media".to_string()).into();
        let max_upload_bytes = parse_or(&lookup, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;

        // Booking rules
        let business_timezone =
            lookup("BUSINESS_TIMEZONE").unwrap_or_else(|| "America/Sao_Paulo".to_string());
        let business_open_hour = parse_or(&lookup, "BUSINESS_OPEN_HOUR", 7)?;
        let business_close_hour = parse_or(&lookup, "BUSINESS_CLOSE_HOUR", 17)?;
        let min_lead_time_minutes = parse_or(&lookup, "MIN_LEAD_TIME_MINUTES", 60)?;

        let config = Self {
            host,
            port,
            database_url,
            log_level,
            cors_origins,
            jwt_secret,
            jwt_ttl_hours,
            request_timeout,
            media_root,
            max_upload_bytes,
            business_timezone,
            business_open_hour,
            business_close_hour,
            min_lead_time_minutes,
        };

        // Reject bad hours or timezone at startup rather than on first booking
        config.booking_rules()?;

        Ok(config)
    }

    /// Returns the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Booking rules described by the business settings.
    pub fn booking_rules(&self) -> Result<BookingRules> {
        let timezone = self
            .business_timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|_| eyre!("Invalid BUSINESS_TIMEZONE: {}", self.business_timezone))?;

        BookingRules::new(
            timezone,
            self.business_open_hour,
            self.business_close_hour,
            self.min_lead_time_minutes,
        )
        .map_err(|e| eyre!("Invalid business hours: {}", e))
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| eyre!("Invalid {} value: {}", key, value)),
        None => Ok(default),
    }
}
