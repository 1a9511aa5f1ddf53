use std::{fs, path::Path, time::Duration as StdDuration};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    config::CalendarConfig,
    event::{CalendarEvent, CreatedEvent},
    CalendarClient, CalendarError, CalendarResult,
};

pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens are refreshed this long before Google says they expire.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// The fields of a Google service-account key file that we use.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> CalendarResult<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            CalendarError::Credentials(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> CalendarResult<Self> {
        serde_json::from_str(raw).map_err(|e| CalendarError::Credentials(e.to_string()))
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Google Calendar client authenticated as a service account.
pub struct GoogleCalendar {
    http: reqwest::Client,
    config: CalendarConfig,
    key: ServiceAccountKey,
    signing_key: EncodingKey,
    token: Mutex<Option<AccessToken>>,
}

impl GoogleCalendar {
    /// Builds a client from the key file named in `config`.
    pub fn from_config(config: CalendarConfig) -> CalendarResult<Self> {
        let key = ServiceAccountKey::from_file(&config.credentials_file)?;
        Self::new(config, key)
    }

    pub fn new(config: CalendarConfig, key: ServiceAccountKey) -> CalendarResult<Self> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| CalendarError::Credentials(format!("invalid private key: {}", e)))?;

        let http = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(config.request_timeout_secs))
            .build()?;

        info!(
            "Calendar sync enabled for {} as {}",
            config.calendar_id, key.client_email
        );

        Ok(Self {
            http,
            config,
            key,
            signing_key,
            token: Mutex::new(None),
        })
    }

    fn events_url(&self) -> String {
        format!(
            "{}/calendars/{}/events",
            self.config.api_base_url,
            urlencoding::encode(&self.config.calendar_id)
        )
    }

    fn sign_assertion(&self, now: DateTime<Utc>) -> CalendarResult<String> {
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: CALENDAR_SCOPE,
            aud: &self.key.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        jsonwebtoken::encode(&header, &claims, &self.signing_key)
            .map_err(|e| CalendarError::Token(e.to_string()))
    }

    /// Returns a cached access token or exchanges a fresh assertion for one.
    async fn access_token(&self) -> CalendarResult<String> {
        let mut cached = self.token.lock().await;
        let now = Utc::now();

        if let Some(token) = cached.as_ref() {
            if token.expires_at > now + Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) {
                return Ok(token.value.clone());
            }
        }

        debug!("Requesting calendar access token from {}", self.key.token_uri);
        let assertion = self.sign_assertion(now)?;
        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CalendarError::Token(format!("{}: {}", status, body)));
        }

        let token: TokenResponse = response.json().await?;
        let value = token.access_token.clone();
        *cached = Some(AccessToken {
            value: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        });

        Ok(value)
    }
}

#[async_trait]
impl CalendarClient for GoogleCalendar {
    async fn insert_event(&self, event: &CalendarEvent) -> CalendarResult<String> {
        let token = self.access_token().await?;
        let response = self
            .http
            .post(self.events_url())
            .bearer_auth(token)
            .json(&event.to_body())
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!("Calendar insert failed with {}: {}", status, body);
            return Err(CalendarError::Api { status, body });
        }

        let created: CreatedEvent = response.json().await?;
        info!(
            "Calendar event {} created ({})",
            created.id,
            created.html_link.as_deref().unwrap_or("no link")
        );
        Ok(created.id)
    }

    async fn delete_event(&self, event_id: &str) -> CalendarResult<()> {
        let token = self.access_token().await?;
        let url = format!("{}/{}", self.events_url(), urlencoding::encode(event_id));
        let response = self.http.delete(url).bearer_auth(token).send().await?;

        match response.status() {
            status if status.is_success() => {
                info!("Calendar event {} deleted", event_id);
                Ok(())
            }
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                warn!("Calendar event {} was already gone", event_id);
                Ok(())
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(CalendarError::Api {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }

    fn timezone(&self) -> String {
        self.config.timezone.clone()
    }
}
