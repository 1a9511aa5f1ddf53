use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{BookingError, BookingResult};

/// Largest price representable by the catalog: 9999.99.
pub const MAX_PRICE_CENTS: i64 = 999_999;
pub const MAX_SERVICE_NAME_LEN: usize = 50;
pub const DEFAULT_SERVICE_IMAGE: &str = "services/default.jpg";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    #[default]
    Hair,
    Eyebrow,
    Beard,
    KidsHaircut,
    HairTreatment,
    Custom,
}

impl ServiceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceCategory::Hair => "hair",
            ServiceCategory::Eyebrow => "eyebrow",
            ServiceCategory::Beard => "beard",
            ServiceCategory::KidsHaircut => "kids_haircut",
            ServiceCategory::HairTreatment => "hair_treatment",
            ServiceCategory::Custom => "custom",
        }
    }
}

impl fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceCategory {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hair" => Ok(ServiceCategory::Hair),
            "eyebrow" => Ok(ServiceCategory::Eyebrow),
            "beard" => Ok(ServiceCategory::Beard),
            "kids_haircut" => Ok(ServiceCategory::KidsHaircut),
            "hair_treatment" => Ok(ServiceCategory::HairTreatment),
            "custom" => Ok(ServiceCategory::Custom),
            other => Err(BookingError::Validation(format!(
                "Unknown service category: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub price_cents: i64,
    pub category: ServiceCategory,
    pub description: String,
    pub image: Option<String>,
    pub is_active: bool,
    pub duration_minutes: i32,
    pub created_at: DateTime<Utc>,
}

impl Service {
    /// Display label such as `Haircut - R$ 45.00`.
    pub fn label(&self) -> String {
        format!("{} - R$ {}", self.name, format_price(self.price_cents))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateServiceRequest {
    pub name: String,
    pub price_cents: i64,
    #[serde(default)]
    pub category: ServiceCategory,
    #[serde(default)]
    pub description: String,
    pub image: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub duration_minutes: i32,
}

fn default_active() -> bool {
    true
}

impl CreateServiceRequest {
    pub fn validate(&self) -> BookingResult<()> {
        validate_service_name(&self.name)?;
        validate_price_cents(self.price_cents)?;
        validate_duration(self.duration_minutes)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateServiceRequest {
    pub name: Option<String>,
    pub price_cents: Option<i64>,
    pub category: Option<ServiceCategory>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub is_active: Option<bool>,
    pub duration_minutes: Option<i32>,
}

impl UpdateServiceRequest {
    pub fn validate(&self) -> BookingResult<()> {
        if let Some(name) = &self.name {
            validate_service_name(name)?;
        }
        if let Some(price_cents) = self.price_cents {
            validate_price_cents(price_cents)?;
        }
        if let Some(duration) = self.duration_minutes {
            validate_duration(duration)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceListQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

pub fn validate_service_name(name: &str) -> BookingResult<()> {
    let len = name.trim().chars().count();
    if len == 0 || len > MAX_SERVICE_NAME_LEN {
        return Err(BookingError::Validation(format!(
            "Service name must be between 1 and {} characters",
            MAX_SERVICE_NAME_LEN
        )));
    }
    Ok(())
}

pub fn validate_price_cents(price_cents: i64) -> BookingResult<()> {
    if price_cents <= 0 {
        return Err(BookingError::Validation(
            "Price must be a positive value".to_string(),
        ));
    }
    if price_cents > MAX_PRICE_CENTS {
        return Err(BookingError::Validation(format!(
            "Price must not exceed {}",
            format_price(MAX_PRICE_CENTS)
        )));
    }
    Ok(())
}

pub fn validate_duration(duration_minutes: i32) -> BookingResult<()> {
    if duration_minutes <= 0 {
        return Err(BookingError::Validation(
            "Duration must be a positive number of minutes".to_string(),
        ));
    }
    Ok(())
}

pub fn format_price(price_cents: i64) -> String {
    format!("{}.{:02}", price_cents / 100, price_cents % 100)
}
