use barbershop_core::{
    errors::BookingError,
    models::{
        appointment::{Appointment, AppointmentResponse},
        service::Service,
        user::User,
    },
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub profile_picture: Option<String>,
    pub role: String,
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbService {
    pub id: Uuid,
    pub name: String,
    pub price_cents: i64,
    pub category: String,
    pub description: String,
    pub image: Option<String>,
    pub is_active: bool,
    pub duration_minutes: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbAppointment {
    pub id: Uuid,
    pub client_id: Uuid,
    pub service_id: Uuid,
    pub date_time: DateTime<Utc>,
    pub status: String,
    pub notes: Option<String>,
    pub calendar_event_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Appointment row joined with the fields of its service needed for display
/// and for building calendar events.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbAppointmentDetails {
    pub id: Uuid,
    pub client_id: Uuid,
    pub service_id: Uuid,
    pub service_name: String,
    pub duration_minutes: i32,
    pub date_time: DateTime<Utc>,
    pub status: String,
    pub notes: Option<String>,
    pub calendar_event_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbAppointmentDetails {
    /// `None` when the end falls outside the representable range.
    pub fn ends_at(&self) -> Option<DateTime<Utc>> {
        self.date_time
            .checked_add_signed(Duration::minutes(i64::from(self.duration_minutes)))
    }
}

impl TryFrom<DbUser> for User {
    type Error = BookingError;

    fn try_from(row: DbUser) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            role: row.role.parse()?,
            username: row.username,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            phone_number: row.phone_number,
            profile_picture: row.profile_picture,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<DbService> for Service {
    type Error = BookingError;

    fn try_from(row: DbService) -> Result<Self, Self::Error> {
        Ok(Service {
            id: row.id,
            category: row.category.parse()?,
            name: row.name,
            price_cents: row.price_cents,
            description: row.description,
            image: row.image,
            is_active: row.is_active,
            duration_minutes: row.duration_minutes,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<DbAppointment> for Appointment {
    type Error = BookingError;

    fn try_from(row: DbAppointment) -> Result<Self, Self::Error> {
        Ok(Appointment {
            id: row.id,
            client_id: row.client_id,
            service_id: row.service_id,
            date_time: row.date_time,
            status: row.status.parse()?,
            notes: row.notes,
            calendar_event_id: row.calendar_event_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<DbAppointmentDetails> for AppointmentResponse {
    type Error = BookingError;

    fn try_from(row: DbAppointmentDetails) -> Result<Self, Self::Error> {
        let ends_at = row.ends_at().ok_or_else(|| {
            BookingError::Validation(format!("Appointment {} ends out of range", row.id))
        })?;
        Ok(AppointmentResponse {
            id: row.id,
            client_id: row.client_id,
            service_id: row.service_id,
            service_name: row.service_name,
            date_time: row.date_time,
            ends_at,
            status: row.status.parse()?,
            notes: row.notes,
            calendar_event_id: row.calendar_event_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
