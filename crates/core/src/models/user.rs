use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{BookingError, BookingResult};

pub const DEFAULT_PROFILE_PICTURE: &str = "profile_pictures/default.jpg";
pub const ALLOWED_IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Access tier of an account.
///
/// The tier only drives authorization; every tier can book appointments for
/// itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Client,
    Employee,
    Manager,
    Superuser,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Employee => "employee",
            Role::Manager => "manager",
            Role::Superuser => "superuser",
        }
    }

    /// Any non-client account.
    pub fn is_staff(&self) -> bool {
        !matches!(self, Role::Client)
    }

    pub fn can_manage_services(&self) -> bool {
        matches!(self, Role::Manager | Role::Superuser)
    }

    pub fn can_manage_appointments(&self) -> bool {
        self.is_staff()
    }

    /// Whether an account of this tier may create an account of `target` tier.
    ///
    /// Clients register themselves, so this is only consulted for staff-created
    /// accounts.
    pub fn can_register(&self, target: Role) -> bool {
        match target {
            Role::Client => true,
            Role::Employee => matches!(self, Role::Manager | Role::Superuser),
            Role::Manager | Role::Superuser => matches!(self, Role::Superuser),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Role::Client),
            "employee" => Ok(Role::Employee),
            "manager" => Ok(Role::Manager),
            "superuser" => Ok(Role::Superuser),
            other => Err(BookingError::Validation(format!("Unknown role: {}", other))),
        }
    }
}

/// Public view of an account. The password hash never leaves the db crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub profile_picture: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUserRequest {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone_number: String,
    pub password: String,
    pub password_confirmation: String,
}

impl RegisterUserRequest {
    pub fn validate(&self) -> BookingResult<()> {
        validate_username(&self.username)?;
        validate_email(&self.email)?;
        validate_person_name("first_name", &self.first_name)?;
        validate_person_name("last_name", &self.last_name)?;
        validate_phone_number(&self.phone_number)?;
        validate_password(&self.password, &self.password_confirmation)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
}

impl UpdateProfileRequest {
    pub fn validate(&self) -> BookingResult<()> {
        if let Some(username) = &self.username {
            validate_username(username)?;
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(first_name) = &self.first_name {
            validate_person_name("first_name", first_name)?;
        }
        if let Some(last_name) = &self.last_name {
            validate_person_name("last_name", last_name)?;
        }
        if let Some(phone_number) = &self.phone_number {
            validate_phone_number(phone_number)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.phone_number.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
    pub new_password_confirmation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfilePictureResponse {
    pub profile_picture: String,
}

pub fn validate_username(username: &str) -> BookingResult<()> {
    if username.is_empty() || username.chars().count() > 150 {
        return Err(BookingError::Validation(
            "Username must be between 1 and 150 characters".to_string(),
        ));
    }
    let allowed = |c: char| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_');
    if !username.chars().all(allowed) {
        return Err(BookingError::Validation(
            "Username may only contain letters, digits and @/./+/-/_".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> BookingResult<()> {
    let invalid = || BookingError::Validation(format!("Invalid email address: {}", email));

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || email.chars().any(char::is_whitespace)
    {
        return Err(invalid());
    }
    Ok(())
}

pub fn validate_person_name(field: &str, value: &str) -> BookingResult<()> {
    let len = value.trim().chars().count();
    if len == 0 || len > 70 {
        return Err(BookingError::Validation(format!(
            "{} must be between 1 and 70 characters",
            field
        )));
    }
    Ok(())
}

pub fn validate_phone_number(phone_number: &str) -> BookingResult<()> {
    if phone_number.len() > 11 || !phone_number.chars().all(|c| c.is_ascii_digit()) {
        return Err(BookingError::Validation(
            "Phone number must contain at most 11 digits".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str, confirmation: &str) -> BookingResult<()> {
    if password != confirmation {
        return Err(BookingError::Validation(
            "The two password fields didn't match".to_string(),
        ));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(BookingError::Validation(format!(
            "Password must contain at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(BookingError::Validation(
            "Password can't be entirely numeric".to_string(),
        ));
    }
    Ok(())
}

/// Returns the lowercased extension when it is an accepted image type.
pub fn validate_image_extension(file_name: &str) -> BookingResult<String> {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    if ALLOWED_IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        Ok(extension)
    } else {
        Err(BookingError::Validation(
            "Only JPG, JPEG or PNG files are allowed".to_string(),
        ))
    }
}
