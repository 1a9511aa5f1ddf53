//! Role-tier guards used by handlers after authentication.

use barbershop_core::{
    errors::{BookingError, BookingResult},
    models::user::{Role, User},
};
use uuid::Uuid;

pub fn require_staff(user: &User) -> BookingResult<()> {
    if user.role.is_staff() {
        Ok(())
    } else {
        Err(BookingError::Authorization(
            "Only staff members can perform this action".to_string(),
        ))
    }
}

pub fn require_service_manager(user: &User) -> BookingResult<()> {
    if user.role.can_manage_services() {
        Ok(())
    } else {
        Err(BookingError::Authorization(
            "Only managers can manage services".to_string(),
        ))
    }
}

/// Staff-created accounts: managers add employees, superusers add managers.
pub fn require_can_register(actor: &User, target: Role) -> BookingResult<()> {
    if actor.role.can_register(target) {
        Ok(())
    } else {
        Err(BookingError::Authorization(format!(
            "A {} cannot register a {}",
            actor.role, target
        )))
    }
}

pub fn ensure_owner(user: &User, owner_id: Uuid) -> BookingResult<()> {
    if user.id == owner_id {
        Ok(())
    } else {
        Err(BookingError::Authorization(
            "You can only change your own appointments".to_string(),
        ))
    }
}

pub fn ensure_owner_or_staff(user: &User, owner_id: Uuid) -> BookingResult<()> {
    if user.id == owner_id || user.role.can_manage_appointments() {
        Ok(())
    } else {
        Err(BookingError::Authorization(
            "You do not have access to this appointment".to_string(),
        ))
    }
}
