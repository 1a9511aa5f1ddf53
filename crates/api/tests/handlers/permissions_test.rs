use barbershop_api::middleware::permissions;
use barbershop_core::{errors::BookingError, models::user::Role};
use rstest::rstest;

use crate::test_utils::user_with_role;

#[rstest]
#[case(Role::Client, false)]
#[case(Role::Employee, true)]
#[case(Role::Manager, true)]
#[case(Role::Superuser, true)]
fn test_require_staff(#[case] role: Role, #[case] allowed: bool) {
    let result = permissions::require_staff(&user_with_role(role));

    assert_eq!(result.is_ok(), allowed);
    if !allowed {
        assert!(matches!(result, Err(BookingError::Authorization(_))));
    }
}

#[rstest]
#[case(Role::Client, false)]
#[case(Role::Employee, false)]
#[case(Role::Manager, true)]
#[case(Role::Superuser, true)]
fn test_require_service_manager(#[case] role: Role, #[case] allowed: bool) {
    assert_eq!(
        permissions::require_service_manager(&user_with_role(role)).is_ok(),
        allowed
    );
}

#[rstest]
#[case(Role::Employee, Role::Employee, false)]
#[case(Role::Manager, Role::Employee, true)]
#[case(Role::Manager, Role::Manager, false)]
#[case(Role::Superuser, Role::Employee, true)]
#[case(Role::Superuser, Role::Manager, true)]
#[case(Role::Client, Role::Employee, false)]
fn test_require_can_register(#[case] actor: Role, #[case] target: Role, #[case] allowed: bool) {
    assert_eq!(
        permissions::require_can_register(&user_with_role(actor), target).is_ok(),
        allowed
    );
}

#[test]
fn test_owner_can_access_own_appointment() {
    let client = user_with_role(Role::Client);

    assert!(permissions::ensure_owner(&client, client.id).is_ok());
    assert!(permissions::ensure_owner_or_staff(&client, client.id).is_ok());
}

#[test]
fn test_client_cannot_access_someone_elses_appointment() {
    let client = user_with_role(Role::Client);
    let other = user_with_role(Role::Client);

    assert!(permissions::ensure_owner_or_staff(&client, other.id).is_err());
    assert!(permissions::ensure_owner(&client, other.id).is_err());
}

#[test]
fn test_staff_can_view_but_not_reschedule_for_clients() {
    let employee = user_with_role(Role::Employee);
    let client = user_with_role(Role::Client);

    assert!(permissions::ensure_owner_or_staff(&employee, client.id).is_ok());
    assert!(matches!(
        permissions::ensure_owner(&employee, client.id),
        Err(BookingError::Authorization(_))
    ));
}
