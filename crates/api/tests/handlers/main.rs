#[path = "../test_utils.rs"]
mod test_utils;

mod booking_flow_test;
mod calendar_sync_test;
mod middleware_test;
mod permissions_test;
mod routes_test;
