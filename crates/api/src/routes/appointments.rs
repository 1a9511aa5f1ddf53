use axum::{
    routing::{get, put},
    Router,
};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route(
            "/api/appointments",
            get(handlers::appointments::list_my_appointments)
                .post(handlers::appointments::create_appointment),
        )
        // Static segment, matched ahead of `/:id`
        .route(
            "/api/appointments/all",
            get(handlers::appointments::list_all_appointments),
        )
        .route(
            "/api/appointments/:id",
            get(handlers::appointments::get_appointment)
                .put(handlers::appointments::reschedule_appointment)
                .delete(handlers::appointments::delete_appointment),
        )
        .route(
            "/api/appointments/:id/status",
            put(handlers::appointments::update_appointment_status),
        )
}
