use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route(
            "/api/account",
            get(handlers::account::get_account).put(handlers::account::update_account),
        )
        .route("/api/account/password", put(handlers::account::change_password))
        .route(
            "/api/account/profile-picture",
            post(handlers::account::upload_profile_picture),
        )
}
