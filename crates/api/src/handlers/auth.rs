use axum::{extract::State, http::StatusCode, Json};
use barbershop_core::{
    errors::BookingError,
    models::user::{LoginRequest, LoginResponse, RegisterUserRequest, Role, User},
};
use barbershop_db::repositories::{
    token,
    user::{self, NewUser},
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    middleware::{
        auth::{self, AuthUser, TOKEN_TYPE},
        error_handling::AppError,
        permissions,
    },
    ApiState,
};

/// Validates and stores a new account with the given role.
async fn create_account(
    state: &ApiState,
    payload: &RegisterUserRequest,
    role: Role,
) -> Result<User, AppError> {
    payload.validate()?;

    if user::username_taken(&state.db_pool, &payload.username, None).await? {
        return Err(BookingError::Validation(
            "A user with that username already exists".to_string(),
        )
        .into());
    }
    if user::email_taken(&state.db_pool, &payload.email, None).await? {
        return Err(BookingError::Validation(
            "A user with that email already exists".to_string(),
        )
        .into());
    }

    let password_hash = auth::hash_password(&payload.password)?;
    let db_user = user::create_user(
        &state.db_pool,
        &NewUser {
            username: &payload.username,
            email: &payload.email,
            first_name: &payload.first_name,
            last_name: &payload.last_name,
            phone_number: &payload.phone_number,
            password_hash: &password_hash,
            role,
        },
    )
    .await?;

    let created = User::try_from(db_user)?;
    info!("Registered {} account {}", created.role, created.username);
    Ok(created)
}

#[axum::debug_handler]
pub async fn register(
    State(state): State<Arc<ApiState>>,
    Json(payload): Json<RegisterUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let created = create_account(&state, &payload, Role::Client).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[axum::debug_handler]
pub async fn register_employee(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
    Json(payload): Json<RegisterUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    permissions::require_can_register(&auth.user, Role::Employee)?;

    let created = create_account(&state, &payload, Role::Employee).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[axum::debug_handler]
pub async fn register_manager(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
    Json(payload): Json<RegisterUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    permissions::require_can_register(&auth.user, Role::Manager)?;

    let created = create_account(&state, &payload, Role::Manager).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<Arc<ApiState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let invalid = || BookingError::Authentication("Invalid username or password".to_string());

    let db_user = user::get_user_by_username(&state.db_pool, payload.username.trim())
        .await?
        .ok_or_else(invalid)?;

    if !auth::verify_password(&payload.password, &db_user.password_hash)? {
        warn!("Failed login for {}", db_user.username);
        return Err(invalid().into());
    }

    let account = User::try_from(db_user)?;
    if !account.is_active {
        return Err(BookingError::Authentication("Account is disabled".to_string()).into());
    }

    let issued = auth::issue_token(&account, &state.config.jwt_secret, state.config.jwt_ttl_hours)?;
    debug!("Issued token {} for {}", issued.claims.jti, account.username);

    Ok(Json(LoginResponse {
        token: issued.token,
        token_type: TOKEN_TYPE.to_string(),
        expires_at: issued.claims.expires_at(),
        user: account,
    }))
}

#[axum::debug_handler]
pub async fn logout(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
) -> Result<StatusCode, AppError> {
    token::revoke_token(
        &state.db_pool,
        auth.claims.jti,
        auth.user.id,
        auth.claims.expires_at(),
    )
    .await?;

    let purged = token::purge_expired(&state.db_pool).await?;
    if purged > 0 {
        debug!("Purged {} expired revoked tokens", purged);
    }

    info!("{} logged out", auth.user.username);
    Ok(StatusCode::NO_CONTENT)
}
