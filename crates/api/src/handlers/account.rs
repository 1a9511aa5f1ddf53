use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use barbershop_core::{
    errors::BookingError,
    models::user::{
        validate_image_extension, validate_password, ChangePasswordRequest, ProfilePictureResponse,
        UpdateProfileRequest, User, DEFAULT_PROFILE_PICTURE,
    },
};
use barbershop_db::repositories::user;
use std::{path::Path, sync::Arc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    middleware::{
        auth::{self, AuthUser},
        error_handling::AppError,
    },
    ApiState,
};

/// Multipart field carrying the picture.
pub const PROFILE_PICTURE_FIELD: &str = "profile_picture";
const PROFILE_PICTURE_DIR: &str = "profile_pictures";

#[axum::debug_handler(state = Arc<ApiState>)]
pub async fn get_account(auth: AuthUser) -> Json<User> {
    Json(auth.user)
}

#[axum::debug_handler]
pub async fn update_account(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<User>, AppError> {
    if payload.is_empty() {
        return Ok(Json(auth.user));
    }
    payload.validate()?;

    let id = auth.user.id;
    if let Some(username) = &payload.username {
        if user::username_taken(&state.db_pool, username, Some(id)).await? {
            return Err(BookingError::Validation(
                "A user with that username already exists".to_string(),
            )
            .into());
        }
    }
    if let Some(email) = &payload.email {
        if user::email_taken(&state.db_pool, email, Some(id)).await? {
            return Err(BookingError::Validation(
                "A user with that email already exists".to_string(),
            )
            .into());
        }
    }

    let updated = User::try_from(user::update_profile(&state.db_pool, id, &payload).await?)?;
    info!("Updated profile of {}", updated.username);

    Ok(Json(updated))
}

#[axum::debug_handler]
pub async fn change_password(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<StatusCode, AppError> {
    let db_user = user::get_user_by_id(&state.db_pool, auth.user.id)
        .await?
        .ok_or_else(|| BookingError::NotFound(format!("User with ID {} not found", auth.user.id)))?;

    if !auth::verify_password(&payload.old_password, &db_user.password_hash)? {
        return Err(BookingError::Validation(
            "Your old password was entered incorrectly".to_string(),
        )
        .into());
    }
    validate_password(&payload.new_password, &payload.new_password_confirmation)?;

    let password_hash = auth::hash_password(&payload.new_password)?;
    user::update_password(&state.db_pool, db_user.id, &password_hash).await?;
    info!("Password changed for {}", db_user.username);

    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn upload_profile_picture(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<ProfilePictureResponse>, AppError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(PROFILE_PICTURE_FIELD) {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| BookingError::Validation("Upload must be a file".to_string()))?;
        let extension = validate_image_extension(&file_name)?;
        let bytes = field.bytes().await?;
        upload = Some((extension, bytes));
        break;
    }

    let (extension, bytes) = upload.ok_or_else(|| {
        BookingError::Validation(format!("Missing '{}' file field", PROFILE_PICTURE_FIELD))
    })?;
    if bytes.is_empty() {
        return Err(BookingError::Validation("Uploaded file is empty".to_string()).into());
    }

    let relative = format!(
        "{}/{}-{}.{}",
        PROFILE_PICTURE_DIR,
        auth.user.id,
        Uuid::new_v4().simple(),
        extension
    );
    let media_root = &state.config.media_root;
    tokio::fs::create_dir_all(media_root.join(PROFILE_PICTURE_DIR))
        .await
        .map_err(|e| BookingError::Internal(Box::new(e)))?;
    tokio::fs::write(media_root.join(&relative), &bytes)
        .await
        .map_err(|e| BookingError::Internal(Box::new(e)))?;

    let updated = user::update_profile_picture(&state.db_pool, auth.user.id, &relative).await?;
    info!("Stored profile picture {} ({} bytes)", relative, bytes.len());

    if let Some(previous) = auth.user.profile_picture.as_deref() {
        remove_previous_picture(media_root, previous).await;
    }

    Ok(Json(ProfilePictureResponse {
        profile_picture: updated.profile_picture.unwrap_or(relative),
    }))
}

async fn remove_previous_picture(media_root: &Path, previous: &str) {
    if previous == DEFAULT_PROFILE_PICTURE || !previous.starts_with(PROFILE_PICTURE_DIR) {
        return;
    }
    if let Err(err) = tokio::fs::remove_file(media_root.join(previous)).await {
        warn!("Could not remove old profile picture {}: {}", previous, err);
    }
}
