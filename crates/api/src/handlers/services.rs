use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use barbershop_core::{
    errors::BookingError,
    models::service::{CreateServiceRequest, Service, ServiceListQuery, UpdateServiceRequest},
    scheduling::{BookingRules, TimeWindow},
};
use barbershop_db::repositories::{appointment, service};
use chrono::Utc;
use sqlx::PgConnection;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::{
    calendar_sync,
    middleware::{
        auth::{AuthUser, MaybeAuthUser},
        error_handling::AppError,
        permissions,
    },
    ApiState,
};

fn not_found(id: Uuid) -> BookingError {
    BookingError::NotFound(format!("Service with ID {} not found", id))
}

#[axum::debug_handler]
pub async fn list_services(
    State(state): State<Arc<ApiState>>,
    viewer: MaybeAuthUser,
    Query(query): Query<ServiceListQuery>,
) -> Result<Json<Vec<Service>>, AppError> {
    // Inactive services are only listed for staff
    let include_inactive = query.include_inactive && viewer.is_staff();

    let services = service::list_services(&state.db_pool, include_inactive)
        .await?
        .into_iter()
        .map(Service::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(services))
}

#[axum::debug_handler]
pub async fn get_service(
    State(state): State<Arc<ApiState>>,
    viewer: MaybeAuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Service>, AppError> {
    let found = service::get_service_by_id(&state.db_pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;

    if !found.is_active && !viewer.is_staff() {
        return Err(not_found(id).into());
    }

    Ok(Json(Service::try_from(found)?))
}

#[axum::debug_handler]
pub async fn create_service(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
    Json(payload): Json<CreateServiceRequest>,
) -> Result<(StatusCode, Json<Service>), AppError> {
    permissions::require_service_manager(&auth.user)?;
    payload.validate()?;

    let created = Service::try_from(service::create_service(&state.db_pool, &payload).await?)?;
    info!("{} created service {}", auth.user.username, created.label());

    Ok((StatusCode::CREATED, Json(created)))
}

#[axum::debug_handler]
pub async fn update_service(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateServiceRequest>,
) -> Result<Json<Service>, AppError> {
    permissions::require_service_manager(&auth.user)?;
    payload.validate()?;

    let mut tx = state.db_pool.begin().await?;
    let current = appointment::lock_service(&mut *tx, id)
        .await?
        .ok_or_else(|| not_found(id))?;

    if let Some(duration) = payload
        .duration_minutes
        .filter(|duration| *duration > current.duration_minutes)
    {
        ensure_booked_appointments_fit(&mut tx, &state.rules, id, duration).await?;
    }

    let updated = service::update_service(&mut *tx, id, &payload)
        .await?
        .ok_or_else(|| not_found(id))?;
    tx.commit().await?;

    Ok(Json(Service::try_from(updated)?))
}

/// Booked active appointments must stay apart and, from now on, inside
/// business hours when the service is lengthened to `duration_minutes`.
async fn ensure_booked_appointments_fit(
    conn: &mut PgConnection,
    rules: &BookingRules,
    service_id: Uuid,
    duration_minutes: i32,
) -> Result<(), AppError> {
    if let Some((first, second)) =
        appointment::find_overlap_for_duration(&mut *conn, service_id, duration_minutes).await?
    {
        info!(
            "Lengthening service {} to {} minutes would overlap appointments {} and {}",
            service_id, duration_minutes, first, second
        );
        return Err(BookingError::Conflict(format!(
            "A duration of {} minutes would make booked appointments overlap",
            duration_minutes
        ))
        .into());
    }

    let upcoming = appointment::upcoming_active_starts(&mut *conn, service_id, Utc::now()).await?;
    for start in upcoming {
        let window = TimeWindow::from_duration(start, duration_minutes)?;
        if !rules.within_business_hours(&window) {
            return Err(BookingError::Validation(format!(
                "A duration of {} minutes would push the appointment at {} past business hours",
                duration_minutes, start
            ))
            .into());
        }
    }

    Ok(())
}

/// Deleting a service also deletes its appointments; their calendar events
/// are removed afterwards.
#[axum::debug_handler]
pub async fn delete_service(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    permissions::require_service_manager(&auth.user)?;

    let event_ids = appointment::calendar_event_ids_for_service(&state.db_pool, id).await?;
    if !service::delete_service(&state.db_pool, id).await? {
        return Err(not_found(id).into());
    }

    let removed =
        calendar_sync::retract_events_best_effort(state.calendar.as_deref(), &event_ids).await;
    info!(
        "{} deleted service {} ({} of {} calendar events removed)",
        auth.user.username,
        id,
        removed,
        event_ids.len()
    );

    Ok(StatusCode::NO_CONTENT)
}
