//! Appointment booking and management.
//!
//! Every write runs in one transaction: the service row is locked, the
//! booking rules and conflict check run against the locked state, the row is
//! written, and the calendar is updated before commit. Any failure, including
//! a calendar error, drops the transaction and nothing is stored.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use barbershop_core::{
    errors::BookingError,
    models::appointment::{
        AppointmentResponse, AppointmentStatus, CreateAppointmentRequest, Page, Pagination,
        UpdateAppointmentRequest, UpdateStatusRequest,
    },
    scheduling::TimeWindow,
};
use barbershop_db::{
    models::{DbAppointmentDetails, DbService},
    repositories::appointment,
};
use chrono::Utc;
use sqlx::{PgConnection, Postgres, Transaction};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    calendar_sync,
    middleware::{auth::AuthUser, error_handling::AppError, permissions},
    ApiState,
};

fn not_found(id: Uuid) -> BookingError {
    BookingError::NotFound(format!("Appointment with ID {} not found", id))
}

/// Blank notes are stored as no notes.
fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

async fn locked_service(conn: &mut PgConnection, service_id: Uuid) -> Result<DbService, AppError> {
    appointment::lock_service(conn, service_id)
        .await?
        .ok_or_else(|| {
            BookingError::NotFound(format!("Service with ID {} not found", service_id)).into()
        })
}

fn ensure_bookable(service: &DbService) -> Result<(), AppError> {
    if service.is_active {
        Ok(())
    } else {
        Err(BookingError::Validation(format!(
            "Service '{}' is not available for booking",
            service.name
        ))
        .into())
    }
}

/// Fails with a conflict when an active appointment of the same service
/// overlaps `window`.
async fn ensure_no_conflict(
    conn: &mut PgConnection,
    service_id: Uuid,
    window: &TimeWindow,
    exclude: Option<Uuid>,
) -> Result<(), AppError> {
    let conflict =
        appointment::find_conflicting(conn, service_id, window.start, window.end, exclude).await?;

    match conflict {
        Some(existing) => {
            info!(
                "Booking of service {} at {} conflicts with appointment {}",
                service_id, window.start, existing.id
            );
            Err(BookingError::Conflict(
                "This time slot is already booked for the selected service".to_string(),
            )
            .into())
        }
        None => Ok(()),
    }
}

async fn load_details(conn: &mut PgConnection, id: Uuid) -> Result<DbAppointmentDetails, AppError> {
    appointment::get_appointment(conn, id)
        .await?
        .ok_or_else(|| not_found(id).into())
}

/// Commits, reporting a calendar event created in this transaction as
/// orphaned if the commit fails.
async fn commit(tx: Transaction<'_, Postgres>, created_event: Option<&str>) -> Result<(), AppError> {
    if let Err(err) = tx.commit().await {
        if let Some(event_id) = created_event {
            error!(
                "Commit failed after creating calendar event {}; the event is orphaned",
                event_id
            );
        }
        return Err(err.into());
    }
    Ok(())
}

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
    Json(payload): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<AppointmentResponse>), AppError> {
    let notes = normalize_notes(payload.notes);
    let mut tx = state.db_pool.begin().await?;

    let service = locked_service(&mut tx, payload.service_id).await?;
    ensure_bookable(&service)?;

    let window = state
        .rules
        .validate(payload.date_time, service.duration_minutes, Utc::now())?;
    ensure_no_conflict(&mut tx, service.id, &window, None).await?;

    let created = appointment::create_appointment(
        &mut *tx,
        auth.user.id,
        service.id,
        window.start,
        notes.as_deref(),
    )
    .await?;

    let event_id = calendar_sync::publish_appointment(
        state.calendar.as_deref(),
        &service.name,
        window.start,
        service.duration_minutes,
        notes.as_deref(),
    )
    .await?;
    if let Some(event_id) = &event_id {
        appointment::set_calendar_event_id(&mut *tx, created.id, Some(event_id)).await?;
    }

    let details = load_details(&mut tx, created.id).await?;
    commit(tx, event_id.as_deref()).await?;

    info!(
        "{} booked {} at {} (appointment {})",
        auth.user.username, service.name, window.start, created.id
    );
    Ok((StatusCode::CREATED, Json(AppointmentResponse::try_from(details)?)))
}

fn page_of(
    rows: Vec<DbAppointmentDetails>,
    pagination: &Pagination,
    total: i64,
) -> Result<Page<AppointmentResponse>, AppError> {
    let items = rows
        .into_iter()
        .map(AppointmentResponse::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page {
        items,
        page: pagination.page(),
        per_page: pagination.per_page(),
        total,
    })
}

#[axum::debug_handler]
pub async fn list_my_appointments(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Page<AppointmentResponse>>, AppError> {
    pagination.validate()?;

    let rows = appointment::list_for_client(
        &state.db_pool,
        auth.user.id,
        pagination.limit(),
        pagination.offset(),
    )
    .await?;
    let total = appointment::count_for_client(&state.db_pool, auth.user.id).await?;

    Ok(Json(page_of(rows, &pagination, total)?))
}

#[axum::debug_handler]
pub async fn list_all_appointments(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Page<AppointmentResponse>>, AppError> {
    permissions::require_staff(&auth.user)?;
    pagination.validate()?;

    let rows =
        appointment::list_all(&state.db_pool, pagination.limit(), pagination.offset()).await?;
    let total = appointment::count_all(&state.db_pool).await?;

    Ok(Json(page_of(rows, &pagination, total)?))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<AppointmentResponse>, AppError> {
    let details = appointment::get_appointment(&state.db_pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    permissions::ensure_owner_or_staff(&auth.user, details.client_id)?;

    Ok(Json(AppointmentResponse::try_from(details)?))
}

/// Moves an appointment to another time and/or service, or edits its notes.
#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAppointmentRequest>,
) -> Result<Json<AppointmentResponse>, AppError> {
    if payload.is_empty() {
        return Err(BookingError::Validation("No changes supplied".to_string()).into());
    }

    let mut tx = state.db_pool.begin().await?;
    let current = appointment::get_appointment_for_update(&mut *tx, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    permissions::ensure_owner(&auth.user, current.client_id)?;

    if current.status.parse::<AppointmentStatus>()? != AppointmentStatus::Active {
        return Err(BookingError::Validation(
            "Only active appointments can be rescheduled".to_string(),
        )
        .into());
    }

    let service_id = payload.service_id.unwrap_or(current.service_id);
    let date_time = payload.date_time.unwrap_or(current.date_time);
    let notes = match payload.notes {
        Some(notes) => normalize_notes(Some(notes)),
        None => current.notes.clone(),
    };

    let service = locked_service(&mut tx, service_id).await?;
    let moved = service_id != current.service_id || date_time != current.date_time;
    if moved {
        if service_id != current.service_id {
            ensure_bookable(&service)?;
        }
        let window = state
            .rules
            .validate(date_time, service.duration_minutes, Utc::now())?;
        ensure_no_conflict(&mut tx, service.id, &window, Some(id)).await?;
    }

    calendar_sync::retract_event(state.calendar.as_deref(), current.calendar_event_id.as_deref())
        .await?;
    appointment::reschedule(&mut *tx, id, service.id, date_time, notes.as_deref()).await?;

    let event_id = calendar_sync::publish_appointment(
        state.calendar.as_deref(),
        &service.name,
        date_time,
        service.duration_minutes,
        notes.as_deref(),
    )
    .await?;
    appointment::set_calendar_event_id(&mut *tx, id, event_id.as_deref()).await?;

    let details = load_details(&mut tx, id).await?;
    commit(tx, event_id.as_deref()).await?;

    info!("{} rescheduled appointment {} to {}", auth.user.username, id, date_time);
    Ok(Json(AppointmentResponse::try_from(details)?))
}

/// Staff status change. Canceling removes the calendar event; reopening a
/// canceled appointment checks for conflicts and creates a new one.
#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<AppointmentResponse>, AppError> {
    permissions::require_staff(&auth.user)?;

    let mut tx = state.db_pool.begin().await?;
    let current = appointment::get_appointment_for_update(&mut *tx, id)
        .await?
        .ok_or_else(|| not_found(id))?;

    let from = current.status.parse::<AppointmentStatus>()?;
    let to = payload.status;
    if !from.can_transition_to(to) {
        return Err(BookingError::Validation(format!(
            "Cannot change an appointment from {} to {}",
            from, to
        ))
        .into());
    }
    if from == to {
        return Ok(Json(AppointmentResponse::try_from(current)?));
    }

    let mut created_event = None;
    match to {
        AppointmentStatus::Canceled => {
            calendar_sync::retract_event(
                state.calendar.as_deref(),
                current.calendar_event_id.as_deref(),
            )
            .await?;
            appointment::set_calendar_event_id(&mut *tx, id, None).await?;
        }
        AppointmentStatus::Active => {
            let service = locked_service(&mut tx, current.service_id).await?;
            ensure_bookable(&service)?;
            let window = TimeWindow::from_duration(current.date_time, service.duration_minutes)?;
            ensure_no_conflict(&mut tx, service.id, &window, Some(id)).await?;

            created_event = calendar_sync::publish_appointment(
                state.calendar.as_deref(),
                &service.name,
                current.date_time,
                service.duration_minutes,
                current.notes.as_deref(),
            )
            .await?;
            appointment::set_calendar_event_id(&mut *tx, id, created_event.as_deref()).await?;
        }
        AppointmentStatus::Completed => {}
    }

    appointment::set_status(&mut *tx, id, to).await?;
    let details = load_details(&mut tx, id).await?;
    commit(tx, created_event.as_deref()).await?;

    info!("{} changed appointment {} from {} to {}", auth.user.username, id, from, to);
    Ok(Json(AppointmentResponse::try_from(details)?))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let mut tx = state.db_pool.begin().await?;
    let current = appointment::get_appointment_for_update(&mut *tx, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    permissions::ensure_owner_or_staff(&auth.user, current.client_id)?;

    appointment::delete_appointment(&mut *tx, id).await?;
    calendar_sync::retract_event(state.calendar.as_deref(), current.calendar_event_id.as_deref())
        .await?;
    commit(tx, None).await?;

    info!("{} deleted appointment {}", auth.user.username, id);
    Ok(StatusCode::NO_CONTENT)
}
