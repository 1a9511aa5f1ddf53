//! Appointment queries.
//!
//! Everything that takes part in a booking accepts any [`PgExecutor`], so the
//! handlers can run the service lock, the conflict check and the writes on
//! one transaction.

use crate::models::{DbAppointment, DbAppointmentDetails, DbService};
use barbershop_core::models::appointment::AppointmentStatus;
use chrono::{DateTime, Utc};
use eyre::Result;
use sqlx::{PgExecutor, Pool, Postgres};
use uuid::Uuid;

const APPOINTMENT_COLUMNS: &str = "id, client_id, service_id, date_time, status, notes, \
                                   calendar_event_id, created_at, updated_at";

const DETAILS_SELECT: &str = r#"
    SELECT a.id, a.client_id, a.service_id, s.name AS service_name, s.duration_minutes,
           a.date_time, a.status, a.notes, a.calendar_event_id, a.created_at, a.updated_at
    FROM appointments a
    JOIN services s ON s.id = a.service_id
"#;

/// Locks the service row until the surrounding transaction ends, so two
/// bookings for the same service cannot pass the conflict check together.
pub async fn lock_service<'e>(
    executor: impl PgExecutor<'e>,
    service_id: Uuid,
) -> Result<Option<DbService>> {
    let service = sqlx::query_as::<_, DbService>(
        r#"
        SELECT id, name, price_cents, category, description, image, is_active,
               duration_minutes, created_at
        FROM services
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(service_id)
    .fetch_optional(executor)
    .await?;

    Ok(service)
}

/// First active appointment of `service_id` whose window overlaps
/// `[start, end)`, ignoring `exclude`.
pub async fn find_conflicting<'e>(
    executor: impl PgExecutor<'e>,
    service_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    exclude: Option<Uuid>,
) -> Result<Option<DbAppointment>> {
    let conflict = sqlx::query_as::<_, DbAppointment>(
        r#"
        SELECT a.id, a.client_id, a.service_id, a.date_time, a.status, a.notes,
               a.calendar_event_id, a.created_at, a.updated_at
        FROM appointments a
        JOIN services s ON s.id = a.service_id
        WHERE a.service_id = $1
          AND a.status = 'active'
          AND ($4::uuid IS NULL OR a.id <> $4)
          AND a.date_time < $3
          AND a.date_time + make_interval(mins => s.duration_minutes) > $2
        ORDER BY a.date_time ASC
        LIMIT 1
        "#,
    )
    .bind(service_id)
    .bind(start)
    .bind(end)
    .bind(exclude)
    .fetch_optional(executor)
    .await?;

    if let Some(existing) = &conflict {
        tracing::debug!(
            "Conflict for service {} at {}: appointment {}",
            service_id, start, existing.id
        );
    }

    Ok(conflict)
}

/// A pair of active appointments of `service_id` that would overlap if the
/// service lasted `duration_minutes`, earlier one first.
pub async fn find_overlap_for_duration<'e>(
    executor: impl PgExecutor<'e>,
    service_id: Uuid,
    duration_minutes: i32,
) -> Result<Option<(Uuid, Uuid)>> {
    let overlap = sqlx::query_as::<_, (Uuid, Uuid)>(
        r#"
        SELECT a.id AS first_id, b.id AS second_id
        FROM appointments a
        JOIN appointments b
          ON b.service_id = a.service_id
         AND b.id <> a.id
         AND b.status = 'active'
         AND b.date_time >= a.date_time
         AND b.date_time < a.date_time + make_interval(mins => $2::int)
        WHERE a.service_id = $1
          AND a.status = 'active'
        ORDER BY a.date_time ASC
        LIMIT 1
        "#,
    )
    .bind(service_id)
    .bind(duration_minutes)
    .fetch_optional(executor)
    .await?;

    Ok(overlap)
}

/// Start times of active appointments of `service_id` at or after `from`.
pub async fn upcoming_active_starts<'e>(
    executor: impl PgExecutor<'e>,
    service_id: Uuid,
    from: DateTime<Utc>,
) -> Result<Vec<DateTime<Utc>>> {
    let starts = sqlx::query_scalar::<_, DateTime<Utc>>(
        r#"
        SELECT date_time
        FROM appointments
        WHERE service_id = $1
          AND status = 'active'
          AND date_time >= $2
        ORDER BY date_time ASC
        "#,
    )
    .bind(service_id)
    .bind(from)
    .fetch_all(executor)
    .await?;

    Ok(starts)
}

pub async fn create_appointment<'e>(
    executor: impl PgExecutor<'e>,
    client_id: Uuid,
    service_id: Uuid,
    date_time: DateTime<Utc>,
    notes: Option<&str>,
) -> Result<DbAppointment> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    tracing::debug!(
        "Creating appointment: id={}, client={}, service={}, at={}",
        id, client_id, service_id, date_time
    );

    let appointment = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        INSERT INTO appointments (id, client_id, service_id, date_time, status, notes,
                                  created_at, updated_at)
        VALUES ($1, $2, $3, $4, 'active', $5, $6, $6)
        RETURNING {APPOINTMENT_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(client_id)
    .bind(service_id)
    .bind(date_time)
    .bind(notes)
    .bind(now)
    .fetch_one(executor)
    .await?;

    Ok(appointment)
}

pub async fn get_appointment<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> Result<Option<DbAppointmentDetails>> {
    let appointment =
        sqlx::query_as::<_, DbAppointmentDetails>(&format!("{DETAILS_SELECT} WHERE a.id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await?;

    Ok(appointment)
}

/// Same as [`get_appointment`] but locks the appointment row.
pub async fn get_appointment_for_update<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> Result<Option<DbAppointmentDetails>> {
    let appointment = sqlx::query_as::<_, DbAppointmentDetails>(&format!(
        "{DETAILS_SELECT} WHERE a.id = $1 FOR UPDATE OF a"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(appointment)
}

pub async fn list_for_client(
    pool: &Pool<Postgres>,
    client_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<DbAppointmentDetails>> {
    let appointments = sqlx::query_as::<_, DbAppointmentDetails>(&format!(
        r#"
        {DETAILS_SELECT}
        WHERE a.client_id = $1
        ORDER BY a.date_time DESC
        LIMIT $2 OFFSET $3
        "#
    ))
    .bind(client_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(appointments)
}

pub async fn count_for_client(pool: &Pool<Postgres>, client_id: Uuid) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM appointments WHERE client_id = $1")
        .bind(client_id)
        .fetch_one(pool)
        .await?;

    Ok(count)
}

/// Every appointment, most recently created first.
pub async fn list_all(
    pool: &Pool<Postgres>,
    limit: i64,
    offset: i64,
) -> Result<Vec<DbAppointmentDetails>> {
    let appointments = sqlx::query_as::<_, DbAppointmentDetails>(&format!(
        r#"
        {DETAILS_SELECT}
        ORDER BY a.created_at DESC
        LIMIT $1 OFFSET $2
        "#
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(appointments)
}

pub async fn count_all(pool: &Pool<Postgres>) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM appointments")
        .fetch_one(pool)
        .await?;

    Ok(count)
}

pub async fn reschedule<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    service_id: Uuid,
    date_time: DateTime<Utc>,
    notes: Option<&str>,
) -> Result<DbAppointment> {
    let appointment = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        UPDATE appointments
        SET service_id = $2, date_time = $3, notes = $4, updated_at = $5
        WHERE id = $1
        RETURNING {APPOINTMENT_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(service_id)
    .bind(date_time)
    .bind(notes)
    .bind(Utc::now())
    .fetch_one(executor)
    .await?;

    Ok(appointment)
}

pub async fn set_status<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    status: AppointmentStatus,
) -> Result<DbAppointment> {
    let appointment = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        UPDATE appointments
        SET status = $2, updated_at = $3
        WHERE id = $1
        RETURNING {APPOINTMENT_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(status.as_str())
    .bind(Utc::now())
    .fetch_one(executor)
    .await?;

    Ok(appointment)
}

pub async fn set_calendar_event_id<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    calendar_event_id: Option<&str>,
) -> Result<()> {
    sqlx::query("UPDATE appointments SET calendar_event_id = $2 WHERE id = $1")
        .bind(id)
        .bind(calendar_event_id)
        .execute(executor)
        .await?;

    Ok(())
}

/// Returns whether a row was removed.
pub async fn delete_appointment<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM appointments WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// External event ids still attached to appointments of a service.
pub async fn calendar_event_ids_for_service(
    pool: &Pool<Postgres>,
    service_id: Uuid,
) -> Result<Vec<String>> {
    let ids = sqlx::query_scalar::<_, String>(
        r#"
        SELECT calendar_event_id
        FROM appointments
        WHERE service_id = $1 AND calendar_event_id IS NOT NULL
        "#,
    )
    .bind(service_id)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}
