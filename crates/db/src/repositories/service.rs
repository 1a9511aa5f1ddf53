use crate::models::DbService;
use barbershop_core::models::service::{CreateServiceRequest, UpdateServiceRequest};
use chrono::Utc;
use eyre::Result;
use sqlx::{PgExecutor, Pool, Postgres};
use uuid::Uuid;

const SERVICE_COLUMNS: &str =
    "id, name, price_cents, category, description, image, is_active, duration_minutes, created_at";

pub async fn create_service(
    pool: &Pool<Postgres>,
    request: &CreateServiceRequest,
) -> Result<DbService> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    tracing::debug!("Creating service: id={}, name={}", id, request.name);

    let service = sqlx::query_as::<_, DbService>(&format!(
        r#"
        INSERT INTO services (id, name, price_cents, category, description, image,
                              is_active, duration_minutes, created_at)
        VALUES ($1, $2, $3, $4, $5, COALESCE($6, 'services/default.jpg'), $7, $8, $9)
        RETURNING {SERVICE_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(request.name.trim())
    .bind(request.price_cents)
    .bind(request.category.as_str())
    .bind(&request.description)
    .bind(request.image.as_deref())
    .bind(request.is_active)
    .bind(request.duration_minutes)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(service)
}

pub async fn get_service_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<DbService>> {
    let service = sqlx::query_as::<_, DbService>(&format!(
        "SELECT {SERVICE_COLUMNS} FROM services WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(service)
}

pub async fn list_services(pool: &Pool<Postgres>, include_inactive: bool) -> Result<Vec<DbService>> {
    let services = sqlx::query_as::<_, DbService>(&format!(
        r#"
        SELECT {SERVICE_COLUMNS}
        FROM services
        WHERE $1 OR is_active
        ORDER BY category ASC, name ASC
        "#
    ))
    .bind(include_inactive)
    .fetch_all(pool)
    .await?;

    Ok(services)
}

/// Applies the fields present in `changes`; returns `None` when the service
/// does not exist.
pub async fn update_service<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    changes: &UpdateServiceRequest,
) -> Result<Option<DbService>> {
    let service = sqlx::query_as::<_, DbService>(&format!(
        r#"
        UPDATE services
        SET name = COALESCE($2, name),
            price_cents = COALESCE($3, price_cents),
            category = COALESCE($4, category),
            description = COALESCE($5, description),
            image = COALESCE($6, image),
            is_active = COALESCE($7, is_active),
            duration_minutes = COALESCE($8, duration_minutes)
        WHERE id = $1
        RETURNING {SERVICE_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(changes.name.as_deref().map(str::trim))
    .bind(changes.price_cents)
    .bind(changes.category.map(|c| c.as_str()))
    .bind(changes.description.as_deref())
    .bind(changes.image.as_deref())
    .bind(changes.is_active)
    .bind(changes.duration_minutes)
    .fetch_optional(executor)
    .await?;

    Ok(service)
}

/// Deletes the service and, through the foreign key, its appointments.
/// Returns whether a row was removed.
pub async fn delete_service(pool: &Pool<Postgres>, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM services WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
