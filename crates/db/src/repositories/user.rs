use crate::models::DbUser;
use barbershop_core::models::user::{Role, UpdateProfileRequest};
use chrono::Utc;
use eyre::{eyre, Result};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, phone_number, \
                            profile_picture, role, password_hash, is_active, created_at";

/// Fields needed to insert an account. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub phone_number: &'a str,
    pub password_hash: &'a str,
    pub role: Role,
}

pub async fn create_user(pool: &Pool<Postgres>, new_user: &NewUser<'_>) -> Result<DbUser> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    tracing::debug!(
        "Creating user: id={}, username={}, role={}",
        id, new_user.username, new_user.role
    );

    let user = sqlx::query_as::<_, DbUser>(&format!(
        r#"
        INSERT INTO users (id, username, email, first_name, last_name, phone_number,
                           password_hash, role, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(new_user.username)
    .bind(new_user.email)
    .bind(new_user.first_name)
    .bind(new_user.last_name)
    .bind(new_user.phone_number)
    .bind(new_user.password_hash)
    .bind(new_user.role.as_str())
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(user)
}

pub async fn get_user_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<DbUser>> {
    let user = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn get_user_by_username(
    pool: &Pool<Postgres>,
    username: &str,
) -> Result<Option<DbUser>> {
    let user = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
    ))
    .bind(username)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Whether another account already uses `username`.
pub async fn username_taken(
    pool: &Pool<Postgres>,
    username: &str,
    exclude: Option<Uuid>,
) -> Result<bool> {
    let taken = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM users
            WHERE username = $1 AND ($2::uuid IS NULL OR id <> $2)
        )
        "#,
    )
    .bind(username)
    .bind(exclude)
    .fetch_one(pool)
    .await?;

    Ok(taken)
}

/// Whether another account already uses `email` (case-insensitive).
pub async fn email_taken(pool: &Pool<Postgres>, email: &str, exclude: Option<Uuid>) -> Result<bool> {
    let taken = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM users
            WHERE LOWER(email) = LOWER($1) AND ($2::uuid IS NULL OR id <> $2)
        )
        "#,
    )
    .bind(email)
    .bind(exclude)
    .fetch_one(pool)
    .await?;

    Ok(taken)
}

pub async fn update_profile(
    pool: &Pool<Postgres>,
    id: Uuid,
    changes: &UpdateProfileRequest,
) -> Result<DbUser> {
    let user = sqlx::query_as::<_, DbUser>(&format!(
        r#"
        UPDATE users
        SET username = COALESCE($2, username),
            email = COALESCE($3, email),
            first_name = COALESCE($4, first_name),
            last_name = COALESCE($5, last_name),
            phone_number = COALESCE($6, phone_number)
        WHERE id = $1
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(changes.username.as_deref())
    .bind(changes.email.as_deref())
    .bind(changes.first_name.as_deref())
    .bind(changes.last_name.as_deref())
    .bind(changes.phone_number.as_deref())
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| eyre!("User not found"))?;

    Ok(user)
}

pub async fn update_password(pool: &Pool<Postgres>, id: Uuid, password_hash: &str) -> Result<()> {
    let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(eyre!("User not found"));
    }
    Ok(())
}

pub async fn update_profile_picture(
    pool: &Pool<Postgres>,
    id: Uuid,
    profile_picture: &str,
) -> Result<DbUser> {
    let user = sqlx::query_as::<_, DbUser>(&format!(
        r#"
        UPDATE users SET profile_picture = $2
        WHERE id = $1
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(profile_picture)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| eyre!("User not found"))?;

    Ok(user)
}

pub async fn count_by_role(pool: &Pool<Postgres>, role: Role) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = $1")
        .bind(role.as_str())
        .fetch_one(pool)
        .await?;

    Ok(count)
}
