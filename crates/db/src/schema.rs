use eyre::Result;
use sqlx::{Executor, Pool, Postgres};
use tracing::info;

pub async fn initialize_database(pool: &Pool<Postgres>) -> Result<()> {
    info!("Initializing database schema...");

    // Create users table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            username VARCHAR(150) NOT NULL UNIQUE,
            email VARCHAR(254) NOT NULL UNIQUE,
            first_name VARCHAR(70) NOT NULL,
            last_name VARCHAR(70) NOT NULL,
            phone_number VARCHAR(11) NOT NULL DEFAULT '',
            profile_picture VARCHAR(255) NULL DEFAULT 'profile_pictures/default.jpg',
            role VARCHAR(20) NOT NULL DEFAULT 'client',
            password_hash VARCHAR(255) NOT NULL,
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            CONSTRAINT valid_role CHECK (role IN ('client', 'employee', 'manager', 'superuser'))
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create services table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS services (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name VARCHAR(50) NOT NULL,
            price_cents BIGINT NOT NULL,
            category VARCHAR(30) NOT NULL DEFAULT 'hair',
            description TEXT NOT NULL DEFAULT '',
            image VARCHAR(255) NULL DEFAULT 'services/default.jpg',
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            duration_minutes INTEGER NOT NULL,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            CONSTRAINT positive_price CHECK (price_cents > 0 AND price_cents <= 999999),
            CONSTRAINT positive_duration CHECK (duration_minutes > 0),
            CONSTRAINT valid_category CHECK (category IN (
                'hair', 'eyebrow', 'beard', 'kids_haircut', 'hair_treatment', 'custom'
            ))
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create appointments table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS appointments (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            client_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            service_id UUID NOT NULL REFERENCES services(id) ON DELETE CASCADE,
            date_time TIMESTAMP WITH TIME ZONE NOT NULL,
            status VARCHAR(10) NOT NULL DEFAULT 'active',
            notes TEXT NULL,
            calendar_event_id VARCHAR(255) NULL,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            CONSTRAINT valid_status CHECK (status IN ('active', 'canceled', 'completed'))
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create revoked_tokens table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS revoked_tokens (
            jti UUID PRIMARY KEY,
            user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            expires_at TIMESTAMP WITH TIME ZONE NOT NULL,
            revoked_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes (a bare &str runs over the simple query protocol)
    pool.execute(
        r#"
        CREATE INDEX IF NOT EXISTS idx_users_role ON users(role);
        CREATE INDEX IF NOT EXISTS idx_services_is_active ON services(is_active);
        CREATE INDEX IF NOT EXISTS idx_appointments_client_id ON appointments(client_id);
        CREATE INDEX IF NOT EXISTS idx_appointments_service_time ON appointments(service_id, date_time);
        CREATE INDEX IF NOT EXISTS idx_appointments_status ON appointments(status);
        CREATE INDEX IF NOT EXISTS idx_revoked_tokens_expires_at ON revoked_tokens(expires_at);
        "#,
    )
    .await?;

    info!("Database schema initialized successfully.");
    Ok(())
}
