//! # Authentication Module
//!
//! Password hashing with Argon2, HS256 session tokens and the [`AuthUser`]
//! extractor that turns a `Bearer` token into the current account.
//!
//! Tokens carry the user id, role, a unique `jti` and an expiry. Logging out
//! records the `jti` as revoked; the extractor rejects revoked tokens and
//! reloads the account so deactivation and role changes apply immediately.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordVerifier, SaltString},
    Argon2, PasswordHasher,
};
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use barbershop_core::{
    errors::{BookingError, BookingResult},
    models::user::{Role, User},
};
use barbershop_db::repositories::{token, user};
use chrono::{DateTime, Duration, TimeZone, Utc};
use eyre::Result;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{middleware::error_handling::AppError, ApiState};

pub const TOKEN_TYPE: &str = "Bearer";

/// Hashes a password using the Argon2 algorithm
///
/// Generates a fresh random salt and returns the PHC string (algorithm,
/// parameters, salt and hash) suitable for storage.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| eyre::eyre!("Error hashing password: {}", e))?
        .to_string();

    Ok(password_hash)
}

/// Checks `password` against a stored PHC hash.
///
/// A malformed stored hash is an error, a wrong password is `Ok(false)`.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(password_hash)
        .map_err(|e| eyre::eyre!("Stored password hash is invalid: {}", e))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Session token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_else(Utc::now)
    }
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

/// Signs a token for `user` valid for `ttl_hours`.
pub fn issue_token(user: &User, secret: &str, ttl_hours: i64) -> BookingResult<IssuedToken> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id,
        role: user.role,
        jti: Uuid::new_v4(),
        iat: now.timestamp(),
        exp: (now + Duration::hours(ttl_hours)).timestamp(),
    };

    let token = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| BookingError::Internal(Box::new(e)))?;

    Ok(IssuedToken { token, claims })
}

/// Verifies signature and expiry and returns the claims.
pub fn decode_token(token: &str, secret: &str) -> BookingResult<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            debug!("Rejected session token: {}", e);
            BookingError::Authentication("Invalid or expired token".to_string())
        })
}

fn bearer_token(parts: &Parts) -> BookingResult<Option<&str>> {
    let Some(value) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value
        .to_str()
        .map_err(|_| BookingError::Authentication("Malformed Authorization header".to_string()))?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case(TOKEN_TYPE) && !token.trim().is_empty() => {
            Ok(Some(token.trim()))
        }
        _ => Err(BookingError::Authentication(
            "Authorization header must be a Bearer token".to_string(),
        )),
    }
}

/// The authenticated account behind the request's `Bearer` token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    pub claims: Claims,
}

impl AuthUser {
    async fn authenticate(token: &str, state: &ApiState) -> BookingResult<Self> {
        let claims = decode_token(token, &state.config.jwt_secret)?;

        if token::is_revoked(&state.db_pool, claims.jti).await? {
            return Err(BookingError::Authentication("Token has been revoked".to_string()));
        }

        let user: User = user::get_user_by_id(&state.db_pool, claims.sub)
            .await?
            .ok_or_else(|| BookingError::Authentication("Account no longer exists".to_string()))?
            .try_into()?;

        if !user.is_active {
            warn!("Inactive account {} attempted to authenticate", user.id);
            return Err(BookingError::Authentication("Account is disabled".to_string()));
        }

        Ok(Self { user, claims })
    }
}

#[async_trait]
impl FromRequestParts<Arc<ApiState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<ApiState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?
            .ok_or_else(|| BookingError::Authentication("Authentication required".to_string()))?;

        Ok(AuthUser::authenticate(token, state).await?)
    }
}

/// Like [`AuthUser`] for endpoints that also serve anonymous callers.
///
/// A request without an `Authorization` header is anonymous; a header with a
/// bad token is still rejected.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl MaybeAuthUser {
    pub fn is_staff(&self) -> bool {
        self.0.as_ref().is_some_and(|auth| auth.user.role.is_staff())
    }
}

#[async_trait]
impl FromRequestParts<Arc<ApiState>> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<ApiState>,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(parts)? {
            Some(token) => Ok(MaybeAuthUser(Some(AuthUser::authenticate(token, state).await?))),
            None => Ok(MaybeAuthUser(None)),
        }
    }
}
