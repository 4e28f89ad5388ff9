use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use promeconfig_common::validation::{validate_email, validate_password};
use promeconfig_common::{AuthResponse, Credentials};
use sea_orm::DatabaseConnection;
use tracing::info;

use crate::config::{MAX_JWT_EXPIRES_HOURS, ServerConfig};
use crate::db::entities::user;
use crate::db::services::user_service;
use crate::web::error::AppError;
use crate::web::models::Claims;

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub async fn register_user(
    db: &DatabaseConnection,
    config: &ServerConfig,
    req: Credentials,
) -> Result<AuthResponse, AppError> {
    let email = normalize_email(&req.email);
    validate_email(&email)?;
    validate_password(&req.password, config.min_password_len)?;

    if user_service::get_user_by_email(db, &email).await?.is_some() {
        return Err(AppError::UserAlreadyExists(email));
    }

    let password_hash = hash(&req.password, config.bcrypt_cost)
        .map_err(|e| AppError::PasswordHashingError(e.to_string()))?;

    // A concurrent register for the same email loses on the unique index.
    let user_model = user_service::create_user(db, &email, &password_hash)
        .await
        .map_err(|e| match e.sql_err() {
            Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => AppError::UserAlreadyExists(email.clone()),
            _ => AppError::from(e),
        })?;
    info!(user_id = %user_model.id, "User registered.");

    create_jwt_for_user(&user_model, config)
}

pub async fn login_user(
    db: &DatabaseConnection,
    config: &ServerConfig,
    req: Credentials,
) -> Result<AuthResponse, AppError> {
    let email = normalize_email(&req.email);
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::InvalidCredentials);
    }

    let user = user_service::get_user_by_email(db, &email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let valid_password = verify(&req.password, &user.password_hash)
        .map_err(|e| AppError::InternalServerError(format!("password verification failed: {e}")))?;
    if !valid_password {
        return Err(AppError::InvalidCredentials);
    }

    create_jwt_for_user(&user, config)
}

pub fn create_jwt_for_user(user: &user::Model, config: &ServerConfig) -> Result<AuthResponse, AppError> {
    let now = Utc::now();
    let expiration = Duration::try_hours(config.jwt_expires_hours)
        .filter(|_| (1..=MAX_JWT_EXPIRES_HOURS).contains(&config.jwt_expires_hours))
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| {
            AppError::TokenCreationError(format!("invalid token lifetime of {} hours", config.jwt_expires_hours))
        })?
        .timestamp() as usize;

    let claims = Claims {
        sub: user.email.clone(),
        user_id: user.id.clone(),
        exp: expiration,
        iat: now.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_ref()),
    )
    .map_err(|e| AppError::TokenCreationError(e.to_string()))?;

    Ok(AuthResponse::new(token, user.clone().into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{DecodingKey, Validation, decode};

    #[test]
    fn jwt_round_trips_user_identity() {
        let config = ServerConfig::new("sqlite::memory:", "test-secret");
        let now = Utc::now();
        let user = user::Model {
            id: "u-1".into(),
            email: "ops@example.com".into(),
            password_hash: String::new(),
            created_at: now,
            updated_at: now,
        };

        let resp = create_jwt_for_user(&user, &config).unwrap();
        assert_eq!(resp.token, resp.access_token);
        let token = resp.bearer_token().unwrap();

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(b"test-secret"),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(data.claims.user_id, "u-1");
        assert_eq!(data.claims.sub, "ops@example.com");
        assert!(data.claims.exp > now.timestamp() as usize);
    }

    #[test]
    fn out_of_range_lifetime_is_an_error_not_a_panic() {
        let now = Utc::now();
        let user = user::Model {
            id: "u-1".into(),
            email: "ops@example.com".into(),
            password_hash: String::new(),
            created_at: now,
            updated_at: now,
        };
        for hours in [i64::MAX, -1] {
            let mut config = ServerConfig::new("sqlite::memory:", "test-secret");
            config.jwt_expires_hours = hours;
            let err = create_jwt_for_user(&user, &config).unwrap_err();
            assert!(matches!(err, AppError::TokenCreationError(_)), "{hours}: {err:?}");
        }
    }
}
