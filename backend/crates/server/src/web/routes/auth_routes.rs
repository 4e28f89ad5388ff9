use axum::{
    Json, Router,
    extract::{Extension, State},
    routing::{get, post},
};
use promeconfig_common::{AuthResponse, Credentials, User};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::info;

use crate::db::services::user_service;
use crate::services::auth_service;
use crate::web::{AppError, AppState, models::AuthenticatedUser};

/// Sign-up and sign-in under both route spellings.
pub fn create_public_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/signup", post(register_handler))
        .route("/auth/register", post(register_handler))
        .route("/auth/signin", post(login_handler))
        .route("/auth/login", post(login_handler))
}

pub fn create_protected_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/signout", post(logout_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/user", get(current_user_handler))
        .route("/auth/user", get(current_user_handler))
}

async fn register_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<Credentials>,
) -> Result<Json<AuthResponse>, AppError> {
    let response = auth_service::register_user(&app_state.db_pool, &app_state.config, payload).await?;
    Ok(Json(response))
}

async fn login_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<Credentials>,
) -> Result<Json<AuthResponse>, AppError> {
    let response = auth_service::login_user(&app_state.db_pool, &app_state.config, payload).await?;
    Ok(Json(response))
}

// Tokens are stateless; the client drops its copy.
async fn logout_handler(Extension(user): Extension<AuthenticatedUser>) -> Json<Value> {
    info!(user_id = %user.id, "User signed out.");
    Json(json!({ "message": "signed out" }))
}

async fn current_user_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Value>, AppError> {
    let model = user_service::get_user_by_id(&app_state.db_pool, &user.id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("user no longer exists".to_string()))?;
    Ok(Json(json!({ "user": User::from(model) })))
}
