use axum::{
    Json, Router,
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{get, put},
};
use promeconfig_common::{AiSettings, AiSettingsInput, AiSettingsPatch};
use std::sync::Arc;

use crate::db::services::ai_settings_service;
use crate::web::{AppError, AppState, models::AuthenticatedUser};

pub fn create_ai_settings_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/",
            get(get_ai_settings_handler)
                .post(save_ai_settings_handler)
                .delete(delete_own_ai_settings_handler),
        )
        .route("/{id}", put(update_ai_settings_handler).delete(delete_ai_settings_handler))
}

async fn get_ai_settings_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<AiSettings>, AppError> {
    ai_settings_service::get_ai_settings(&app_state.db_pool, &user.id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("AI settings not found".to_string()))
}

async fn save_ai_settings_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(payload): Json<AiSettingsInput>,
) -> Result<Json<AiSettings>, AppError> {
    payload.validate()?;
    let settings = ai_settings_service::upsert_ai_settings(&app_state.db_pool, &user.id, payload).await?;
    Ok(Json(settings))
}

async fn update_ai_settings_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    Json(payload): Json<AiSettingsPatch>,
) -> Result<Json<AiSettings>, AppError> {
    payload.validate()?;
    let settings = ai_settings_service::update_ai_settings(&app_state.db_pool, &user.id, &id, payload).await?;
    Ok(Json(settings))
}

async fn delete_own_ai_settings_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<StatusCode, AppError> {
    ai_settings_service::delete_ai_settings(&app_state.db_pool, &user.id, None).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_ai_settings_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    ai_settings_service::delete_ai_settings(&app_state.db_pool, &user.id, Some(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
