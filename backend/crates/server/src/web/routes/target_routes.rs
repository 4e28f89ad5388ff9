use axum::{
    Json, Router,
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{get, put},
};
use promeconfig_common::{NewTarget, Target, TargetPatch};
use std::sync::Arc;

use crate::db::services::target_service;
use crate::web::{AppError, AppState, models::AuthenticatedUser};

pub fn create_target_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_targets_handler).post(create_target_handler))
        .route("/{id}", put(update_target_handler).delete(delete_target_handler))
}

async fn list_targets_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<Target>>, AppError> {
    let targets = target_service::list_targets(&app_state.db_pool, &user.id).await?;
    Ok(Json(targets))
}

async fn create_target_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(payload): Json<NewTarget>,
) -> Result<(StatusCode, Json<Target>), AppError> {
    payload.validate()?;
    let target = target_service::create_target(&app_state.db_pool, &user.id, payload).await?;
    Ok((StatusCode::CREATED, Json(target)))
}

async fn update_target_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    Json(payload): Json<TargetPatch>,
) -> Result<Json<Target>, AppError> {
    payload.validate()?;
    let target = target_service::update_target(&app_state.db_pool, &user.id, &id, payload).await?;
    Ok(Json(target))
}

async fn delete_target_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    target_service::delete_target(&app_state.db_pool, &user.id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
