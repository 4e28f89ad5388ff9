use axum::{
    Json, Router,
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{get, put},
};
use promeconfig_common::{AlertRule, AlertRulePatch, NewAlertRule};
use std::sync::Arc;

use crate::db::services::alert_rule_service;
use crate::web::{AppError, AppState, models::AuthenticatedUser};

pub fn create_alert_rule_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_alert_rules_handler).post(create_alert_rule_handler))
        .route("/{id}", put(update_alert_rule_handler).delete(delete_alert_rule_handler))
}

async fn list_alert_rules_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<AlertRule>>, AppError> {
    let rules = alert_rule_service::list_alert_rules(&app_state.db_pool, &user.id).await?;
    Ok(Json(rules))
}

async fn create_alert_rule_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(payload): Json<NewAlertRule>,
) -> Result<(StatusCode, Json<AlertRule>), AppError> {
    payload.validate()?;
    let rule = alert_rule_service::create_alert_rule(&app_state.db_pool, &user.id, payload).await?;
    Ok((StatusCode::CREATED, Json(rule)))
}

async fn update_alert_rule_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    Json(payload): Json<AlertRulePatch>,
) -> Result<Json<AlertRule>, AppError> {
    payload.validate()?;
    let rule = alert_rule_service::update_alert_rule(&app_state.db_pool, &user.id, &id, payload).await?;
    Ok(Json(rule))
}

async fn delete_alert_rule_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    alert_rule_service::delete_alert_rule(&app_state.db_pool, &user.id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
