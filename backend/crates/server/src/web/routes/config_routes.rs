use axum::{
    Json, Router,
    extract::{Extension, State},
    routing::get,
};
use promeconfig_common::prometheus::render_config;
use promeconfig_common::{RenderOptions, RenderedConfig};
use std::sync::Arc;

use crate::db::services::{alert_rule_service, target_service};
use crate::web::{AppError, AppState, models::AuthenticatedUser};

pub fn create_config_router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(render_config_handler))
}

/// Renders the caller's targets and alert rules as Prometheus files.
async fn render_config_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<RenderedConfig>, AppError> {
    let targets = target_service::list_targets(&app_state.db_pool, &user.id).await?;
    let rules = alert_rule_service::list_alert_rules(&app_state.db_pool, &user.id).await?;
    let rendered = render_config(&targets, &rules, &RenderOptions::default())
        .map_err(|e| AppError::InternalServerError(format!("failed to render configuration: {e}")))?;
    Ok(Json(rendered))
}
