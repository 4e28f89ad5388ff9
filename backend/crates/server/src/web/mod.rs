use axum::{
    Router,
    http::Method,
    middleware as axum_middleware,
    routing::get,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ServerConfig;
use crate::web::{middleware::auth, routes::*};

pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;

pub use error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DatabaseConnection,
    pub config: Arc<ServerConfig>,
}

async fn health_check_handler() -> &'static str {
    "OK"
}

pub fn create_axum_router(db_pool: DatabaseConnection, config: Arc<ServerConfig>) -> Router {
    let app_state = Arc::new(AppState { db_pool, config });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    let auth_layer = || axum_middleware::from_fn_with_state(app_state.clone(), auth::auth);

    // Each resource answers under both the hyphenated and the legacy spelling.
    let api = Router::new()
        .merge(auth_routes::create_public_router())
        .merge(auth_routes::create_protected_router().route_layer(auth_layer()))
        .nest("/targets", target_routes::create_target_router().route_layer(auth_layer()))
        .nest("/alert-rules", alert_rule_routes::create_alert_rule_router().route_layer(auth_layer()))
        .nest("/alertrules", alert_rule_routes::create_alert_rule_router().route_layer(auth_layer()))
        .nest("/ai-settings", ai_settings_routes::create_ai_settings_router().route_layer(auth_layer()))
        .nest("/aisettings", ai_settings_routes::create_ai_settings_router().route_layer(auth_layer()))
        .nest("/config", config_routes::create_config_router().route_layer(auth_layer()));

    Router::new()
        .route("/api/health", get(health_check_handler))
        .nest("/api", api)
        .layer(cors)
        .with_state(app_state)
}
