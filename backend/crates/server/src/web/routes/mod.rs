pub mod ai_settings_routes;
pub mod alert_rule_routes;
pub mod auth_routes;
pub mod config_routes;
pub mod target_routes;
