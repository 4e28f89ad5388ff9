pub mod ai_settings_service;
pub mod alert_rule_service;
pub mod target_service;
pub mod user_service;
