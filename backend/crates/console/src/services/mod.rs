pub mod ai_settings_service;
pub mod alert_rule_service;
pub mod auth_service;
pub mod target_service;

pub use ai_settings_service::AiSettingsService;
pub use alert_rule_service::AlertRuleService;
pub use auth_service::{AuthService, AuthState};
pub use target_service::TargetService;
