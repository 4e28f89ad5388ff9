//! Form state and presentation helpers. Each form converts user input into a
//! validated payload; nothing here talks to a backend.

pub mod ai_settings_form;
pub mod alert_rule_form;
pub mod api_panel;
pub mod auth_form;
pub mod config_preview;
pub mod dashboard;
pub mod target_form;

pub use ai_settings_form::AiSettingsForm;
pub use alert_rule_form::AlertRuleForm;
pub use api_panel::{ApiPanel, ConnectionStatus, ReloadStatus, StatusSnapshot};
pub use auth_form::{AuthForm, AuthMode};
pub use config_preview::{ConfigFile, ConfigPreview};
pub use dashboard::DashboardStats;
pub use target_form::{RelabelList, RelabelRuleForm, TargetForm};
