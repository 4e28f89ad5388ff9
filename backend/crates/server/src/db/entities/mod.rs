pub mod ai_setting;
pub mod alert_rule;
pub mod target;
pub mod user;

pub mod prelude {
    pub use super::ai_setting::Entity as AiSetting;
    pub use super::alert_rule::Entity as AlertRule;
    pub use super::target::Entity as Target;
    pub use super::user::Entity as User;
}
