//! Shared data model and wire contract for PromeConfig.
//!
//! Both the REST server and the console depend on this crate so that the
//! JSON shapes, the validation rules and the generated Prometheus files
//! cannot drift apart.

pub mod auth;
pub mod models;
pub mod prometheus;
pub mod relabel;
pub mod validation;

pub use auth::{AuthErrorKind, AuthResponse, Credentials, ErrorBody};
pub use models::{
    AiSettings, AiSettingsInput, AiSettingsPatch, AlertRule, AlertRulePatch, NewAlertRule,
    NewTarget, ScrapeInterval, Target, TargetPatch, User,
};
pub use prometheus::{RenderOptions, RenderedConfig};
pub use relabel::{RelabelAction, RelabelRule};
pub use validation::ValidationError;
