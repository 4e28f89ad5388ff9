//! The uniform CRUD and auth contract, with one implementation per kind of
//! backend. Call sites hold an `Arc<dyn Backend>` and never branch on which
//! one they got.

use async_trait::async_trait;
use promeconfig_common::{
    AiSettings, AiSettingsInput, AiSettingsPatch, AlertRule, AlertRulePatch, AuthErrorKind,
    Credentials, NewAlertRule, NewTarget, Target, TargetPatch, User,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{BackendKind, ConsoleConfig};
use crate::error::{ConsoleError, Result};
use crate::session::{Session, SessionStore};

pub mod hosted;
pub mod rest;

pub use hosted::HostedBackend;
pub use rest::RestBackend;

#[async_trait]
pub trait Backend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Creates an account. On success the session is persisted.
    async fn sign_up(&self, credentials: &Credentials) -> Result<Session>;
    /// On success the session is persisted.
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session>;
    /// Clears the local session even when the remote call fails.
    async fn sign_out(&self) -> Result<()>;
    async fn current_user(&self) -> Result<User>;

    async fn list_targets(&self) -> Result<Vec<Target>>;
    async fn create_target(&self, target: &NewTarget) -> Result<Target>;
    async fn update_target(&self, id: &str, patch: &TargetPatch) -> Result<Target>;
    async fn delete_target(&self, id: &str) -> Result<()>;

    async fn list_alert_rules(&self) -> Result<Vec<AlertRule>>;
    async fn create_alert_rule(&self, rule: &NewAlertRule) -> Result<AlertRule>;
    async fn update_alert_rule(&self, id: &str, patch: &AlertRulePatch) -> Result<AlertRule>;
    async fn delete_alert_rule(&self, id: &str) -> Result<()>;

    /// Fails with `NotFound` when the user has no settings yet.
    async fn get_ai_settings(&self) -> Result<AiSettings>;
    /// Insert-or-replace keyed on the owner.
    async fn save_ai_settings(&self, input: &AiSettingsInput) -> Result<AiSettings>;
    async fn update_ai_settings(&self, id: &str, patch: &AiSettingsPatch) -> Result<AiSettings>;
    async fn delete_ai_settings(&self) -> Result<()>;
}

/// Builds the backend selected in the configuration. The choice is made once.
pub fn from_config(config: &ConsoleConfig, session: Arc<SessionStore>) -> Result<Arc<dyn Backend>> {
    let client = http_client(config.request_timeout())?;
    match config.backend {
        BackendKind::Rest => Ok(Arc::new(RestBackend::new(
            client,
            config.rest_base_url.clone(),
            config.rest_routes,
            session,
        ))),
        BackendKind::Hosted => {
            let (Some(url), Some(key)) = (&config.hosted_url, &config.hosted_anon_key) else {
                return Err(ConsoleError::Config(
                    "the hosted backend needs both hosted_url and hosted_anon_key".to_string(),
                ));
            };
            Ok(Arc::new(HostedBackend::new(client, url.clone(), key.clone(), session)))
        }
    }
}

pub fn http_client(timeout: Option<Duration>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().user_agent(concat!("promeconfig/", env!("CARGO_PKG_VERSION")));
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

/// Which call produced the failure; auth calls classify into
/// [`AuthErrorKind`] instead of the generic resource errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallKind {
    Auth,
    Resource,
}

/// The union of the error shapes the supported backends send back.
#[derive(Debug, Default, Deserialize)]
struct RawErrorBody {
    error: Option<Value>,
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    code: Option<Value>,
    error_code: Option<String>,
}

impl RawErrorBody {
    fn message(&self) -> Option<String> {
        self.error_description
            .clone()
            .or_else(|| self.msg.clone())
            .or_else(|| self.message.clone())
            .or_else(|| match &self.error {
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Object(obj)) => obj.get("message").and_then(Value::as_str).map(str::to_string),
                _ => None,
            })
            .filter(|m| !m.is_empty())
    }

    fn code(&self) -> Option<String> {
        self.error_code
            .clone()
            .or_else(|| self.code.as_ref().and_then(Value::as_str).map(str::to_string))
            .or_else(|| {
                // OAuth-style bodies put the code in `error` and the text in
                // `error_description`.
                self.error_description.as_ref()?;
                self.error.as_ref().and_then(Value::as_str).map(str::to_string)
            })
    }
}

/// Maps a non-2xx response to a typed error. An unparsable body is treated
/// as an empty object, leaving `HTTP <status>` as the message.
pub(crate) fn error_from_response(status: u16, body: &[u8], kind: CallKind) -> ConsoleError {
    let raw: RawErrorBody = serde_json::from_slice(body).unwrap_or_default();
    let message = raw.message().unwrap_or_else(|| format!("HTTP {status}"));

    if kind == CallKind::Auth && (400..500).contains(&status) {
        return ConsoleError::Auth(AuthErrorKind::classify(raw.code().as_deref(), &message));
    }
    match status {
        401 => ConsoleError::Unauthorized,
        403 => ConsoleError::Forbidden(message),
        404 => ConsoleError::NotFound(message),
        409 => ConsoleError::Conflict(message),
        _ => ConsoleError::Http { status, message },
    }
}

/// Reads a response, turning non-2xx statuses into [`ConsoleError`].
pub(crate) async fn check(response: reqwest::Response, kind: CallKind) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.bytes().await.unwrap_or_default();
    let err = error_from_response(status.as_u16(), &body, kind);
    tracing::debug!(status = status.as_u16(), error = %err, "Backend call failed.");
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unparsable_body_falls_back_to_status() {
        let err = error_from_response(502, b"<html>bad gateway</html>", CallKind::Resource);
        match err {
            ConsoleError::Http { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "HTTP 502");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn server_error_field_is_surfaced() {
        let err = error_from_response(500, br#"{"error":"database is locked"}"#, CallKind::Resource);
        assert_eq!(err.to_string(), "database is locked");
    }

    #[test]
    fn resource_statuses_map_to_kinds() {
        assert!(error_from_response(401, b"{}", CallKind::Resource).is_unauthorized());
        assert!(error_from_response(404, br#"{"error":"target x not found"}"#, CallKind::Resource).is_not_found());
        assert!(matches!(
            error_from_response(403, b"", CallKind::Resource),
            ConsoleError::Forbidden(_)
        ));
    }

    #[test]
    fn auth_failures_prefer_structured_codes() {
        let err = error_from_response(
            409,
            br#"{"error":"user already exists","code":"user_already_exists"}"#,
            CallKind::Auth,
        );
        assert!(matches!(err, ConsoleError::Auth(AuthErrorKind::DuplicateAccount)));

        let err = error_from_response(
            400,
            br#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
            CallKind::Auth,
        );
        assert!(matches!(err, ConsoleError::Auth(AuthErrorKind::InvalidCredentials)));

        let err = error_from_response(422, br#"{"code":422,"msg":"Password should be at least 6 characters"}"#, CallKind::Auth);
        assert!(matches!(err, ConsoleError::Auth(AuthErrorKind::WeakPassword)));
    }

    #[test]
    fn unmatched_auth_message_is_kept_verbatim() {
        let err = error_from_response(429, br#"{"msg":"Too many requests"}"#, CallKind::Auth);
        match err {
            ConsoleError::Auth(AuthErrorKind::Other(msg)) => assert_eq!(msg, "Too many requests"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
