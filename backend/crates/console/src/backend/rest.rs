use async_trait::async_trait;
use promeconfig_common::{
    AiSettings, AiSettingsInput, AiSettingsPatch, AlertRule, AlertRulePatch, AuthErrorKind,
    AuthResponse, Credentials, NewAlertRule, NewTarget, Target, TargetPatch, User,
};
use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{info, warn};

use super::{Backend, CallKind, check};
use crate::config::RestRoutes;
use crate::error::{ConsoleError, Result};
use crate::session::{Session, SessionStore};

/// Path spelling for one route variant, relative to the base URL.
#[derive(Debug, Clone, Copy)]
struct RoutePaths {
    sign_up: &'static str,
    sign_in: &'static str,
    sign_out: &'static str,
    user: &'static str,
    targets: &'static str,
    alert_rules: &'static str,
    ai_settings: &'static str,
}

const DEFAULT_ROUTES: RoutePaths = RoutePaths {
    sign_up: "/auth/signup",
    sign_in: "/auth/signin",
    sign_out: "/auth/signout",
    user: "/user",
    targets: "/targets",
    alert_rules: "/alert-rules",
    ai_settings: "/ai-settings",
};

const LEGACY_ROUTES: RoutePaths = RoutePaths {
    sign_up: "/auth/register",
    sign_in: "/auth/login",
    sign_out: "/auth/logout",
    user: "/auth/user",
    targets: "/targets",
    alert_rules: "/alertrules",
    ai_settings: "/aisettings",
};

/// `GET /user` answers `{"user": {...}}`; older servers answer the bare user.
#[derive(Deserialize)]
#[serde(untagged)]
enum UserEnvelope {
    Wrapped { user: User },
    Bare(User),
}

impl From<UserEnvelope> for User {
    fn from(envelope: UserEnvelope) -> Self {
        match envelope {
            UserEnvelope::Wrapped { user } | UserEnvelope::Bare(user) => user,
        }
    }
}

/// Client for the PromeConfig REST server.
pub struct RestBackend {
    client: Client,
    base_url: String,
    routes: RoutePaths,
    session: Arc<SessionStore>,
}

impl RestBackend {
    pub fn new(client: Client, base_url: String, routes: RestRoutes, session: Arc<SessionStore>) -> Self {
        let routes = match routes {
            RestRoutes::Default => DEFAULT_ROUTES,
            RestRoutes::Legacy => LEGACY_ROUTES,
        };
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            routes,
            session,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, format!("{}{}", self.base_url, path));
        match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder, kind: CallKind) -> Result<T> {
        let response = check(builder.send().await?, kind).await?;
        Ok(response.json::<T>().await?)
    }

    async fn send_empty(&self, builder: RequestBuilder) -> Result<()> {
        check(builder.send().await?, CallKind::Resource).await?;
        Ok(())
    }

    async fn authenticate(&self, path: &str, credentials: &Credentials) -> Result<Session> {
        let response: AuthResponse = self
            .send(self.client.post(format!("{}{}", self.base_url, path)).json(credentials), CallKind::Auth)
            .await?;
        let token = response
            .bearer_token()
            .ok_or_else(|| ConsoleError::Auth(AuthErrorKind::Other("server returned no token".into())))?
            .to_string();
        let session = Session { token, user: response.user };
        self.session.save(session.clone()).await?;
        info!(user_id = %session.user.id, "Signed in against REST backend.");
        Ok(session)
    }

    fn item(collection: &str, id: &str) -> String {
        format!("{collection}/{id}")
    }
}

#[async_trait]
impl Backend for RestBackend {
    fn name(&self) -> &'static str {
        "rest"
    }

    async fn sign_up(&self, credentials: &Credentials) -> Result<Session> {
        self.authenticate(self.routes.sign_up, credentials).await
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Session> {
        self.authenticate(self.routes.sign_in, credentials).await
    }

    async fn sign_out(&self) -> Result<()> {
        if self.session.is_authenticated() {
            if let Err(e) = self.send_empty(self.request(Method::POST, self.routes.sign_out)).await {
                warn!(error = %e, "Remote sign-out failed, clearing local session anyway.");
            }
        }
        self.session.clear().await
    }

    async fn current_user(&self) -> Result<User> {
        let envelope: UserEnvelope = self
            .send(self.request(Method::GET, self.routes.user), CallKind::Resource)
            .await?;
        Ok(envelope.into())
    }

    async fn list_targets(&self) -> Result<Vec<Target>> {
        self.send(self.request(Method::GET, self.routes.targets), CallKind::Resource).await
    }

    async fn create_target(&self, target: &NewTarget) -> Result<Target> {
        self.send(self.request(Method::POST, self.routes.targets).json(target), CallKind::Resource)
            .await
    }

    async fn update_target(&self, id: &str, patch: &TargetPatch) -> Result<Target> {
        let path = Self::item(self.routes.targets, id);
        self.send(self.request(Method::PUT, &path).json(patch), CallKind::Resource).await
    }

    async fn delete_target(&self, id: &str) -> Result<()> {
        let path = Self::item(self.routes.targets, id);
        self.send_empty(self.request(Method::DELETE, &path)).await
    }

    async fn list_alert_rules(&self) -> Result<Vec<AlertRule>> {
        self.send(self.request(Method::GET, self.routes.alert_rules), CallKind::Resource).await
    }

    async fn create_alert_rule(&self, rule: &NewAlertRule) -> Result<AlertRule> {
        self.send(self.request(Method::POST, self.routes.alert_rules).json(rule), CallKind::Resource)
            .await
    }

    async fn update_alert_rule(&self, id: &str, patch: &AlertRulePatch) -> Result<AlertRule> {
        let path = Self::item(self.routes.alert_rules, id);
        self.send(self.request(Method::PUT, &path).json(patch), CallKind::Resource).await
    }

    async fn delete_alert_rule(&self, id: &str) -> Result<()> {
        let path = Self::item(self.routes.alert_rules, id);
        self.send_empty(self.request(Method::DELETE, &path)).await
    }

    async fn get_ai_settings(&self) -> Result<AiSettings> {
        self.send(self.request(Method::GET, self.routes.ai_settings), CallKind::Resource).await
    }

    async fn save_ai_settings(&self, input: &AiSettingsInput) -> Result<AiSettings> {
        self.send(self.request(Method::POST, self.routes.ai_settings).json(input), CallKind::Resource)
            .await
    }

    async fn update_ai_settings(&self, id: &str, patch: &AiSettingsPatch) -> Result<AiSettings> {
        let path = Self::item(self.routes.ai_settings, id);
        self.send(self.request(Method::PUT, &path).json(patch), CallKind::Resource).await
    }

    async fn delete_ai_settings(&self) -> Result<()> {
        self.send_empty(self.request(Method::DELETE, self.routes.ai_settings)).await
    }
}
