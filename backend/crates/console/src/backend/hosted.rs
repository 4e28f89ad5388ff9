//! Adapter for a hosted database-as-a-service: a GoTrue-style auth API under
//! `/auth/v1` and a PostgREST-style row API under `/rest/v1`. Rows are
//! filtered to the session by the service's row-level policies; inserts
//! stamp `user_id` from the local session.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use promeconfig_common::{
    AiSettings, AiSettingsInput, AiSettingsPatch, AlertRule, AlertRulePatch, AuthErrorKind,
    Credentials, NewAlertRule, NewTarget, Target, TargetPatch, User,
};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use super::{Backend, CallKind, check};
use crate::error::{ConsoleError, Result};
use crate::session::{Session, SessionStore};

const TARGETS: &str = "targets";
const ALERT_RULES: &str = "alert_rules";
const AI_SETTINGS: &str = "ai_settings";

const RETURN_REPRESENTATION: &str = "return=representation";
const UPSERT_REPRESENTATION: &str = "resolution=merge-duplicates,return=representation";

#[derive(Debug, Deserialize)]
struct HostedUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl From<HostedUser> for User {
    fn from(u: HostedUser) -> Self {
        Self {
            id: u.id,
            email: u.email.unwrap_or_default(),
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

/// Token endpoint reply. Sign-up without auto-confirm returns the user and
/// no token.
#[derive(Debug, Deserialize)]
struct HostedAuthReply {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    user: Option<HostedUser>,
    // Sign-up may return the bare user at the top level.
    #[serde(default)]
    id: Option<String>,
}

/// Insert body: the create payload plus the owner.
#[derive(Serialize)]
struct Owned<'a, T: Serialize> {
    user_id: &'a str,
    #[serde(flatten)]
    row: &'a T,
}

pub struct HostedBackend {
    client: Client,
    base_url: String,
    anon_key: String,
    session: Arc<SessionStore>,
}

impl HostedBackend {
    pub fn new(client: Client, base_url: String, anon_key: String, session: Arc<SessionStore>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key,
            session,
        }
    }

    /// Every call carries the project key; the bearer is the user's token
    /// when signed in and the project key otherwise.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let bearer = self.session.token().unwrap_or_else(|| self.anon_key.clone());
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    fn table(&self, method: Method, table: &str) -> RequestBuilder {
        self.request(method, &format!("/rest/v1/{table}"))
    }

    fn owner_id(&self) -> Result<String> {
        self.session
            .current()
            .map(|s| s.user.id)
            .ok_or(ConsoleError::Unauthorized)
    }

    async fn rows<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<Vec<T>> {
        let response = check(builder.send().await?, CallKind::Resource).await?;
        Ok(response.json::<Vec<T>>().await?)
    }

    /// Runs a write that returns the affected rows; an empty result means
    /// the filter matched nothing visible to this user.
    async fn single_row<T: DeserializeOwned>(&self, builder: RequestBuilder, what: &str) -> Result<T> {
        self.rows::<T>(builder)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ConsoleError::NotFound(what.to_string()))
    }

    async fn list<T: DeserializeOwned>(&self, table: &str) -> Result<Vec<T>> {
        self.rows(
            self.table(Method::GET, table)
                .query(&[("select", "*"), ("order", "created_at.desc")]),
        )
        .await
    }

    async fn insert<B: Serialize, T: DeserializeOwned>(&self, table: &str, body: &B) -> Result<T> {
        let owner = self.owner_id()?;
        let builder = self
            .table(Method::POST, table)
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&Owned { user_id: &owner, row: body });
        self.single_row(builder, table).await
    }

    async fn patch<B: Serialize, T: DeserializeOwned>(&self, table: &str, id: &str, body: &B) -> Result<T> {
        let builder = self
            .table(Method::PATCH, table)
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", RETURN_REPRESENTATION)
            .json(body);
        self.single_row(builder, &format!("{table} {id}")).await
    }

    async fn delete_where(&self, table: &str, column: &str, value: &str) -> Result<()> {
        let builder = self
            .table(Method::DELETE, table)
            .query(&[(column, format!("eq.{value}"))])
            .header("Prefer", RETURN_REPRESENTATION);
        self.single_row::<Value>(builder, &format!("{table} {value}")).await?;
        Ok(())
    }

    async fn authenticate(&self, path: &str, credentials: &Credentials) -> Result<Session> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("apikey", &self.anon_key)
            .json(credentials)
            .send()
            .await?;
        let reply: HostedAuthReply = check(response, CallKind::Auth).await?.json().await?;

        let (Some(token), Some(user)) = (reply.access_token.filter(|t| !t.is_empty()), reply.user) else {
            if reply.id.is_some() {
                return Err(ConsoleError::Auth(AuthErrorKind::EmailNotConfirmed));
            }
            return Err(ConsoleError::Auth(AuthErrorKind::Other(
                "hosted auth returned no session".to_string(),
            )));
        };
        let session = Session { token, user: user.into() };
        self.session.save(session.clone()).await?;
        info!(user_id = %session.user.id, "Signed in against hosted backend.");
        Ok(session)
    }
}

#[async_trait]
impl Backend for HostedBackend {
    fn name(&self) -> &'static str {
        "hosted"
    }

    async fn sign_up(&self, credentials: &Credentials) -> Result<Session> {
        self.authenticate("/auth/v1/signup", credentials).await
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Session> {
        self.authenticate("/auth/v1/token?grant_type=password", credentials).await
    }

    async fn sign_out(&self) -> Result<()> {
        if self.session.is_authenticated() {
            let result = match self.request(Method::POST, "/auth/v1/logout").send().await {
                Ok(response) => check(response, CallKind::Resource).await.map(|_| ()),
                Err(e) => Err(e.into()),
            };
            if let Err(e) = result {
                warn!(error = %e, "Remote sign-out failed, clearing local session anyway.");
            }
        }
        self.session.clear().await
    }

    async fn current_user(&self) -> Result<User> {
        if !self.session.is_authenticated() {
            return Err(ConsoleError::Unauthorized);
        }
        let response = check(self.request(Method::GET, "/auth/v1/user").send().await?, CallKind::Resource).await?;
        Ok(response.json::<HostedUser>().await?.into())
    }

    async fn list_targets(&self) -> Result<Vec<Target>> {
        self.list(TARGETS).await
    }

    async fn create_target(&self, target: &NewTarget) -> Result<Target> {
        self.insert(TARGETS, target).await
    }

    async fn update_target(&self, id: &str, patch: &TargetPatch) -> Result<Target> {
        self.patch(TARGETS, id, patch).await
    }

    async fn delete_target(&self, id: &str) -> Result<()> {
        self.delete_where(TARGETS, "id", id).await
    }

    async fn list_alert_rules(&self) -> Result<Vec<AlertRule>> {
        self.list(ALERT_RULES).await
    }

    async fn create_alert_rule(&self, rule: &NewAlertRule) -> Result<AlertRule> {
        self.insert(ALERT_RULES, rule).await
    }

    async fn update_alert_rule(&self, id: &str, patch: &AlertRulePatch) -> Result<AlertRule> {
        self.patch(ALERT_RULES, id, patch).await
    }

    async fn delete_alert_rule(&self, id: &str) -> Result<()> {
        self.delete_where(ALERT_RULES, "id", id).await
    }

    async fn get_ai_settings(&self) -> Result<AiSettings> {
        let owner = self.owner_id()?;
        let builder = self
            .table(Method::GET, AI_SETTINGS)
            .query(&[("select", "*".to_string()), ("user_id", format!("eq.{owner}")), ("limit", "1".to_string())]);
        self.single_row(builder, AI_SETTINGS).await
    }

    async fn save_ai_settings(&self, input: &AiSettingsInput) -> Result<AiSettings> {
        let owner = self.owner_id()?;
        let builder = self
            .table(Method::POST, AI_SETTINGS)
            .query(&[("on_conflict", "user_id")])
            .header("Prefer", UPSERT_REPRESENTATION)
            .json(&Owned { user_id: &owner, row: input });
        self.single_row(builder, AI_SETTINGS).await
    }

    async fn update_ai_settings(&self, id: &str, patch: &AiSettingsPatch) -> Result<AiSettings> {
        self.patch(AI_SETTINGS, id, patch).await
    }

    async fn delete_ai_settings(&self) -> Result<()> {
        let owner = self.owner_id()?;
        self.delete_where(AI_SETTINGS, "user_id", &owner).await
    }
}
