//! Application state: the loaded collections plus the auth state machine.
//! Every mutation is followed by a full reload; a 401 from any call signs
//! the user out locally.

use promeconfig_common::{
    AiSettings, AiSettingsInput, AiSettingsPatch, AlertRule, AlertRulePatch, NewAlertRule,
    NewTarget, RenderOptions, Target, TargetPatch, User,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::backend::Backend;
use crate::error::{ConsoleError, Result};
use crate::services::{AiSettingsService, AlertRuleService, AuthService, AuthState, TargetService};
use crate::session::SessionStore;
use crate::views::{ConfigPreview, DashboardStats};

#[derive(Debug, Default)]
struct Collections {
    targets: Vec<Target>,
    alert_rules: Vec<AlertRule>,
}

pub struct AppController {
    session: Arc<SessionStore>,
    auth: AuthService,
    targets: TargetService,
    alert_rules: AlertRuleService,
    ai_settings: AiSettingsService,
    data: RwLock<Collections>,
}

impl AppController {
    pub fn new(backend: Arc<dyn Backend>, session: Arc<SessionStore>) -> Self {
        info!(backend = backend.name(), "Console controller created.");
        Self {
            auth: AuthService::new(backend.clone(), session.clone()),
            targets: TargetService::new(backend.clone()),
            alert_rules: AlertRuleService::new(backend.clone()),
            ai_settings: AiSettingsService::new(backend),
            session,
            data: RwLock::new(Collections::default()),
        }
    }

    /// Confirms any persisted session and, when signed in, loads the
    /// collections. A failed initial load is logged, not fatal.
    pub async fn init(&self) -> AuthState {
        let state = self.auth.restore().await;
        if matches!(state, AuthState::Authenticated(_)) {
            self.reload_after("restore").await;
        }
        state
    }

    pub fn auth_state(&self) -> AuthState {
        self.auth.state()
    }

    pub fn subscribe_auth(&self) -> tokio::sync::watch::Receiver<AuthState> {
        self.auth.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_authenticated()
    }

    pub fn current_user(&self) -> Option<User> {
        self.auth.current_user()
    }

    pub async fn targets(&self) -> Vec<Target> {
        self.data.read().await.targets.clone()
    }

    pub async fn alert_rules(&self) -> Vec<AlertRule> {
        self.data.read().await.alert_rules.clone()
    }

    pub async fn dashboard(&self) -> DashboardStats {
        let data = self.data.read().await;
        DashboardStats::compute(&data.targets, &data.alert_rules)
    }

    /// Renders the loaded collections; nothing is fetched.
    pub async fn config_preview(&self, options: &RenderOptions) -> Result<ConfigPreview> {
        let data = self.data.read().await;
        ConfigPreview::render(&data.targets, &data.alert_rules, options)
    }

    /// Fetches both collections concurrently and swaps them in together.
    /// On any failure the previous state stays as it was.
    pub async fn reload(&self) -> Result<()> {
        let fetched = tokio::try_join!(self.targets.list(), self.alert_rules.list());
        match self.intercept(fetched).await {
            Ok((targets, alert_rules)) => {
                debug!(targets = targets.len(), alert_rules = alert_rules.len(), "Collections reloaded.");
                let mut data = self.data.write().await;
                data.targets = targets;
                data.alert_rules = alert_rules;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to reload collections, keeping previous state.");
                Err(e)
            }
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User> {
        let user = self.auth.sign_in(email, password).await?;
        self.reload_after("sign-in").await;
        Ok(user)
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<User> {
        let user = self.auth.sign_up(email, password).await?;
        self.reload_after("sign-up").await;
        Ok(user)
    }

    /// Always leaves the controller signed out with empty collections.
    pub async fn sign_out(&self) -> Result<()> {
        let result = self.auth.sign_out().await;
        self.clear_collections().await;
        if let Err(e) = &result {
            warn!(error = %e, "Sign-out finished with an error; local state was cleared.");
        }
        result
    }

    pub async fn create_target(&self, target: NewTarget) -> Result<Target> {
        let created = self.intercept(self.targets.create(target).await).await?;
        self.reload_after("mutation").await;
        Ok(created)
    }

    pub async fn update_target(&self, id: &str, patch: TargetPatch) -> Result<Target> {
        let updated = self.intercept(self.targets.update(id, patch).await).await?;
        self.reload_after("mutation").await;
        Ok(updated)
    }

    pub async fn delete_target(&self, id: &str) -> Result<()> {
        self.intercept(self.targets.delete(id).await).await?;
        self.reload_after("mutation").await;
        Ok(())
    }

    pub async fn create_alert_rule(&self, rule: NewAlertRule) -> Result<AlertRule> {
        let created = self.intercept(self.alert_rules.create(rule).await).await?;
        self.reload_after("mutation").await;
        Ok(created)
    }

    pub async fn update_alert_rule(&self, id: &str, patch: AlertRulePatch) -> Result<AlertRule> {
        let updated = self.intercept(self.alert_rules.update(id, patch).await).await?;
        self.reload_after("mutation").await;
        Ok(updated)
    }

    pub async fn delete_alert_rule(&self, id: &str) -> Result<()> {
        self.intercept(self.alert_rules.delete(id).await).await?;
        self.reload_after("mutation").await;
        Ok(())
    }

    pub async fn ai_settings(&self) -> Result<Option<AiSettings>> {
        self.intercept(self.ai_settings.get().await).await
    }

    pub async fn save_ai_settings(&self, input: AiSettingsInput) -> Result<AiSettings> {
        self.intercept(self.ai_settings.save(input).await).await
    }

    pub async fn update_ai_settings(&self, id: &str, patch: AiSettingsPatch) -> Result<AiSettings> {
        self.intercept(self.ai_settings.update(id, patch).await).await
    }

    pub async fn delete_ai_settings(&self) -> Result<()> {
        self.intercept(self.ai_settings.delete().await).await
    }

    /// Watches the session for sign-out coming from elsewhere: the watch
    /// channel covers this process, the periodic re-read covers others.
    pub fn spawn_session_watcher(self: &Arc<Self>, poll_every: Duration) -> JoinHandle<()> {
        let controller = Arc::clone(self);
        let mut rx = self.session.subscribe();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    changed = rx.changed() => {
                        if changed.is_err() {
                            debug!("Session store dropped, stopping watcher.");
                            break;
                        }
                        let signed_out = rx.borrow_and_update().is_none();
                        if signed_out {
                            controller.on_session_ended().await;
                        } else if controller.auth_state() == AuthState::Unauthenticated {
                            // Signed in from another process.
                            controller.init().await;
                        }
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = controller.session.reload_from_disk().await {
                            warn!(error = %e, "Failed to re-read session file.");
                        }
                    }
                }
            }
        })
    }

    async fn on_session_ended(&self) {
        if self.auth.is_authenticated() {
            info!("Session ended outside this controller, clearing local state.");
        }
        self.auth.session_ended();
        self.clear_collections().await;
    }

    async fn clear_collections(&self) {
        *self.data.write().await = Collections::default();
    }

    /// The step before it already succeeded; a failed reload only logs.
    async fn reload_after(&self, step: &'static str) {
        if let Err(e) = self.reload().await {
            warn!(error = %e, step, "Follow-up reload failed, collections may be stale.");
        }
    }

    /// Applies the 401 rule to any result: sign out locally, no retry.
    async fn intercept<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(ConsoleError::Unauthorized) = &result {
            warn!("Backend rejected the session, signing out locally.");
            self.auth.handle_unauthorized().await;
            self.clear_collections().await;
        }
        result
    }
}
