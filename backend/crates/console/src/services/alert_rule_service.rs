use promeconfig_common::{AlertRule, AlertRulePatch, NewAlertRule};
use std::sync::Arc;

use crate::backend::Backend;
use crate::error::Result;

#[derive(Clone)]
pub struct AlertRuleService {
    backend: Arc<dyn Backend>,
}

impl AlertRuleService {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub async fn list(&self) -> Result<Vec<AlertRule>> {
        self.backend.list_alert_rules().await
    }

    pub async fn create(&self, rule: NewAlertRule) -> Result<AlertRule> {
        rule.validate()?;
        self.backend.create_alert_rule(&rule).await
    }

    pub async fn update(&self, id: &str, patch: AlertRulePatch) -> Result<AlertRule> {
        patch.validate()?;
        self.backend.update_alert_rule(id, &patch).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.backend.delete_alert_rule(id).await
    }
}
