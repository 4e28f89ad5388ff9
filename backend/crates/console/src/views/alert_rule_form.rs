use promeconfig_common::models::DEFAULT_FOR_DURATION;
use promeconfig_common::validation::parse_key_values;
use promeconfig_common::{AlertRule, AlertRulePatch, NewAlertRule, ValidationError};
use std::collections::BTreeMap;

/// Labels and annotations are edited as `key=value` lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertRuleForm {
    pub alert_name: String,
    pub expr: String,
    pub for_duration: String,
    pub labels: String,
    pub annotations: String,
    editing: Option<String>,
}

impl Default for AlertRuleForm {
    fn default() -> Self {
        Self {
            alert_name: String::new(),
            expr: String::new(),
            for_duration: DEFAULT_FOR_DURATION.to_string(),
            labels: String::new(),
            annotations: String::new(),
            editing: None,
        }
    }
}

fn format_pairs(map: &BTreeMap<String, String>) -> String {
    map.iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl AlertRuleForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rule(rule: &AlertRule) -> Self {
        Self {
            alert_name: rule.alert_name.clone(),
            expr: rule.expr.clone(),
            for_duration: rule.for_duration.clone(),
            labels: format_pairs(&rule.labels),
            annotations: format_pairs(&rule.annotations),
            editing: Some(rule.id.clone()),
        }
    }

    pub fn editing_id(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    pub fn to_new_rule(&self) -> Result<NewAlertRule, ValidationError> {
        let for_duration = match self.for_duration.trim() {
            "" => DEFAULT_FOR_DURATION.to_string(),
            d => d.to_string(),
        };
        let rule = NewAlertRule {
            alert_name: self.alert_name.trim().to_string(),
            expr: self.expr.trim().to_string(),
            for_duration,
            labels: parse_key_values(&self.labels)?,
            annotations: parse_key_values(&self.annotations)?,
        };
        rule.validate()?;
        Ok(rule)
    }

    pub fn to_patch(&self) -> Result<AlertRulePatch, ValidationError> {
        self.to_new_rule().map(AlertRulePatch::from)
    }
}
