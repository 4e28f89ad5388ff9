//! Validation shared by the console forms and the server handlers.

use std::collections::BTreeMap;
use thiserror::Error;

use crate::models::{AiSettingsInput, AiSettingsPatch, AlertRulePatch, NewAlertRule, NewTarget, TargetPatch};
use crate::relabel::{RelabelAction, RelabelRule};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_TEMPERATURE: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("job name must not be empty")]
    EmptyJobName,
    #[error("at least one target is required")]
    NoTargets,
    #[error("target '{0}' is not a host:port address")]
    InvalidTargetAddress(String),
    #[error("metrics path '{0}' must start with '/'")]
    InvalidMetricsPath(String),
    #[error("{field}[{index}]: hashmod requires a positive modulus")]
    MissingModulus { field: &'static str, index: usize },
    #[error("alert name must not be empty")]
    EmptyAlertName,
    #[error("alert expression must not be empty")]
    EmptyExpr,
    #[error("'{0}' is not a key=value pair")]
    InvalidKeyValue(String),
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
    #[error("temperature {0} is outside 0.0..=2.0")]
    InvalidTemperature(f64),
    #[error("invalid email address")]
    InvalidEmail,
    #[error("password must be at least {0} characters")]
    WeakPassword(usize),
    #[error("{0}")]
    Invalid(String),
}

/// Splits comma-separated input, trims each element and drops empty
/// segments. Order is preserved.
pub fn split_csv(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parses `key=value` entries separated by commas or newlines.
pub fn parse_key_values(input: &str) -> Result<BTreeMap<String, String>, ValidationError> {
    let mut map = BTreeMap::new();
    for entry in input.split(['\n', ',']).map(str::trim).filter(|s| !s.is_empty()) {
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| ValidationError::InvalidKeyValue(entry.to_string()))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(ValidationError::InvalidKeyValue(entry.to_string()));
        }
        map.insert(key.to_string(), value.trim().to_string());
    }
    Ok(map)
}

/// Trims every target address, keeping order.
pub fn normalize_targets(targets: Vec<String>) -> Vec<String> {
    targets.into_iter().map(|t| t.trim().to_string()).collect()
}

pub fn validate_target_address(addr: &str) -> Result<(), ValidationError> {
    let invalid = || ValidationError::InvalidTargetAddress(addr.to_string());
    let (host, port) = addr.rsplit_once(':').ok_or_else(invalid)?;
    if host.trim().is_empty() || port.parse::<u16>().is_err() {
        return Err(invalid());
    }
    Ok(())
}

fn validate_targets(targets: &[String]) -> Result<(), ValidationError> {
    if targets.is_empty() {
        return Err(ValidationError::NoTargets);
    }
    for t in targets {
        if t.trim().is_empty() {
            return Err(ValidationError::NoTargets);
        }
        validate_target_address(t)?;
    }
    Ok(())
}

fn validate_metrics_path(path: &str) -> Result<(), ValidationError> {
    if !path.starts_with('/') {
        return Err(ValidationError::InvalidMetricsPath(path.to_string()));
    }
    Ok(())
}

pub fn validate_relabel_rules(
    field: &'static str,
    rules: &[RelabelRule],
) -> Result<(), ValidationError> {
    for (index, rule) in rules.iter().enumerate() {
        if rule.action == RelabelAction::Hashmod && rule.modulus.unwrap_or(0) == 0 {
            return Err(ValidationError::MissingModulus { field, index });
        }
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    let (local, domain) = email.split_once('@').ok_or(ValidationError::InvalidEmail)?;
    if local.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || email.contains(char::is_whitespace)
    {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

pub fn validate_password(password: &str, min_len: usize) -> Result<(), ValidationError> {
    if password.chars().count() < min_len {
        return Err(ValidationError::WeakPassword(min_len));
    }
    Ok(())
}

fn validate_temperature(t: f64) -> Result<(), ValidationError> {
    if !(0.0..=MAX_TEMPERATURE).contains(&t) {
        return Err(ValidationError::InvalidTemperature(t));
    }
    Ok(())
}

impl NewTarget {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.job_name.trim().is_empty() {
            return Err(ValidationError::EmptyJobName);
        }
        validate_targets(&self.targets)?;
        validate_metrics_path(&self.metrics_path)?;
        if let Some(rules) = &self.relabel_configs {
            validate_relabel_rules("relabel_configs", rules)?;
        }
        if let Some(rules) = &self.metric_relabel_configs {
            validate_relabel_rules("metric_relabel_configs", rules)?;
        }
        Ok(())
    }
}

impl TargetPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.job_name {
            if name.trim().is_empty() {
                return Err(ValidationError::EmptyJobName);
            }
        }
        if let Some(targets) = &self.targets {
            validate_targets(targets)?;
        }
        if let Some(path) = &self.metrics_path {
            validate_metrics_path(path)?;
        }
        if let Some(rules) = &self.relabel_configs {
            validate_relabel_rules("relabel_configs", rules)?;
        }
        if let Some(rules) = &self.metric_relabel_configs {
            validate_relabel_rules("metric_relabel_configs", rules)?;
        }
        Ok(())
    }
}

impl NewAlertRule {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.alert_name.trim().is_empty() {
            return Err(ValidationError::EmptyAlertName);
        }
        if self.expr.trim().is_empty() {
            return Err(ValidationError::EmptyExpr);
        }
        Ok(())
    }
}

impl AlertRulePatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.alert_name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(ValidationError::EmptyAlertName);
        }
        if self.expr.as_deref().is_some_and(|e| e.trim().is_empty()) {
            return Err(ValidationError::EmptyExpr);
        }
        Ok(())
    }
}

impl AiSettingsInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.provider.trim().is_empty() {
            return Err(ValidationError::EmptyField("provider"));
        }
        if self.model.trim().is_empty() {
            return Err(ValidationError::EmptyField("model"));
        }
        validate_temperature(self.temperature)
    }
}

impl AiSettingsPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.provider.as_deref().is_some_and(|p| p.trim().is_empty()) {
            return Err(ValidationError::EmptyField("provider"));
        }
        if self.model.as_deref().is_some_and(|m| m.trim().is_empty()) {
            return Err(ValidationError::EmptyField("model"));
        }
        if let Some(t) = self.temperature {
            validate_temperature(t)?;
        }
        Ok(())
    }
}
