use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::relabel::RelabelRule;

pub const DEFAULT_METRICS_PATH: &str = "/metrics";
pub const DEFAULT_FOR_DURATION: &str = "5m";
pub const DEFAULT_AI_PROVIDER: &str = "openai";
pub const DEFAULT_AI_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_AI_TEMPERATURE: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum ScrapeInterval {
    #[serde(rename = "5s")]
    FiveSeconds,
    #[serde(rename = "10s")]
    TenSeconds,
    #[default]
    #[serde(rename = "15s")]
    FifteenSeconds,
    #[serde(rename = "30s")]
    ThirtySeconds,
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
}

impl ScrapeInterval {
    pub const ALL: [ScrapeInterval; 6] = [
        ScrapeInterval::FiveSeconds,
        ScrapeInterval::TenSeconds,
        ScrapeInterval::FifteenSeconds,
        ScrapeInterval::ThirtySeconds,
        ScrapeInterval::OneMinute,
        ScrapeInterval::FiveMinutes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScrapeInterval::FiveSeconds => "5s",
            ScrapeInterval::TenSeconds => "10s",
            ScrapeInterval::FifteenSeconds => "15s",
            ScrapeInterval::ThirtySeconds => "30s",
            ScrapeInterval::OneMinute => "1m",
            ScrapeInterval::FiveMinutes => "5m",
        }
    }
}

impl fmt::Display for ScrapeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScrapeInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScrapeInterval::ALL
            .into_iter()
            .find(|i| i.as_str() == s.trim())
            .ok_or_else(|| format!("unsupported scrape interval '{s}'"))
    }
}

/// A scrape job as stored by a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: String,
    pub user_id: String,
    pub job_name: String,
    pub targets: Vec<String>,
    pub scrape_interval: ScrapeInterval,
    pub metrics_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relabel_configs: Option<Vec<RelabelRule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_relabel_configs: Option<Vec<RelabelRule>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create payload for a target. Identifier, owner and timestamps are
/// assigned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTarget {
    pub job_name: String,
    pub targets: Vec<String>,
    #[serde(default)]
    pub scrape_interval: ScrapeInterval,
    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relabel_configs: Option<Vec<RelabelRule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_relabel_configs: Option<Vec<RelabelRule>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TargetPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targets: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scrape_interval: Option<ScrapeInterval>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relabel_configs: Option<Vec<RelabelRule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_relabel_configs: Option<Vec<RelabelRule>>,
}

impl From<NewTarget> for TargetPatch {
    fn from(t: NewTarget) -> Self {
        Self {
            job_name: Some(t.job_name),
            targets: Some(t.targets),
            scrape_interval: Some(t.scrape_interval),
            metrics_path: Some(t.metrics_path),
            relabel_configs: t.relabel_configs,
            metric_relabel_configs: t.metric_relabel_configs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRule {
    pub id: String,
    pub user_id: String,
    pub alert_name: String,
    pub expr: String,
    pub for_duration: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub annotations: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAlertRule {
    pub alert_name: String,
    pub expr: String,
    #[serde(default = "default_for_duration")]
    pub for_duration: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AlertRulePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub for_duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
}

impl From<NewAlertRule> for AlertRulePatch {
    fn from(r: NewAlertRule) -> Self {
        Self {
            alert_name: Some(r.alert_name),
            expr: Some(r.expr),
            for_duration: Some(r.for_duration),
            labels: Some(r.labels),
            annotations: Some(r.annotations),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiSettings {
    pub id: String,
    pub user_id: String,
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of an AI-settings save. Saving is an upsert keyed on the owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiSettingsInput {
    #[serde(default = "default_ai_provider")]
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_ai_model")]
    pub model: String,
    #[serde(default = "default_ai_temperature")]
    pub temperature: f64,
}

impl Default for AiSettingsInput {
    fn default() -> Self {
        Self {
            provider: default_ai_provider(),
            api_key: None,
            base_url: None,
            model: default_ai_model(),
            temperature: default_ai_temperature(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AiSettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

/// Row APIs send `null` for empty JSON columns.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn default_metrics_path() -> String {
    DEFAULT_METRICS_PATH.to_string()
}

fn default_for_duration() -> String {
    DEFAULT_FOR_DURATION.to_string()
}

fn default_ai_provider() -> String {
    DEFAULT_AI_PROVIDER.to_string()
}

fn default_ai_model() -> String {
    DEFAULT_AI_MODEL.to_string()
}

fn default_ai_temperature() -> f64 {
    DEFAULT_AI_TEMPERATURE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrape_interval_uses_duration_strings_on_the_wire() {
        let json = serde_json::to_string(&ScrapeInterval::OneMinute).unwrap();
        assert_eq!(json, "\"1m\"");
        let parsed: ScrapeInterval = serde_json::from_str("\"30s\"").unwrap();
        assert_eq!(parsed, ScrapeInterval::ThirtySeconds);
        assert!(serde_json::from_str::<ScrapeInterval>("\"20s\"").is_err());
    }

    #[test]
    fn new_target_fills_defaults() {
        let t: NewTarget =
            serde_json::from_str(r#"{"job_name":"node","targets":["localhost:9100"]}"#).unwrap();
        assert_eq!(t.scrape_interval, ScrapeInterval::FifteenSeconds);
        assert_eq!(t.metrics_path, "/metrics");
        assert!(t.relabel_configs.is_none());
    }

    #[test]
    fn alert_rule_tolerates_missing_maps() {
        let raw = r#"{
            "id": "r1", "user_id": "u1", "alert_name": "Down", "expr": "up == 0",
            "for_duration": "1m",
            "created_at": "2024-01-01T00:00:00Z", "updated_at": "2024-01-01T00:00:00Z"
        }"#;
        let rule: AlertRule = serde_json::from_str(raw).unwrap();
        assert!(rule.labels.is_empty());
        assert!(rule.annotations.is_empty());

        let with_null = raw.replace(r#""for_duration": "1m","#, r#""for_duration": "1m", "labels": null,"#);
        let rule: AlertRule = serde_json::from_str(&with_null).unwrap();
        assert!(rule.labels.is_empty());
    }

    #[test]
    fn empty_patch_serializes_to_empty_object() {
        let patch = TargetPatch::default();
        assert_eq!(serde_json::to_value(&patch).unwrap(), serde_json::json!({}));
    }
}
