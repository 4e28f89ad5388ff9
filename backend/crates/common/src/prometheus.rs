//! Renders stored targets and alert rules as Prometheus configuration
//! files: `prometheus.yml` (scrape jobs) and the alerting rules file it
//! references.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{AlertRule, Target, DEFAULT_METRICS_PATH};
use crate::relabel::{RelabelAction, RelabelRule};

pub const DEFAULT_GLOBAL_INTERVAL: &str = "15s";
pub const DEFAULT_ALERTMANAGER: &str = "alertmanager:9093";
pub const DEFAULT_RULE_FILE: &str = "alerts.yml";
pub const SELF_SCRAPE_JOB: &str = "prometheus";
pub const SELF_SCRAPE_TARGET: &str = "localhost:9090";
pub const ALERT_GROUP_NAME: &str = "user_alerts";

/// Knobs for the parts of `prometheus.yml` that do not come from stored rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub scrape_interval: String,
    pub evaluation_interval: String,
    pub alertmanagers: Vec<String>,
    pub rule_file: String,
    /// Prometheus' own scrape job. Skipped when `None` or when a stored
    /// target already uses the job name.
    pub self_scrape: Option<String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            scrape_interval: DEFAULT_GLOBAL_INTERVAL.to_string(),
            evaluation_interval: DEFAULT_GLOBAL_INTERVAL.to_string(),
            alertmanagers: vec![DEFAULT_ALERTMANAGER.to_string()],
            rule_file: DEFAULT_RULE_FILE.to_string(),
            self_scrape: Some(SELF_SCRAPE_TARGET.to_string()),
        }
    }
}

/// Both generated files, as served by `GET /api/config`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedConfig {
    pub prometheus_yml: String,
    pub alerts_yml: String,
}

#[derive(Serialize)]
struct PrometheusFile<'a> {
    global: Global<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    alerting: Option<Alerting<'a>>,
    rule_files: Vec<&'a str>,
    scrape_configs: Vec<ScrapeConfig<'a>>,
}

#[derive(Serialize)]
struct Global<'a> {
    scrape_interval: &'a str,
    evaluation_interval: &'a str,
}

#[derive(Serialize)]
struct Alerting<'a> {
    alertmanagers: Vec<StaticConfigs<'a>>,
}

#[derive(Serialize)]
struct StaticConfigs<'a> {
    static_configs: Vec<StaticConfig<'a>>,
}

#[derive(Serialize)]
struct StaticConfig<'a> {
    targets: Vec<&'a str>,
}

#[derive(Serialize)]
struct ScrapeConfig<'a> {
    job_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    scrape_interval: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metrics_path: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    relabel_configs: Vec<RelabelConfig<'a>>,
    static_configs: Vec<StaticConfig<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    metric_relabel_configs: Vec<RelabelConfig<'a>>,
}

/// Prometheus field names; blank strings and empty lists are left out so
/// Prometheus applies its own defaults.
#[derive(Serialize)]
struct RelabelConfig<'a> {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    source_labels: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    separator: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_label: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    regex: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    modulus: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    replacement: Option<&'a str>,
    action: RelabelAction,
}

impl<'a> From<&'a RelabelRule> for RelabelConfig<'a> {
    fn from(rule: &'a RelabelRule) -> Self {
        let non_blank = |v: &'a Option<String>| v.as_deref().filter(|s| !s.trim().is_empty());
        Self {
            source_labels: rule
                .source_labels
                .iter()
                .flatten()
                .map(String::as_str)
                .filter(|l| !l.trim().is_empty())
                .collect(),
            separator: rule.separator.as_deref().filter(|s| !s.is_empty()),
            target_label: non_blank(&rule.target_label),
            regex: non_blank(&rule.regex),
            modulus: rule.modulus.filter(|_| rule.action == RelabelAction::Hashmod),
            replacement: rule.replacement.as_deref().filter(|s| !s.is_empty()),
            action: rule.action,
        }
    }
}

impl<'a> From<&'a Target> for ScrapeConfig<'a> {
    fn from(target: &'a Target) -> Self {
        let relabel = |rules: &'a Option<Vec<RelabelRule>>| {
            rules.iter().flatten().map(RelabelConfig::from).collect::<Vec<_>>()
        };
        Self {
            job_name: &target.job_name,
            scrape_interval: Some(target.scrape_interval.as_str()),
            metrics_path: Some(target.metrics_path.as_str())
                .filter(|p| !p.is_empty() && *p != DEFAULT_METRICS_PATH),
            relabel_configs: relabel(&target.relabel_configs),
            static_configs: vec![StaticConfig {
                targets: target.targets.iter().map(String::as_str).collect(),
            }],
            metric_relabel_configs: relabel(&target.metric_relabel_configs),
        }
    }
}

#[derive(Serialize)]
struct AlertsFile<'a> {
    groups: Vec<AlertGroup<'a>>,
}

#[derive(Serialize)]
struct AlertGroup<'a> {
    name: &'a str,
    rules: Vec<AlertingRule<'a>>,
}

#[derive(Serialize)]
struct AlertingRule<'a> {
    alert: &'a str,
    expr: &'a str,
    #[serde(rename = "for", skip_serializing_if = "Option::is_none")]
    for_duration: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    labels: Option<&'a BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    annotations: Option<&'a BTreeMap<String, String>>,
}

/// Rows come back newest first; the files list them in creation order so
/// adding a job appends to the file instead of reshuffling it.
fn oldest_first<T>(rows: &[T], created: impl Fn(&T) -> chrono::DateTime<chrono::Utc>) -> Vec<&T> {
    let mut sorted: Vec<&T> = rows.iter().collect();
    sorted.sort_by_key(|row| created(*row));
    sorted
}

pub fn render_prometheus_config(
    targets: &[Target],
    options: &RenderOptions,
) -> Result<String, serde_yaml::Error> {
    let targets = oldest_first(targets, |t| t.created_at);
    let mut scrape_configs = Vec::with_capacity(targets.len() + 1);
    if let Some(self_target) = options.self_scrape.as_deref() {
        if !targets.iter().any(|t| t.job_name == SELF_SCRAPE_JOB) {
            scrape_configs.push(ScrapeConfig {
                job_name: SELF_SCRAPE_JOB,
                scrape_interval: None,
                metrics_path: None,
                relabel_configs: Vec::new(),
                static_configs: vec![StaticConfig { targets: vec![self_target] }],
                metric_relabel_configs: Vec::new(),
            });
        }
    }
    scrape_configs.extend(targets.into_iter().map(ScrapeConfig::from));

    let alerting = (!options.alertmanagers.is_empty()).then(|| Alerting {
        alertmanagers: vec![StaticConfigs {
            static_configs: vec![StaticConfig {
                targets: options.alertmanagers.iter().map(String::as_str).collect(),
            }],
        }],
    });

    serde_yaml::to_string(&PrometheusFile {
        global: Global {
            scrape_interval: &options.scrape_interval,
            evaluation_interval: &options.evaluation_interval,
        },
        alerting,
        rule_files: vec![options.rule_file.as_str()],
        scrape_configs,
    })
}

/// No stored rules renders `groups: []`, which Prometheus loads as empty.
pub fn render_alert_rules(rules: &[AlertRule]) -> Result<String, serde_yaml::Error> {
    let rules = oldest_first(rules, |r| r.created_at);
    let groups = if rules.is_empty() {
        Vec::new()
    } else {
        vec![AlertGroup {
            name: ALERT_GROUP_NAME,
            rules: rules
                .into_iter()
                .map(|rule| AlertingRule {
                    alert: &rule.alert_name,
                    expr: &rule.expr,
                    for_duration: Some(rule.for_duration.as_str()).filter(|d| !d.trim().is_empty()),
                    labels: Some(&rule.labels).filter(|m| !m.is_empty()),
                    annotations: Some(&rule.annotations).filter(|m| !m.is_empty()),
                })
                .collect(),
        }]
    };
    serde_yaml::to_string(&AlertsFile { groups })
}

pub fn render_config(
    targets: &[Target],
    rules: &[AlertRule],
    options: &RenderOptions,
) -> Result<RenderedConfig, serde_yaml::Error> {
    Ok(RenderedConfig {
        prometheus_yml: render_prometheus_config(targets, options)?,
        alerts_yml: render_alert_rules(rules)?,
    })
}
