use promeconfig_common::{AlertRule, ScrapeInterval, Target};
use std::collections::BTreeMap;
use std::fmt;

/// Summary numbers derived from the loaded collections.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DashboardStats {
    pub target_count: usize,
    pub alert_rule_count: usize,
    /// Sum of `host:port` entries across all jobs.
    pub endpoint_count: usize,
    pub jobs_by_interval: BTreeMap<ScrapeInterval, usize>,
    pub jobs_with_relabeling: usize,
    pub relabel_rule_count: usize,
    pub rules_by_severity: BTreeMap<String, usize>,
}

impl DashboardStats {
    pub fn compute(targets: &[Target], alert_rules: &[AlertRule]) -> Self {
        let mut stats = DashboardStats {
            target_count: targets.len(),
            alert_rule_count: alert_rules.len(),
            ..Default::default()
        };
        for target in targets {
            stats.endpoint_count += target.targets.len();
            *stats.jobs_by_interval.entry(target.scrape_interval).or_default() += 1;

            let rules = target.relabel_configs.as_ref().map_or(0, Vec::len)
                + target.metric_relabel_configs.as_ref().map_or(0, Vec::len);
            if rules > 0 {
                stats.jobs_with_relabeling += 1;
                stats.relabel_rule_count += rules;
            }
        }
        for rule in alert_rules {
            let severity = rule.labels.get("severity").cloned().unwrap_or_else(|| "none".to_string());
            *stats.rules_by_severity.entry(severity).or_default() += 1;
        }
        stats
    }
}

impl fmt::Display for DashboardStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Scrape targets : {} jobs, {} endpoints", self.target_count, self.endpoint_count)?;
        writeln!(f, "Alert rules    : {}", self.alert_rule_count)?;
        writeln!(
            f,
            "Relabeling     : {} rules across {} jobs",
            self.relabel_rule_count, self.jobs_with_relabeling
        )?;
        if !self.jobs_by_interval.is_empty() {
            let intervals: Vec<String> = self
                .jobs_by_interval
                .iter()
                .map(|(interval, n)| format!("{interval}={n}"))
                .collect();
            writeln!(f, "Intervals      : {}", intervals.join(" "))?;
        }
        if !self.rules_by_severity.is_empty() {
            let severities: Vec<String> = self
                .rules_by_severity
                .iter()
                .map(|(severity, n)| format!("{severity}={n}"))
                .collect();
            writeln!(f, "Severities     : {}", severities.join(" "))?;
        }
        Ok(())
    }
}
