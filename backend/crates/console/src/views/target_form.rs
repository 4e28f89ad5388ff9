use promeconfig_common::relabel::{DEFAULT_REGEX, DEFAULT_REPLACEMENT};
use promeconfig_common::validation::split_csv;
use promeconfig_common::{
    NewTarget, RelabelAction, RelabelRule, ScrapeInterval, Target, TargetPatch, ValidationError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelabelList {
    Relabel,
    MetricRelabel,
}

impl RelabelList {
    fn field(self) -> &'static str {
        match self {
            RelabelList::Relabel => "relabel_configs",
            RelabelList::MetricRelabel => "metric_relabel_configs",
        }
    }
}

/// One editable relabel rule. Every field is raw text except the action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelabelRuleForm {
    pub source_labels: String,
    pub separator: String,
    pub target_label: String,
    pub regex: String,
    pub modulus: String,
    pub replacement: String,
    pub action: RelabelAction,
}

impl Default for RelabelRuleForm {
    fn default() -> Self {
        Self {
            source_labels: String::new(),
            separator: String::new(),
            target_label: String::new(),
            regex: DEFAULT_REGEX.to_string(),
            modulus: String::new(),
            replacement: DEFAULT_REPLACEMENT.to_string(),
            action: RelabelAction::Replace,
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

impl RelabelRuleForm {
    pub fn from_rule(rule: &RelabelRule) -> Self {
        Self {
            source_labels: rule.source_labels.as_deref().unwrap_or_default().join(", "),
            separator: rule.separator.clone().unwrap_or_default(),
            target_label: rule.target_label.clone().unwrap_or_default(),
            regex: rule.regex.clone().unwrap_or_default(),
            modulus: rule.modulus.map(|m| m.to_string()).unwrap_or_default(),
            replacement: rule.replacement.clone().unwrap_or_default(),
            action: rule.action,
        }
    }

    fn to_rule(&self, list: RelabelList, index: usize) -> Result<RelabelRule, ValidationError> {
        let source_labels = split_csv(&self.source_labels);
        let modulus = match self.modulus.trim() {
            "" => None,
            raw => Some(raw.parse::<u64>().map_err(|_| {
                ValidationError::Invalid(format!("{}[{index}]: modulus '{raw}' is not a number", list.field()))
            })?),
        };
        Ok(RelabelRule {
            source_labels: (!source_labels.is_empty()).then_some(source_labels),
            // The separator may legitimately be whitespace.
            separator: (!self.separator.is_empty()).then(|| self.separator.clone()),
            target_label: non_empty(&self.target_label),
            regex: non_empty(&self.regex),
            modulus,
            replacement: (!self.replacement.is_empty()).then(|| self.replacement.clone()),
            action: self.action,
        })
    }
}

/// Create/edit form for a scrape job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetForm {
    pub job_name: String,
    /// Comma-separated `host:port` list as typed.
    pub targets: String,
    pub scrape_interval: ScrapeInterval,
    pub metrics_path: String,
    pub relabel_configs: Vec<RelabelRuleForm>,
    pub metric_relabel_configs: Vec<RelabelRuleForm>,
    editing: Option<String>,
}

impl Default for TargetForm {
    fn default() -> Self {
        Self {
            job_name: String::new(),
            targets: String::new(),
            scrape_interval: ScrapeInterval::default(),
            metrics_path: promeconfig_common::models::DEFAULT_METRICS_PATH.to_string(),
            relabel_configs: Vec::new(),
            metric_relabel_configs: Vec::new(),
            editing: None,
        }
    }
}

impl TargetForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-fills the form from a stored target for editing.
    pub fn from_target(target: &Target) -> Self {
        let rules = |rules: &Option<Vec<RelabelRule>>| -> Vec<RelabelRuleForm> {
            rules.iter().flatten().map(RelabelRuleForm::from_rule).collect()
        };
        Self {
            job_name: target.job_name.clone(),
            targets: target.targets.join(", "),
            scrape_interval: target.scrape_interval,
            metrics_path: target.metrics_path.clone(),
            relabel_configs: rules(&target.relabel_configs),
            metric_relabel_configs: rules(&target.metric_relabel_configs),
            editing: Some(target.id.clone()),
        }
    }

    pub fn editing_id(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    pub fn rules(&self, list: RelabelList) -> &[RelabelRuleForm] {
        match list {
            RelabelList::Relabel => &self.relabel_configs,
            RelabelList::MetricRelabel => &self.metric_relabel_configs,
        }
    }

    pub fn rules_mut(&mut self, list: RelabelList) -> &mut Vec<RelabelRuleForm> {
        match list {
            RelabelList::Relabel => &mut self.relabel_configs,
            RelabelList::MetricRelabel => &mut self.metric_relabel_configs,
        }
    }

    /// Appends a fresh `replace` rule and returns it for editing.
    pub fn add_rule(&mut self, list: RelabelList) -> &mut RelabelRuleForm {
        let rules = self.rules_mut(list);
        rules.push(RelabelRuleForm::default());
        let last = rules.len() - 1;
        &mut rules[last]
    }

    pub fn remove_rule(&mut self, list: RelabelList, index: usize) -> Option<RelabelRuleForm> {
        let rules = self.rules_mut(list);
        (index < rules.len()).then(|| rules.remove(index))
    }

    fn collect_rules(&self, list: RelabelList) -> Result<Option<Vec<RelabelRule>>, ValidationError> {
        let rules = self
            .rules(list)
            .iter()
            .enumerate()
            .map(|(i, r)| r.to_rule(list, i))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((!rules.is_empty()).then_some(rules))
    }

    pub fn to_new_target(&self) -> Result<NewTarget, ValidationError> {
        let target = NewTarget {
            job_name: self.job_name.trim().to_string(),
            targets: split_csv(&self.targets),
            scrape_interval: self.scrape_interval,
            metrics_path: self.metrics_path.trim().to_string(),
            relabel_configs: self.collect_rules(RelabelList::Relabel)?,
            metric_relabel_configs: self.collect_rules(RelabelList::MetricRelabel)?,
        };
        target.validate()?;
        Ok(target)
    }

    /// A full replacement patch for edit mode. Emptied rule lists are sent as
    /// empty arrays so the stored ones are cleared.
    pub fn to_patch(&self) -> Result<TargetPatch, ValidationError> {
        let target = self.to_new_target()?;
        let mut patch = TargetPatch::from(target);
        patch.relabel_configs.get_or_insert_with(Vec::new);
        patch.metric_relabel_configs.get_or_insert_with(Vec::new);
        Ok(patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn builds_payload_from_comma_separated_targets() {
        let form = TargetForm {
            job_name: "node-exporter".into(),
            targets: "localhost:9100, localhost:9090".into(),
            ..TargetForm::new()
        };
        let target = form.to_new_target().unwrap();
        assert_eq!(target.targets, vec!["localhost:9100", "localhost:9090"]);
        assert_eq!(target.scrape_interval.as_str(), "15s");
        assert_eq!(target.metrics_path, "/metrics");
        assert!(target.relabel_configs.is_none());
    }

    #[test]
    fn new_rule_starts_from_replace_template() {
        let mut form = TargetForm::new();
        let rule = form.add_rule(RelabelList::Relabel);
        assert_eq!(rule.action, RelabelAction::Replace);
        assert_eq!(rule.regex, "(.*)");
        assert_eq!(rule.replacement, "${1}");

        rule.source_labels = "__address__, ,job".into();
        rule.target_label = "instance".into();
        form.job_name = "node".into();
        form.targets = "localhost:9100".into();

        let target = form.to_new_target().unwrap();
        let rules = target.relabel_configs.unwrap();
        assert_eq!(rules[0].source_labels, Some(vec!["__address__".to_string(), "job".to_string()]));
        assert_eq!(rules[0].target_label.as_deref(), Some("instance"));
    }

    #[test]
    fn hashmod_needs_a_numeric_modulus() {
        let mut form = TargetForm {
            job_name: "sharded".into(),
            targets: "localhost:9100".into(),
            ..TargetForm::new()
        };
        let rule = form.add_rule(RelabelList::MetricRelabel);
        rule.action = RelabelAction::Hashmod;
        assert!(matches!(form.to_new_target(), Err(ValidationError::MissingModulus { .. })));

        form.rules_mut(RelabelList::MetricRelabel)[0].modulus = "four".into();
        assert!(matches!(form.to_new_target(), Err(ValidationError::Invalid(_))));

        form.rules_mut(RelabelList::MetricRelabel)[0].modulus = "4".into();
        assert!(form.to_new_target().is_ok());
    }

    #[test]
    fn edit_mode_round_trips_a_target() {
        let now = Utc::now();
        let stored = Target {
            id: "t-1".into(),
            user_id: "u-1".into(),
            job_name: "node".into(),
            targets: vec!["a:1".into(), "b:2".into()],
            scrape_interval: ScrapeInterval::OneMinute,
            metrics_path: "/snmp".into(),
            relabel_configs: Some(vec![RelabelRule::template()]),
            metric_relabel_configs: None,
            created_at: now,
            updated_at: now,
        };
        let mut form = TargetForm::from_target(&stored);
        assert_eq!(form.editing_id(), Some("t-1"));
        assert_eq!(form.targets, "a:1, b:2");
        assert_eq!(form.relabel_configs.len(), 1);

        assert!(form.remove_rule(RelabelList::Relabel, 0).is_some());
        assert!(form.remove_rule(RelabelList::Relabel, 0).is_none());
        let patch = form.to_patch().unwrap();
        assert_eq!(patch.relabel_configs, Some(vec![]));
        assert_eq!(patch.scrape_interval, Some(ScrapeInterval::OneMinute));
    }
}
