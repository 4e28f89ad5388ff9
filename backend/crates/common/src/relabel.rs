use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_REGEX: &str = "(.*)";
pub const DEFAULT_REPLACEMENT: &str = "${1}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RelabelAction {
    #[default]
    Replace,
    Keep,
    Drop,
    Hashmod,
    Labelmap,
    Labeldrop,
    Labelkeep,
}

impl RelabelAction {
    pub const ALL: [RelabelAction; 7] = [
        RelabelAction::Replace,
        RelabelAction::Keep,
        RelabelAction::Drop,
        RelabelAction::Hashmod,
        RelabelAction::Labelmap,
        RelabelAction::Labeldrop,
        RelabelAction::Labelkeep,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RelabelAction::Replace => "replace",
            RelabelAction::Keep => "keep",
            RelabelAction::Drop => "drop",
            RelabelAction::Hashmod => "hashmod",
            RelabelAction::Labelmap => "labelmap",
            RelabelAction::Labeldrop => "labeldrop",
            RelabelAction::Labelkeep => "labelkeep",
        }
    }
}

impl fmt::Display for RelabelAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelabelAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RelabelAction::ALL
            .into_iter()
            .find(|a| a.as_str() == s.trim())
            .ok_or_else(|| format!("unknown relabel action '{s}'"))
    }
}

/// A single label-rewriting instruction attached to a scrape job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RelabelRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_labels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    /// Only meaningful for `hashmod`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modulus: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,
    #[serde(default)]
    pub action: RelabelAction,
}

impl RelabelRule {
    /// The rule a form starts out with when the user clicks "add rule".
    pub fn template() -> Self {
        Self {
            source_labels: Some(Vec::new()),
            target_label: Some(String::new()),
            regex: Some(DEFAULT_REGEX.to_string()),
            replacement: Some(DEFAULT_REPLACEMENT.to_string()),
            action: RelabelAction::Replace,
            ..Default::default()
        }
    }

    pub fn effective_regex(&self) -> &str {
        self.regex
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_REGEX)
    }

    pub fn effective_replacement(&self) -> &str {
        self.replacement
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_REPLACEMENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_parses_every_variant() {
        for action in RelabelAction::ALL {
            assert_eq!(action.as_str().parse::<RelabelAction>().unwrap(), action);
        }
        assert!("rewrite".parse::<RelabelAction>().is_err());
    }

    #[test]
    fn missing_action_defaults_to_replace() {
        let rule: RelabelRule = serde_json::from_str(r#"{"target_label":"instance"}"#).unwrap();
        assert_eq!(rule.action, RelabelAction::Replace);
        assert_eq!(rule.effective_regex(), "(.*)");
        assert_eq!(rule.effective_replacement(), "${1}");
    }

    #[test]
    fn unset_fields_are_omitted_on_the_wire() {
        let rule = RelabelRule {
            action: RelabelAction::Labeldrop,
            regex: Some("tmp_.*".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json, serde_json::json!({"regex": "tmp_.*", "action": "labeldrop"}));
    }
}
