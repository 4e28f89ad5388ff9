use promeconfig_common::{AiSettings, AiSettingsInput, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiSettingsForm {
    pub provider: String,
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// Raw text, parsed on submit.
    pub temperature: String,
}

impl Default for AiSettingsForm {
    fn default() -> Self {
        let defaults = AiSettingsInput::default();
        Self {
            provider: defaults.provider,
            api_key: String::new(),
            base_url: String::new(),
            model: defaults.model,
            temperature: defaults.temperature.to_string(),
        }
    }
}

fn optional(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

impl AiSettingsForm {
    pub fn from_settings(settings: &AiSettings) -> Self {
        Self {
            provider: settings.provider.clone(),
            api_key: settings.api_key.clone().unwrap_or_default(),
            base_url: settings.base_url.clone().unwrap_or_default(),
            model: settings.model.clone(),
            temperature: settings.temperature.to_string(),
        }
    }

    pub fn to_input(&self) -> Result<AiSettingsInput, ValidationError> {
        let temperature = self.temperature.trim().parse::<f64>().map_err(|_| {
            ValidationError::Invalid(format!("temperature '{}' is not a number", self.temperature.trim()))
        })?;
        let input = AiSettingsInput {
            provider: self.provider.trim().to_string(),
            api_key: optional(&self.api_key),
            base_url: optional(&self.base_url),
            model: self.model.trim().to_string(),
            temperature,
        };
        input.validate()?;
        Ok(input)
    }
}

/// Shows the first four characters of a key and masks the rest.
pub fn mask_api_key(key: &str) -> String {
    let visible: String = key.chars().take(4).collect();
    if key.chars().count() <= 4 {
        "*".repeat(key.chars().count())
    } else {
        format!("{visible}{}", "*".repeat(8))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_stored_defaults() {
        let input = AiSettingsForm::default().to_input().unwrap();
        assert_eq!(input, AiSettingsInput::default());
    }

    #[test]
    fn temperature_must_parse_and_stay_in_range() {
        let mut form = AiSettingsForm { temperature: "warm".into(), ..Default::default() };
        assert!(matches!(form.to_input(), Err(ValidationError::Invalid(_))));
        form.temperature = "2.1".into();
        assert_eq!(form.to_input(), Err(ValidationError::InvalidTemperature(2.1)));
        form.temperature = "0".into();
        form.base_url = "  ".into();
        let input = form.to_input().unwrap();
        assert_eq!(input.base_url, None);
    }

    #[test]
    fn api_keys_are_masked() {
        assert_eq!(mask_api_key("sk-abcdef123"), "sk-a********");
        assert_eq!(mask_api_key("abc"), "***");
    }
}
