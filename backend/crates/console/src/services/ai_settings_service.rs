use promeconfig_common::{AiSettings, AiSettingsInput, AiSettingsPatch};
use std::sync::Arc;

use crate::backend::Backend;
use crate::error::{ConsoleError, Result};

#[derive(Clone)]
pub struct AiSettingsService {
    backend: Arc<dyn Backend>,
}

impl AiSettingsService {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// `None` when the user has not saved settings yet. Every other failure
    /// propagates.
    pub async fn get(&self) -> Result<Option<AiSettings>> {
        match self.backend.get_ai_settings().await {
            Ok(settings) => Ok(Some(settings)),
            Err(ConsoleError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Saving twice keeps a single record.
    pub async fn save(&self, input: AiSettingsInput) -> Result<AiSettings> {
        input.validate()?;
        self.backend.save_ai_settings(&input).await
    }

    pub async fn update(&self, id: &str, patch: AiSettingsPatch) -> Result<AiSettings> {
        patch.validate()?;
        self.backend.update_ai_settings(id, &patch).await
    }

    pub async fn delete(&self) -> Result<()> {
        self.backend.delete_ai_settings().await
    }
}
