use promeconfig_common::{NewTarget, Target, TargetPatch};
use std::sync::Arc;

use crate::backend::Backend;
use crate::error::Result;

/// Validates locally, then delegates to the backend. The owner is never
/// supplied by the caller.
#[derive(Clone)]
pub struct TargetService {
    backend: Arc<dyn Backend>,
}

impl TargetService {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub async fn list(&self) -> Result<Vec<Target>> {
        self.backend.list_targets().await
    }

    pub async fn create(&self, target: NewTarget) -> Result<Target> {
        target.validate()?;
        self.backend.create_target(&target).await
    }

    pub async fn update(&self, id: &str, patch: TargetPatch) -> Result<Target> {
        patch.validate()?;
        self.backend.update_target(id, &patch).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.backend.delete_target(id).await
    }
}
