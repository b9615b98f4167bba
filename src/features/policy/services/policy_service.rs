use std::sync::Arc;

use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::features::policy::dtos::UpdatePolicyDto;
use crate::features::policy::models::SystemPolicy;
use crate::features::policy::repositories::PolicyStore;

/// Reads and updates the upload policy
pub struct PolicyService {
    store: Arc<dyn PolicyStore>,
}

impl PolicyService {
    pub fn new(store: Arc<dyn PolicyStore>) -> Self {
        Self { store }
    }

    /// Effective policy; defaults when nothing is stored
    pub async fn get_policy(&self) -> Result<SystemPolicy> {
        let policy = self.store.get().await?.unwrap_or_default();
        Ok(policy.normalized())
    }

    pub async fn update_policy(&self, dto: UpdatePolicyDto) -> Result<SystemPolicy> {
        dto.validate()
            .map_err(|e| AppError::Validation(format!("Invalid request: {}", e)))?;

        if dto.is_empty() {
            return Err(AppError::Validation(
                "At least one policy field must be provided".to_string(),
            ));
        }

        let current = self.get_policy().await?;
        let merged = dto.apply_to(current);
        merged.validate().map_err(AppError::Validation)?;

        let updated = self.store.put(&merged).await?;

        tracing::info!(
            max_file_size_mb = updated.max_file_size_mb,
            min_validity_hours = updated.min_validity_hours,
            max_validity_days = updated.max_validity_days,
            default_validity_days = updated.default_validity_days,
            require_password_min_length = updated.require_password_min_length,
            "System policy updated"
        );

        Ok(updated)
    }
}
