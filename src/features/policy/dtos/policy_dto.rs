use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::features::policy::models::SystemPolicy;

/// Response DTO for the upload policy
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PolicyResponseDto {
    pub max_file_size_mb: i32,
    pub min_validity_hours: i32,
    pub max_validity_days: i32,
    pub default_validity_days: i32,
    pub require_password_min_length: i32,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<SystemPolicy> for PolicyResponseDto {
    fn from(policy: SystemPolicy) -> Self {
        Self {
            max_file_size_mb: policy.max_file_size_mb,
            min_validity_hours: policy.min_validity_hours,
            max_validity_days: policy.max_validity_days,
            default_validity_days: policy.default_validity_days,
            require_password_min_length: policy.require_password_min_length,
            updated_at: policy.updated_at,
        }
    }
}

/// Partial policy update; absent fields keep their current value
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePolicyDto {
    #[validate(range(min = 1, message = "maxFileSizeMb must be at least 1"))]
    pub max_file_size_mb: Option<i32>,

    #[validate(range(min = 1, message = "minValidityHours must be at least 1"))]
    pub min_validity_hours: Option<i32>,

    #[validate(range(min = 1, message = "maxValidityDays must be at least 1"))]
    pub max_validity_days: Option<i32>,

    #[validate(range(min = 1, message = "defaultValidityDays must be at least 1"))]
    pub default_validity_days: Option<i32>,

    #[validate(range(min = 4, message = "requirePasswordMinLength must be at least 4"))]
    pub require_password_min_length: Option<i32>,
}

impl UpdatePolicyDto {
    pub fn is_empty(&self) -> bool {
        self.max_file_size_mb.is_none()
            && self.min_validity_hours.is_none()
            && self.max_validity_days.is_none()
            && self.default_validity_days.is_none()
            && self.require_password_min_length.is_none()
    }

    /// Overlay the provided fields on `current`
    pub fn apply_to(&self, current: SystemPolicy) -> SystemPolicy {
        SystemPolicy {
            max_file_size_mb: self.max_file_size_mb.unwrap_or(current.max_file_size_mb),
            min_validity_hours: self.min_validity_hours.unwrap_or(current.min_validity_hours),
            max_validity_days: self.max_validity_days.unwrap_or(current.max_validity_days),
            default_validity_days: self
                .default_validity_days
                .unwrap_or(current.default_validity_days),
            require_password_min_length: self
                .require_password_min_length
                .unwrap_or(current.require_password_min_length),
            updated_at: current.updated_at,
        }
    }
}
