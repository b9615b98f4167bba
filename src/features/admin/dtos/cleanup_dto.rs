use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::features::admin::services::CleanupReport;

/// Outcome of one cleanup sweep
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CleanupResponseDto {
    /// Expired files found by the sweep
    pub files_found: usize,
    /// Files whose blob and metadata were both removed
    pub files_deleted: usize,
}

impl From<CleanupReport> for CleanupResponseDto {
    fn from(report: CleanupReport) -> Self {
        Self {
            files_found: report.files_found,
            files_deleted: report.files_deleted,
        }
    }
}
