use std::sync::Arc;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::files::models::File;
use crate::features::files::repositories::FileRepository;
use crate::features::files::services::access_control::authorize_management;
use crate::features::statistics::models::{DownloadHistory, FileStatistics};
use crate::features::statistics::repositories::StatisticsRepository;
use crate::shared::types::Page;

/// Read side of download accounting, restricted to owners and admins
pub struct StatisticsService {
    files: Arc<dyn FileRepository>,
    statistics: Arc<dyn StatisticsRepository>,
}

impl StatisticsService {
    pub fn new(files: Arc<dyn FileRepository>, statistics: Arc<dyn StatisticsRepository>) -> Self {
        Self { files, statistics }
    }

    pub async fn get_stats(
        &self,
        file_id: Uuid,
        requester: &AuthenticatedUser,
    ) -> Result<(File, FileStatistics)> {
        let file = self.files.get_by_id(file_id).await?;
        authorize_management(&file, Some(requester))?;

        if file.is_anonymous() {
            return Err(AppError::NotFound(
                "Statistics are not tracked for anonymous uploads".to_string(),
            ));
        }

        let stats = self
            .statistics
            .get_statistics(file_id)
            .await?
            .ok_or_else(|| AppError::NotFound("File statistics not found".to_string()))?;

        Ok((file, stats))
    }

    pub async fn get_history(
        &self,
        file_id: Uuid,
        requester: &AuthenticatedUser,
        page: &Page,
    ) -> Result<(Vec<DownloadHistory>, i64)> {
        let file = self.files.get_by_id(file_id).await?;
        authorize_management(&file, Some(requester))?;

        self.statistics
            .list_history(file_id, page.limit, page.offset())
            .await
    }
}
