use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::features::files::models::{File, UserSummary};
use crate::features::statistics::models::{DownloadHistory, FileStatistics};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileStatisticsDto {
    pub file_id: Uuid,
    pub file_name: String,
    pub download_count: i64,
    pub unique_downloaders: i64,
    pub last_downloaded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileStatisticsDto {
    pub fn new(file: &File, stats: FileStatistics) -> Self {
        Self {
            file_id: stats.file_id,
            file_name: file.file_name.clone(),
            download_count: stats.download_count,
            unique_downloaders: stats.unique_downloaders,
            last_downloaded_at: stats.last_downloaded_at,
            created_at: stats.created_at,
            updated_at: stats.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DownloadHistoryDto {
    pub id: Uuid,
    pub downloaded_at: DateTime<Utc>,
    pub download_completed: bool,
    /// Absent for anonymous downloads
    pub downloader: Option<UserSummary>,
}

impl From<DownloadHistory> for DownloadHistoryDto {
    fn from(entry: DownloadHistory) -> Self {
        Self {
            id: entry.id,
            downloaded_at: entry.downloaded_at,
            download_completed: entry.download_completed,
            downloader: entry.downloader,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct HistoryQueryDto {
    /// Page number (1-indexed)
    pub page: Option<i64>,
    /// Items per page (max 100, default 50)
    pub limit: Option<i64>,
}
