use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::features::files::models::UserSummary;

/// One finished (or abandoned) download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadHistory {
    pub id: Uuid,
    pub file_id: Uuid,
    pub downloader_id: Option<Uuid>,
    pub downloader: Option<UserSummary>,
    pub downloaded_at: DateTime<Utc>,
    pub download_completed: bool,
}

#[derive(Debug, FromRow)]
pub struct DownloadHistoryRow {
    pub id: Uuid,
    pub file_id: Uuid,
    pub downloader_id: Option<Uuid>,
    pub downloader_username: Option<String>,
    pub downloader_email: Option<String>,
    pub downloaded_at: DateTime<Utc>,
    pub download_completed: bool,
}

impl From<DownloadHistoryRow> for DownloadHistory {
    fn from(row: DownloadHistoryRow) -> Self {
        let downloader = match (row.downloader_id, row.downloader_username, row.downloader_email) {
            (Some(id), Some(username), Some(email)) => Some(UserSummary {
                id,
                username,
                email,
            }),
            _ => None,
        };

        Self {
            id: row.id,
            file_id: row.file_id,
            downloader_id: row.downloader_id,
            downloader,
            downloaded_at: row.downloaded_at,
            download_completed: row.download_completed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewDownloadHistory {
    pub file_id: Uuid,
    pub downloader: Option<UserSummary>,
    pub downloaded_at: DateTime<Utc>,
    pub download_completed: bool,
}
