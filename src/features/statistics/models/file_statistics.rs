use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Aggregate counters for an owned file
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct FileStatistics {
    pub file_id: Uuid,
    pub download_count: i64,
    pub unique_downloaders: i64,
    pub last_downloaded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileStatistics {
    pub fn new(file_id: Uuid, at: DateTime<Utc>) -> Self {
        Self {
            file_id,
            download_count: 0,
            unique_downloaders: 0,
            last_downloaded_at: None,
            created_at: at,
            updated_at: at,
        }
    }
}
