use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::files::repositories::upsert_user;
use crate::features::statistics::models::{
    DownloadHistory, DownloadHistoryRow, FileStatistics, NewDownloadHistory,
};

/// Download history and aggregate counters
///
/// Counter updates are relative (`x = x + 1`) so concurrent writers never lose increments.
#[async_trait]
pub trait StatisticsRepository: Send + Sync {
    async fn get_statistics(&self, file_id: Uuid) -> Result<Option<FileStatistics>>;

    async fn record_download(&self, entry: &NewDownloadHistory) -> Result<DownloadHistory>;

    async fn increment_download_count(&self, file_id: Uuid, at: DateTime<Utc>) -> Result<()>;

    async fn count_completed_downloads(&self, file_id: Uuid, downloader_id: Uuid) -> Result<i64>;

    async fn increment_unique_downloaders(&self, file_id: Uuid) -> Result<()>;

    /// Newest first, with the total row count
    async fn list_history(
        &self,
        file_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<DownloadHistory>, i64)>;
}

pub struct PgStatisticsRepository {
    pool: PgPool,
}

impl PgStatisticsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatisticsRepository for PgStatisticsRepository {
    async fn get_statistics(&self, file_id: Uuid) -> Result<Option<FileStatistics>> {
        sqlx::query_as::<_, FileStatistics>(
            r#"
            SELECT file_id, download_count, unique_downloaders, last_downloaded_at,
                   created_at, updated_at
            FROM file_statistics
            WHERE file_id = $1
            "#,
        )
        .bind(file_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch statistics for {}: {:?}", file_id, e);
            AppError::Database(e)
        })
    }

    async fn record_download(&self, entry: &NewDownloadHistory) -> Result<DownloadHistory> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            tracing::error!("Failed to begin transaction: {:?}", e);
            AppError::Database(e)
        })?;

        if let Some(downloader) = &entry.downloader {
            upsert_user(&mut tx, downloader).await?;
        }

        let id = Uuid::now_v7();
        sqlx::query(
            r#"
            INSERT INTO download_history (id, file_id, downloader_id, downloaded_at, download_completed)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(id)
        .bind(entry.file_id)
        .bind(entry.downloader.as_ref().map(|d| d.id))
        .bind(entry.downloaded_at)
        .bind(entry.download_completed)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to record download of {}: {:?}", entry.file_id, e);
            AppError::Database(e)
        })?;

        tx.commit().await.map_err(|e| {
            tracing::error!("Failed to commit download record: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(DownloadHistory {
            id,
            file_id: entry.file_id,
            downloader_id: entry.downloader.as_ref().map(|d| d.id),
            downloader: entry.downloader.clone(),
            downloaded_at: entry.downloaded_at,
            download_completed: entry.download_completed,
        })
    }

    async fn increment_download_count(&self, file_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE file_statistics
            SET download_count = download_count + 1,
                last_downloaded_at = GREATEST(COALESCE(last_downloaded_at, $2), $2),
                updated_at = NOW()
            WHERE file_id = $1
            "#,
        )
        .bind(file_id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to increment download count for {}: {:?}", file_id, e);
            AppError::Database(e)
        })?;

        Ok(())
    }

    async fn count_completed_downloads(&self, file_id: Uuid, downloader_id: Uuid) -> Result<i64> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM download_history
            WHERE file_id = $1 AND downloader_id = $2 AND download_completed
            "#,
        )
        .bind(file_id)
        .bind(downloader_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to count downloads for {}: {:?}", file_id, e);
            AppError::Database(e)
        })
    }

    async fn increment_unique_downloaders(&self, file_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE file_statistics
            SET unique_downloaders = unique_downloaders + 1,
                updated_at = NOW()
            WHERE file_id = $1
            "#,
        )
        .bind(file_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to increment unique downloaders for {}: {:?}", file_id, e);
            AppError::Database(e)
        })?;

        Ok(())
    }

    async fn list_history(
        &self,
        file_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<DownloadHistory>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM download_history WHERE file_id = $1")
            .bind(file_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to count history for {}: {:?}", file_id, e);
                AppError::Database(e)
            })?;

        let rows = sqlx::query_as::<_, DownloadHistoryRow>(
            r#"
            SELECT h.id, h.file_id, h.downloader_id,
                   u.username AS downloader_username, u.email AS downloader_email,
                   h.downloaded_at, h.download_completed
            FROM download_history h
            LEFT JOIN users u ON u.id = h.downloader_id
            WHERE h.file_id = $1
            ORDER BY h.downloaded_at DESC, h.id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(file_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list history for {}: {:?}", file_id, e);
            AppError::Database(e)
        })?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }
}
