use chrono::Utc;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::core::error::{AppError, Result};
use crate::features::files::repositories::FileRepository;
use crate::modules::storage::BlobStore;

type SweepLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupReport {
    pub files_found: usize,
    pub files_deleted: usize,
}

/// Deletes expired files, blob first and metadata second
pub struct CleanupService {
    files: Arc<dyn FileRepository>,
    blobs: Arc<dyn BlobStore>,
    limiter: SweepLimiter,
}

impl CleanupService {
    /// `quota` sweeps per `window`, replenished evenly
    pub fn new(
        files: Arc<dyn FileRepository>,
        blobs: Arc<dyn BlobStore>,
        quota: u32,
        window: Duration,
    ) -> Self {
        let burst = NonZeroU32::new(quota).unwrap_or(NonZeroU32::MIN);
        let period = (window / burst.get()).max(Duration::from_millis(1));
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_minute(burst))
            .allow_burst(burst);

        Self {
            files,
            blobs,
            limiter: RateLimiter::direct(quota),
        }
    }

    pub async fn run(&self) -> Result<CleanupReport> {
        if self.limiter.check().is_err() {
            return Err(AppError::RateLimitExceeded(
                "Cleanup was triggered too often; try again later".to_string(),
            ));
        }

        let expired = self.files.list_expired(Utc::now()).await?;
        let mut report = CleanupReport {
            files_found: expired.len(),
            files_deleted: 0,
        };

        for file in &expired {
            if let Err(e) = self.blobs.delete(&file.storage_path, file.container()).await {
                warn!("Skipping expired file {}: blob delete failed: {}", file.id, e);
                continue;
            }

            match self.files.delete(file.id).await {
                Ok(()) => report.files_deleted += 1,
                Err(AppError::NotFound(_)) => {
                    info!("Expired file {} was already removed", file.id);
                }
                Err(e) => warn!("Failed to delete expired file {}: {}", file.id, e),
            }
        }

        info!(
            files_found = report.files_found,
            files_deleted = report.files_deleted,
            "Expired file cleanup finished"
        );
        Ok(report)
    }
}
