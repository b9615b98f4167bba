//! In-memory fakes and fixtures shared by unit and handler tests.

use async_trait::async_trait;
use axum::{extract::Request, middleware::Next, Router};
use base64::prelude::*;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use fake::faker::internet::en::{SafeEmail, Username};
use fake::Fake;
use futures::{stream, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::files::models::{
    File, FileSortBy, FileStatus, NewFile, OwnedFilesQuery, SortOrder, StatusSummary, UserSummary,
};
use crate::features::files::repositories::FileRepository;
use crate::features::policy::models::SystemPolicy;
use crate::features::policy::repositories::PolicyStore;
use crate::features::statistics::models::{DownloadHistory, FileStatistics, NewDownloadHistory};
use crate::features::statistics::repositories::StatisticsRepository;
use crate::modules::storage::{validate_object_name, BlobDownload, BlobStore, Container, StorageError};
use crate::shared::constants::{ROLE_ADMIN, ROLE_USER};

// =============================================================================
// FIXTURES
// =============================================================================

fn fake_user(role: &str) -> AuthenticatedUser {
    let user_id = Uuid::new_v4();
    let tag = &user_id.simple().to_string()[..8];
    let email: String = SafeEmail().fake();
    let username: String = Username().fake();

    AuthenticatedUser {
        user_id,
        email: format!("{}.{}", tag, email),
        username: format!("{}_{}", username, tag),
        role: role.to_string(),
    }
}

/// A fresh user with a unique id and email
pub fn regular_user() -> AuthenticatedUser {
    fake_user(ROLE_USER)
}

pub fn admin_user() -> AuthenticatedUser {
    fake_user(ROLE_ADMIN)
}

pub fn summary_of(user: &AuthenticatedUser) -> UserSummary {
    UserSummary {
        id: user.user_id,
        username: user.username.clone(),
        email: user.email.clone(),
    }
}

fn share_token() -> String {
    BASE64_URL_SAFE_NO_PAD.encode(Uuid::new_v4().as_bytes())
}

/// Active public file without password or whitelist
pub fn file_fixture(owner: Option<&AuthenticatedUser>) -> File {
    let now = Utc::now();
    let id = Uuid::new_v4();
    File {
        id,
        share_token: share_token(),
        file_name: "notes.txt".to_string(),
        storage_path: format!("{}-notes.txt", id),
        file_size: 5,
        mime_type: Some("text/plain".to_string()),
        owner_id: owner.map(|u| u.user_id),
        is_public: true,
        password_hash: None,
        available_from: Some(now - Duration::hours(1)),
        available_to: Some(now + Duration::days(7)),
        shared_with: vec![],
        owner: owner.map(summary_of),
        created_at: now,
    }
}

/// Insert payload for an active public file
pub fn new_file_fixture(owner: Option<&AuthenticatedUser>) -> NewFile {
    let now = Utc::now();
    let id = Uuid::new_v4();
    NewFile {
        id,
        share_token: share_token(),
        file_name: "notes.txt".to_string(),
        storage_path: format!("{}-notes.txt", id),
        file_size: 5,
        mime_type: Some("text/plain".to_string()),
        owner: owner.map(summary_of),
        is_public: true,
        password_hash: None,
        available_from: Some(now),
        available_to: Some(now + Duration::days(7)),
        shared_with: vec![],
    }
}

// =============================================================================
// ROUTER HELPERS
// =============================================================================

/// Attach a fixed identity to every request, bypassing token validation
pub fn with_user(router: Router, user: AuthenticatedUser) -> Router {
    router.layer(axum::middleware::from_fn(
        move |mut request: Request, next: Next| {
            let user = user.clone();
            async move {
                request.extensions_mut().insert(user);
                next.run(request).await
            }
        },
    ))
}

// =============================================================================
// STATISTICS
// =============================================================================

#[derive(Default)]
struct StatisticsState {
    counters: HashMap<Uuid, FileStatistics>,
    history: Vec<DownloadHistory>,
}

/// Counters and history kept in process memory
#[derive(Default)]
pub struct InMemoryStatistics {
    state: Mutex<StatisticsState>,
}

impl InMemoryStatistics {
    /// Create the zeroed counter row an owned upload would have
    pub fn seed(&self, file_id: Uuid) {
        let mut state = self.state.lock().unwrap();
        state
            .counters
            .entry(file_id)
            .or_insert_with(|| FileStatistics::new(file_id, Utc::now()));
    }

    fn forget(&self, file_id: Uuid) {
        let mut state = self.state.lock().unwrap();
        state.counters.remove(&file_id);
        state.history.retain(|h| h.file_id != file_id);
    }
}

#[async_trait]
impl StatisticsRepository for InMemoryStatistics {
    async fn get_statistics(&self, file_id: Uuid) -> Result<Option<FileStatistics>> {
        Ok(self.state.lock().unwrap().counters.get(&file_id).cloned())
    }

    async fn record_download(&self, entry: &NewDownloadHistory) -> Result<DownloadHistory> {
        let record = DownloadHistory {
            id: Uuid::now_v7(),
            file_id: entry.file_id,
            downloader_id: entry.downloader.as_ref().map(|d| d.id),
            downloader: entry.downloader.clone(),
            downloaded_at: entry.downloaded_at,
            download_completed: entry.download_completed,
        };
        self.state.lock().unwrap().history.push(record.clone());
        Ok(record)
    }

    async fn increment_download_count(&self, file_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(counters) = state.counters.get_mut(&file_id) {
            counters.download_count += 1;
            counters.last_downloaded_at = Some(counters.last_downloaded_at.map_or(at, |t| t.max(at)));
            counters.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn count_completed_downloads(&self, file_id: Uuid, downloader_id: Uuid) -> Result<i64> {
        let state = self.state.lock().unwrap();
        let count = state
            .history
            .iter()
            .filter(|h| {
                h.file_id == file_id && h.download_completed && h.downloader_id == Some(downloader_id)
            })
            .count();
        Ok(count as i64)
    }

    async fn increment_unique_downloaders(&self, file_id: Uuid) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(counters) = state.counters.get_mut(&file_id) {
            counters.unique_downloaders += 1;
            counters.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn list_history(
        &self,
        file_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<DownloadHistory>, i64)> {
        let state = self.state.lock().unwrap();
        let mut rows: Vec<DownloadHistory> = state
            .history
            .iter()
            .filter(|h| h.file_id == file_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.downloaded_at.cmp(&a.downloaded_at));

        let total = rows.len() as i64;
        let page = rows
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }
}

// =============================================================================
// FILE REGISTRY
// =============================================================================

/// File registry and statistics sharing one in-memory state
#[derive(Default)]
pub struct InMemoryStore {
    files: Mutex<Vec<File>>,
    statistics: InMemoryStatistics,
    collisions: AtomicUsize,
}

impl InMemoryStore {
    /// Report a share token conflict for the next `count` creates
    pub fn collide_next(&self, count: usize) {
        self.collisions.store(count, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.files.lock().unwrap().len()
    }

    fn find(&self, matches: impl Fn(&File) -> bool) -> Result<File> {
        self.files
            .lock()
            .unwrap()
            .iter()
            .find(|f| matches(f))
            .cloned()
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))
    }
}

#[async_trait]
impl FileRepository for InMemoryStore {
    async fn create(&self, new_file: &NewFile) -> Result<File> {
        let collided = self
            .collisions
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();

        let file = {
            let mut files = self.files.lock().unwrap();
            if collided || files.iter().any(|f| f.share_token == new_file.share_token) {
                return Err(AppError::Conflict("Share token already in use".to_string()));
            }

            let file = File {
                id: new_file.id,
                share_token: new_file.share_token.clone(),
                file_name: new_file.file_name.clone(),
                storage_path: new_file.storage_path.clone(),
                file_size: new_file.file_size,
                mime_type: new_file.mime_type.clone(),
                owner_id: new_file.owner.as_ref().map(|o| o.id),
                is_public: new_file.is_public,
                password_hash: new_file.password_hash.clone(),
                available_from: new_file.available_from,
                available_to: new_file.available_to,
                shared_with: new_file.shared_with.clone(),
                owner: new_file.owner.clone(),
                created_at: Utc::now(),
            };
            files.push(file.clone());
            file
        };

        if !file.is_anonymous() {
            self.statistics.seed(file.id);
        }
        Ok(file)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<File> {
        self.find(|f| f.id == id)
    }

    async fn get_by_share_token(&self, share_token: &str) -> Result<File> {
        self.find(|f| f.share_token == share_token)
    }

    async fn get_by_owner(
        &self,
        owner_id: Uuid,
        query: &OwnedFilesQuery,
        now: DateTime<Utc>,
    ) -> Result<(Vec<File>, i64)> {
        let mut owned: Vec<File> = self
            .files
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.owner_id == Some(owner_id))
            .filter(|f| query.status.map_or(true, |s| f.status(now) == s))
            .cloned()
            .collect();

        owned.sort_by(|a, b| {
            let ordering = match query.sort_by {
                FileSortBy::CreatedAt => a.created_at.cmp(&b.created_at),
                FileSortBy::FileName => a.file_name.to_lowercase().cmp(&b.file_name.to_lowercase()),
            };
            match query.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let total = owned.len() as i64;
        let page = owned
            .into_iter()
            .skip(query.offset.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn status_summary(&self, owner_id: Uuid, now: DateTime<Utc>) -> Result<StatusSummary> {
        let files = self.files.lock().unwrap();
        let mut summary = StatusSummary::default();
        for file in files.iter().filter(|f| f.owner_id == Some(owner_id)) {
            summary.total += 1;
            match file.status(now) {
                FileStatus::Active => summary.active += 1,
                FileStatus::Pending => summary.pending += 1,
                FileStatus::Expired => summary.expired += 1,
            }
        }
        Ok(summary)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        {
            let mut files = self.files.lock().unwrap();
            let before = files.len();
            files.retain(|f| f.id != id);
            if files.len() == before {
                return Err(AppError::NotFound("File not found".to_string()));
            }
        }
        self.statistics.forget(id);
        Ok(())
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<File>> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.status(now) == FileStatus::Expired)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl StatisticsRepository for InMemoryStore {
    async fn get_statistics(&self, file_id: Uuid) -> Result<Option<FileStatistics>> {
        self.statistics.get_statistics(file_id).await
    }

    async fn record_download(&self, entry: &NewDownloadHistory) -> Result<DownloadHistory> {
        self.statistics.record_download(entry).await
    }

    async fn increment_download_count(&self, file_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        self.statistics.increment_download_count(file_id, at).await
    }

    async fn count_completed_downloads(&self, file_id: Uuid, downloader_id: Uuid) -> Result<i64> {
        self.statistics
            .count_completed_downloads(file_id, downloader_id)
            .await
    }

    async fn increment_unique_downloaders(&self, file_id: Uuid) -> Result<()> {
        self.statistics.increment_unique_downloaders(file_id).await
    }

    async fn list_history(
        &self,
        file_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<DownloadHistory>, i64)> {
        self.statistics.list_history(file_id, limit, offset).await
    }
}

/// Registry whose every call fails, for compensation paths
pub struct FailingFileRepository;

fn unavailable<T>() -> Result<T> {
    Err(AppError::Internal("registry unavailable".to_string()))
}

#[async_trait]
impl FileRepository for FailingFileRepository {
    async fn create(&self, _new_file: &NewFile) -> Result<File> {
        unavailable()
    }

    async fn get_by_id(&self, _id: Uuid) -> Result<File> {
        unavailable()
    }

    async fn get_by_share_token(&self, _share_token: &str) -> Result<File> {
        unavailable()
    }

    async fn get_by_owner(
        &self,
        _owner_id: Uuid,
        _query: &OwnedFilesQuery,
        _now: DateTime<Utc>,
    ) -> Result<(Vec<File>, i64)> {
        unavailable()
    }

    async fn status_summary(&self, _owner_id: Uuid, _now: DateTime<Utc>) -> Result<StatusSummary> {
        unavailable()
    }

    async fn delete(&self, _id: Uuid) -> Result<()> {
        unavailable()
    }

    async fn list_expired(&self, _now: DateTime<Utc>) -> Result<Vec<File>> {
        unavailable()
    }
}

// =============================================================================
// POLICY
// =============================================================================

pub struct InMemoryPolicyStore {
    policy: Mutex<Option<SystemPolicy>>,
}

impl InMemoryPolicyStore {
    /// No row yet, as before the first migration seed
    pub fn empty() -> Self {
        Self {
            policy: Mutex::new(None),
        }
    }

    pub fn with(policy: SystemPolicy) -> Self {
        Self {
            policy: Mutex::new(Some(policy)),
        }
    }
}

#[async_trait]
impl PolicyStore for InMemoryPolicyStore {
    async fn get(&self) -> Result<Option<SystemPolicy>> {
        Ok(self.policy.lock().unwrap().clone())
    }

    async fn put(&self, policy: &SystemPolicy) -> Result<SystemPolicy> {
        let stored = SystemPolicy {
            updated_at: Some(Utc::now()),
            ..policy.clone()
        };
        *self.policy.lock().unwrap() = Some(stored.clone());
        Ok(stored)
    }
}

// =============================================================================
// BLOBS
// =============================================================================

#[derive(Clone)]
struct StoredBlob {
    content_type: String,
    data: Bytes,
}

/// Blob store over a map keyed by container and location
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: Mutex<HashMap<(Container, String), StoredBlob>>,
    fail_deletes: AtomicBool,
    fail_uploads: AtomicBool,
}

impl InMemoryBlobStore {
    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }

    pub fn contains(&self, container: Container, location: &str) -> bool {
        self.blobs
            .lock()
            .unwrap()
            .contains_key(&(container, location.to_string()))
    }

    /// Make every upload leave a truncated blob behind and then fail
    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    /// Make every delete fail with a backend error until switched off
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn upload(
        &self,
        name: &str,
        container: Container,
        content_type: &str,
        data: Bytes,
    ) -> std::result::Result<String, StorageError> {
        validate_object_name(name)?;
        let failing = self.fail_uploads.load(Ordering::SeqCst);
        let data = if failing {
            data.slice(..data.len() / 2)
        } else {
            data
        };

        self.blobs.lock().unwrap().insert(
            (container, name.to_string()),
            StoredBlob {
                content_type: content_type.to_string(),
                data,
            },
        );

        if failing {
            return Err(StorageError::Backend("simulated disk full".to_string()));
        }
        Ok(name.to_string())
    }

    async fn download(
        &self,
        location: &str,
        container: Container,
    ) -> std::result::Result<BlobDownload, StorageError> {
        let blob = self
            .blobs
            .lock()
            .unwrap()
            .get(&(container, location.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::NotFound(location.to_string()))?;

        Ok(BlobDownload {
            size: Some(blob.data.len() as u64),
            content_type: Some(blob.content_type),
            stream: stream::once(async move { Ok(blob.data) }).boxed(),
        })
    }

    async fn delete(
        &self,
        location: &str,
        container: Container,
    ) -> std::result::Result<(), StorageError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("simulated outage".to_string()));
        }
        self.blobs
            .lock()
            .unwrap()
            .remove(&(container, location.to_string()));
        Ok(())
    }
}
