use base64::prelude::*;
use bytes::Bytes;
use chrono::Utc;
use futures::stream::BoxStream;
use std::io;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::files::dtos::{MyFilesQueryDto, UploadFileInput};
use crate::features::files::models::{
    File, FileStatus, NewFile, OwnedFilesQuery, StatusSummary, UserSummary,
};
use crate::features::files::repositories::FileRepository;
use crate::features::files::services::access_control::{
    authorize_delete, authorize_download, authorize_management, authorize_upload,
    DownloadDecision, UploadRequest,
};
use crate::features::policy::services::PolicyService;
use crate::features::statistics::services::{DownloadRecorder, DownloadTicket, TrackedStream};
use crate::modules::security::PasswordHasher;
use crate::modules::storage::{BlobStore, Container};
use crate::shared::constants::{DEFAULT_CONTENT_TYPE, DEFAULT_FILES_PAGE_SIZE};
use crate::shared::types::Page;
use crate::shared::validation::{sanitize_file_name, storage_object_name};

/// Attempts at finding an unused share token before giving up
const SHARE_TOKEN_ATTEMPTS: usize = 3;

/// An authorized download, ready to be streamed
pub struct FileDownload {
    pub file_name: String,
    pub content_type: String,
    pub content_length: u64,
    pub body: TrackedStream<BoxStream<'static, io::Result<Bytes>>>,
}

/// One page of the caller's files
#[derive(Debug)]
pub struct MyFiles {
    pub files: Vec<File>,
    pub total: i64,
    pub summary: StatusSummary,
    pub page: Page,
}

/// Service for file operations
pub struct FileService {
    files: Arc<dyn FileRepository>,
    policy: Arc<PolicyService>,
    blobs: Arc<dyn BlobStore>,
    hasher: Arc<dyn PasswordHasher>,
    recorder: DownloadRecorder,
}

impl FileService {
    pub fn new(
        files: Arc<dyn FileRepository>,
        policy: Arc<PolicyService>,
        blobs: Arc<dyn BlobStore>,
        hasher: Arc<dyn PasswordHasher>,
        recorder: DownloadRecorder,
    ) -> Self {
        Self {
            files,
            policy,
            blobs,
            hasher,
            recorder,
        }
    }

    /// Validate, store the blob, then register the metadata
    ///
    /// The blob is removed again if its write fails or the metadata cannot be written.
    pub async fn upload_file(
        &self,
        input: UploadFileInput,
        requester: Option<&AuthenticatedUser>,
    ) -> Result<File> {
        let now = Utc::now();
        let policy = self.policy.get_policy().await?;

        let is_public = input.is_public.unwrap_or(true);
        let password = input.password.filter(|p| !p.is_empty());
        let file_size = i64::try_from(input.data.len())
            .map_err(|_| AppError::PayloadTooLarge("File is too large".to_string()))?;

        let grant = authorize_upload(
            &UploadRequest {
                requester,
                is_public,
                password: password.as_deref(),
                shared_with: &input.shared_with,
                available_from: input.available_from,
                available_to: input.available_to,
                file_size,
            },
            &policy,
            now,
        )?;

        let password_hash = match password {
            Some(password) => Some(self.hash_password(password).await?),
            None => None,
        };

        let file_name = sanitize_file_name(&input.file_name);
        let mime_type = detect_mime_type(&file_name, input.content_type.as_deref());
        let object_name = storage_object_name(Uuid::now_v7(), &file_name);
        let container = Container::for_visibility(is_public);

        let storage_path = match self
            .blobs
            .upload(&object_name, container, &mime_type, input.data)
            .await
        {
            Ok(path) => path,
            Err(e) => {
                if let Err(cleanup) = self.blobs.delete(&object_name, container).await {
                    warn!(
                        "Failed to remove partial blob '{}': {}",
                        object_name, cleanup
                    );
                }
                return Err(e.into());
            }
        };

        debug!("Blob stored: container={}, path={}", container, storage_path);

        let mut new_file = NewFile {
            id: Uuid::now_v7(),
            share_token: generate_share_token(),
            file_name,
            storage_path,
            file_size,
            mime_type: Some(mime_type),
            owner: requester.map(summary_of),
            is_public,
            password_hash,
            available_from: Some(grant.available_from),
            available_to: Some(grant.available_to),
            shared_with: grant.shared_with,
        };

        let mut attempt = 1;
        let created = loop {
            match self.files.create(&new_file).await {
                Ok(file) => break Ok(file),
                Err(AppError::Conflict(_)) if attempt < SHARE_TOKEN_ATTEMPTS => {
                    warn!("Share token collision, regenerating (attempt {})", attempt);
                    new_file.share_token = generate_share_token();
                    attempt += 1;
                }
                Err(e) => break Err(e),
            }
        };

        match created {
            Ok(file) => {
                info!(
                    "File uploaded: id={}, size={}, public={}, owner={:?}",
                    file.id, file.file_size, file.is_public, file.owner_id
                );
                Ok(file)
            }
            Err(e) => {
                if let Err(cleanup) = self.blobs.delete(&new_file.storage_path, container).await {
                    warn!(
                        "Failed to remove orphaned blob '{}': {}",
                        new_file.storage_path, cleanup
                    );
                }
                Err(e)
            }
        }
    }

    /// Public info behind a share link
    pub async fn get_file_info(&self, share_token: &str) -> Result<File> {
        let file = self.files.get_by_share_token(share_token).await?;

        if file.status(Utc::now()) == FileStatus::Expired {
            return Err(AppError::Gone("This file is no longer available".to_string()));
        }
        Ok(file)
    }

    /// Authorize a download and open the blob stream
    pub async fn download_file(
        &self,
        share_token: &str,
        requester: Option<&AuthenticatedUser>,
        credential: Option<&str>,
    ) -> Result<FileDownload> {
        let file = self.files.get_by_share_token(share_token).await?;

        let decision = authorize_download(&file, requester, credential, Utc::now())?;
        if let DownloadDecision::VerifyPassword { hash, credential } = decision {
            if !self.verify_password(credential, hash).await? {
                return Err(AppError::Forbidden("Incorrect password".to_string()));
            }
        }

        let blob = self.blobs.download(&file.storage_path, file.container()).await?;

        let expected_size = u64::try_from(file.file_size).unwrap_or_default();
        let ticket = DownloadTicket {
            file_id: file.id,
            owner_id: file.owner_id,
            downloader: requester.map(summary_of),
            expected_size,
        };

        debug!(
            "Serving file {} to {:?}",
            file.id,
            requester.map(|u| u.user_id)
        );

        Ok(FileDownload {
            content_type: file
                .mime_type
                .or(blob.content_type)
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            content_length: blob.size.unwrap_or(expected_size),
            file_name: file.file_name,
            body: self.recorder.track(ticket, blob.stream),
        })
    }

    pub async fn get_file_details(&self, id: Uuid, requester: &AuthenticatedUser) -> Result<File> {
        let file = self.files.get_by_id(id).await?;
        authorize_management(&file, Some(requester))?;
        Ok(file)
    }

    /// Remove the blob first, then the metadata
    pub async fn delete_file(&self, id: Uuid, requester: &AuthenticatedUser) -> Result<()> {
        let file = self.files.get_by_id(id).await?;
        authorize_delete(&file, Some(requester))?;

        self.blobs
            .delete(&file.storage_path, file.container())
            .await?;
        self.files.delete(file.id).await?;

        info!("File deleted: id={}, by={}", file.id, requester.user_id);
        Ok(())
    }

    pub async fn list_my_files(
        &self,
        requester: &AuthenticatedUser,
        query: MyFilesQueryDto,
    ) -> Result<MyFiles> {
        let now = Utc::now();
        let page = Page::new(query.page, query.limit, DEFAULT_FILES_PAGE_SIZE);

        let owned_query = OwnedFilesQuery {
            status: query.status,
            sort_by: query.sort_by.unwrap_or_default(),
            order: query.order.unwrap_or_default(),
            limit: page.limit,
            offset: page.offset(),
        };

        let (files, total) = self
            .files
            .get_by_owner(requester.user_id, &owned_query, now)
            .await?;
        let summary = self.files.status_summary(requester.user_id, now).await?;

        Ok(MyFiles {
            files,
            total,
            summary,
            page,
        })
    }

    async fn hash_password(&self, password: String) -> Result<String> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
            .map_err(AppError::from)
    }

    async fn verify_password(&self, credential: &str, hash: &str) -> Result<bool> {
        let hasher = self.hasher.clone();
        let credential = credential.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&credential, &hash))
            .await
            .map_err(|e| AppError::Internal(format!("Password check task failed: {}", e)))?
            .map_err(AppError::from)
    }
}

/// Unguessable, URL-safe token unrelated to the file id
fn generate_share_token() -> String {
    BASE64_URL_SAFE_NO_PAD.encode(Uuid::new_v4().as_bytes())
}

fn summary_of(user: &AuthenticatedUser) -> UserSummary {
    UserSummary {
        id: user.user_id,
        username: user.username.clone(),
        email: user.email.clone(),
    }
}

/// Trust the client's content type unless it is missing or generic
fn detect_mime_type(file_name: &str, declared: Option<&str>) -> String {
    match declared.map(str::trim) {
        Some(ct) if !ct.is_empty() && !ct.eq_ignore_ascii_case(DEFAULT_CONTENT_TYPE) => {
            ct.to_string()
        }
        _ => mime_guess::from_path(file_name)
            .first_raw()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::files::models::{FileSortBy, SortOrder};
    use crate::features::policy::models::SystemPolicy;
    use crate::features::statistics::repositories::StatisticsRepository;
    use crate::modules::security::Argon2PasswordHasher;
    use crate::modules::storage::LocalBlobStore;
    use crate::shared::test_helpers::{
        admin_user, new_file_fixture, regular_user, FailingFileRepository, InMemoryBlobStore,
        InMemoryPolicyStore, InMemoryStore,
    };
    use crate::shared::validation::is_share_token_shaped;
    use chrono::Duration;
    use futures::TryStreamExt;
    use tokio::task::JoinHandle;

    struct Harness {
        service: Arc<FileService>,
        store: Arc<InMemoryStore>,
        blobs: Arc<InMemoryBlobStore>,
        worker: JoinHandle<()>,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_policy(SystemPolicy::default())
        }

        fn with_policy(policy: SystemPolicy) -> Self {
            let store = Arc::new(InMemoryStore::default());
            let blobs = Arc::new(InMemoryBlobStore::default());
            let (recorder, worker) = DownloadRecorder::spawn(store.clone(), 64);
            let service = FileService::new(
                store.clone(),
                Arc::new(PolicyService::new(Arc::new(InMemoryPolicyStore::with(policy)))),
                blobs.clone(),
                Arc::new(Argon2PasswordHasher::default()),
                recorder,
            );

            Self {
                service: Arc::new(service),
                store,
                blobs,
                worker,
            }
        }

        /// Drop the service and wait until every queued event is applied
        async fn settle(self) -> (Arc<InMemoryStore>, Arc<InMemoryBlobStore>) {
            drop(self.service);
            self.worker.await.unwrap();
            (self.store, self.blobs)
        }
    }

    fn input(data: &'static [u8]) -> UploadFileInput {
        UploadFileInput {
            file_name: "report.pdf".to_string(),
            content_type: Some("application/pdf".to_string()),
            data: Bytes::from_static(data),
            ..Default::default()
        }
    }

    async fn drain(download: FileDownload) -> Vec<u8> {
        let chunks: Vec<Bytes> = download.body.try_collect().await.unwrap();
        chunks.concat()
    }

    #[tokio::test]
    async fn test_anonymous_upload_gets_default_window_and_token() {
        let harness = Harness::new();
        let before = Utc::now();

        let file = harness
            .service
            .upload_file(input(b"%PDF-1.4"), None)
            .await
            .unwrap();

        assert!(file.is_public);
        assert!(file.owner_id.is_none());
        assert!(is_share_token_shaped(&file.share_token));
        assert_ne!(file.share_token, file.id.to_string());

        let to = file.available_to.unwrap();
        assert!(to >= before + Duration::days(7));
        assert!(to <= Utc::now() + Duration::days(7));
        assert!(harness.store.get_statistics(file.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_owned_upload_creates_zero_statistics() {
        let harness = Harness::new();
        let owner = regular_user();

        let file = harness
            .service
            .upload_file(input(b"data"), Some(&owner))
            .await
            .unwrap();

        let stats = harness.store.get_statistics(file.id).await.unwrap().unwrap();
        assert_eq!(stats.download_count, 0);
        assert_eq!(stats.unique_downloaders, 0);
    }

    #[tokio::test]
    async fn test_anonymous_private_upload_rejected_without_blob() {
        let harness = Harness::new();
        let request = UploadFileInput {
            is_public: Some(false),
            ..input(b"secret")
        };

        let result = harness.service.upload_file(request, None).await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
        assert_eq!(harness.blobs.len(), 0);
    }

    #[tokio::test]
    async fn test_short_validity_rejected() {
        let harness = Harness::with_policy(SystemPolicy {
            min_validity_hours: 4,
            ..SystemPolicy::default()
        });
        let now = Utc::now();
        let request = UploadFileInput {
            available_from: Some(now),
            available_to: Some(now + Duration::hours(1)),
            ..input(b"x")
        };

        let result = harness.service.upload_file(request, Some(&regular_user())).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(harness.blobs.len(), 0);
    }

    #[tokio::test]
    async fn test_password_is_stored_hashed() {
        let harness = Harness::new();
        let owner = regular_user();

        let short = UploadFileInput {
            password: Some("abc".to_string()),
            ..input(b"x")
        };
        assert!(matches!(
            harness.service.upload_file(short, Some(&owner)).await,
            Err(AppError::Validation(_))
        ));

        let ok = UploadFileInput {
            password: Some("abcdefgh".to_string()),
            ..input(b"x")
        };
        let file = harness.service.upload_file(ok, Some(&owner)).await.unwrap();
        let hash = file.password_hash.unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(!hash.contains("abcdefgh"));
    }

    #[tokio::test]
    async fn test_empty_password_is_absent() {
        let harness = Harness::new();
        let request = UploadFileInput {
            password: Some(String::new()),
            ..input(b"x")
        };

        let file = harness.service.upload_file(request, None).await.unwrap();
        assert!(!file.has_password());
    }

    #[tokio::test]
    async fn test_oversized_upload_rejected() {
        let harness = Harness::with_policy(SystemPolicy {
            max_file_size_mb: 1,
            ..SystemPolicy::default()
        });
        let request = UploadFileInput {
            data: Bytes::from(vec![0u8; 1024 * 1024 + 1]),
            ..input(b"")
        };

        let result = harness.service.upload_file(request, None).await;
        assert!(matches!(result, Err(AppError::PayloadTooLarge(_))));
    }

    #[tokio::test]
    async fn test_metadata_failure_removes_blob() {
        let blobs = Arc::new(InMemoryBlobStore::default());
        let store = Arc::new(InMemoryStore::default());
        let (recorder, _worker) = DownloadRecorder::spawn(store, 4);
        let service = FileService::new(
            Arc::new(FailingFileRepository),
            Arc::new(PolicyService::new(Arc::new(InMemoryPolicyStore::empty()))),
            blobs.clone(),
            Arc::new(Argon2PasswordHasher::default()),
            recorder,
        );

        let result = service.upload_file(input(b"x"), None).await;
        assert!(matches!(result, Err(AppError::Internal(_))));
        assert_eq!(blobs.len(), 0);
    }

    #[tokio::test]
    async fn test_whitelist_is_normalized_without_owner() {
        let harness = Harness::new();
        let mut owner = regular_user();
        owner.email = "owner@example.com".to_string();

        let request = UploadFileInput {
            shared_with: vec![
                "Friend@Example.com".to_string(),
                "friend@example.com ".to_string(),
                "owner@example.com".to_string(),
            ],
            ..input(b"x")
        };
        let file = harness.service.upload_file(request, Some(&owner)).await.unwrap();
        assert_eq!(file.shared_with, vec!["friend@example.com"]);
    }

    #[tokio::test]
    async fn test_private_blob_lands_in_private_container() {
        let harness = Harness::new();
        let request = UploadFileInput {
            is_public: Some(false),
            ..input(b"x")
        };
        let file = harness
            .service
            .upload_file(request, Some(&regular_user()))
            .await
            .unwrap();

        assert!(harness.blobs.contains(Container::Private, &file.storage_path));
        assert!(file.storage_path.ends_with("-report.pdf"));
    }

    #[tokio::test]
    async fn test_mime_detected_from_extension() {
        assert_eq!(detect_mime_type("photo.png", None), "image/png");
        assert_eq!(
            detect_mime_type("photo.png", Some("application/octet-stream")),
            "image/png"
        );
        assert_eq!(detect_mime_type("data.custom", Some("text/csv")), "text/csv");
        assert_eq!(detect_mime_type("noext", None), DEFAULT_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_download_password_flow() {
        let harness = Harness::new();
        let owner = regular_user();
        let request = UploadFileInput {
            password: Some("abcdefgh".to_string()),
            ..input(b"payload")
        };
        let file = harness.service.upload_file(request, Some(&owner)).await.unwrap();
        let token = file.share_token.clone();

        let missing = harness.service.download_file(&token, None, None).await;
        assert!(matches!(missing, Err(AppError::Forbidden(ref m)) if m.contains("required")));

        let wrong = harness.service.download_file(&token, None, Some("nope")).await;
        assert!(matches!(wrong, Err(AppError::Forbidden(ref m)) if m.contains("Incorrect")));

        let right = harness
            .service
            .download_file(&token, None, Some("abcdefgh"))
            .await
            .unwrap();
        assert_eq!(drain(right).await, b"payload");

        let owner_bypass = harness
            .service
            .download_file(&token, Some(&owner), None)
            .await
            .unwrap();
        assert_eq!(owner_bypass.content_type, "application/pdf");
        assert_eq!(drain(owner_bypass).await, b"payload");
    }

    #[tokio::test]
    async fn test_expired_download_gone_even_for_owner() {
        let harness = Harness::new();
        let owner = regular_user();
        let mut new_file = new_file_fixture(Some(&owner));
        new_file.available_from = Some(Utc::now() - Duration::days(3));
        new_file.available_to = Some(Utc::now() - Duration::days(1));
        let file = harness.store.create(&new_file).await.unwrap();

        let result = harness
            .service
            .download_file(&file.share_token, Some(&owner), None)
            .await;
        assert!(matches!(result, Err(AppError::Gone(_))));

        let info = harness.service.get_file_info(&file.share_token).await;
        assert!(matches!(info, Err(AppError::Gone(_))));
    }

    #[tokio::test]
    async fn test_pending_locked_for_others() {
        let harness = Harness::new();
        let owner = regular_user();
        let now = Utc::now();
        let request = UploadFileInput {
            available_from: Some(now + Duration::hours(2)),
            available_to: Some(now + Duration::days(2)),
            ..input(b"soon")
        };
        let file = harness.service.upload_file(request, Some(&owner)).await.unwrap();

        let result = harness.service.download_file(&file.share_token, None, None).await;
        assert!(matches!(result, Err(AppError::Locked(_))));

        let owner_download = harness
            .service
            .download_file(&file.share_token, Some(&owner), None)
            .await
            .unwrap();
        assert_eq!(drain(owner_download).await, b"soon");

        let info = harness.service.get_file_info(&file.share_token).await.unwrap();
        assert_eq!(info.status(Utc::now()), FileStatus::Pending);
    }

    #[tokio::test]
    async fn test_concurrent_distinct_downloaders_counted_exactly() {
        const N: usize = 16;
        let harness = Harness::new();
        let owner = regular_user();
        let file = harness
            .service
            .upload_file(input(b"shared bytes"), Some(&owner))
            .await
            .unwrap();

        let mut tasks = Vec::new();
        for _ in 0..N {
            let service = harness.service.clone();
            let token = file.share_token.clone();
            tasks.push(tokio::spawn(async move {
                let user = regular_user();
                let download = service.download_file(&token, Some(&user), None).await.unwrap();
                drain(download).await
            }));
        }
        for task in tasks {
            assert_eq!(task.await.unwrap(), b"shared bytes");
        }

        let (store, _) = harness.settle().await;
        let stats = store.get_statistics(file.id).await.unwrap().unwrap();
        assert_eq!(stats.download_count, N as i64);
        assert_eq!(stats.unique_downloaders, N as i64);
        assert!(stats.last_downloaded_at.is_some());
    }

    #[tokio::test]
    async fn test_repeat_downloader_counted_once() {
        let harness = Harness::new();
        let owner = regular_user();
        let fan = regular_user();
        let file = harness
            .service
            .upload_file(input(b"abc"), Some(&owner))
            .await
            .unwrap();

        for _ in 0..3 {
            let download = harness
                .service
                .download_file(&file.share_token, Some(&fan), None)
                .await
                .unwrap();
            drain(download).await;
        }

        let (store, _) = harness.settle().await;
        let stats = store.get_statistics(file.id).await.unwrap().unwrap();
        assert_eq!(stats.download_count, 3);
        assert_eq!(stats.unique_downloaders, 1);
    }

    #[tokio::test]
    async fn test_abandoned_download_records_incomplete_history() {
        let harness = Harness::new();
        let owner = regular_user();
        let file = harness
            .service
            .upload_file(input(b"abc"), Some(&owner))
            .await
            .unwrap();

        let download = harness
            .service
            .download_file(&file.share_token, None, None)
            .await
            .unwrap();
        drop(download);

        let (store, _) = harness.settle().await;
        let stats = store.get_statistics(file.id).await.unwrap().unwrap();
        assert_eq!(stats.download_count, 0);
        let (history, total) = store.list_history(file.id, 50, 0).await.unwrap();
        assert_eq!(total, 1);
        assert!(!history[0].download_completed);
    }

    #[tokio::test]
    async fn test_delete_permissions() {
        let harness = Harness::new();
        let owner = regular_user();
        let file = harness
            .service
            .upload_file(input(b"abc"), Some(&owner))
            .await
            .unwrap();

        let other = harness.service.delete_file(file.id, &regular_user()).await;
        assert!(matches!(other, Err(AppError::Forbidden(_))));

        harness.service.delete_file(file.id, &owner).await.unwrap();
        assert_eq!(harness.blobs.len(), 0);
        assert!(matches!(
            harness.service.get_file_details(file.id, &owner).await,
            Err(AppError::NotFound(_))
        ));

        let anonymous = harness.service.upload_file(input(b"abc"), None).await.unwrap();
        let result = harness.service.delete_file(anonymous.id, &admin_user()).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_list_my_files_filters_and_summarizes() {
        let harness = Harness::new();
        let owner = regular_user();
        let now = Utc::now();

        for name in ["b.txt", "a.txt"] {
            let request = UploadFileInput {
                file_name: name.to_string(),
                ..input(b"x")
            };
            harness.service.upload_file(request, Some(&owner)).await.unwrap();
        }
        let pending = UploadFileInput {
            file_name: "c.txt".to_string(),
            available_from: Some(now + Duration::hours(5)),
            available_to: Some(now + Duration::days(1)),
            ..input(b"x")
        };
        harness.service.upload_file(pending, Some(&owner)).await.unwrap();
        harness.service.upload_file(input(b"x"), Some(&regular_user())).await.unwrap();

        let all = harness
            .service
            .list_my_files(
                &owner,
                MyFilesQueryDto {
                    sort_by: Some(FileSortBy::FileName),
                    order: Some(SortOrder::Asc),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let names: Vec<&str> = all.files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);
        assert_eq!(all.total, 3);
        assert_eq!(
            all.summary,
            StatusSummary {
                total: 3,
                active: 2,
                pending: 1,
                expired: 0
            }
        );

        let only_pending = harness
            .service
            .list_my_files(
                &owner,
                MyFilesQueryDto {
                    status: Some(FileStatus::Pending),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(only_pending.total, 1);
        assert_eq!(only_pending.files[0].file_name, "c.txt");
    }

    #[tokio::test]
    async fn test_unknown_share_token_is_not_found() {
        let harness = Harness::new();
        let result = harness
            .service
            .download_file("AAAAAAAAAAAAAAAAAAAAAA", None, None)
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_whitelisted_download() {
        let harness = Harness::new();
        let owner = regular_user();
        let friend = regular_user();
        let request = UploadFileInput {
            is_public: Some(false),
            shared_with: vec![friend.email.to_uppercase()],
            ..input(b"for you")
        };
        let file = harness.service.upload_file(request, Some(&owner)).await.unwrap();
        let token = file.share_token.as_str();

        assert!(matches!(
            harness.service.download_file(token, None, None).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            harness
                .service
                .download_file(token, Some(&regular_user()), None)
                .await,
            Err(AppError::Forbidden(_))
        ));

        let download = harness
            .service
            .download_file(token, Some(&friend), None)
            .await
            .unwrap();
        assert_eq!(drain(download).await, b"for you");
    }

    #[tokio::test]
    async fn test_admin_manages_owned_but_not_anonymous_files() {
        let harness = Harness::new();
        let admin = admin_user();
        let owned = harness
            .service
            .upload_file(input(b"a"), Some(&regular_user()))
            .await
            .unwrap();
        let anonymous = harness.service.upload_file(input(b"b"), None).await.unwrap();

        assert!(harness.service.get_file_details(owned.id, &admin).await.is_ok());
        assert!(matches!(
            harness.service.delete_file(anonymous.id, &admin).await,
            Err(AppError::Forbidden(_))
        ));
        harness.service.delete_file(owned.id, &admin).await.unwrap();
        assert_eq!(harness.blobs.len(), 1);
    }

    #[tokio::test]
    async fn test_long_names_fit_the_local_backend() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryStore::default());
        let (recorder, _worker) = DownloadRecorder::spawn(store.clone(), 8);
        let service = FileService::new(
            store,
            Arc::new(PolicyService::new(Arc::new(InMemoryPolicyStore::empty()))),
            Arc::new(LocalBlobStore::new(dir.path()).await.unwrap()),
            Arc::new(Argon2PasswordHasher::default()),
            recorder,
        );

        for name in ["a".repeat(240) + ".pdf", "報告書".repeat(40) + ".pdf"] {
            let file = service
                .upload_file(
                    UploadFileInput {
                        file_name: name.clone(),
                        data: Bytes::from_static(b"long name"),
                        ..Default::default()
                    },
                    None,
                )
                .await
                .unwrap();

            assert_eq!(file.file_name, name);
            assert!(file.storage_path.len() <= 255);
            assert!(file.storage_path.ends_with(".pdf"));

            let download = service.download_file(&file.share_token, None, None).await.unwrap();
            assert_eq!(download.file_name, name);
            assert_eq!(drain(download).await, b"long name");
        }
    }

    #[tokio::test]
    async fn test_failed_blob_write_is_cleaned_up() {
        let harness = Harness::new();
        harness.blobs.fail_uploads(true);

        let result = harness.service.upload_file(input(b"half written"), None).await;

        assert!(matches!(result, Err(AppError::Internal(_))));
        assert_eq!(harness.blobs.len(), 0);
        assert_eq!(harness.store.len(), 0);
    }

    #[tokio::test]
    async fn test_share_token_collision_is_retried() {
        let harness = Harness::new();
        harness.store.collide_next(1);

        let file = harness
            .service
            .upload_file(input(b"second try"), Some(&regular_user()))
            .await
            .unwrap();

        assert_eq!(harness.store.len(), 1);
        assert_eq!(harness.blobs.len(), 1);
        assert!(harness.blobs.contains(Container::Public, &file.storage_path));
    }

    #[tokio::test]
    async fn test_share_token_collisions_give_up_after_limit() {
        let harness = Harness::new();
        harness.store.collide_next(SHARE_TOKEN_ATTEMPTS);

        let result = harness.service.upload_file(input(b"never stored"), None).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(harness.store.len(), 0);
        assert_eq!(harness.blobs.len(), 0);
    }
}
