use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use utoipa::ToSchema;

use crate::core::error::AppError;

/// Storage area a blob lives in; derived from the file's visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    Public,
    Private,
}

impl Container {
    pub fn for_visibility(is_public: bool) -> Self {
        if is_public {
            Self::Public
        } else {
            Self::Private
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Invalid object name: {0}")]
    InvalidName(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => AppError::NotFound("File content not found".to_string()),
            StorageError::InvalidName(name) => {
                AppError::BadRequest(format!("Invalid object name: {}", name))
            }
            StorageError::Backend(msg) => AppError::Internal(msg),
        }
    }
}

/// An opened blob, streamed chunk by chunk
pub struct BlobDownload {
    pub stream: BoxStream<'static, io::Result<Bytes>>,
    pub content_type: Option<String>,
    pub size: Option<u64>,
}

impl fmt::Debug for BlobDownload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobDownload")
            .field("content_type", &self.content_type)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Blob storage backend
///
/// Object names are flat (no separators); the returned location is what the
/// file registry persists as `storage_path`.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` under `name` and return its location
    async fn upload(
        &self,
        name: &str,
        container: Container,
        content_type: &str,
        data: Bytes,
    ) -> Result<String, StorageError>;

    /// Open a stored blob for streaming
    async fn download(
        &self,
        location: &str,
        container: Container,
    ) -> Result<BlobDownload, StorageError>;

    /// Remove a blob; deleting something absent is not an error
    async fn delete(&self, location: &str, container: Container) -> Result<(), StorageError>;
}

/// Reject names that could escape their container
pub(crate) fn validate_object_name(name: &str) -> Result<(), StorageError> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.chars().any(|c| c.is_control())
    {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}
