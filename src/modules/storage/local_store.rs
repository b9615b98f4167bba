//! Local disk blob backend
//!
//! Layout: `<root>/<container>/<object name>`.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use super::blob_store::{validate_object_name, BlobDownload, BlobStore, Container, StorageError};

pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// Create the store, making sure both container directories exist
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let store = Self { root: root.into() };

        for container in [Container::Public, Container::Private] {
            let dir = store.container_dir(container);
            fs::create_dir_all(&dir).await.map_err(|e| {
                StorageError::Backend(format!(
                    "Failed to create storage directory '{}': {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        info!("Local blob store initialized at {}", store.root.display());
        Ok(store)
    }

    fn container_dir(&self, container: Container) -> PathBuf {
        self.root.join(container.as_str())
    }

    fn object_path(&self, name: &str, container: Container) -> Result<PathBuf, StorageError> {
        validate_object_name(name)?;
        Ok(self.container_dir(container).join(name))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(
        &self,
        name: &str,
        container: Container,
        _content_type: &str,
        data: Bytes,
    ) -> Result<String, StorageError> {
        let path = self.object_path(name, container)?;

        fs::write(&path, &data).await.map_err(|e| {
            StorageError::Backend(format!("Failed to write '{}': {}", path.display(), e))
        })?;

        debug!("Stored {} bytes at '{}'", data.len(), path.display());
        Ok(name.to_string())
    }

    async fn download(
        &self,
        location: &str,
        container: Container,
    ) -> Result<BlobDownload, StorageError> {
        let path = self.object_path(location, container)?;

        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(location.to_string()))
            }
            Err(e) => {
                return Err(StorageError::Backend(format!(
                    "Failed to open '{}': {}",
                    path.display(),
                    e
                )))
            }
        };

        let size = file
            .metadata()
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to stat '{}': {}", path.display(), e)))?
            .len();

        let content_type = mime_guess::from_path(&path)
            .first()
            .map(|mime| mime.essence_str().to_string());

        Ok(BlobDownload {
            stream: ReaderStream::new(file).boxed(),
            content_type,
            size: Some(size),
        })
    }

    async fn delete(&self, location: &str, container: Container) -> Result<(), StorageError> {
        let path = self.object_path(location, container)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Deleted '{}'", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Backend(format!(
                "Failed to delete '{}': {}",
                path.display(),
                e
            ))),
        }
    }
}
