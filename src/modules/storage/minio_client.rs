//! MinIO/S3-compatible blob backend
//!
//! Containers map to key prefixes inside a single bucket.
//!
//! Uses rust-s3 crate for lightweight S3 operations.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use s3::creds::Credentials;
use s3::{Bucket, BucketConfiguration, Region};
use tracing::{debug, info, warn};

use super::blob_store::{validate_object_name, BlobDownload, BlobStore, Container, StorageError};
use crate::core::config::MinIOConfig;

const STATUS_NOT_FOUND: u16 = 404;

/// MinIO/S3-compatible storage client
pub struct MinIOClient {
    bucket: Box<Bucket>,
    region: Region,
    credentials: Credentials,
    endpoint: String,
    public_prefix: String,
    private_prefix: String,
}

impl MinIOClient {
    /// Create a new MinIO client from configuration, creating the bucket if needed
    pub async fn new(config: MinIOConfig) -> Result<Self, StorageError> {
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Backend(format!("Failed to create MinIO credentials: {}", e)))?;

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };

        let mut bucket = Bucket::new(&config.bucket, region.clone(), credentials.clone())
            .map_err(|e| StorageError::Backend(format!("Failed to create MinIO bucket: {}", e)))?;

        // Path-style URLs for MinIO (http://endpoint/bucket)
        bucket.set_path_style();

        let client = Self {
            bucket,
            region,
            credentials,
            endpoint: config.endpoint,
            public_prefix: config.public_prefix,
            private_prefix: config.private_prefix,
        };

        client.ensure_bucket_exists().await;

        info!(
            "MinIO client initialized for endpoint: {}, bucket: {}, public_prefix: {}, private_prefix: {}",
            client.endpoint, client.bucket.name(), client.public_prefix, client.private_prefix
        );

        Ok(client)
    }

    /// Ensure the bucket exists, create if not
    async fn ensure_bucket_exists(&self) {
        let result = Bucket::create_with_path_style(
            &self.bucket.name(),
            self.region.clone(),
            self.credentials.clone(),
            BucketConfiguration::default(),
        )
        .await;

        match result {
            Ok(_) => info!("Bucket '{}' created successfully", self.bucket.name()),
            Err(e) => {
                let error_str = e.to_string();
                if error_str.contains("BucketAlreadyOwnedByYou")
                    || error_str.contains("BucketAlreadyExists")
                    || error_str.contains("already own it")
                {
                    debug!("Bucket '{}' already exists", self.bucket.name());
                } else {
                    warn!(
                        "Could not create bucket '{}': {}. Assuming it exists.",
                        self.bucket.name(),
                        e
                    );
                }
            }
        }
    }

    /// Get the prefix for the given container
    pub fn get_prefix(&self, container: Container) -> &str {
        match container {
            Container::Public => &self.public_prefix,
            Container::Private => &self.private_prefix,
        }
    }

    /// Full object key, e.g. `private/0190...-report.pdf`
    pub fn generate_key(&self, container: Container, name: &str) -> Result<String, StorageError> {
        validate_object_name(name)?;
        Ok(format!("{}/{}", self.get_prefix(container), name))
    }
}

#[async_trait]
impl BlobStore for MinIOClient {
    async fn upload(
        &self,
        name: &str,
        container: Container,
        content_type: &str,
        data: Bytes,
    ) -> Result<String, StorageError> {
        let key = self.generate_key(container, name)?;

        let response = self
            .bucket
            .put_object_with_content_type(&key, &data, content_type)
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to upload file '{}': {}", key, e)))?;

        if !(200..300).contains(&response.status_code()) {
            return Err(StorageError::Backend(format!(
                "Upload of '{}' rejected with status {}",
                key,
                response.status_code()
            )));
        }

        debug!("Uploaded file '{}' to bucket '{}'", key, self.bucket.name());
        Ok(name.to_string())
    }

    async fn download(
        &self,
        location: &str,
        container: Container,
    ) -> Result<BlobDownload, StorageError> {
        let key = self.generate_key(container, location)?;

        let response = self.bucket.get_object(&key).await.map_err(|e| {
            StorageError::Backend(format!("Failed to download file '{}': {}", key, e))
        })?;

        match response.status_code() {
            STATUS_NOT_FOUND => return Err(StorageError::NotFound(key)),
            code if !(200..300).contains(&code) => {
                return Err(StorageError::Backend(format!(
                    "Download of '{}' failed with status {}",
                    key, code
                )))
            }
            _ => {}
        }

        let content_type = response.headers().get("content-type").cloned();
        let body = response.bytes().clone();
        let size = body.len() as u64;

        debug!(
            "Downloaded file '{}' from bucket '{}'",
            key,
            self.bucket.name()
        );

        Ok(BlobDownload {
            stream: stream::once(async move { Ok(body) }).boxed(),
            content_type,
            size: Some(size),
        })
    }

    async fn delete(&self, location: &str, container: Container) -> Result<(), StorageError> {
        let key = self.generate_key(container, location)?;

        let response = self
            .bucket
            .delete_object(&key)
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to delete file '{}': {}", key, e)))?;

        let code = response.status_code();
        if code != STATUS_NOT_FOUND && !(200..300).contains(&code) {
            return Err(StorageError::Backend(format!(
                "Delete of '{}' failed with status {}",
                key, code
            )));
        }

        debug!(
            "Deleted file '{}' from bucket '{}'",
            key,
            self.bucket.name()
        );
        Ok(())
    }
}
