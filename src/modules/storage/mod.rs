//! Storage module for file blobs
//!
//! Backends live behind [`BlobStore`] and address objects by container
//! (`public`/`private`) and object name.

mod blob_store;
mod local_store;
mod minio_client;

pub use blob_store::{BlobDownload, BlobStore, Container, StorageError};
pub(crate) use blob_store::validate_object_name;
pub use local_store::LocalBlobStore;
pub use minio_client::MinIOClient;
