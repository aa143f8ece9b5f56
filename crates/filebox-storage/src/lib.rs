//! # filebox-storage
//!
//! The storage gateway: a thin adapter between the API and an object store.
//!
//! - [`S3FileStore`]: S3, MinIO or another S3-compatible service via `aws-sdk-s3`
//! - [`LocalFileStore`]: lite mode, objects on the local filesystem
//!
//! Both gate every operation on a one-time container initialisation and bound
//! every backend call with a timeout and a shutdown token (see [`CallLimits`]).

pub mod error;
pub mod limits;
pub mod local;
pub mod s3;

pub use error::StorageError;
pub use limits::CallLimits;
pub use local::LocalFileStore;
pub use s3::S3FileStore;

use async_trait::async_trait;
use filebox_common::models::FileRecord;
use futures_util::stream::BoxStream;

/// Lazy, single-pass listing of a container.
pub type FileStream = BoxStream<'static, Result<FileRecord, StorageError>>;

/// Operations the API needs from an object store.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Wait until the backing container exists. Runs the initialisation at
    /// most once per store; later calls return immediately.
    async fn ready(&self) -> Result<(), StorageError>;

    /// Probe the store for `name`. A missing object is `Ok(false)`.
    async fn exists(&self, name: &str) -> Result<bool, StorageError>;

    /// Store `file.content` under `file.name` and return its absolute location.
    async fn upload(&self, file: FileRecord) -> Result<String, StorageError>;

    /// Read an object fully into memory.
    async fn download(&self, name: &str) -> Result<FileRecord, StorageError>;

    /// Summaries (name, content type, length) of every object in the container.
    async fn list(&self) -> Result<FileStream, StorageError>;

    /// Remove an object. Returns whether anything was deleted.
    async fn delete(&self, name: &str) -> Result<bool, StorageError>;

    /// Reorder stored files to match `files`.
    ///
    /// Records carry no position attribute, so no backend supports this yet.
    async fn reorder(&self, _files: Vec<FileRecord>) -> Result<bool, StorageError> {
        Err(StorageError::Unsupported {
            operation: "reorder",
        })
    }
}

/// Best-effort content type for objects stored without one.
pub(crate) fn guess_content_type(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
