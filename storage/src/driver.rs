use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use bytes::Bytes;
use camino::{Utf8Component, Utf8Path};

use crate::error::{StorageError, StorageErrorKind};

/// A key/value storage backend.
///
/// Keys are relative, `/`-separated paths within a bucket. Drivers create
/// buckets on first write.
#[async_trait::async_trait]
pub trait Driver: fmt::Debug {
    /// The name of the driver.
    fn name(&self) -> &'static str;

    /// Read the full contents of an object.
    async fn get(&self, bucket: &str, key: &Utf8Path) -> Result<Bytes, StorageError>;

    /// Write an object, replacing any existing contents.
    async fn put(&self, bucket: &str, key: &Utf8Path, data: Bytes) -> Result<(), StorageError>;

    /// Write an object only if the key is unused.
    ///
    /// Returns `false` (and leaves the existing object alone) when the key is taken.
    async fn create(&self, bucket: &str, key: &Utf8Path, data: Bytes)
        -> Result<bool, StorageError>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, bucket: &str, key: &Utf8Path) -> Result<(), StorageError>;
}

/// Reject keys which can't be stored safely on every driver.
pub(crate) fn check_key(engine: &'static str, bucket: &str, key: &Utf8Path) -> Result<(), StorageError> {
    let valid = !key.as_str().is_empty()
        && key
            .components()
            .all(|component| matches!(component, Utf8Component::Normal(_)));

    if valid && !bucket.is_empty() && !bucket.contains(['/', '\\']) && bucket != ".." {
        Ok(())
    } else {
        Err(StorageError::builder(
            engine,
            StorageErrorKind::InvalidKey,
            format!("invalid key: {bucket}/{key}"),
        )
        .bucket(bucket)
        .key(key.as_str())
        .build())
    }
}

#[async_trait::async_trait]
impl<D> Driver for Arc<D>
where
    D: ?Sized + Driver + Sync + Send + 'static,
{
    fn name(&self) -> &'static str {
        self.deref().name()
    }

    async fn get(&self, bucket: &str, key: &Utf8Path) -> Result<Bytes, StorageError> {
        self.deref().get(bucket, key).await
    }

    async fn put(&self, bucket: &str, key: &Utf8Path, data: Bytes) -> Result<(), StorageError> {
        self.deref().put(bucket, key, data).await
    }

    async fn create(
        &self,
        bucket: &str,
        key: &Utf8Path,
        data: Bytes,
    ) -> Result<bool, StorageError> {
        self.deref().create(bucket, key, data).await
    }

    async fn delete(&self, bucket: &str, key: &Utf8Path) -> Result<(), StorageError> {
        self.deref().delete(bucket, key).await
    }
}
