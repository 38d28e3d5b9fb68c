use std::collections::BTreeMap;
use std::collections::HashMap;

use bytes::Bytes;
use camino::{Utf8Path, Utf8PathBuf};
use tokio::sync::RwLock;

use crate::driver::{check_key, Driver};
use crate::error::StorageError;

/// Storage driver that keeps objects in memory.
///
/// Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    buckets: RwLock<HashMap<String, BTreeMap<Utf8PathBuf, Bytes>>>,
}

impl MemoryStorage {
    /// Create a new, empty `MemoryStorage`.
    pub fn new() -> Self {
        Self::default()
    }

    fn missing(&self, bucket: &str, key: &Utf8Path) -> StorageError {
        StorageError::not_found(self.name(), bucket, Some(key.as_str()))
    }
}

#[async_trait::async_trait]
impl Driver for MemoryStorage {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, bucket: &str, key: &Utf8Path) -> Result<Bytes, StorageError> {
        check_key(self.name(), bucket, key)?;
        let buckets = self.buckets.read().await;
        buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .cloned()
            .ok_or_else(|| self.missing(bucket, key))
    }

    async fn put(&self, bucket: &str, key: &Utf8Path, data: Bytes) -> Result<(), StorageError> {
        check_key(self.name(), bucket, key)?;
        let mut buckets = self.buckets.write().await;
        buckets
            .entry(bucket.to_owned())
            .or_default()
            .insert(key.to_owned(), data);
        Ok(())
    }

    async fn create(
        &self,
        bucket: &str,
        key: &Utf8Path,
        data: Bytes,
    ) -> Result<bool, StorageError> {
        check_key(self.name(), bucket, key)?;
        let mut buckets = self.buckets.write().await;
        let objects = buckets.entry(bucket.to_owned()).or_default();
        if objects.contains_key(key) {
            return Ok(false);
        }
        objects.insert(key.to_owned(), data);
        Ok(true)
    }

    async fn delete(&self, bucket: &str, key: &Utf8Path) -> Result<(), StorageError> {
        check_key(self.name(), bucket, key)?;
        let mut buckets = self.buckets.write().await;
        if let Some(objects) = buckets.get_mut(bucket) {
            objects.remove(key);
        }
        Ok(())
    }
}
