//! # Storage backends
//!
//! A small key/value object store with interchangeable drivers, used to persist
//! short links and other durable application state.

use std::sync::Arc;

use bytes::Bytes;
use camino::{Utf8Path, Utf8PathBuf};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

mod driver;
mod error;
mod local;
mod memory;

#[doc(inline)]
pub use driver::Driver;
#[doc(inline)]
pub use error::{StorageError, StorageErrorBuilder, StorageErrorKind};
#[doc(inline)]
pub use local::LocalDriver;
#[doc(inline)]
pub use memory::MemoryStorage;

/// Which storage driver to use, as read from configuration.
///
/// ```toml
/// [storage]
/// driver = "local"
/// path = "/var/lib/whatsdeployed"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "driver", rename_all = "kebab-case")]
pub enum StorageConfig {
    /// Keep everything in memory.
    #[default]
    Memory,

    /// Store objects as files under a directory.
    Local {
        /// Root directory for stored objects.
        path: Utf8PathBuf,
    },
}

impl StorageConfig {
    /// Construct the configured driver.
    #[tracing::instrument(level = "debug")]
    pub fn build(&self) -> Storage {
        match self {
            StorageConfig::Memory => MemoryStorage::new().into(),
            StorageConfig::Local { path } => LocalDriver::new(path.clone()).into(),
        }
    }
}

pub(crate) type ArcDriver = Arc<dyn Driver + Send + Sync>;

/// A handle to a storage driver.
#[derive(Debug, Clone)]
pub struct Storage {
    driver: ArcDriver,
}

impl<D> From<D> for Storage
where
    D: Driver + Send + Sync + 'static,
{
    fn from(value: D) -> Self {
        Storage::new(value)
    }
}

impl Storage {
    /// Wrap a driver.
    pub fn new<D: Driver + Send + Sync + 'static>(driver: D) -> Self {
        Self {
            driver: Arc::new(driver),
        }
    }

    /// The name of the underlying driver.
    pub fn name(&self) -> &str {
        self.driver.name()
    }

    /// A handle scoped to a single bucket.
    pub fn bucket<S: Into<String>>(&self, bucket: S) -> StorageBucket {
        StorageBucket {
            driver: self.driver.clone(),
            bucket: bucket.into(),
        }
    }
}

/// A storage handle scoped to one bucket.
#[derive(Debug, Clone)]
pub struct StorageBucket {
    bucket: String,
    driver: ArcDriver,
}

impl StorageBucket {
    /// The bucket name.
    pub fn name(&self) -> &str {
        &self.bucket
    }

    /// Read an object.
    #[tracing::instrument(skip(self), fields(driver=self.driver.name(), bucket=%self.bucket))]
    pub async fn get(&self, key: &Utf8Path) -> Result<Bytes, StorageError> {
        self.driver.get(&self.bucket, key).await
    }

    /// Write an object, replacing any existing contents.
    #[tracing::instrument(skip(self, data), fields(driver=self.driver.name(), bucket=%self.bucket))]
    pub async fn put(&self, key: &Utf8Path, data: Bytes) -> Result<(), StorageError> {
        tracing::trace!(%key, size = data.len(), "Writing to: {}/{key}", self.bucket);
        self.driver.put(&self.bucket, key, data).await
    }

    /// Write an object only if `key` is unused. Returns whether the write happened.
    #[tracing::instrument(skip(self, data), fields(driver=self.driver.name(), bucket=%self.bucket))]
    pub async fn create(&self, key: &Utf8Path, data: Bytes) -> Result<bool, StorageError> {
        self.driver.create(&self.bucket, key, data).await
    }

    /// Delete an object. Missing objects are ignored.
    #[tracing::instrument(skip(self), fields(driver=self.driver.name(), bucket=%self.bucket))]
    pub async fn delete(&self, key: &Utf8Path) -> Result<(), StorageError> {
        self.driver.delete(&self.bucket, key).await
    }

    /// Read and deserialize a JSON object. Missing objects are `None`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        key: &Utf8Path,
    ) -> Result<Option<T>, StorageError> {
        let data = match self.get(key).await {
            Ok(data) => data,
            Err(error) if error.is_not_found() => return Ok(None),
            Err(error) => return Err(error),
        };

        serde_json::from_slice(&data)
            .map(Some)
            .map_err(|error| self.serialization(key, error))
    }

    /// Serialize `value` as JSON and write it.
    pub async fn put_json<T: Serialize + ?Sized>(
        &self,
        key: &Utf8Path,
        value: &T,
    ) -> Result<(), StorageError> {
        let data = serde_json::to_vec(value).map_err(|error| self.serialization(key, error))?;
        self.put(key, data.into()).await
    }

    /// Serialize `value` as JSON and write it only if `key` is unused.
    pub async fn create_json<T: Serialize + ?Sized>(
        &self,
        key: &Utf8Path,
        value: &T,
    ) -> Result<bool, StorageError> {
        let data = serde_json::to_vec(value).map_err(|error| self.serialization(key, error))?;
        self.create(key, data.into()).await
    }

    fn serialization(&self, key: &Utf8Path, error: serde_json::Error) -> StorageError {
        StorageError::builder(
            self.driver.name(),
            StorageErrorKind::SerializationError,
            error,
        )
        .bucket(&self.bucket)
        .key(key.as_str())
        .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Link {
        owner: String,
        repo: String,
    }

    #[test]
    fn config_from_toml_shape() {
        let config: StorageConfig = serde_json::from_value(serde_json::json!({
            "driver": "local",
            "path": "/var/lib/whatsdeployed",
        }))
        .unwrap();
        assert_eq!(
            config,
            StorageConfig::Local {
                path: "/var/lib/whatsdeployed".into()
            }
        );

        let config: StorageConfig =
            serde_json::from_value(serde_json::json!({"driver": "memory"})).unwrap();
        assert_eq!(config, StorageConfig::Memory);
        assert_eq!(config.build().name(), "memory");
    }

    #[tokio::test]
    async fn json_helpers() {
        let bucket = StorageConfig::Memory.build().bucket("shortlinks");
        let key = Utf8Path::new("links/abc.json");

        assert_eq!(bucket.get_json::<Link>(key).await.unwrap(), None);

        let link = Link {
            owner: "mozilla".into(),
            repo: "kitsune".into(),
        };
        assert!(bucket.create_json(key, &link).await.unwrap());
        assert_eq!(bucket.get_json::<Link>(key).await.unwrap(), Some(link));

        bucket.put(key, Bytes::from_static(b"not json")).await.unwrap();
        let error = bucket.get_json::<Link>(key).await.unwrap_err();
        assert_eq!(error.kind(), StorageErrorKind::SerializationError);
        assert_eq!(error.bucket(), Some("shortlinks"));
    }
}
