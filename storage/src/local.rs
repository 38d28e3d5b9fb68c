use std::future::Future;

use bytes::Bytes;
use camino::{Utf8Path, Utf8PathBuf};
use tokio::io::AsyncWriteExt;

use crate::driver::{check_key, Driver};
use crate::error::StorageError;

/// Storage driver backed by a directory on the local filesystem.
///
/// Objects live at `{root}/{bucket}/{key}`.
#[derive(Debug)]
pub struct LocalDriver {
    root: Utf8PathBuf,
}

impl LocalDriver {
    /// Store objects under `root`. The directory is created on first write.
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    /// The directory objects are stored under.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn path(&self, bucket: &str, key: &Utf8Path) -> Result<Utf8PathBuf, StorageError> {
        check_key(self.name(), bucket, key)?;
        let mut path = self.root.join(bucket);
        path.push(key);
        Ok(path)
    }

    fn io(&self, bucket: &str, key: &Utf8Path) -> impl Fn(std::io::Error) -> StorageError + '_ {
        let bucket = bucket.to_owned();
        let key = key.to_owned();
        move |error| StorageError::io(self.name(), error).at(&bucket, key.as_str())
    }

    async fn parents(&self, bucket: &str, key: &Utf8Path, path: &Utf8Path) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(self.io(bucket, key))?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Driver for LocalDriver {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn get(&self, bucket: &str, key: &Utf8Path) -> Result<Bytes, StorageError> {
        let path = self.path(bucket, key)?;
        let data = tokio::fs::read(&path).await.map_err(self.io(bucket, key))?;
        Ok(Bytes::from(data))
    }

    async fn put(&self, bucket: &str, key: &Utf8Path, data: Bytes) -> Result<(), StorageError> {
        let path = self.path(bucket, key)?;
        self.parents(bucket, key, &path).await?;

        // Write beside the target and rename, so readers never see a partial object.
        let staging = path.with_extension("partial");
        tokio::fs::write(&staging, &data)
            .await
            .map_err(self.io(bucket, key))?;
        tokio::fs::rename(&staging, &path)
            .await
            .map_err(self.io(bucket, key))?;
        Ok(())
    }

    async fn create(
        &self,
        bucket: &str,
        key: &Utf8Path,
        data: Bytes,
    ) -> Result<bool, StorageError> {
        let path = self.path(bucket, key)?;
        self.parents(bucket, key, &path).await?;

        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await;

        let mut file = match file {
            Ok(file) => file,
            Err(error) if error.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
            Err(error) => return Err(self.io(bucket, key)(error)),
        };

        remove_on_error(&path, async move {
            file.write_all(&data).await?;
            file.shutdown().await
        })
        .await
        .map_err(self.io(bucket, key))?;
        Ok(true)
    }

    async fn delete(&self, bucket: &str, key: &Utf8Path) -> Result<(), StorageError> {
        let path = self.path(bucket, key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(self.io(bucket, key)(error)),
        }
    }
}

/// Await `write` for a file just created at `path`, removing the file if the write fails.
async fn remove_on_error<F>(path: &Utf8Path, write: F) -> std::io::Result<()>
where
    F: Future<Output = std::io::Result<()>>,
{
    let Err(error) = write.await else {
        return Ok(());
    };

    if let Err(cleanup) = tokio::fs::remove_file(path).await {
        tracing::warn!(%path, error = %cleanup, "unable to remove partially written object");
    }
    Err(error)
}
