//! Recently used short links.

use camino::Utf8Path;
use storage::{Storage, StorageBucket};

use crate::error::Error;

/// How many short links are remembered.
pub const MAX_HISTORY: usize = 5;

const BUCKET: &str = "history";
const KEY: &str = "short-urls.json";

/// The most recently used short paths, newest first.
#[derive(Debug, Clone)]
pub struct History {
    bucket: StorageBucket,
}

impl History {
    /// History kept in the `history` bucket of `storage`.
    pub fn new(storage: &Storage) -> Self {
        Self {
            bucket: storage.bucket(BUCKET),
        }
    }

    /// The remembered short paths.
    ///
    /// Unreadable history is discarded with a warning and treated as empty.
    pub async fn entries(&self) -> Result<Vec<String>, Error> {
        match self.bucket.get_json::<Vec<String>>(Utf8Path::new(KEY)).await {
            Ok(entries) => Ok(entries.unwrap_or_default()),
            Err(error) if error.kind() == storage::StorageErrorKind::SerializationError => {
                tracing::warn!(%error, "discarding unreadable short link history");
                self.bucket.delete(Utf8Path::new(KEY)).await?;
                Ok(Vec::new())
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Record a short path, moving it to the front if it is already known.
    pub async fn add(&self, short: &str) -> Result<Vec<String>, Error> {
        let mut entries = self.entries().await?;
        entries.retain(|entry| entry != short);
        entries.insert(0, short.to_owned());
        entries.truncate(MAX_HISTORY);

        self.bucket.put_json(Utf8Path::new(KEY), &entries).await?;
        Ok(entries)
    }

    /// Forget everything.
    pub async fn clear(&self) -> Result<(), Error> {
        Ok(self.bucket.delete(Utf8Path::new(KEY)).await?)
    }
}
