use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;

use tracing_error::SpanTrace;

/// Categorizes storage errors by their semantic meaning, independent of
/// the driver which produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorKind {
    /// The requested key or bucket was not found.
    ///
    /// **Retryable:** No - the object doesn't exist.
    NotFound,

    /// The caller lacks permission to read or write the object.
    ///
    /// **Retryable:** No - unless file permissions change.
    PermissionDenied,

    /// The operation failed due to I/O errors.
    ///
    /// **Retryable:** Maybe - depends on whether the I/O issue is transient.
    Io,

    /// The key is not usable by this driver (empty, absolute, or escaping the root).
    ///
    /// **Retryable:** No - the request itself is invalid.
    InvalidKey,

    /// Stored data could not be serialized or deserialized.
    ///
    /// **Retryable:** No - indicates a data format mismatch.
    SerializationError,
}

impl StorageErrorKind {
    /// Returns whether this error kind typically indicates a retryable condition.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageErrorKind::Io)
    }
}

impl fmt::Display for StorageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageErrorKind::NotFound => write!(f, "not found"),
            StorageErrorKind::PermissionDenied => write!(f, "permission denied"),
            StorageErrorKind::Io => write!(f, "I/O error"),
            StorageErrorKind::InvalidKey => write!(f, "invalid key"),
            StorageErrorKind::SerializationError => write!(f, "serialization error"),
        }
    }
}

#[derive(Debug)]
struct ErrorTrace {
    /// Captured backtrace, controlled by `RUST_BACKTRACE`.
    backtrace: Backtrace,

    /// The tracing span context where the error was created.
    span_trace: SpanTrace,
}

impl ErrorTrace {
    #[track_caller]
    fn capture() -> Self {
        ErrorTrace {
            backtrace: Backtrace::capture(),
            span_trace: SpanTrace::capture(),
        }
    }
}

/// Storage error with the operation context attached.
///
/// # Example
///
/// ```rust
/// use storage::{StorageError, StorageErrorKind};
///
/// let error = StorageError::builder(
///     "local",
///     StorageErrorKind::NotFound,
///     std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
/// )
/// .bucket("shortlinks")
/// .key("links/abc.json")
/// .build();
///
/// assert!(error.is_not_found());
/// ```
#[derive(Debug)]
pub struct StorageError {
    kind: StorageErrorKind,
    engine: &'static str,
    bucket: Option<String>,
    key: Option<String>,
    source: Box<dyn StdError + Send + Sync + 'static>,
    traces: Box<ErrorTrace>,
}

impl StdError for StorageError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.source.as_ref())
    }
}

impl StorageError {
    /// Create a new storage error without bucket or key context.
    pub fn new<E>(engine: &'static str, kind: StorageErrorKind, error: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync + 'static>>,
    {
        Self::builder(engine, kind, error).build()
    }

    /// Create a builder to attach the bucket and key to an error.
    pub fn builder<E>(engine: &'static str, kind: StorageErrorKind, error: E) -> StorageErrorBuilder
    where
        E: Into<Box<dyn StdError + Send + Sync + 'static>>,
    {
        StorageErrorBuilder {
            engine,
            kind,
            source: error.into(),
            bucket: None,
            key: None,
        }
    }

    /// Build a `NotFound` error for a missing bucket or key.
    pub fn not_found(engine: &'static str, bucket: &str, key: Option<&str>) -> Self {
        let what = match key {
            Some(key) => format!("{bucket}/{key}"),
            None => bucket.to_owned(),
        };
        let builder = Self::builder(
            engine,
            StorageErrorKind::NotFound,
            std::io::Error::new(std::io::ErrorKind::NotFound, format!("not found: {what}")),
        )
        .bucket(bucket);

        match key {
            Some(key) => builder.key(key).build(),
            None => builder.build(),
        }
    }

    /// Wrap an I/O error, picking the kind from the I/O error kind.
    pub fn io(engine: &'static str, error: std::io::Error) -> Self {
        let kind = match error.kind() {
            std::io::ErrorKind::NotFound => StorageErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => StorageErrorKind::PermissionDenied,
            _ => StorageErrorKind::Io,
        };
        Self::new(engine, kind, error)
    }

    /// Returns the error kind.
    pub fn kind(&self) -> StorageErrorKind {
        self.kind
    }

    /// Whether the object or bucket did not exist.
    pub fn is_not_found(&self) -> bool {
        self.kind == StorageErrorKind::NotFound
    }

    /// Returns the storage engine name.
    pub fn engine(&self) -> &'static str {
        self.engine
    }

    /// Returns the bucket name, if available.
    pub fn bucket(&self) -> Option<&str> {
        self.bucket.as_deref()
    }

    /// Returns the key, if available.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Attach bucket and key context to an existing error.
    pub fn at(mut self, bucket: &str, key: &str) -> Self {
        self.bucket.get_or_insert_with(|| bucket.to_owned());
        self.key.get_or_insert_with(|| key.to_owned());
        self
    }

    /// Returns whether this error is likely retryable.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// Returns a reference to the captured backtrace.
    pub fn backtrace(&self) -> &Backtrace {
        &self.traces.backtrace
    }

    /// Returns a reference to the captured span trace.
    pub fn span_trace(&self) -> &SpanTrace {
        &self.traces.span_trace
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Storage error [{}] from {}", self.kind, self.engine)?;

        if let Some(bucket) = &self.bucket {
            write!(f, " (bucket: {})", bucket)?;
        }

        if let Some(key) = &self.key {
            write!(f, " (key: {})", key)?;
        }

        write!(f, ": {}", self.source)
    }
}

/// Builder for attaching optional context to a `StorageError`.
#[derive(Debug)]
pub struct StorageErrorBuilder {
    kind: StorageErrorKind,
    engine: &'static str,
    source: Box<dyn StdError + Send + Sync + 'static>,
    bucket: Option<String>,
    key: Option<String>,
}

impl StorageErrorBuilder {
    /// Set the bucket name.
    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    /// Set the key within the bucket.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Build the `StorageError`.
    #[track_caller]
    pub fn build(self) -> StorageError {
        StorageError {
            kind: self.kind,
            engine: self.engine,
            bucket: self.bucket,
            key: self.key,
            source: self.source,
            traces: Box::new(ErrorTrace::capture()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_impl_all!(StorageError: Send, Sync, StdError);

    #[test]
    fn io_errors_keep_their_kind() {
        let error = StorageError::io(
            "local",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(error.is_not_found());

        let error = StorageError::io(
            "local",
            std::io::Error::new(std::io::ErrorKind::Other, "disk on fire"),
        );
        assert_eq!(error.kind(), StorageErrorKind::Io);
        assert!(error.is_retryable());
    }

    #[test]
    fn display_includes_context() {
        let error = StorageError::not_found("memory", "shortlinks", Some("links/abc.json"));
        let message = error.to_string();
        assert!(message.contains("[not found]"));
        assert!(message.contains("bucket: shortlinks"));
        assert!(message.contains("key: links/abc.json"));
    }
}
