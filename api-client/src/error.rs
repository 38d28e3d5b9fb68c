//! Error types for API Clients
use std::fmt;
use std::time::Duration;

use http::{StatusCode, Uri};
use thiserror::Error;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An error occured while sending or recieving an HTTP request
#[derive(Debug, Error)]
pub enum Error {
    /// The server answered with a non-success status.
    #[error(transparent)]
    Response(#[from] HttpResponseError),

    /// An error occured while recieving the response body
    #[error("reading response body: {0}")]
    ResponseBody(#[source] BoxError),

    /// A JSON body could not be encoded or decoded.
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// An error occured while sending the request
    #[error(transparent)]
    Request(#[from] hyperdriver::client::Error),

    /// Query parameters could not be encoded.
    #[error("encoding query: {0}")]
    Query(#[from] serde_urlencoded::ser::Error),

    /// The request could not be built.
    #[error("building request: {0}")]
    InvalidRequest(#[from] http::Error),

    /// The request did not complete in time.
    #[error("request to {uri} timed out after {timeout:?}")]
    Timeout {
        /// The target of the request.
        uri: Uri,
        /// The timeout that was exceeded.
        timeout: Duration,
    },
}

impl Error {
    /// The HTTP status of the response, when the server answered.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Response(error) => Some(error.status),
            _ => None,
        }
    }
}

/// A server returned an error response
#[derive(Debug, Clone)]
pub struct HttpResponseError {
    /// The URI which was requested.
    pub uri: Uri,

    /// The HTTP status code of the response
    pub status: StatusCode,

    /// The message body of the response
    pub message: String,
}

impl fmt::Display for HttpResponseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "HTTP {} from {}: {}", self.status, self.uri, self.message)
    }
}

impl std::error::Error for HttpResponseError {}
