//! Response wrapper for working with HTTP responses from an `ApiClient`.

use bytes::Bytes;
use http_body_util::BodyExt as _;
use hyperdriver::Body;

use crate::error::{Error, HttpResponseError};

/// An HTTP response, along with the parts of the request that produced it.
#[derive(Debug)]
pub struct ApiResponse {
    request: http::request::Parts,
    response: http::response::Parts,
    body: Body,
}

impl ApiResponse {
    /// Create a new `ApiResponse` instance.
    pub fn new(request: http::request::Parts, response: http::Response<Body>) -> Self {
        let (response, body) = response.into_parts();

        Self {
            request,
            response,
            body,
        }
    }

    /// Get the status code of the response.
    pub fn status(&self) -> http::StatusCode {
        self.response.status
    }

    /// Get the headers of the response.
    pub fn headers(&self) -> &http::HeaderMap {
        &self.response.headers
    }

    /// Get the URI of the request that generated the response.
    pub fn uri(&self) -> &http::Uri {
        &self.request.uri
    }

    /// Get the parts of the request that generated the response.
    pub fn request(&self) -> &http::request::Parts {
        &self.request
    }

    /// Split into request parts, response parts and body.
    pub fn into_parts(self) -> (http::request::Parts, http::response::Parts, Body) {
        (self.request, self.response, self.body)
    }

    /// Collect the response body.
    pub async fn bytes(self) -> Result<Bytes, Error> {
        let collected = self
            .body
            .collect()
            .await
            .map_err(|error| Error::ResponseBody(error.into()))?;
        Ok(collected.to_bytes())
    }

    /// Collect the response body as UTF-8 text.
    pub async fn text(self) -> Result<String, Error> {
        let bytes = self.bytes().await?;
        String::from_utf8(bytes.to_vec()).map_err(|error| Error::ResponseBody(error.into()))
    }

    /// Collect the body and deserialize it as JSON.
    pub async fn json<T>(self) -> Result<T, Error>
    where
        T: serde::de::DeserializeOwned,
    {
        let bytes = self.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Convert this response into an error, reading the body as the message.
    pub async fn into_error(self) -> HttpResponseError {
        let uri = self.request.uri.clone();
        let status = self.status();
        let message = self
            .text()
            .await
            .unwrap_or_else(|err| format!("Failed to read response body: {err}"));

        HttpResponseError {
            uri,
            status,
            message,
        }
    }

    /// Pass the response through if its status is a success, otherwise read it as an error.
    pub async fn error_for_status(self) -> Result<Self, Error> {
        if self.status().is_success() {
            Ok(self)
        } else {
            Err(self.into_error().await.into())
        }
    }
}
