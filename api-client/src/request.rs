use std::time::Duration;

use bytes::Bytes;
use http::{header::HeaderValue, HeaderMap, HeaderName, Method, Uri};
use serde::Serialize;

use crate::error::Error;
use crate::uri::UriExtension as _;
use crate::{response::ApiResponse, ApiClient, Authentication};

/// Extension methods for `http::Request`.
pub trait RequestExt {
    /// A copy of the request head, without the body.
    fn parts(&self) -> http::request::Parts;
}

impl<B> RequestExt for http::Request<B> {
    fn parts(&self) -> http::request::Parts {
        let (mut parts, _) = http::Request::new(()).into_parts();
        parts.method = self.method().clone();
        parts.uri = self.uri().clone();
        parts.version = self.version();
        parts.headers = self.headers().clone();
        parts
    }
}

/// Builds a single request against an `ApiClient`.
///
/// Errors from building the request (bad header values, unencodable query parameters)
/// are deferred until [`RequestBuilder::send`].
#[derive(Debug)]
pub struct RequestBuilder<A> {
    client: ApiClient<A>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Option<hyperdriver::Body>,
    timeout: Option<Duration>,
    error: Option<Error>,
}

impl<A> RequestBuilder<A> {
    /// Start a new request for `uri`.
    pub fn new(client: ApiClient<A>, uri: Uri, method: Method) -> Self {
        let timeout = client.timeout();
        Self {
            client,
            method,
            uri,
            headers: HeaderMap::new(),
            body: None,
            timeout,
            error: None,
        }
    }

    /// The client this request will be sent with.
    pub fn client(&self) -> &ApiClient<A> {
        &self.client
    }

    /// The URI this request will be sent to.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Add a header to the request.
    pub fn header<K, V>(mut self, key: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        let key = HeaderName::try_from(key).map_err(Into::into);
        let value = HeaderValue::try_from(value).map_err(Into::into);
        match (key, value) {
            (Ok(key), Ok(value)) => {
                self.headers.append(key, value);
            }
            (Err(error), _) | (_, Err(error)) => {
                self.error.get_or_insert(Error::InvalidRequest(error));
            }
        }
        self
    }

    /// Append URL-encoded query parameters to the request URI.
    pub fn query<Q: Serialize + ?Sized>(mut self, query: &Q) -> Self {
        match serde_urlencoded::to_string(query) {
            Ok(encoded) if encoded.is_empty() => {}
            Ok(encoded) => self.uri = self.uri.append_query(&encoded),
            Err(error) => {
                self.error.get_or_insert(error.into());
            }
        }
        self
    }

    /// Override the timeout for this request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the raw request body.
    pub fn body<B: Into<hyperdriver::Body>>(self, body: B) -> Self {
        Self {
            body: Some(body.into()),
            ..self
        }
    }

    /// Serialize `value` as the JSON request body.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => {
                self.headers.insert(
                    http::header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
                self.body = Some(hyperdriver::Body::from(Bytes::from(body)));
            }
            Err(error) => {
                self.error.get_or_insert(error.into());
            }
        }
        self
    }

    /// Send the request, applying the timeout if one is set.
    pub async fn send(self) -> Result<ApiResponse, Error>
    where
        A: Authentication,
    {
        if let Some(error) = self.error {
            return Err(error);
        }

        let mut builder = http::Request::builder()
            .method(self.method)
            .uri(self.uri.clone());
        if let Some(headers) = builder.headers_mut() {
            headers.extend(self.headers);
        }
        let req = builder.body(self.body.unwrap_or_else(hyperdriver::Body::empty))?;

        match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.client.execute(req))
                .await
                .map_err(|_| Error::Timeout {
                    uri: self.uri,
                    timeout,
                })?,
            None => self.client.execute(req).await,
        }
    }
}
