//! A small HTTP client for JSON APIs, built on `hyperdriver`.
//!
//! Individual API clients (such as the GitHub client) wrap an [`ApiClient`], which handles
//! the base URL, authentication, timeouts and response decoding.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use arc_swap::Guard;
use http::Method;
use http::Uri;
use hyperdriver::service::SharedService;
use tower::ServiceExt;

mod authentication;
mod error;
mod paginate;
pub mod request;
pub mod response;
mod secret;
pub mod uri;

pub use self::authentication::{
    Authentication, AuthenticationLayer, AuthenticationService, TokenAuth,
};
pub use self::error::{Error, HttpResponseError};
pub use self::paginate::{next_link, pages};
pub use self::request::{RequestBuilder, RequestExt};
pub use self::response::ApiResponse;
pub use self::secret::Secret;
use self::uri::UriExtension as _;

/// A client for accessing APIs over HTTP / HTTPS
///
/// Useful inner object to wrap for individual API clients.
#[derive(Debug)]
pub struct ApiClient<A> {
    base: Uri,
    inner: hyperdriver::client::SharedClientService<hyperdriver::Body, hyperdriver::Body>,
    authentication: Arc<ArcSwap<A>>,
    timeout: Option<Duration>,
}

impl<A> Clone for ApiClient<A> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            inner: self.inner.clone(),
            authentication: self.authentication.clone(),
            timeout: self.timeout,
        }
    }
}

impl<A> ApiClient<A>
where
    A: Authentication + Send + Sync + 'static,
{
    /// Create a new API Client from a base URL and an authentication method
    pub fn new(base: Uri, authentication: A) -> Self {
        let authentication = Arc::new(ArcSwap::new(Arc::new(authentication)));
        let inner = hyperdriver::Client::build_tcp_http()
            .with_default_tls()
            .layer(AuthenticationLayer::new(authentication.clone()))
            .build_service();

        ApiClient {
            base,
            inner,
            authentication,
            timeout: None,
        }
    }

    /// Create a new API Client which sends requests through `inner`.
    ///
    /// This is how custom middleware stacks (and the [`mock::MockService`]) are plugged in.
    pub fn new_with_inner_service<S>(base: Uri, authentication: A, inner: S) -> Self
    where
        S: tower::Service<
                http::Request<hyperdriver::Body>,
                Response = http::Response<hyperdriver::Body>,
                Error = hyperdriver::client::Error,
            > + Clone
            + Send
            + Sync
            + 'static,
        S::Future: Send + 'static,
    {
        let authentication = Arc::new(ArcSwap::new(Arc::new(authentication)));

        let service = tower::ServiceBuilder::new()
            .layer(SharedService::layer())
            .layer(AuthenticationLayer::new(authentication.clone()))
            .service(inner);

        ApiClient {
            base,
            inner: service,
            authentication,
            timeout: None,
        }
    }

    /// The credentials currently in use.
    pub fn auth(&self) -> Guard<Arc<A>> {
        self.authentication.as_ref().load()
    }
}

impl<A> ApiClient<A> {
    /// Apply a default timeout to every request built by this client.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The default request timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Build a request against an absolute URI.
    pub fn request(&self, method: Method, uri: Uri) -> RequestBuilder<A> {
        RequestBuilder::new(self.clone(), uri, method)
    }

    /// Build a GET request against an endpoint relative to the base URL.
    pub fn get(&self, endpoint: &str) -> RequestBuilder<A> {
        self.request(Method::GET, self.base.clone().join(endpoint))
    }

    /// Send a fully-built request.
    pub async fn execute(&self, req: http::Request<hyperdriver::Body>) -> Result<ApiResponse, Error> {
        let parts = req.parts();
        tracing::trace!(method = %parts.method, uri = %parts.uri, "sending request");

        let response = self.inner.clone().oneshot(req).await?;
        Ok(ApiResponse::new(parts, response))
    }
}

/// In-memory HTTP fixtures for testing API clients without a network.
pub mod mock {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use bytes::Bytes;
    use http::response;

    /// A canned response.
    #[derive(Debug, Clone)]
    pub struct MockResponse {
        status: http::StatusCode,
        headers: http::HeaderMap,
        body: Bytes,
    }

    impl MockResponse {
        /// A response with the given status, headers and body.
        pub fn new(status: http::StatusCode, headers: http::HeaderMap, body: impl Into<Bytes>) -> Self {
            Self {
                status,
                headers,
                body: body.into(),
            }
        }

        /// A `200 OK` response with a JSON body.
        pub fn json(value: &serde_json::Value) -> Self {
            let mut headers = http::HeaderMap::new();
            headers.insert(
                http::header::CONTENT_TYPE,
                http::HeaderValue::from_static("application/json"),
            );
            Self::new(http::StatusCode::OK, headers, value.to_string())
        }

        /// A `200 OK` response with a plain text body.
        pub fn text(body: &str) -> Self {
            Self::new(http::StatusCode::OK, http::HeaderMap::new(), body.to_owned())
        }

        /// Add a header to the response.
        pub fn with_header(mut self, name: http::HeaderName, value: &str) -> Self {
            if let Ok(value) = value.parse() {
                self.headers.append(name, value);
            }
            self
        }
    }

    /// A tower service which answers requests by path (ignoring the query string).
    ///
    /// Unknown paths get a `404 Not Found`. Every requested URI and its headers
    /// are recorded.
    #[derive(Debug, Default, Clone)]
    pub struct MockService {
        responses: HashMap<String, MockResponse>,
        requests: Arc<Mutex<Vec<(http::Uri, http::HeaderMap)>>>,
    }

    impl MockService {
        /// An empty set of fixtures.
        pub fn new() -> Self {
            Self::default()
        }

        /// Answer requests for `path` with `response`.
        pub fn add(&mut self, path: &str, response: MockResponse) -> &mut Self {
            self.responses.insert(path.to_owned(), response);
            self
        }

        /// The URIs requested so far, in order.
        pub fn requests(&self) -> Vec<http::Uri> {
            self.requests
                .lock()
                .map(|requests| requests.iter().map(|(uri, _)| uri.clone()).collect())
                .unwrap_or_default()
        }

        /// The headers of each request so far, in order.
        pub fn headers(&self) -> Vec<http::HeaderMap> {
            self.requests
                .lock()
                .map(|requests| requests.iter().map(|(_, headers)| headers.clone()).collect())
                .unwrap_or_default()
        }
    }

    impl tower::Service<http::Request<hyperdriver::Body>> for MockService {
        type Response = http::Response<hyperdriver::Body>;
        type Error = hyperdriver::client::Error;
        type Future = std::future::Ready<Result<Self::Response, Self::Error>>;

        fn poll_ready(
            &mut self,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<Result<(), Self::Error>> {
            std::task::Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: http::Request<hyperdriver::Body>) -> Self::Future {
            if let Ok(mut requests) = self.requests.lock() {
                requests.push((req.uri().clone(), req.headers().clone()));
            }

            let response = self
                .responses
                .get(req.uri().path())
                .cloned()
                .unwrap_or_else(|| {
                    MockResponse::new(
                        http::StatusCode::NOT_FOUND,
                        http::HeaderMap::new(),
                        format!("no fixture for {}", req.uri().path()),
                    )
                });

            let mut builder = response::Builder::new()
                .status(response.status)
                .version(http::Version::HTTP_11);

            if let Some(headers) = builder.headers_mut() {
                headers.extend(response.headers);
            }

            let response = builder
                .body(hyperdriver::Body::from(response.body))
                .expect("mock responses are valid");

            std::future::ready(Ok(response))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockResponse, MockService};

    #[test]
    fn extensions_produce_send_futures() {
        let client = ApiClient::new(
            "https://api.github.com/".parse().unwrap(),
            TokenAuth::github("secret garden"),
        );
        let builder = client.get("rate_limit");

        fn assert_send<T: Send>(_t: T) {}

        let fut = builder.send();
        assert_send(fut);
    }

    #[tokio::test]
    async fn mock_client_round_trip() {
        let mut mock = MockService::new();
        mock.add(
            "/repos/o/r/commits",
            MockResponse::json(&serde_json::json!([{"sha": "abc"}])),
        );

        let client = ApiClient::new_with_inner_service(
            "https://api.github.com/".parse().unwrap(),
            TokenAuth::github("secret garden"),
            mock.clone(),
        );

        let response = client
            .get("repos/o/r/commits")
            .query(&[("per_page", "100")])
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), http::StatusCode::OK);

        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body[0]["sha"], "abc");
        assert_eq!(mock.requests()[0].query(), Some("per_page=100"));
    }

    #[tokio::test]
    async fn error_for_status_reads_message() {
        let client = ApiClient::new_with_inner_service(
            "https://api.github.com/".parse().unwrap(),
            (),
            MockService::new(),
        );

        let error = client
            .get("missing")
            .send()
            .await
            .unwrap()
            .error_for_status()
            .await
            .unwrap_err();
        assert_eq!(error.status(), Some(http::StatusCode::NOT_FOUND));
        assert!(error.to_string().contains("no fixture for /missing"));
    }

    #[tokio::test]
    async fn pages_follow_link_headers() {
        use futures::TryStreamExt as _;

        let mut mock = MockService::new();
        mock.add(
            "/repos/o/r/tags",
            MockResponse::json(&serde_json::json!([1, 2])).with_header(
                http::header::LINK,
                r#"<https://api.github.com/repositories/9/tags?page=2>; rel="next""#,
            ),
        );
        mock.add(
            "/repositories/9/tags",
            MockResponse::json(&serde_json::json!([3])),
        );

        let client = ApiClient::new_with_inner_service(
            "https://api.github.com/".parse().unwrap(),
            (),
            mock,
        );

        let pages: Vec<Vec<u32>> = pages(client.get("repos/o/r/tags")).try_collect().await.unwrap();
        assert_eq!(pages, vec![vec![1, 2], vec![3]]);
    }
}
