//! Authentication for API clients.
//!
//! The `Authentication` trait is applied to every request sent through an `ApiClient`.
//!
//! Implementations provided here:
//! - `TokenAuth` for `Authorization: <scheme> <token>` headers (GitHub uses `token`)
//! - `Option<A>` for credentials which may not be configured
//! - `()` for no authentication

use std::sync::Arc;

use arc_swap::ArcSwap;
use tower::layer::Layer;

use crate::Secret;

/// Adds credentials to an outgoing request.
pub trait Authentication: Clone {
    /// Called by the `ApiClient` for every request.
    fn authenticate<B>(&self, req: http::Request<B>) -> http::Request<B>;
}

/// Authentication with a token and a scheme, such as `token ghp_...` or `Bearer ...`.
///
/// # Example
/// ```rust
/// use api_client::TokenAuth;
///
/// let auth = TokenAuth::github("ghp_secret");
/// let header = auth.header_value().unwrap();
///
/// assert_eq!(header.to_str().unwrap(), "token ghp_secret");
/// ```
#[derive(Debug, Clone)]
pub struct TokenAuth {
    scheme: &'static str,
    token: Secret,
}

impl TokenAuth {
    /// Create a token authentication using the GitHub `token` scheme.
    pub fn github<K: Into<Secret>>(token: K) -> Self {
        Self {
            scheme: "token",
            token: token.into(),
        }
    }

    /// Create a token authentication using the `Bearer` scheme.
    pub fn bearer<K: Into<Secret>>(token: K) -> Self {
        Self {
            scheme: "Bearer",
            token: token.into(),
        }
    }

    /// The header value for this token, if the token is a valid header.
    pub fn header_value(&self) -> Option<http::HeaderValue> {
        self.token.authorization(self.scheme).ok()
    }
}

impl Authentication for TokenAuth {
    fn authenticate<B>(&self, mut req: http::Request<B>) -> http::Request<B> {
        if req.headers().contains_key(http::header::AUTHORIZATION) {
            tracing::warn!("{} header already set", http::header::AUTHORIZATION);
            return req;
        }

        match self.header_value() {
            Some(value) => {
                req.headers_mut().append(http::header::AUTHORIZATION, value);
            }
            None => tracing::warn!("token is not a valid header value, sending unauthenticated"),
        }
        req
    }
}

impl<A: Authentication> Authentication for Option<A> {
    fn authenticate<B>(&self, req: http::Request<B>) -> http::Request<B> {
        match self {
            Some(auth) => auth.authenticate(req),
            None => req,
        }
    }
}

impl Authentication for () {
    fn authenticate<B>(&self, req: http::Request<B>) -> http::Request<B> {
        req
    }
}

/// A layer to provide a swappable authentication mechanism.
#[derive(Debug)]
pub struct AuthenticationLayer<A> {
    auth: Arc<ArcSwap<A>>,
}

impl<A> Clone for AuthenticationLayer<A> {
    fn clone(&self) -> Self {
        Self {
            auth: self.auth.clone(),
        }
    }
}

impl<A> AuthenticationLayer<A> {
    pub(crate) fn new(auth: Arc<ArcSwap<A>>) -> Self {
        Self { auth }
    }
}

impl<A, S> Layer<S> for AuthenticationLayer<A> {
    type Service = AuthenticationService<A, S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthenticationService {
            inner,
            auth: self.auth.clone(),
        }
    }
}

/// A service which authenticates each request before passing it on.
#[derive(Debug)]
pub struct AuthenticationService<A, S> {
    inner: S,
    auth: Arc<ArcSwap<A>>,
}

impl<A, S: Clone> Clone for AuthenticationService<A, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            auth: self.auth.clone(),
        }
    }
}

impl<A, S, BIn, BOut> tower::Service<http::Request<BIn>> for AuthenticationService<A, S>
where
    A: Authentication,
    S: tower::Service<http::Request<BIn>, Response = http::Response<BOut>>,
    S::Future: Send + 'static,
{
    type Response = http::Response<BOut>;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: http::Request<BIn>) -> Self::Future {
        let req = self.auth.load().authenticate(req);
        self.inner.call(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> http::Request<()> {
        http::Request::get("https://api.github.com/").body(()).unwrap()
    }

    #[test]
    fn github_token_scheme() {
        let req = TokenAuth::github("abc").authenticate(request());
        assert_eq!(
            req.headers()[http::header::AUTHORIZATION].to_str().unwrap(),
            "token abc"
        );
    }

    #[test]
    fn missing_token_leaves_request_alone() {
        let auth: Option<TokenAuth> = None;
        let req = auth.authenticate(request());
        assert!(!req.headers().contains_key(http::header::AUTHORIZATION));
    }

    #[test]
    fn existing_header_is_kept() {
        let mut req = request();
        req.headers_mut()
            .insert(http::header::AUTHORIZATION, "Bearer other".parse().unwrap());
        let req = TokenAuth::github("abc").authenticate(req);
        assert_eq!(
            req.headers()[http::header::AUTHORIZATION].to_str().unwrap(),
            "Bearer other"
        );
    }
}
