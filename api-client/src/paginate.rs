//! Pagination driven by `Link` response headers, as used by the GitHub REST API.

use futures::stream::{self, BoxStream, StreamExt as _};
use http::{HeaderMap, Method, Uri};
use serde::de::DeserializeOwned;

use crate::error::Error;
use crate::{Authentication, RequestBuilder};

/// Find the target of the `rel="next"` entry in the `Link` headers of a response.
///
/// # Example
/// ```rust
/// use api_client::next_link;
///
/// let mut headers = http::HeaderMap::new();
/// headers.insert(
///     http::header::LINK,
///     r#"<https://api.github.com/repositories/1/tags?page=2>; rel="next", <https://api.github.com/repositories/1/tags?page=5>; rel="last""#
///         .parse()
///         .unwrap(),
/// );
///
/// let next = next_link(&headers).unwrap();
/// assert_eq!(next.query(), Some("page=2"));
/// ```
pub fn next_link(headers: &HeaderMap) -> Option<Uri> {
    headers
        .get_all(http::header::LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .find_map(|link| {
            let mut segments = link.split(';');
            let target = segments
                .next()?
                .trim()
                .strip_prefix('<')?
                .strip_suffix('>')?;

            let is_next = segments.any(|param| {
                let Some((name, value)) = param.split_once('=') else {
                    return false;
                };
                name.trim().eq_ignore_ascii_case("rel")
                    && value
                        .trim()
                        .trim_matches('"')
                        .split_ascii_whitespace()
                        .any(|rel| rel.eq_ignore_ascii_case("next"))
            });

            if is_next {
                target.parse().ok()
            } else {
                None
            }
        })
}

enum Page<A> {
    First(RequestBuilder<A>),
    Next(Uri),
    Done,
}

/// Stream the pages of a JSON array endpoint, following `Link: rel="next"` headers.
///
/// Each item of the stream is one page. The stream ends after the first error,
/// so callers can keep the pages collected so far.
pub fn pages<A, T>(request: RequestBuilder<A>) -> BoxStream<'static, Result<Vec<T>, Error>>
where
    A: Authentication + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
{
    let client = request.client().clone();
    stream::unfold(Page::First(request), move |state| {
        let client = client.clone();
        async move {
            let request = match state {
                Page::First(request) => request,
                Page::Next(uri) => client.request(Method::GET, uri),
                Page::Done => return None,
            };

            let result = async {
                let response = request.send().await?.error_for_status().await?;
                let next = next_link(response.headers());
                tracing::trace!(uri = %response.uri(), next = ?next, "fetched page");
                let items: Vec<T> = response.json().await?;
                Ok::<_, Error>((items, next))
            }
            .await;

            match result {
                Ok((items, Some(next))) => Some((Ok(items), Page::Next(next))),
                Ok((items, None)) => Some((Ok(items), Page::Done)),
                Err(error) => Some((Err(error), Page::Done)),
            }
        }
    })
    .boxed()
}
