//! URI utilities.

use camino::Utf8Path;
use http::Uri;
use thiserror::Error;
use url::Url;

/// Errors that can occur when parsing a URI.
#[derive(Debug, Error)]
pub enum ParseUriError {
    /// An error occurred while parsing the URL.
    #[error(transparent)]
    Url(#[from] url::ParseError),

    /// The URL is not an absolute `http` or `https` URL.
    #[error("not an http(s) URL: {0}")]
    Scheme(String),

    /// The URI is invalid, but URL parsing succeded.
    #[error("invalid URI: {0}")]
    Invalid(#[from] http::uri::InvalidUri),
}

/// Parse an absolute `http`/`https` URL, such as a user-supplied revision URL.
pub fn parse_http_uri(value: &str) -> Result<Uri, ParseUriError> {
    let url: Url = value.trim().parse()?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ParseUriError::Scheme(url.to_string()));
    }
    Ok(url.as_str().parse()?)
}

/// Extension trait for URIs.
pub trait UriExtension {
    /// Join a path to a URI.
    fn join<P: AsRef<str>>(self, path: P) -> Uri;

    /// Append an already URL-encoded query string to the URI.
    fn append_query(self, encoded: &str) -> Uri;

    /// Replace a query parameter in a URI.
    fn replace_query(self, key: &str, value: &str) -> Uri;
}

impl UriExtension for Uri {
    fn join<P: AsRef<str>>(self, path: P) -> Uri {
        let mut parts = self.into_parts();

        let base = parts
            .path_and_query
            .as_ref()
            .map(|pq| pq.path().to_owned())
            .unwrap_or_else(|| "/".to_owned());
        let joined = Utf8Path::new(&base).join(path.as_ref());
        parts.path_and_query = http::uri::PathAndQuery::from_maybe_shared(joined.to_string()).ok();
        Uri::from_parts(parts).unwrap_or_default()
    }

    fn append_query(self, encoded: &str) -> Uri {
        let combined = match self.query() {
            Some(existing) if !existing.is_empty() => {
                format!("{}?{existing}&{encoded}", self.path())
            }
            _ => format!("{}?{encoded}", self.path()),
        };

        let mut parts = self.clone().into_parts();
        match http::uri::PathAndQuery::from_maybe_shared(combined) {
            Ok(pq) => {
                parts.path_and_query = Some(pq);
                Uri::from_parts(parts).unwrap_or(self)
            }
            Err(error) => {
                tracing::warn!(%error, "dropping unencodable query");
                self
            }
        }
    }

    fn replace_query(self, key: &str, value: &str) -> Uri {
        let Ok(mut url) = Url::parse(&self.to_string()) else {
            return self;
        };

        let current = url
            .query_pairs()
            .filter(|(k, _)| k != key)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect::<Vec<_>>();

        url.query_pairs_mut()
            .clear()
            .extend_pairs(current)
            .append_pair(key, value);

        url.as_str().parse().unwrap_or(self)
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn join_api_paths() {
        let uri = "https://api.github.com/".parse::<Uri>().unwrap();
        assert_eq!(
            uri.join("repos/mozilla/kitsune/commits").to_string(),
            "https://api.github.com/repos/mozilla/kitsune/commits"
        );

        let uri = "https://ghe.example.com/api/v3".parse::<Uri>().unwrap();
        assert_eq!(
            uri.join("repos/a/b/tags").to_string(),
            "https://ghe.example.com/api/v3/repos/a/b/tags"
        );

        let uri = "https://ghe.example.com/api/v3/".parse::<Uri>().unwrap();
        assert_eq!(uri.join("/rate_limit").to_string(), "https://ghe.example.com/rate_limit");
    }

    #[test]
    fn append_to_existing_query() {
        let uri = "https://prod.example.com/__version__?v=1".parse::<Uri>().unwrap();
        assert_eq!(
            uri.append_query("cachescramble=12").to_string(),
            "https://prod.example.com/__version__?v=1&cachescramble=12"
        );

        let uri = "https://prod.example.com/__version__".parse::<Uri>().unwrap();
        assert_eq!(
            uri.append_query("cachescramble=12").to_string(),
            "https://prod.example.com/__version__?cachescramble=12"
        );
    }

    #[test]
    fn replace_query_parameter() {
        let uri = "https://example.com/revision?cachescramble=1&x=y"
            .parse::<Uri>()
            .unwrap();
        assert_eq!(
            uri.replace_query("cachescramble", "2").to_string(),
            "https://example.com/revision?x=y&cachescramble=2"
        );
    }

    #[test]
    fn only_http_urls_are_accepted() {
        assert!(parse_http_uri("https://example.com/version.json").is_ok());
        assert!(matches!(
            parse_http_uri("ftp://example.com/sha"),
            Err(ParseUriError::Scheme(_))
        ));
        assert!(parse_http_uri("not a url").is_err());
    }
}
