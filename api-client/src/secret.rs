//! Credentials which should never show up in logs.

use std::{borrow::Cow, env::VarError, fmt};

use http::{header::InvalidHeaderValue, HeaderValue};
use serde::Deserialize;
use zeroize::Zeroize;

/// A credential, such as an API token.
///
/// The value is hidden from `Debug` output and zeroed on drop.
/// Use [Secret::revealed] to get the underlying value.
#[derive(Clone, Deserialize)]
#[serde(from = "String")]
pub struct Secret(Cow<'static, str>);

impl Secret {
    /// Read a secret from an environment variable.
    pub fn from_env(var: &str) -> Result<Self, VarError> {
        let value = std::env::var(var)?;
        Ok(Secret(value.into()))
    }

    /// Read a secret from an environment variable, treating an empty value as missing.
    pub fn from_env_opt(var: &str) -> Option<Self> {
        Self::from_env(var).ok().filter(|secret| !secret.is_empty())
    }

    /// Expose the underlying value.
    pub fn revealed(&self) -> &str {
        &self.0
    }

    /// Whether the secret has no content.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Render the secret as an `Authorization` value with the given scheme, e.g. `token` or `Bearer`.
    pub fn authorization(&self, scheme: &str) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut header = HeaderValue::try_from(format!("{scheme} {}", self.revealed()))?;
        header.set_sensitive(true);
        Ok(header)
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        if let Cow::Owned(ref mut s) = self.0 {
            s.zeroize()
        }
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(****)")
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Secret(value.into())
    }
}

impl From<&'static str> for Secret {
    fn from(value: &'static str) -> Self {
        Secret(value.into())
    }
}
