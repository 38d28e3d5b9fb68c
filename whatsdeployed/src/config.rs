//! Service configuration.
//!
//! Read from an optional TOML file, then overridden from the environment:
//!
//! ```toml
//! per_page = 100
//!
//! [github]
//! timeout = 10
//!
//! [server]
//! host = "0.0.0.0"
//! port = 5000
//! public_url = "https://whatsdeployed.io"
//!
//! [storage]
//! driver = "local"
//! path = "/var/lib/whatsdeployed"
//! ```

use std::io;

use api_client::Secret;
use camino::{Utf8Path, Utf8PathBuf};
use octocat::GithubConfig;
use serde::Deserialize;
use storage::StorageConfig;
use thiserror::Error;

use crate::deploy::DEFAULT_PER_PAGE;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("reading {path}: {source}")]
    Read {
        /// The config file.
        path: Utf8PathBuf,

        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The file is not valid configuration.
    #[error("parsing config: {0}")]
    Parse(#[from] toml_edit::de::Error),

    /// An environment override could not be parsed.
    #[error("invalid {var}: {value:?}")]
    Env {
        /// Variable name.
        var: &'static str,

        /// Rejected value.
        value: String,
    },
}

/// Where the HTTP service listens.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,

    /// Bind port.
    pub port: u16,

    /// Absolute site URL used for badge links, e.g. `https://whatsdeployed.io`.
    pub public_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            public_url: None,
        }
    }
}

impl ServerConfig {
    /// `host:port`, for binding.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Everything the service and CLI need.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Github API access.
    pub github: GithubConfig,

    /// HTTP service.
    pub server: ServerConfig,

    /// Where short links and history are stored.
    pub storage: StorageConfig,

    /// Commits compared per view.
    pub per_page: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            github: GithubConfig::default(),
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl Config {
    /// Parse TOML configuration. Missing sections take their defaults.
    pub fn from_toml(document: &str) -> Result<Self, ConfigError> {
        Ok(toml_edit::de::from_str(document)?)
    }

    /// Read the config file, if given, then apply environment overrides.
    pub fn load(path: Option<&Utf8Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let document = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_owned(),
                    source,
                })?;
                Self::from_toml(&document)?
            }
            None => Self::default(),
        };

        config.apply_env(|var| std::env::var(var).ok())?;
        tracing::debug!(?config, "loaded configuration");
        Ok(config)
    }

    /// Apply `GITHUB_AUTH_TOKEN`, `GITHUB_REQUEST_TIMEOUT`,
    /// `REQUESTS_USER_AGENT`, `HOST` and `PORT` from `lookup`.
    ///
    /// Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());

        if let Some(token) = get("GITHUB_AUTH_TOKEN") {
            self.github.token = Some(Secret::from(token));
        }
        if let Some(value) = get("GITHUB_REQUEST_TIMEOUT") {
            self.github.timeout = parse_env("GITHUB_REQUEST_TIMEOUT", value)?;
        }
        if let Some(user_agent) = get("REQUESTS_USER_AGENT") {
            self.github.user_agent = user_agent;
        }
        if let Some(host) = get("HOST") {
            self.server.host = host;
        }
        if let Some(value) = get("PORT") {
            self.server.port = parse_env("PORT", value)?;
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Env { var, value })
}
