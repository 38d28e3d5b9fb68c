use std::time::Duration;

use api_client::Secret;
use serde::Deserialize;

pub(crate) const DEFAULT_BASE: &str = "https://api.github.com/";
pub(crate) const DEFAULT_USER_AGENT: &str = "whatsdeployed (https://whatsdeployed.io)";
const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

/// Configuration for talking to the Github REST API.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    /// Personal access token. Anonymous requests are heavily rate limited.
    pub token: Option<Secret>,

    /// API root, for Github Enterprise installations.
    pub base: String,

    /// Sent as the `User-Agent` header, which Github requires.
    pub user_agent: String,

    /// Per-request timeout, in seconds.
    pub timeout: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token: None,
            base: DEFAULT_BASE.to_owned(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            timeout: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

impl GithubConfig {
    /// The request timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// The token, unless it is unset or blank.
    pub(crate) fn token(&self) -> Option<Secret> {
        self.token.clone().filter(|token| !token.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config: GithubConfig = serde_json::from_value(serde_json::json!({
            "token": "ghp_example",
        }))
        .unwrap();

        assert_eq!(config.token().unwrap().revealed(), "ghp_example");
        assert_eq!(config.base, DEFAULT_BASE);
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn blank_token_is_anonymous() {
        let config = GithubConfig {
            token: Some("".into()),
            ..Default::default()
        };
        assert!(config.token().is_none());
    }
}
