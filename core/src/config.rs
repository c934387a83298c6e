//! Client configuration.

use std::time::Duration;

use tracing::warn;

/// Public Travis CI API endpoint for open-source repositories.
pub const DEFAULT_BASE_URL: &str = "https://api.travis-ci.org";

/// Travis CI API endpoint for private repositories.
pub const PRO_BASE_URL: &str = "https://api.travis-ci.com";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings used to construct a `TravisClient`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API root, without a trailing slash.
    pub base_url: String,
    /// Travis API token, sent as `Authorization: token <token>`.
    pub token: Option<String>,
    pub user_agent: String,
    /// Upper bound for a single round trip. A context deadline that expires
    /// sooner takes precedence.
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            user_agent: concat!("travis-client/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds a configuration from the environment.
    ///
    /// - `TRAVIS_API_URL` overrides the base URL.
    /// - `TRAVIS_TOKEN` sets the API token; an empty value means no token.
    /// - `TRAVIS_TIMEOUT_SECS` sets the round-trip timeout; `0` disables it.
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("TRAVIS_API_URL").filter(|v| !v.trim().is_empty()) {
            config.base_url = url.trim().to_string();
        }

        config.token = lookup("TRAVIS_TOKEN").filter(|v| !v.is_empty());

        if let Some(raw) = lookup("TRAVIS_TIMEOUT_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(0) => config.timeout = None,
                Ok(secs) => config.timeout = Some(Duration::from_secs(secs)),
                Err(err) => {
                    warn!(value = %raw, error = %err, "ignoring invalid TRAVIS_TIMEOUT_SECS");
                }
            }
        }

        config
    }
}
