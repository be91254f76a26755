//! Connection configuration, populated from environment variables.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while building a [`PodConfig`] or the HTTP client.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has an invalid value: {value:?}")]
    Invalid { var: &'static str, value: String },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Settings for one pod session.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `PODLINK_POD_URL` | (required) | Base URL of the pod, e.g. `https://pod.example.org` |
/// | `PODLINK_SESSION_COOKIE` | (absent) | Sent verbatim as the `Cookie` header |
/// | `PODLINK_CSRF_TOKEN` | (absent = scraped) | Known CSRF token |
/// | `PODLINK_TOKEN_PAGE` | `stream` | Page whose `csrf-token` meta tag is scraped |
/// | `PODLINK_TIMEOUT_SECS` | `30` | Per-request timeout |
/// | `PODLINK_USER_AGENT` | `podlink/<version>` | `User-Agent` header |
#[derive(Debug, Clone, PartialEq)]
pub struct PodConfig {
    /// Pod root without a trailing slash.
    pub pod_url: String,

    /// Session cookie of an already logged-in user.
    pub session_cookie: Option<String>,

    /// CSRF token to use instead of scraping one.
    pub csrf_token: Option<String>,

    /// Path, relative to the pod root, of a page carrying a `csrf-token` meta tag.
    pub token_page: String,

    pub timeout: Duration,

    pub user_agent: String,
}

impl PodConfig {
    /// Defaults for `pod_url`.
    pub fn new(pod_url: impl Into<String>) -> Self {
        Self {
            pod_url: pod_url.into().trim_end_matches('/').to_string(),
            session_cookie: None,
            csrf_token: None,
            token_page: "stream".into(),
            timeout: Duration::from_secs(30),
            user_agent: concat!("podlink/", env!("CARGO_PKG_VERSION")).into(),
        }
    }

    pub fn with_session_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.session_cookie = Some(cookie.into());
        self
    }

    pub fn with_csrf_token(mut self, token: impl Into<String>) -> Self {
        self.csrf_token = Some(token.into());
        self
    }

    pub fn with_token_page(mut self, page: impl Into<String>) -> Self {
        self.token_page = page.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Populate config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Populate config from any variable source, applying defaults where absent.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let pod_url = lookup("PODLINK_POD_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("PODLINK_POD_URL"))?;
        if !(pod_url.starts_with("http://") || pod_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                var: "PODLINK_POD_URL",
                value: pod_url,
            });
        }

        let mut config = Self::new(pod_url);
        config.session_cookie = lookup("PODLINK_SESSION_COOKIE");
        config.csrf_token = lookup("PODLINK_CSRF_TOKEN");

        if let Some(page) = lookup("PODLINK_TOKEN_PAGE") {
            config.token_page = page;
        }
        if let Some(raw) = lookup("PODLINK_TIMEOUT_SECS") {
            let secs = raw.parse::<u64>().map_err(|_| ConfigError::Invalid {
                var: "PODLINK_TIMEOUT_SECS",
                value: raw.clone(),
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(agent) = lookup("PODLINK_USER_AGENT") {
            config.user_agent = agent;
        }
        Ok(config)
    }
}
