//! Blocking `reqwest` implementation of [`podlink::Connection`].
//!
//! Redirects are never followed: several pod endpoints report success with a
//! `302` and the models need to see it. The CSRF token is taken from the
//! config when present, otherwise scraped once from the `csrf-token` meta
//! tag of the configured token page and cached for the session.

use std::sync::{LazyLock, Mutex};

use podlink::{Body, Connection, Method, Request, Response, TransportError};
use regex::Regex;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{COOKIE, USER_AGENT};
use reqwest::redirect::Policy;
use tracing::{debug, info};

use crate::config::{ConfigError, PodConfig};

/// `<meta name="csrf-token" content="…">`
static CSRF_META_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<meta\s+name=["']csrf-token["']\s+content=["']([^"']+)["']"#)
        .expect("invalid csrf meta regex")
});

/// Pull the CSRF token out of a rendered pod page.
pub fn scrape_csrf_token(html: &str) -> Option<String> {
    CSRF_META_RE.captures(html).map(|c| c[1].to_string())
}

pub struct HttpConnection {
    client: Client,
    config: PodConfig,
    token: Mutex<Option<String>>,
}

impl HttpConnection {
    pub fn new(config: PodConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;

        Ok(Self {
            client,
            token: Mutex::new(config.csrf_token.clone()),
            config,
        })
    }

    /// Build a connection from `PODLINK_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(PodConfig::from_env()?)
    }

    pub fn config(&self) -> &PodConfig {
        &self.config
    }

    /// Absolute URL of `path` on this pod.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.pod_url, path.trim_start_matches('/'))
    }

    /// Drop the cached token and scrape a fresh one.
    pub fn refresh_token(&self) -> Result<String, TransportError> {
        let response = self.send(Request::get(self.config.token_page.as_str()))?;
        if !response.is_success() {
            return Err(TransportError::Csrf(format!(
                "token page {} answered {}",
                self.config.token_page, response.status
            )));
        }
        let token = scrape_csrf_token(&response.body).ok_or_else(|| {
            TransportError::Csrf(format!("no csrf-token meta tag on {}", self.config.token_page))
        })?;

        info!(page = %self.config.token_page, "csrf token refreshed");
        *self.lock_token() = Some(token.clone());
        Ok(token)
    }

    fn lock_token(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.token.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn builder(&self, request: &Request) -> RequestBuilder {
        let url = self.url(&request.path);
        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Put => self.client.put(url),
            Method::Delete => self.client.delete(url),
        };

        builder = builder.header(USER_AGENT, self.config.user_agent.as_str());
        if let Some(cookie) = &self.config.session_cookie {
            builder = builder.header(COOKIE, cookie.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        match &request.body {
            Body::Empty => builder,
            Body::Form(pairs) => builder.form(pairs),
            Body::Json(value) => builder.json(value),
        }
    }
}

impl Connection for HttpConnection {
    fn send(&self, request: Request) -> Result<Response, TransportError> {
        let response = self
            .builder(&request)
            .send()
            .map_err(|e| TransportError::Http(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| TransportError::Http(e.to_string()))?;

        debug!(method = %request.method, path = %request.path, status, "pod request");
        Ok(Response { status, body })
    }

    fn csrf_token(&self) -> Result<String, TransportError> {
        if let Some(token) = self.lock_token().as_ref() {
            return Ok(token.clone());
        }
        self.refresh_token()
    }
}
