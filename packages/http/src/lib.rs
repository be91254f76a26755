//! Blocking HTTP transport for [`podlink`].
//!
//! [`HttpConnection`] implements [`podlink::Connection`] on top of
//! `reqwest::blocking`, so every model method blocks until the pod answers.
//! Logging in is not handled here: supply the session cookie of an
//! authenticated browser or bot session through [`PodConfig`].
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use podlink::{Connection, Conversation};
//! use podlink_http::HttpConnection;
//!
//! // PODLINK_POD_URL=https://pod.example.org PODLINK_SESSION_COOKIE=_diaspora_session=…
//! let conn: Arc<dyn Connection> = Arc::new(HttpConnection::from_env()?);
//! let thread = Conversation::open(conn, 17, true)?;
//! thread.answer("On my way")?;
//! ```

pub mod config;
pub mod connection;

pub use config::{ConfigError, PodConfig};
pub use connection::{scrape_csrf_token, HttpConnection};
