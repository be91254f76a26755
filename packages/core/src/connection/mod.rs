//! The transport seam between the object model and a pod.
//!
//! The [`Connection`] trait is the only thing the models know about HTTP.
//! A model builds a [`Request`] with a path relative to the pod root, hands
//! it to the connection, and inspects the returned [`Response`]. Cookies,
//! base URLs, timeouts and redirects are the connection's business.
//!
//! # Implementations
//!
//! | Type | When to use |
//! |------|-------------|
//! | [`MockConnection`] | Tests; scripted responses, recorded requests |
//! | `podlink_http::HttpConnection` | A real pod over blocking `reqwest` |
//!
//! [`MockConnection`]: mock::MockConnection

pub mod mock;

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

// ---------------------------------------------------------------------------
// TransportError
// ---------------------------------------------------------------------------

/// Errors a [`Connection`] can return before any status code is known.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The request could not be sent or the response could not be read.
    #[error("http: {0}")]
    Http(String),

    /// No CSRF token could be obtained for a state-changing request.
    #[error("csrf token unavailable: {0}")]
    Csrf(String),
}

// ---------------------------------------------------------------------------
// Request / Response
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
            Method::Put => write!(f, "PUT"),
            Method::Delete => write!(f, "DELETE"),
        }
    }
}

/// Request payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Body {
    #[default]
    Empty,
    /// `application/x-www-form-urlencoded` pairs, in order.
    Form(Vec<(String, String)>),
    /// `application/json`.
    Json(Value),
}

/// One HTTP request against a pod, addressed relative to the pod root
/// (e.g. `posts/42.json`).
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Body,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: Body::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Ask for a JSON response.
    pub fn accept_json(self) -> Self {
        self.header("accept", "application/json")
    }

    /// Append a form field, turning the body into a form if it was empty.
    ///
    /// On a JSON object body the field becomes a string member of the
    /// object. Any other JSON body cannot carry fields.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        match &mut self.body {
            Body::Form(pairs) => pairs.push((key.into(), value.into())),
            Body::Empty => self.body = Body::Form(vec![(key.into(), value.into())]),
            Body::Json(Value::Object(members)) => {
                members.insert(key.into(), Value::String(value.into()));
            }
            Body::Json(other) => {
                debug_assert!(other.is_object(), "form field added to a non-object JSON body");
            }
        }
        self
    }

    pub fn json(mut self, value: Value) -> Self {
        self.body = Body::Json(value);
        self
    }

    /// Case-insensitive header lookup.
    pub fn header_value(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Form field lookup; `None` for non-form bodies.
    pub fn form_value(&self, key: &str) -> Option<&str> {
        match &self.body {
            Body::Form(pairs) => pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }
}

/// Status and body of a pod's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }

    /// Parse the body as JSON; an empty body reads as `null`.
    pub fn json_value(&self) -> Result<Value, serde_json::Error> {
        if self.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&self.body)
    }
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// An authenticated session with one pod.
///
/// Implementations must be usable from a shared reference; models hold an
/// `Arc<dyn Connection>` and never need exclusive access to it.
pub trait Connection: Send + Sync {
    /// Send one request and return the pod's answer, whatever its status.
    fn send(&self, request: Request) -> Result<Response, TransportError>;

    /// The anti-forgery token to attach to state-changing requests.
    fn csrf_token(&self) -> Result<String, TransportError>;

    fn get(&self, path: &str) -> Result<Response, TransportError> {
        self.send(Request::get(path))
    }

    fn post(&self, request: Request) -> Result<Response, TransportError> {
        self.send(Request {
            method: Method::Post,
            ..request
        })
    }

    fn put(&self, request: Request) -> Result<Response, TransportError> {
        self.send(Request {
            method: Method::Put,
            ..request
        })
    }

    fn delete(&self, request: Request) -> Result<Response, TransportError> {
        self.send(Request {
            method: Method::Delete,
            ..request
        })
    }
}
