//! In-memory connection that replays scripted responses.
//!
//! Responses are handed out in the order they were queued, one per request.
//! Every request is recorded so callers can assert on what was sent. A
//! request that arrives when the queue is empty fails with
//! [`TransportError::Http`], which makes "this must not hit the network"
//! checks straightforward.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde_json::Value;

use super::{Connection, Request, Response, TransportError};

struct Inner {
    responses: VecDeque<Response>,
    requests: Vec<Request>,
}

/// Scripted [`Connection`] for tests.
pub struct MockConnection {
    token: Option<String>,
    inner: Mutex<Inner>,
}

impl MockConnection {
    /// A connection whose CSRF token is `"mock-token"`.
    pub fn new() -> Self {
        Self::with_token("mock-token")
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            inner: Mutex::new(Inner {
                responses: VecDeque::new(),
                requests: Vec::new(),
            }),
        }
    }

    /// A connection that cannot produce a CSRF token.
    pub fn without_token() -> Self {
        Self {
            token: None,
            ..Self::new()
        }
    }

    /// Queue a raw response.
    pub fn respond(&self, status: u16, body: impl Into<String>) -> &Self {
        self.lock().responses.push_back(Response::new(status, body));
        self
    }

    /// Queue a response whose body is `value` serialised as JSON.
    pub fn respond_json(&self, status: u16, value: &Value) -> &Self {
        self.respond(status, value.to_string())
    }

    /// Everything sent so far, oldest first.
    pub fn requests(&self) -> Vec<Request> {
        self.lock().requests.clone()
    }

    pub fn last_request(&self) -> Option<Request> {
        self.lock().requests.last().cloned()
    }

    /// Number of queued responses nobody asked for yet.
    pub fn pending(&self) -> usize {
        self.lock().responses.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A panic while holding the lock can only come from a failing test;
        // the data is still consistent, so keep going.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MockConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl Connection for MockConnection {
    fn send(&self, request: Request) -> Result<Response, TransportError> {
        let mut inner = self.lock();
        let label = format!("{} {}", request.method, request.path);
        inner.requests.push(request);
        inner
            .responses
            .pop_front()
            .ok_or_else(|| TransportError::Http(format!("no scripted response for {label}")))
    }

    fn csrf_token(&self) -> Result<String, TransportError> {
        self.token
            .clone()
            .ok_or_else(|| TransportError::Csrf("mock connection has no token".into()))
    }
}
