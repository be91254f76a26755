//! Private message threads (`conversations/{id}`).
//!
//! The caller must be a participant; the pod answers `404` otherwise.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::connection::{Connection, Request};
use crate::error::{Error, Resource, Result};

pub struct Conversation {
    connection: Arc<dyn Connection>,
    pub id: u64,
    data: Value,
}

impl Conversation {
    /// Bind to conversation `id`, fetching it right away unless `fetch` is
    /// `false`.
    pub fn open(connection: Arc<dyn Connection>, id: u64, fetch: bool) -> Result<Self> {
        let mut conversation = Self {
            connection,
            id,
            data: Value::Null,
        };
        if fetch {
            conversation.fetch()?;
        }
        Ok(conversation)
    }

    /// `GET conversations/{id}.json`
    pub fn fetch(&mut self) -> Result<()> {
        let response = self
            .connection
            .get(&format!("conversations/{}.json", self.id))?;
        if response.status != 200 {
            return Err(Error::unexpected(
                Resource::Conversation,
                "fetch",
                response.status,
            ));
        }

        let mut body: Value = response.json()?;
        self.data = body
            .get_mut("conversation")
            .map(Value::take)
            .ok_or(Error::MissingField {
                resource: Resource::Conversation,
                field: "conversation",
            })?;
        Ok(())
    }

    pub fn subject(&self) -> Option<&str> {
        self.data.get("subject").and_then(Value::as_str)
    }

    /// Messages in the thread; empty until fetched.
    pub fn messages(&self) -> &[Value] {
        self.data
            .get("messages")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Post `text` as a reply. Returns the created message.
    pub fn answer(&self, text: &str) -> Result<Value> {
        let token = self.connection.csrf_token()?;
        let request = Request::post(format!("conversations/{}/messages", self.id))
            .field("message[text]", text)
            .field("utf8", "&#x2713;")
            .field("authenticity_token", token)
            .accept_json();

        let response = self.connection.post(request)?;
        if response.status != 200 {
            return Err(Error::unexpected(
                Resource::Conversation,
                "answer",
                response.status,
            ));
        }
        Ok(response.json_value()?)
    }

    /// Hide the conversation for the current user.
    ///
    /// The pod deletes the visibility record and then fails to find it again,
    /// so `404` is the success status here and any other status is an error.
    pub fn delete(&self) -> Result<()> {
        let token = self.connection.csrf_token()?;
        let request = Request::delete(format!("conversations/{}/visibility/", self.id))
            .field("authenticity_token", token)
            .accept_json();

        let response = self.connection.delete(request)?;
        if response.status != 404 {
            warn!(
                id = self.id,
                status = response.status,
                "conversation delete answered with a non-404 status"
            );
            return Err(Error::unexpected(
                Resource::Conversation,
                "delete",
                response.status,
            ));
        }
        debug!(id = self.id, "conversation deleted");
        Ok(())
    }
}

impl fmt::Debug for Conversation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conversation")
            .field("id", &self.id)
            .field("subject", &self.subject())
            .finish_non_exhaustive()
    }
}
