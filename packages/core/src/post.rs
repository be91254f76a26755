//! Posts and the interactions on them.
//!
//! A [`Post`] moves through three states: created from an id and/or guid,
//! data fetched from `posts/{id}.json`, and optionally comments fetched
//! from `posts/{id}/comments.json`. The pod only serves comments by numeric
//! id, so a post opened by guid learns its id from the first fetch.
//!
//! Interactions are one request each. Apart from [`Post::like`], which
//! records the new like in the local data, they leave the local copy as it
//! was; call [`Post::fetch`] to resynchronise.

use std::fmt;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;
use urlencoding::encode;

use crate::comment::{display_str, Comment, Comments};
use crate::connection::{Connection, Request, Response};
use crate::error::{Error, Resource, Result};

/// How much to load when opening a post.
#[derive(Debug, Clone)]
pub struct PostOptions {
    /// Fetch the post data on construction.
    pub fetch: bool,
    /// Fetch comments from the comments endpoint. When `false`, comments
    /// embedded in the post data (`interactions.comments`) are used instead.
    pub comments: bool,
    /// Already known post data; skips the initial fetch unless `fetch` is set.
    pub data: Option<Value>,
}

impl Default for PostOptions {
    fn default() -> Self {
        Self {
            fetch: true,
            comments: true,
            data: None,
        }
    }
}

pub struct Post {
    connection: Arc<dyn Connection>,
    pub id: Option<u64>,
    pub guid: Option<String>,
    data: Value,
    pub comments: Comments,
}

impl Post {
    /// Open a post by id, guid, or both.
    pub fn open(
        connection: Arc<dyn Connection>,
        id: Option<u64>,
        guid: Option<String>,
        options: PostOptions,
    ) -> Result<Self> {
        let guid = guid.filter(|g| !g.is_empty());
        if id.is_none() && guid.is_none() {
            return Err(Error::MissingIdentifier);
        }

        let mut post = Self {
            connection,
            id,
            guid,
            data: Value::Null,
            comments: Comments::new(),
        };
        if let Some(data) = options.data {
            post.adopt(data);
        }

        if options.fetch {
            post.fetch_data()?;
        }
        if !post.has_data() {
            post.fetch_data()?;
        }
        if options.comments {
            post.fetch_comments()?;
        } else {
            post.load_embedded_comments()?;
        }
        Ok(post)
    }

    /// Wrap already fetched post data without any request.
    pub fn from_data(connection: Arc<dyn Connection>, data: Value) -> Result<Self> {
        let mut post = Self {
            connection,
            id: None,
            guid: None,
            data: Value::Null,
            comments: Comments::new(),
        };
        post.adopt(data);
        if post.id.is_none() && post.guid.is_none() {
            return Err(Error::MissingIdentifier);
        }
        post.load_embedded_comments()?;
        Ok(post)
    }

    fn has_data(&self) -> bool {
        self.data.as_object().is_some_and(|o| !o.is_empty())
    }

    /// Take `data` as the post's payload and fill in whichever identifiers
    /// are still unknown.
    fn adopt(&mut self, data: Value) {
        if self.id.is_none() {
            self.id = data.get("id").and_then(Value::as_u64);
        }
        if self.guid.is_none() {
            self.guid = data.get("guid").and_then(Value::as_str).map(str::to_string);
        }
        self.data = data;
    }

    fn load_embedded_comments(&mut self) -> Result<()> {
        let embedded = self
            .data
            .get("interactions")
            .and_then(|i| i.get("comments"))
            .and_then(Value::as_array)
            .cloned();
        if let Some(raw) = embedded {
            self.comments.set_json(&raw)?;
        }
        Ok(())
    }

    /// `GET posts/{id}.json`, or by guid when the id is unknown.
    pub fn fetch_data(&mut self) -> Result<()> {
        let reference = match (&self.id, &self.guid) {
            (Some(id), _) => id.to_string(),
            (None, Some(guid)) => encode(guid).into_owned(),
            (None, None) => return Err(Error::MissingIdentifier),
        };

        let response = self.connection.get(&format!("posts/{reference}.json"))?;
        if response.status != 200 {
            return Err(Error::unexpected(Resource::Post, "fetch", response.status));
        }
        let data = response.json()?;
        self.adopt(data);
        Ok(())
    }

    /// Load comments. A post with no comments gets an empty, fetched list
    /// without a request.
    ///
    /// Always addressed by the numeric id from the post data: the pod does
    /// not serve comments by guid.
    pub fn fetch_comments(&mut self) -> Result<()> {
        let count = self
            .data
            .get("interactions")
            .and_then(|i| i.get("comments_count"))
            .and_then(Value::as_u64)
            .unwrap_or(0);
        if count == 0 {
            self.comments.set(Vec::new());
            return Ok(());
        }

        let id = self
            .data
            .get("id")
            .and_then(Value::as_u64)
            .ok_or(missing("id"))?;
        let response = self.connection.get(&format!("posts/{id}/comments.json"))?;
        if response.status != 200 {
            return Err(Error::unexpected(
                Resource::Post,
                "fetch comments",
                response.status,
            ));
        }

        let raw: Vec<Value> = response.json()?;
        self.comments.set_json(&raw)
    }

    /// Refresh the post data, and the comments too if asked.
    pub fn fetch(&mut self, comments: bool) -> Result<&mut Self> {
        self.fetch_data()?;
        if comments {
            self.fetch_comments()?;
        }
        Ok(self)
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn set_data(&mut self, data: Value) {
        self.adopt(data);
    }

    pub fn text(&self) -> &str {
        self.data.get("text").and_then(Value::as_str).unwrap_or_default()
    }

    /// A field of the author object, e.g. `"name"`, `"guid"` or `"id"`.
    pub fn author(&self, key: &str) -> Option<&Value> {
        self.data.get("author").and_then(|a| a.get(key))
    }

    /// `AUTHOR (AUTHOR GUID): TEXT`
    pub fn summary(&self) -> String {
        format!(
            "{} ({}): {}",
            display_str(self.author("name")),
            display_str(self.author("guid")),
            self.text()
        )
    }

    // ── interactions ─────────────────────────────────────────────────────────

    fn numeric_id(&self) -> Result<u64> {
        self.id.ok_or(missing("id"))
    }

    /// A request carrying the CSRF token as `authenticity_token`.
    fn form_request(&self, request: Request) -> Result<Request> {
        let token = self.connection.csrf_token()?;
        Ok(request.field("authenticity_token", token).accept_json())
    }

    /// A request carrying the CSRF token as `x-csrf-token`.
    fn header_request(&self, request: Request) -> Result<Request> {
        let token = self.connection.csrf_token()?;
        Ok(request.header("x-csrf-token", token))
    }

    fn check_status(response: Response, status: u16, action: &'static str) -> Result<Response> {
        if response.status != status {
            return Err(Error::unexpected(Resource::Post, action, response.status));
        }
        debug!(action, status, "post interaction accepted");
        Ok(response)
    }

    /// Like the post. The returned like replaces the local likes list; a
    /// viewer can only like once.
    pub fn like(&mut self) -> Result<Value> {
        let id = self.numeric_id()?;
        let request = self.form_request(Request::post(format!("posts/{id}/likes")))?;
        let response = Self::check_status(self.connection.post(request)?, 201, "like")?;

        let like = response.json_value()?;
        if !like.is_null() {
            if let Some(interactions) = self
                .data
                .get_mut("interactions")
                .and_then(Value::as_object_mut)
            {
                interactions.insert("likes".into(), Value::Array(vec![like.clone()]));
            }
        }
        Ok(like)
    }

    pub fn reshare(&self) -> Result<Value> {
        let root_guid = self
            .data
            .get("guid")
            .and_then(Value::as_str)
            .or(self.guid.as_deref())
            .ok_or(missing("guid"))?
            .to_string();
        let request = self.form_request(Request::post("reshares").field("root_guid", root_guid))?;
        let response = Self::check_status(self.connection.post(request)?, 201, "reshare")?;
        Ok(response.json_value()?)
    }

    /// Comment on the post. The new comment is returned but not added to
    /// [`Post::comments`].
    pub fn comment(&self, text: &str) -> Result<Comment> {
        let id = self.numeric_id()?;
        let request =
            self.form_request(Request::post(format!("posts/{id}/comments")).field("text", text))?;
        let response = Self::check_status(self.connection.post(request)?, 201, "comment")?;
        Comment::from_json(response.json()?)
    }

    /// Vote for `poll_answer_id` in the post's poll.
    pub fn vote_poll(&self, poll_answer_id: u64) -> Result<Value> {
        let id = self.numeric_id()?;
        let poll_id = self
            .data
            .get("poll")
            .and_then(|p| p.get("poll_id"))
            .and_then(Value::as_u64)
            .ok_or(missing("poll.poll_id"))?;
        let request = self.form_request(
            Request::post(format!("posts/{id}/poll_participations"))
                .field("poll_answer_id", poll_answer_id.to_string())
                .field("poll_id", poll_id.to_string())
                .field("post_id", id.to_string()),
        )?;
        let response = Self::check_status(self.connection.post(request)?, 201, "vote")?;
        Ok(response.json_value()?)
    }

    /// Hide the post from the stream.
    ///
    /// The pod routes this through `share_visibilities/:id` but only reads
    /// `post_id`, so the path id is a fixed placeholder.
    pub fn hide(&self) -> Result<()> {
        let id = self.numeric_id()?;
        let request = Request::put("share_visibilities/42").query("post_id", id.to_string());
        let request = self.header_request(request)?;
        Self::check_status(self.connection.put(request)?, 200, "hide")?;
        Ok(())
    }

    /// Block the post's author.
    pub fn mute(&self) -> Result<()> {
        let person_id = self
            .author("id")
            .and_then(Value::as_u64)
            .ok_or(missing("author.id"))?;
        let request = self.header_request(
            Request::post("blocks")
                .json(json!({ "block": { "person_id": person_id } }))
                .header("content-type", "application/json"),
        )?;
        Self::check_status(self.connection.post(request)?, 204, "mute")?;
        Ok(())
    }

    /// Get notified about new activity on the post.
    pub fn subscribe(&self) -> Result<()> {
        let id = self.numeric_id()?;
        let request = self.header_request(Request::post(format!("posts/{id}/participation")))?;
        Self::check_status(self.connection.post(request)?, 201, "subscribe")?;
        Ok(())
    }

    pub fn unsubscribe(&self) -> Result<()> {
        let id = self.numeric_id()?;
        let request = self.header_request(
            Request::post(format!("posts/{id}/participation")).field("_method", "delete"),
        )?;
        Self::check_status(self.connection.post(request)?, 200, "unsubscribe")?;
        Ok(())
    }

    pub fn delete(&self) -> Result<()> {
        let id = self.numeric_id()?;
        let request = self.form_request(Request::delete(format!("posts/{id}")))?;
        Self::check_status(self.connection.delete(request)?, 204, "delete")?;
        Ok(())
    }

    pub fn delete_comment(&self, comment_id: u64) -> Result<()> {
        let id = self.numeric_id()?;
        let request =
            self.form_request(Request::delete(format!("posts/{id}/comments/{comment_id}")))?;
        Self::check_status(self.connection.delete(request)?, 204, "delete comment")?;
        Ok(())
    }

    /// Remove the viewer's like, as recorded in `interactions.likes[0]`.
    pub fn delete_like(&self) -> Result<()> {
        let id = self.numeric_id()?;
        let like_id = self
            .data
            .get("interactions")
            .and_then(|i| i.get("likes"))
            .and_then(|l| l.get(0))
            .and_then(|l| l.get("id"))
            .and_then(Value::as_u64)
            .ok_or(missing("interactions.likes"))?;
        let request = self.form_request(Request::delete(format!("posts/{id}/likes/{like_id}")))?;
        Self::check_status(self.connection.delete(request)?, 204, "delete like")?;
        Ok(())
    }
}

/// Renders the post text.
impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

impl fmt::Debug for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Post")
            .field("id", &self.id)
            .field("guid", &self.guid)
            .field("comments", &self.comments.len())
            .finish_non_exhaustive()
    }
}

fn missing(field: &'static str) -> Error {
    Error::MissingField {
        resource: Resource::Post,
        field,
    }
}
