//! Comments on a post.
//!
//! [`Comment`] is a read-only view over one comment payload. [`Comments`] is
//! the list a [`Post`](crate::Post) owns. It keeps "never fetched" apart
//! from "fetched, none there": see [`Comments::is_fetched`].

use std::fmt;
use std::ops::Index;

use serde_json::Value;

use crate::error::{Error, Resource, Result};

/// One comment, as returned by `posts/{id}/comments.json`.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: u64,
    pub guid: String,
    data: Value,
}

impl Comment {
    /// Wrap a comment payload. `id` and `guid` must be present.
    pub fn from_json(data: Value) -> Result<Self> {
        let id = data
            .get("id")
            .and_then(Value::as_u64)
            .ok_or(Error::MissingField {
                resource: Resource::Comment,
                field: "id",
            })?;
        let guid = data
            .get("guid")
            .and_then(Value::as_str)
            .ok_or(Error::MissingField {
                resource: Resource::Comment,
                field: "guid",
            })?
            .to_string();
        Ok(Self { id, guid, data })
    }

    pub fn text(&self) -> &str {
        self.data.get("text").and_then(Value::as_str).unwrap_or_default()
    }

    /// Creation time exactly as the pod sent it.
    pub fn when(&self) -> Option<&str> {
        self.data.get("created_at").and_then(Value::as_str)
    }

    /// A field of the author object, e.g. `"name"` or `"guid"`.
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

    pub fn data(&self) -> &Value {
        &self.data
    }
}

/// Renders the comment text and nothing else.
impl fmt::Display for Comment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

pub(crate) fn display_str(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

/// Ordered comments of one post.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Comments {
    items: Option<Vec<Comment>>,
}

impl Comments {
    /// An unfetched list.
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` once [`set`](Self::set) or [`set_json`](Self::set_json) ran,
    /// even if the post has no comments.
    pub fn is_fetched(&self) -> bool {
        self.items.is_some()
    }

    /// Append a comment. Does nothing on an unfetched list, since appending
    /// there would make a partial list look complete. Returns whether the
    /// comment was stored.
    pub fn push(&mut self, comment: Comment) -> bool {
        match &mut self.items {
            Some(items) => {
                items.push(comment);
                true
            }
            None => false,
        }
    }

    /// Replace the whole list.
    pub fn set(&mut self, comments: Vec<Comment>) {
        self.items = Some(comments);
    }

    /// Replace the whole list from raw comment payloads, keeping their order.
    pub fn set_json(&mut self, raw: &[Value]) -> Result<()> {
        let comments = raw
            .iter()
            .cloned()
            .map(Comment::from_json)
            .collect::<Result<Vec<_>>>()?;
        self.set(comments);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<&Comment> {
        self.items.as_ref().and_then(|items| items.get(index))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Comment> {
        self.items.as_deref().unwrap_or_default().iter()
    }

    pub fn ids(&self) -> Vec<u64> {
        self.iter().map(|c| c.id).collect()
    }
}

impl Index<usize> for Comments {
    type Output = Comment;

    fn index(&self, index: usize) -> &Comment {
        &self.items.as_deref().unwrap_or_default()[index]
    }
}

impl<'a> IntoIterator for &'a Comments {
    type Item = &'a Comment;
    type IntoIter = std::slice::Iter<'a, Comment>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
