//! A single notification from `notifications.json`.
//!
//! The pod wraps each notification in an envelope keyed by its type:
//!
//! ```json
//! { "type": "liked", "liked": { "id": 12, "unread": true, "note_html": "…", "created_at": "…" } }
//! ```
//!
//! Everything interesting (who, about what) lives only in `note_html`, so
//! those accessors go through a [`NoteParser`].

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::connection::{Connection, Request};
use crate::error::{Error, Resource, Result};
use crate::note::{NoteParser, RegexNoteParser};

/// What a notification refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum About {
    /// A post, by numeric id.
    Post(u64),
    /// A post linked by guid rather than numeric id.
    PostGuid(String),
    /// No post is linked; the notification is about these people.
    People(Vec<String>),
}

pub struct Notification {
    connection: Arc<dyn Connection>,
    /// The `type` tag of the envelope, e.g. `"liked"` or `"started_sharing"`.
    pub kind: String,
    pub id: u64,
    pub unread: bool,
    data: Value,
}

impl Notification {
    /// Unwrap a notification envelope.
    pub fn from_json(connection: Arc<dyn Connection>, envelope: &Value) -> Result<Self> {
        let kind = envelope
            .get("type")
            .and_then(Value::as_str)
            .ok_or(missing("type"))?
            .to_string();
        let data = envelope.get(&kind).cloned().ok_or(missing("payload"))?;
        let id = data.get("id").and_then(Value::as_u64).ok_or(missing("id"))?;
        let unread = data
            .get("unread")
            .and_then(Value::as_bool)
            .ok_or(missing("unread"))?;

        Ok(Self {
            connection,
            kind,
            id,
            unread,
            data,
        })
    }

    /// A raw field of the notification payload.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    fn note_html(&self) -> &str {
        self.data
            .get("note_html")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// GUIDs of the people who caused the notification.
    pub fn who(&self) -> Vec<String> {
        self.who_with(&RegexNoteParser)
    }

    pub fn who_with(&self, parser: &impl NoteParser) -> Vec<String> {
        parser.people(self.note_html())
    }

    /// The post the notification is about, or its people when it links none.
    pub fn about(&self) -> About {
        self.about_with(&RegexNoteParser)
    }

    pub fn about_with(&self, parser: &impl NoteParser) -> About {
        match parser.post_ref(self.note_html()) {
            Some(reference) => match reference.parse::<u64>() {
                Ok(id) => About::Post(id),
                Err(_) => About::PostGuid(reference),
            },
            None => About::People(self.who_with(parser)),
        }
    }

    /// Creation time exactly as the pod sent it.
    pub fn when(&self) -> Option<&str> {
        self.data.get("created_at").and_then(Value::as_str)
    }

    pub fn text_with(&self, parser: &impl NoteParser) -> String {
        parser.plain_text(self.note_html())
    }

    /// `WHEN: TEXT`
    pub fn summary(&self) -> String {
        format!("{}: {}", self.when().unwrap_or_default(), self)
    }

    /// Mark the notification read (`unread = false`) or unread.
    ///
    /// The local flag only changes once the pod accepted the update.
    pub fn mark(&mut self, unread: bool) -> Result<()> {
        let token = self.connection.csrf_token()?;
        let request = Request::put(format!("notifications/{}", self.id))
            .query("set_unread", unread.to_string())
            .header("x-csrf-token", token);

        let response = self.connection.put(request)?;
        if !response.is_success() {
            return Err(Error::unexpected(
                Resource::Notification,
                "mark",
                response.status,
            ));
        }

        debug!(id = self.id, unread, "notification marked");
        self.unread = unread;
        if let Some(obj) = self.data.as_object_mut() {
            obj.insert("unread".into(), Value::Bool(unread));
        }
        Ok(())
    }
}

/// The note as one line of plain text.
impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text_with(&RegexNoteParser))
    }
}

impl fmt::Debug for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notification")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("unread", &self.unread)
            .finish_non_exhaustive()
    }
}

fn missing(field: &'static str) -> Error {
    Error::MissingField {
        resource: Resource::Notification,
        field,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::mock::MockConnection;
    use crate::connection::Method;
    use serde_json::json;

    const LIKED_HTML: &str = r#"<a href="/people/9f3c0de2" class="hovercardable">Alice</a> liked your <a href="/posts/1234" class="hard_object_link">post</a>."#;
    const SHARING_HTML: &str = r#"<a href="/people/ab12" class="hovercardable">Bob</a> and <a href="/people/cd34" class="hovercardable">Carol</a> started sharing with you."#;

    fn envelope(kind: &str, html: &str) -> Value {
        json!({
            "type": kind,
            kind: {
                "id": 12,
                "unread": true,
                "note_html": html,
                "created_at": "2024-03-01T10:00:00Z"
            }
        })
    }

    fn notification(conn: &Arc<MockConnection>, kind: &str, html: &str) -> Notification {
        let conn: Arc<dyn Connection> = conn.clone();
        Notification::from_json(conn, &envelope(kind, html)).unwrap()
    }

    #[test]
    fn envelope_selects_the_typed_payload() {
        let conn = Arc::new(MockConnection::new());
        let n = notification(&conn, "liked", LIKED_HTML);
        assert_eq!(n.kind, "liked");
        assert_eq!(n.id, 12);
        assert!(n.unread);
        assert_eq!(n.get("created_at"), Some(&json!("2024-03-01T10:00:00Z")));
    }

    #[test]
    fn envelope_without_payload_is_rejected() {
        let conn: Arc<dyn Connection> = Arc::new(MockConnection::new());
        let err = Notification::from_json(conn, &json!({ "type": "liked" })).unwrap_err();
        assert!(matches!(err, Error::MissingField { field: "payload", .. }));
    }

    #[test]
    fn who_lists_every_linked_person() {
        let conn = Arc::new(MockConnection::new());
        let n = notification(&conn, "started_sharing", SHARING_HTML);
        assert_eq!(n.who(), vec!["ab12", "cd34"]);
    }

    #[test]
    fn about_prefers_the_post() {
        let conn = Arc::new(MockConnection::new());
        assert_eq!(notification(&conn, "liked", LIKED_HTML).about(), About::Post(1234));
    }

    #[test]
    fn about_without_post_falls_back_to_people() {
        let conn = Arc::new(MockConnection::new());
        let n = notification(&conn, "started_sharing", SHARING_HTML);
        assert_eq!(n.about(), About::People(n.who()));
    }

    #[test]
    fn about_keeps_hex_post_references() {
        let conn = Arc::new(MockConnection::new());
        let html = r#"commented on <a href="/posts/7e1f0a">a post</a>"#;
        assert_eq!(
            notification(&conn, "comment_on_post", html).about(),
            About::PostGuid("7e1f0a".into())
        );
    }

    #[test]
    fn display_and_summary() {
        let conn = Arc::new(MockConnection::new());
        let n = notification(&conn, "liked", LIKED_HTML);
        assert_eq!(n.to_string(), "Alice liked your post.");
        assert_eq!(n.summary(), "2024-03-01T10:00:00Z: Alice liked your post.");
        assert_eq!(n.when(), Some("2024-03-01T10:00:00Z"));
    }

    #[test]
    fn custom_parser_is_used() {
        struct Fixed;
        impl NoteParser for Fixed {
            fn people(&self, _: &str) -> Vec<String> {
                vec!["fixed".into()]
            }
            fn post_ref(&self, _: &str) -> Option<String> {
                None
            }
            fn plain_text(&self, _: &str) -> String {
                "fixed text".into()
            }
        }

        let conn = Arc::new(MockConnection::new());
        let n = notification(&conn, "liked", LIKED_HTML);
        assert_eq!(n.about_with(&Fixed), About::People(vec!["fixed".into()]));
        assert_eq!(n.text_with(&Fixed), "fixed text");
    }

    #[test]
    fn mark_sends_flag_and_token_then_updates_locally() {
        let conn = Arc::new(MockConnection::with_token("csrf-1"));
        conn.respond(200, "{}");
        let mut n = notification(&conn, "liked", LIKED_HTML);

        n.mark(false).unwrap();

        assert!(!n.unread);
        assert_eq!(n.get("unread"), Some(&json!(false)));
        let req = conn.last_request().unwrap();
        assert_eq!(req.method, Method::Put);
        assert_eq!(req.path, "notifications/12");
        assert_eq!(req.query_value("set_unread"), Some("false"));
        assert_eq!(req.header_value("x-csrf-token"), Some("csrf-1"));
    }

    #[test]
    fn rejected_mark_leaves_flag_alone() {
        let conn = Arc::new(MockConnection::new());
        conn.respond(422, "");
        let mut n = notification(&conn, "liked", LIKED_HTML);

        let err = n.mark(false).unwrap_err();
        assert_eq!(err.status(), Some(422));
        assert!(n.unread);
    }
}
