//! Client-side object model for a diaspora* pod's web API.
//!
//! Each type wraps one kind of remote resource and turns its methods into
//! HTTP requests against the pod. The models never talk to the network
//! themselves: they go through an injected [`Connection`], shared as
//! `Arc<dyn Connection>`. `podlink-http` provides the blocking `reqwest`
//! implementation; [`MockConnection`] replays scripted responses.
//!
//! # Crate layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`connection`] | [`Connection`] trait, [`Request`]/[`Response`], [`MockConnection`] |
//! | [`aspect`] | [`Aspect`] and aspect membership, [`PersonRecord`] |
//! | [`post`] | [`Post`] and its interactions |
//! | [`comment`] | [`Comment`], [`Comments`] |
//! | [`conversation`] | [`Conversation`] |
//! | [`notification`] | [`Notification`], [`About`] |
//! | [`note`] | [`NoteParser`] for notification HTML |
//! | [`error`] | [`Error`], [`Resource`] |
//!
//! # Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use podlink::{Connection, Post, PostOptions};
//!
//! let conn: Arc<dyn Connection> = Arc::new(podlink_http::HttpConnection::new(config)?);
//! let mut post = Post::open(conn, Some(1234), None, PostOptions::default())?;
//! println!("{}", post.summary());
//! for comment in &post.comments {
//!     println!("  {}", comment.summary());
//! }
//! post.like()?;
//! ```

pub mod aspect;
pub mod comment;
pub mod connection;
pub mod conversation;
pub mod error;
pub mod note;
pub mod notification;
pub mod post;

pub use aspect::{Aspect, PersonRecord};
pub use comment::{Comment, Comments};
pub use connection::mock::MockConnection;
pub use connection::{Body, Connection, Method, Request, Response, TransportError};
pub use conversation::Conversation;
pub use error::{Error, Resource, Result};
pub use note::{NoteParser, RegexNoteParser};
pub use notification::{About, Notification};
pub use post::{Post, PostOptions};
