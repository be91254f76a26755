//! End-to-end tests of the models over real HTTP.
//!
//! Each test spawns a loopback axum server playing the pod (real TCP, real
//! HTTP) on its own tokio runtime thread, then drives the blocking
//! [`HttpConnection`] against it from the test thread.

use std::collections::HashMap;
use std::sync::{mpsc, Arc};
use std::time::Duration;

use axum::extract::{Form, Json, Query};
use axum::http::header::{COOKIE, LOCATION};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::Router;
use podlink::{
    Aspect, Connection, Conversation, Error, Notification, Post, PostOptions, TransportError,
};
use podlink_http::{HttpConnection, PodConfig};
use serde_json::{json, Value};
use tokio::net::TcpListener;

const TOKEN: &str = "scraped-token";
const SESSION: &str = "_diaspora_session=abc";

// ---------------------------------------------------------------------------
// Fake pod
// ---------------------------------------------------------------------------

fn has_session(headers: &HeaderMap) -> bool {
    headers.get(COOKIE).and_then(|v| v.to_str().ok()) == Some(SESSION)
}

fn has_token_header(headers: &HeaderMap) -> bool {
    headers.get("x-csrf-token").and_then(|v| v.to_str().ok()) == Some(TOKEN)
}

fn has_token_field(form: &HashMap<String, String>) -> bool {
    form.get("authenticity_token").map(String::as_str) == Some(TOKEN)
}

async fn stream(headers: HeaderMap) -> Response {
    if !has_session(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Html(format!(
        r#"<html><head><meta name="csrf-token" content="{TOKEN}" /></head><body></body></html>"#
    ))
    .into_response()
}

async fn post_data() -> Json<Value> {
    Json(json!({
        "id": 1234,
        "guid": "7e1f0a9b",
        "text": "Hello pod",
        "author": { "id": 7, "name": "Alice", "guid": "9f3c0de2" },
        "interactions": { "comments_count": 1, "likes": [], "comments": [] }
    }))
}

async fn post_comments() -> Json<Value> {
    Json(json!([{
        "id": 5,
        "guid": "c5",
        "text": "first!",
        "created_at": "2024-03-01T10:00:00Z",
        "author": { "name": "Bob", "guid": "ab12" }
    }]))
}

async fn like(Form(form): Form<HashMap<String, String>>) -> Response {
    if !has_token_field(&form) {
        return StatusCode::UNPROCESSABLE_ENTITY.into_response();
    }
    (StatusCode::CREATED, Json(json!({ "id": 501 }))).into_response()
}

async fn remove_aspect(Form(form): Form<HashMap<String, String>>) -> Response {
    if form.get("_method").map(String::as_str) != Some("delete") || !has_token_field(&form) {
        return StatusCode::UNPROCESSABLE_ENTITY.into_response();
    }
    (StatusCode::FOUND, [(LOCATION, "/contacts")]).into_response()
}

async fn add_membership(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !has_token_header(&headers) {
        return Html("<html>kicked out</html>").into_response();
    }
    if body != json!({ "aspect_id": 3, "person_id": 9 }) {
        return StatusCode::BAD_REQUEST.into_response();
    }
    Json(json!({ "id": 77, "aspect_id": 3, "person_id": 9 })).into_response()
}

async fn mark_notification(
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> StatusCode {
    if has_token_header(&headers) && query.get("set_unread").map(String::as_str) == Some("false") {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    }
}

async fn hide_conversation() -> StatusCode {
    StatusCode::NOT_FOUND
}

fn pod_router() -> Router {
    Router::new()
        .route("/stream", get(stream))
        .route("/posts/1234.json", get(post_data))
        .route("/posts/1234/comments.json", get(post_comments))
        .route("/posts/1234/likes", post(like))
        .route("/aspects/3", post(remove_aspect))
        .route("/aspect_memberships", post(add_membership))
        .route("/notifications/12", put(mark_notification))
        .route("/conversations/3/visibility/", delete(hide_conversation))
}

/// Serve `router` on a loopback port from a background thread and return
/// the base URL (e.g. `http://127.0.0.1:PORT`).
fn spawn_pod(router: Router) -> String {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async move {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            tx.send(listener.local_addr().unwrap()).unwrap();
            axum::serve(listener, router).await.unwrap();
        });
    });
    let addr = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    format!("http://{addr}")
}

fn connect(base: &str) -> Arc<dyn Connection> {
    let config = PodConfig::new(base)
        .with_session_cookie(SESSION)
        .with_timeout(Duration::from_secs(5));
    Arc::new(HttpConnection::new(config).unwrap())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn post_fetch_comments_and_like() {
    let conn = connect(&spawn_pod(pod_router()));

    let mut post = Post::open(conn, Some(1234), None, PostOptions::default()).unwrap();
    assert_eq!(post.summary(), "Alice (9f3c0de2): Hello pod");
    assert_eq!(post.comments.len(), 1);
    assert_eq!(post.comments[0].to_string(), "first!");

    // First mutation scrapes the token from /stream.
    let like = post.like().unwrap();
    assert_eq!(like["id"], 501);
    assert_eq!(post.data()["interactions"]["likes"][0]["id"], 501);
}

#[test]
fn aspect_delete_sees_the_redirect() {
    let conn = connect(&spawn_pod(pod_router()));
    Aspect::new(conn, 3, None).remove_aspect().unwrap();
}

#[test]
fn aspect_membership_json_roundtrip() {
    let conn = connect(&spawn_pod(pod_router()));
    let membership = Aspect::new(conn, 3, None).add_user(9).unwrap();
    assert_eq!(membership["id"], 77);
}

#[test]
fn membership_without_token_is_a_csrf_rejection() {
    let base = spawn_pod(pod_router());
    let conn: Arc<dyn Connection> = Arc::new(
        HttpConnection::new(
            PodConfig::new(&base)
                .with_session_cookie(SESSION)
                .with_csrf_token("stale-token"),
        )
        .unwrap(),
    );
    assert!(matches!(
        Aspect::new(conn, 3, None).add_user(9).unwrap_err(),
        Error::CsrfRejected
    ));
}

#[test]
fn notification_mark_read() {
    let conn = connect(&spawn_pod(pod_router()));
    let envelope = json!({
        "type": "liked",
        "liked": { "id": 12, "unread": true, "note_html": "", "created_at": "2024-03-01T10:00:00Z" }
    });
    let mut notification = Notification::from_json(conn, &envelope).unwrap();

    notification.mark(false).unwrap();

    assert!(!notification.unread);
}

#[test]
fn conversation_delete_treats_404_as_success() {
    let conn = connect(&spawn_pod(pod_router()));
    Conversation::open(conn, 3, false).unwrap().delete().unwrap();
}

#[test]
fn token_scrape_needs_a_session() {
    let base = spawn_pod(pod_router());
    let conn: Arc<dyn Connection> = Arc::new(HttpConnection::new(PodConfig::new(&base)).unwrap());
    assert!(matches!(conn.csrf_token(), Err(TransportError::Csrf(_))));
}

#[test]
fn unreachable_pod_is_a_transport_error() {
    let conn: Arc<dyn Connection> = Arc::new(
        HttpConnection::new(
            PodConfig::new("http://127.0.0.1:9").with_timeout(Duration::from_secs(2)),
        )
        .unwrap(),
    );
    let err = Post::open(conn, Some(1), None, PostOptions::default()).unwrap_err();
    assert!(matches!(err, Error::Transport(TransportError::Http(_))));
}
