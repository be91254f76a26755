//! Extraction of structured fields from a notification's `note_html`.
//!
//! Pods embed a rendered HTML sentence in each notification ("<a …>Alice</a>
//! liked your <a …>post</a>"). [`NoteParser`] is the seam callers go through
//! to read people, post references and plain text out of it, so the regex
//! scraper in [`RegexNoteParser`] can be replaced without touching
//! [`Notification`](crate::Notification).

use std::sync::LazyLock;

use regex::Regex;

/// Reads structured data out of notification HTML.
pub trait NoteParser {
    /// GUIDs of every person linked in the note, in document order.
    fn people(&self, html: &str) -> Vec<String>;

    /// The first post reference (`/posts/<ref>`), as written in the link.
    fn post_ref(&self, html: &str) -> Option<String>;

    /// The note as one line of plain text.
    fn plain_text(&self, html: &str) -> String;
}

/// Regex-based [`NoteParser`] matching the markup pods emit today.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexNoteParser;

/// `/people/<hex>" class="hovercardable`
static PERSON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"/people/([0-9a-f]+)["'] class=["']hovercardable"#)
        .expect("invalid person regex")
});

static POST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/posts/([0-9a-f]+)").expect("invalid post regex"));

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"</?[a-z]+( *[a-z_-]+=["'].*?["'])* */?>"#).expect("invalid tag regex")
});

static SPACES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" {2,}").expect("invalid spaces regex"));

impl NoteParser for RegexNoteParser {
    fn people(&self, html: &str) -> Vec<String> {
        PERSON_RE
            .captures_iter(html)
            .map(|c| c[1].to_string())
            .collect()
    }

    fn post_ref(&self, html: &str) -> Option<String> {
        POST_RE.captures(html).map(|c| c[1].to_string())
    }

    fn plain_text(&self, html: &str) -> String {
        let stripped = TAG_RE.replace_all(html, "");
        let first_line = stripped.trim().split('\n').next().unwrap_or_default();
        SPACES_RE.replace_all(first_line, " ").into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIKED: &str = r#"<a href="/people/9f3c0de2" class="hovercardable" data-hovercard="/people/9f3c0de2">Alice</a> and <a href='/people/00ab' class='hovercardable'>Bob</a> liked your <a href="/posts/1234" class="hard_object_link" data-ref="1234">post</a>."#;

    #[test]
    fn people_in_document_order() {
        assert_eq!(RegexNoteParser.people(LIKED), vec!["9f3c0de2", "00ab"]);
    }

    #[test]
    fn people_ignores_links_without_hovercard_class() {
        let html = r#"<a href="/people/abc">x</a> <a href="/people/def" class="other">y</a>"#;
        assert!(RegexNoteParser.people(html).is_empty());
    }

    #[test]
    fn post_ref_takes_the_first_match() {
        assert_eq!(RegexNoteParser.post_ref(LIKED).as_deref(), Some("1234"));
        assert_eq!(RegexNoteParser.post_ref("started sharing with you"), None);
    }

    #[test]
    fn plain_text_strips_tags_and_collapses_spaces() {
        assert_eq!(
            RegexNoteParser.plain_text(LIKED),
            "Alice and Bob liked your post."
        );
        let html = "  <span>Carol</span>   started   sharing\nsecond line ";
        assert_eq!(RegexNoteParser.plain_text(html), "Carol started sharing");
    }
}
