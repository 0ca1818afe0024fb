//! Text cleanup for harvested posts: links are removed and the whitespace
//! they leave behind is collapsed before a post is stored.

use std::sync::LazyLock;

use regex::Regex;
use sento_core::{Post, RawPost};

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:https?://|www\.)\S+").expect("valid regex")
});
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Removes URL-shaped substrings and collapses the whitespace left behind.
///
/// Idempotent: `strip_urls(&strip_urls(s)) == strip_urls(s)`.
#[must_use]
pub fn strip_urls(text: &str) -> String {
    let without_urls = URL_RE.replace_all(text, " ");
    WHITESPACE_RE
        .replace_all(without_urls.trim(), " ")
        .into_owned()
}

/// Sanitizes a search result into a storable post.
#[must_use]
pub fn sanitize_post(raw: RawPost) -> Post {
    Post {
        id: raw.id,
        created_at: raw.created_at.naive_utc(),
        text: strip_urls(&raw.text),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, FixedOffset, Utc};

    use super::*;

    #[test]
    fn strips_links_anywhere_in_text() {
        assert_eq!(
            strip_urls("Gran partit https://t.co/AbC123 avui http://example.com/x?y=1"),
            "Gran partit avui"
        );
        assert_eq!(strip_urls("mira www.example.org ara"), "mira ara");
        assert_eq!(strip_urls("HTTPS://T.CO/xyz"), "");
    }

    #[test]
    fn keeps_text_without_links() {
        assert_eq!(strip_urls("#Barcelona guanya 3-0"), "#Barcelona guanya 3-0");
    }

    #[test]
    fn sanitizing_twice_changes_nothing() {
        let samples = [
            "Visca el Barça https://t.co/abc\n\nhttps://t.co/def",
            "  spaced   out\ttext  ",
            "no links",
            "",
            "http://a.b/c http://d.e/f",
        ];
        for sample in samples {
            let once = strip_urls(sample);
            assert_eq!(strip_urls(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn sanitize_post_normalizes_timestamp_to_naive_utc() {
        let created = DateTime::<FixedOffset>::parse_from_rfc3339("2019-03-01T14:00:00+02:00")
            .unwrap()
            .with_timezone(&Utc);
        let post = sanitize_post(RawPost {
            id: 7,
            created_at: created,
            text: "hola https://t.co/x".to_owned(),
        });
        assert_eq!(post.id, 7);
        assert_eq!(post.text, "hola");
        assert_eq!(post.created_at.to_string(), "2019-03-01 12:00:00");
    }
}
