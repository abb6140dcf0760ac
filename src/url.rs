//! `bpub://` URLs: parsing cross-book references and building viewer URLs.
//!
//! A page of one book links to another book through the `/book/` marker:
//!
//! ```text
//! bpub://bloom-player/book/2c1b71ac-f399-446d-8398-e61a8efd4e83/index.htm
//!                          └──────────── book id ─────────────┘ └ file ┘
//! ```

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{trace, warn};

/// Prefix of every URL the viewer loads, so pages are never cross-origin.
pub const PLAYER_PROTOCOL: &str = "bpub://bloom-player/";

/// Path segment introducing a cross-book reference.
pub const BOOK_MARKER: &str = "/book/";

/// The book id ends at the first `#`, `?` or `/`, and only a `/` may follow it.
static BOOK_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"book/([^#?/]+)/(.+)").expect("book reference pattern"));

/// A request for a file inside another book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookRequest {
    pub book_id: String,
    /// Everything after the book id, unmodified (may hold `/`, `?` or `#`).
    pub requested_file: String,
}

impl BookRequest {
    /// Extract the book id and requested file from a request URL.
    ///
    /// Returns `None` for URLs that are not cross-book references, and for
    /// malformed ones that carry the marker but no `<id>/<file>` pair.
    pub fn parse(url: &str) -> Option<Self> {
        if !url.contains(BOOK_MARKER) {
            trace!(url, "not a cross-book reference");
            return None;
        }

        let Some(captures) = BOOK_REFERENCE.captures(url) else {
            warn!(url, "no book id found in request url");
            return None;
        };

        Some(Self {
            book_id: captures[1].to_string(),
            requested_file: captures[2].to_string(),
        })
    }
}

/// Viewer URL for a file on disk. Each path segment is percent-encoded;
/// both `/` and `\` count as separators.
pub fn url_for_path(path: &Path) -> String {
    let raw = path.to_string_lossy();
    let encoded: Vec<_> = raw
        .split(['/', '\\'])
        .map(urlencoding::encode)
        .collect();
    format!("{PLAYER_PROTOCOL}{}", encoded.join("/"))
}

/// Cross-book reference URL for `requested_file` inside book `book_id`.
pub fn book_link(book_id: &str, requested_file: &str) -> String {
    format!("{PLAYER_PROTOCOL}book/{book_id}/{requested_file}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(url: &str) -> Option<(String, String)> {
        BookRequest::parse(url).map(|r| (r.book_id, r.requested_file))
    }

    #[test]
    fn parses_simple_reference() {
        assert_eq!(
            parse("bpub://x/book/ID123/index.htm"),
            Some(("ID123".into(), "index.htm".into()))
        );
    }

    #[test]
    fn requested_file_is_kept_verbatim() {
        assert_eq!(
            parse("bpub://x/book/ID123/sub/dir/page.htm?x=1"),
            Some(("ID123".into(), "sub/dir/page.htm?x=1".into()))
        );
        assert_eq!(
            parse("bpub://bloom-player/book/2c1b71ac-f399/meta.json#frag"),
            Some(("2c1b71ac-f399".into(), "meta.json#frag".into()))
        );
    }

    #[test]
    fn book_id_stops_at_first_terminator() {
        // '?' or '#' ends the id, but only '/' may separate it from the file
        assert_eq!(parse("bpub://x/book/ID?q=1/index.htm"), None);
        assert_eq!(parse("bpub://x/book/ID#top/index.htm"), None);
        assert_eq!(parse("bpub://x/book/ID123?x=1"), None);
    }

    #[test]
    fn urls_without_marker_are_not_book_references() {
        assert_eq!(parse("bpub://x/nobookhere"), None);
        assert_eq!(parse("bpub://bloom-player/bloomplayer.htm?url=book"), None);
    }

    #[test]
    fn marker_without_file_is_rejected() {
        assert_eq!(parse("bpub://x/book/ID123/"), None);
        assert_eq!(parse("bpub://x/book//index.htm"), None);
    }

    #[test]
    fn url_for_path_encodes_each_segment() {
        assert_eq!(
            url_for_path(Path::new("/tmp/My Book/index.htm")),
            "bpub://bloom-player//tmp/My%20Book/index.htm"
        );
        assert_eq!(
            url_for_path(Path::new(r"C:\Books\a#b\index.htm")),
            "bpub://bloom-player/C%3A/Books/a%23b/index.htm"
        );
    }

    #[test]
    fn book_link_round_trips_through_parse() {
        let link = book_link("ID123", "audio/p1.mp3");
        assert_eq!(link, "bpub://bloom-player/book/ID123/audio/p1.mp3");
        assert_eq!(parse(&link), Some(("ID123".into(), "audio/p1.mp3".into())));
    }
}
