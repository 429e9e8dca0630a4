//! Reference parser for turning user input into Google Drive resource IDs.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{DriveError, Result};

/// What the shape of the input says about the resource, before any metadata is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindHint {
    Unknown,
    Doc,
    Sheet,
    File,
    Folder,
}

/// A normalized reference to a remote resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub id: String,
    pub kind_hint: KindHint,
    pub tab_id: Option<String>,
}

/// URL patterns, tried in order. The first capture group is the resource ID.
///
/// Unanchored, so scheme, `www.`, and Workspace `/a/<domain>/` prefixes all match.
static URL_PATTERNS: LazyLock<Vec<(Regex, KindHint)>> = LazyLock::new(|| {
    [
        (
            r"docs\.google\.com/(?:a/[^/]+/)?document/(?:u/\d+/)?d/([a-zA-Z0-9_-]+)",
            KindHint::Doc,
        ),
        (
            r"docs\.google\.com/(?:a/[^/]+/)?spreadsheets/(?:u/\d+/)?d/([a-zA-Z0-9_-]+)",
            KindHint::Sheet,
        ),
        (
            r"docs\.google\.com/(?:a/[^/]+/)?presentation/(?:u/\d+/)?d/([a-zA-Z0-9_-]+)",
            KindHint::Unknown,
        ),
        (
            r"drive\.google\.com/(?:a/[^/]+/)?(?:u/\d+/)?file/d/([a-zA-Z0-9_-]+)",
            KindHint::File,
        ),
        (
            r"drive\.google\.com/(?:a/[^/]+/)?open\?id=([a-zA-Z0-9_-]+)",
            KindHint::Unknown,
        ),
        (
            r"drive\.google\.com/(?:a/[^/]+/)?drive/(?:u/\d+/)?folders/([a-zA-Z0-9_-]+)",
            KindHint::Folder,
        ),
    ]
    .into_iter()
    .map(|(pattern, hint)| (Regex::new(pattern).expect("Invalid URL regex"), hint))
    .collect()
});

/// "Publish to the web" links carry a publication key under `/d/e/`, not a file ID.
static PUBLISHED_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"docs\.google\.com/(?:a/[^/]+/)?(?:document|spreadsheets|presentation)/d/e/")
        .expect("Invalid published URL regex")
});

/// `tab=` in either the query string or the fragment.
static TAB_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&#]tab=([^&#\s]+)").expect("Invalid tab regex"));

/// Valid Google Drive ID pattern (alphanumeric, underscore, hyphen).
static ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("Invalid ID regex"));

const USAGE_HINT: &str = "Supported formats:
  - File ID: 1abc123xyz
  - Google Docs: https://docs.google.com/document/d/FILE_ID/edit
  - Google Sheets: https://docs.google.com/spreadsheets/d/FILE_ID/edit
  - Google Slides: https://docs.google.com/presentation/d/FILE_ID/edit
  - Google Drive: https://drive.google.com/file/d/FILE_ID/view
  - Drive folder: https://drive.google.com/drive/folders/FOLDER_ID";

/// Parse a bare ID or a Google Docs/Sheets/Drive URL into a [`ResourceRef`].
///
/// # Examples
///
/// ```
/// use gcmd::url_parser::{parse_reference, KindHint};
///
/// let r = parse_reference("https://docs.google.com/document/d/abc123/edit?tab=t.1").unwrap();
/// assert_eq!(r.id, "abc123");
/// assert_eq!(r.kind_hint, KindHint::Doc);
/// assert_eq!(r.tab_id.as_deref(), Some("t.1"));
/// ```
pub fn parse_reference(input: &str) -> Result<ResourceRef> {
    let trimmed = input.trim();

    if PUBLISHED_REGEX.is_match(trimmed) {
        return Err(invalid_reference(input));
    }

    for (regex, hint) in URL_PATTERNS.iter() {
        if let Some(id) = regex.captures(trimmed).and_then(|c| c.get(1)) {
            let tab_id = TAB_REGEX
                .captures(trimmed)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string());

            return Ok(ResourceRef {
                id: id.as_str().to_string(),
                kind_hint: *hint,
                tab_id,
            });
        }
    }

    if ID_REGEX.is_match(trimmed) {
        return Ok(ResourceRef {
            id: trimmed.to_string(),
            kind_hint: KindHint::Unknown,
            tab_id: None,
        });
    }

    Err(invalid_reference(input))
}

fn invalid_reference(input: &str) -> DriveError {
    DriveError::InvalidReference {
        input: input.to_string(),
        hint: USAGE_HINT.to_string(),
    }
}

/// Extract only the resource ID from a URL or validate a raw ID.
///
/// ```
/// use gcmd::url_parser::extract_id;
///
/// assert_eq!(extract_id("https://drive.google.com/file/d/1abc123/view").unwrap(), "1abc123");
/// assert_eq!(extract_id("1abc123").unwrap(), "1abc123");
/// ```
pub fn extract_id(url_or_id: &str) -> Result<String> {
    parse_reference(url_or_id).map(|r| r.id)
}
