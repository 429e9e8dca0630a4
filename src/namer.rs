//! Filesystem-safe names for exported artifacts.

use std::collections::HashSet;

/// Suffix marking a markdown export, so exports can be ignored as a group.
pub const MARKDOWN_SUFFIX: &str = ".exported.md";
pub const CSV_SUFFIX: &str = ".csv";

const FALLBACK_NAME: &str = "untitled";

/// Turn a remote title into a single safe path component.
///
/// Characters that are illegal on common filesystems become `_`, control
/// characters are dropped, and whitespace runs collapse to one space.
pub fn sanitize_name(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut pending_space = false;

    for c in title.chars() {
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if c.is_control() {
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => out.push('_'),
            _ => out.push(c),
        }
    }

    if out.is_empty() || out.chars().all(|c| c == '.') {
        FALLBACK_NAME.to_string()
    } else {
        out
    }
}

/// Make every name unique, in order. The n-th repeat of a name gets ` (n)`
/// inserted before `suffix`, counting the first occurrence as 1.
///
/// Names are compared case-insensitively, so "Notes" and "notes" cannot
/// overwrite each other on macOS or Windows.
pub fn dedupe(stems: Vec<String>, suffix: &str) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::with_capacity(stems.len());
    let mut out = Vec::with_capacity(stems.len());

    for stem in stems {
        let mut candidate = format!("{stem}{suffix}");
        let mut occurrence = 1;
        while taken.contains(&candidate.to_lowercase()) {
            occurrence += 1;
            candidate = format!("{stem} ({occurrence}){suffix}");
        }
        taken.insert(candidate.to_lowercase());
        out.push(candidate);
    }

    out
}
