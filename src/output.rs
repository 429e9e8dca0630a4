//! Human-readable rendering of listings, file details, comments, and export results.

use crate::docs::Heading;
use crate::export::{ArtifactStatus, ExportSummary};
use crate::models::{format_size, Comment, FileMetadata, TabInfo};

const RULE_WIDTH: usize = 70;

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

fn section(out: &mut String, title: &str) {
    out.push_str(&format!("\n{}\n{}\n{}\n\n", rule(), title, rule()));
}

/// One line per file, or a short block per file when `verbose`.
pub fn format_file_list(files: &[FileMetadata], verbose: bool) -> String {
    if files.is_empty() {
        return "No files found.".to_string();
    }

    let mut lines = Vec::with_capacity(files.len());
    for file in files {
        if verbose {
            let size = file
                .size
                .map(|s| format!(" ({})", format_size(s)))
                .unwrap_or_default();
            let owner = file
                .owners
                .first()
                .and_then(|o| o.display_name.as_deref())
                .unwrap_or("");
            lines.push(format!(
                "[{}] {}\n  ID: {}\n  Modified: {}{}\n  Owner: {}\n",
                file.type_label(),
                file.name,
                file.id,
                file.modified_time.as_deref().unwrap_or(""),
                size,
                owner
            ));
        } else {
            lines.push(file.to_string());
        }
    }
    lines.join("\n")
}

/// Everything `info` prints for a file, gathered before rendering.
#[derive(Debug, Default)]
pub struct FileReport<'a> {
    pub file: Option<&'a FileMetadata>,
    pub verbose: bool,
    pub tabs: Option<&'a [TabInfo]>,
    pub headings: Option<&'a [Heading]>,
    pub structure_error: Option<String>,
    pub comments: Option<&'a [Comment]>,
    pub comments_error: Option<String>,
}

pub fn format_file_report(report: &FileReport<'_>) -> String {
    let mut out = String::new();
    let Some(file) = report.file else {
        return out;
    };

    section(&mut out, "FILE INFORMATION");
    out.push_str(&format!("Name: {}\n", file.name));
    out.push_str(&format!("ID: {}\n", file.id));
    out.push_str(&format!("Type: {}\n", file.mime_type.as_deref().unwrap_or("-")));
    if let Some(size) = file.size {
        out.push_str(&format!("Size: {}\n", format_size(size)));
    }
    out.push_str(&format!("\nCreated: {}\n", file.created_time.as_deref().unwrap_or("-")));
    out.push_str(&format!("Modified: {}\n", file.modified_time.as_deref().unwrap_or("-")));
    if let Some(link) = &file.web_view_link {
        out.push_str(&format!("\nWeb Link: {}\n", link));
    }

    if report.verbose {
        format_details(&mut out, file);

        if report.tabs.is_some() || report.headings.is_some() || report.structure_error.is_some() {
            section(&mut out, "DOCUMENT STRUCTURE");
            if let Some(tabs) = report.tabs.filter(|t| !t.is_empty()) {
                out.push_str(&format!("Tabs ({}):\n", tabs.len()));
                out.push_str(&format_tabs(tabs));
                out.push('\n');
            }
            if let Some(headings) = report.headings.filter(|h| !h.is_empty()) {
                out.push_str(&format!("\nHeadings ({}):\n", headings.len()));
                out.push_str(&format_headings(headings));
                out.push('\n');
            }
            if let Some(err) = &report.structure_error {
                out.push_str(&format!(
                    "Note: Could not retrieve document structure: {}\n",
                    err
                ));
            }
        }
    }

    if let Some(comments) = report.comments {
        section(&mut out, "COMMENTS");
        out.push_str(&format_comments(comments));
        out.push('\n');
    }
    if let Some(err) = &report.comments_error {
        out.push_str(&format!("\nNote: Could not retrieve comments: {}\n", err));
    }

    out.push_str(&format!("\n{}\n", rule()));
    out
}

fn format_details(out: &mut String, file: &FileMetadata) {
    section(out, "DETAILED INFORMATION");

    if !file.owners.is_empty() {
        out.push_str("Owner(s):\n");
        for owner in &file.owners {
            out.push_str(&format!("  - {}\n", owner));
        }
    }
    if let Some(modifier) = &file.last_modifying_user {
        out.push_str(&format!("\nLast Modified By: {}\n", modifier));
    }
    out.push_str(&format!("\nShared: {}\n", file.shared.unwrap_or(false)));
    if file.starred == Some(true) {
        out.push_str("Starred: Yes\n");
    }
    if let Some(description) = file.description.as_deref().filter(|d| !d.is_empty()) {
        out.push_str(&format!("\nDescription: {}\n", description));
    }
    if let Some(version) = file.version {
        out.push_str(&format!("\nVersion: {}\n", version));
    }

    if !file.permissions.is_empty() {
        section(out, &format!("PERMISSIONS ({} total)", file.permissions.len()));
        for perm in &file.permissions {
            let email = perm.email_address.as_deref().unwrap_or("N/A");
            let line = match perm.grantee_type.as_str() {
                "user" => format!(
                    "  User {} ({}): {}",
                    perm.display_name.as_deref().unwrap_or(email),
                    email,
                    perm.role
                ),
                "group" => format!("  Group ({}): {}", email, perm.role),
                "domain" => format!(
                    "  Domain ({}): {}",
                    perm.domain.as_deref().unwrap_or("N/A"),
                    perm.role
                ),
                "anyone" => format!("  Anyone with link: {}", perm.role),
                other => format!("  {} : {}", other, perm.role),
            };
            out.push_str(&format!("{}\n", line));
        }
    }

    if let Some(capabilities) = &file.capabilities {
        let entries = capabilities.entries();
        if !entries.is_empty() {
            section(out, "CAPABILITIES");
            for (name, allowed) in entries {
                out.push_str(&format!("  {}: {}\n", name, if allowed { "Yes" } else { "No" }));
            }
        }
    }
}

pub fn format_tabs(tabs: &[TabInfo]) -> String {
    if tabs.is_empty() {
        return "No tabs found.".to_string();
    }
    tabs.iter()
        .map(|t| format!("  - {} (ID: {})", t.title, t.tab_id))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Indent each heading two spaces per level.
pub fn format_headings(headings: &[Heading]) -> String {
    if headings.is_empty() {
        return "No headings found.".to_string();
    }
    headings
        .iter()
        .map(|h| format!("{}- {}", "  ".repeat(h.level as usize), h.text))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_comments(comments: &[Comment]) -> String {
    if comments.is_empty() {
        return "No comments on this file.".to_string();
    }

    let mut out = String::new();
    for comment in comments {
        let status = if comment.deleted {
            " [DELETED]"
        } else if comment.resolved {
            " [RESOLVED]"
        } else {
            ""
        };
        let author = comment.author.display_name.as_deref().unwrap_or("Unknown");

        out.push_str(&format!("{}{}\n", author, status));
        out.push_str(&format!("Created: {}\n", comment.created_time.as_deref().unwrap_or("-")));
        if let Some(quoted) = comment
            .quoted_file_content
            .as_ref()
            .map(|q| q.value.as_str())
            .filter(|q| !q.is_empty())
        {
            out.push_str(&format!("Quoted text:\n  \"{}\"\n", quoted));
        }
        out.push_str(&format!("\n{}\n", comment.content.trim()));

        if !comment.replies.is_empty() {
            out.push_str(&format!("\n  Replies ({}):\n", comment.replies.len()));
            for reply in &comment.replies {
                out.push_str(&format!(
                    "  -> {} ({}):\n    {}\n",
                    reply.author.display_name.as_deref().unwrap_or("Unknown"),
                    reply.created_time.as_deref().unwrap_or("-"),
                    reply.content.trim()
                ));
            }
        }
        out.push_str(&format!("{}\n", "-".repeat(RULE_WIDTH)));
    }
    out.push_str(&format!("Total comments: {}", comments.len()));
    out
}

pub fn format_export_summary(summary: &ExportSummary) -> String {
    let mut out = String::new();
    let ok = summary.succeeded().count();
    out.push_str(&format!("Exported {} of {} file(s):\n", ok, summary.outcomes.len()));
    for outcome in &summary.outcomes {
        let line = match &outcome.status {
            ArtifactStatus::Succeeded => format!("  ok      {}", outcome.path.display()),
            ArtifactStatus::Failed(reason) => {
                format!("  FAILED  {} ({})", outcome.path.display(), reason)
            }
            ArtifactStatus::Skipped(reason) => {
                format!("  SKIPPED {} ({})", outcome.path.display(), reason)
            }
        };
        out.push_str(&format!("{}\n", line));
    }
    out
}
