//! Data models for Google Drive, Sheets, and OAuth responses.

use serde::{Deserialize, Serialize};

pub const DOCUMENT_MIME: &str = "application/vnd.google-apps.document";
pub const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";
pub const PRESENTATION_MIME: &str = "application/vnd.google-apps.presentation";
pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
const GOOGLE_APPS_PREFIX: &str = "application/vnd.google-apps.";

/// Metadata for a file or folder in Google Drive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_size",
        skip_serializing_if = "Option::is_none"
    )]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owners: Vec<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modifying_user: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starred: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_size",
        skip_serializing_if = "Option::is_none"
    )]
    pub version: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<Permission>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Capabilities>,
}

/// Drive reports int64 values as JSON strings.
fn deserialize_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt {
        Some(s) => s.parse::<u64>().map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

impl FileMetadata {
    pub fn kind(&self) -> ResourceKind {
        ResourceKind::from_mime_type(self.mime_type.as_deref().unwrap_or(""))
    }

    pub fn type_label(&self) -> String {
        type_label(self.mime_type.as_deref().unwrap_or(""))
    }
}

impl std::fmt::Display for FileMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{:<12}] {:<44} {}",
            self.type_label(),
            self.id,
            self.name
        )
    }
}

/// Short display name for a mime type: `Document` for Google-native types,
/// the upper-cased subtype (`PDF`) for everything else.
pub fn type_label(mime_type: &str) -> String {
    if let Some(native) = mime_type.strip_prefix(GOOGLE_APPS_PREFIX) {
        let mut chars = native.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    } else if let Some((_, subtype)) = mime_type.split_once('/') {
        subtype.to_uppercase()
    } else {
        mime_type.to_string()
    }
}

/// Format bytes into human-readable size.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Drive user reference (owner, last modifier, comment author).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
}

impl std::fmt::Display for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({})",
            self.display_name.as_deref().unwrap_or("Unknown"),
            self.email_address.as_deref().unwrap_or("N/A")
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    #[serde(rename = "type", default)]
    pub grantee_type: String,
    #[serde(default)]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub can_edit: Option<bool>,
    pub can_comment: Option<bool>,
    pub can_share: Option<bool>,
    pub can_download: Option<bool>,
    pub can_copy: Option<bool>,
    pub can_delete: Option<bool>,
}

impl Capabilities {
    /// The capabilities worth showing, in display order.
    pub fn entries(&self) -> Vec<(&'static str, bool)> {
        [
            ("Edit", self.can_edit),
            ("Comment", self.can_comment),
            ("Share", self.can_share),
            ("Download", self.can_download),
            ("Copy", self.can_copy),
            ("Delete", self.can_delete),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
        .collect()
    }
}

/// Response from the files.list API endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileListResponse {
    #[serde(default)]
    pub files: Vec<FileMetadata>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// A comment thread on a Drive file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author: User,
    #[serde(default)]
    pub created_time: Option<String>,
    #[serde(default)]
    pub resolved: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub quoted_file_content: Option<QuotedFileContent>,
    #[serde(default)]
    pub replies: Vec<Reply>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotedFileContent {
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author: User,
    #[serde(default)]
    pub created_time: Option<String>,
}

/// Response from the comments.list API endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentListResponse {
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Spreadsheet metadata from the Sheets API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spreadsheet {
    pub spreadsheet_id: String,
    #[serde(default)]
    pub properties: SpreadsheetProperties,
    #[serde(default)]
    pub sheets: Vec<Sheet>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SpreadsheetProperties {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Sheet {
    pub properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    pub sheet_id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub index: u32,
}

impl Spreadsheet {
    /// Sheets as tabs, ordered by sheet index.
    pub fn tabs(&self) -> Vec<TabInfo> {
        let mut sheets: Vec<&SheetProperties> = self.sheets.iter().map(|s| &s.properties).collect();
        sheets.sort_by_key(|p| p.index);
        sheets
            .into_iter()
            .map(|p| TabInfo {
                tab_id: p.sheet_id.to_string(),
                title: p.title.clone().unwrap_or_else(|| "Untitled".to_string()),
            })
            .collect()
    }
}

/// Resource type, decided once from the mime type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Document,
    Spreadsheet,
    BinaryFile,
    Unknown,
}

impl ResourceKind {
    pub fn from_mime_type(mime_type: &str) -> Self {
        match mime_type {
            DOCUMENT_MIME => ResourceKind::Document,
            SPREADSHEET_MIME => ResourceKind::Spreadsheet,
            "" => ResourceKind::Unknown,
            m if m.starts_with(GOOGLE_APPS_PREFIX) => ResourceKind::Unknown,
            _ => ResourceKind::BinaryFile,
        }
    }
}

/// A named, independently exportable part of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TabInfo {
    pub tab_id: String,
    pub title: String,
}

/// Snapshot of everything the export planner needs to know about a resource.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceMetadata {
    pub id: String,
    pub title: String,
    pub mime_type: String,
    pub kind: ResourceKind,
    pub tabs: Vec<TabInfo>,
}

impl ResourceMetadata {
    pub fn new(id: String, title: String, mime_type: String, tabs: Vec<TabInfo>) -> Self {
        let kind = ResourceKind::from_mime_type(&mime_type);
        Self {
            id,
            title,
            mime_type,
            kind,
            tabs,
        }
    }

    pub fn is_multi_tab(&self) -> bool {
        self.tabs.len() > 1
    }
}

/// Google API error response.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    pub code: u16,
    pub message: String,
    #[serde(default)]
    pub errors: Vec<ApiErrorReason>,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorReason {
    #[serde(default)]
    pub reason: String,
}

/// Service account credentials from JSON file.
#[derive(Debug, Deserialize)]
pub struct ServiceAccountCredentials {
    pub client_email: String,
    pub private_key: String,
    pub token_uri: Option<String>,
}

/// OAuth client secrets as downloaded from the Cloud console.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthClientSecret {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub auth_uri: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
}

/// Contents of `credentials.json`: a desktop OAuth client or a service account key.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CredentialsFile {
    Installed { installed: OAuthClientSecret },
    Web { web: OAuthClientSecret },
    ServiceAccount(ServiceAccountCredentials),
}

/// OAuth2 token response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    pub expires_in: u64,
    #[serde(default)]
    pub refresh_token: Option<String>,
}
