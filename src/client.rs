//! Google Drive, Docs, and Sheets API client.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::auth::AuthSession;
use crate::docs::Document;
use crate::error::{DriveError, Result};
use crate::models::{
    ApiErrorResponse, Comment, CommentListResponse, FileListResponse, FileMetadata,
    ResourceKind, ResourceMetadata, Spreadsheet, DOCUMENT_MIME, FOLDER_MIME, PRESENTATION_MIME,
    SPREADSHEET_MIME,
};
use crate::plan::ExportFormat;

/// Base URL for Google Drive API v3.
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Base URL for Google Docs API v1.
const DOCS_API_BASE: &str = "https://docs.googleapis.com/v1";

/// Base URL for Google Sheets API v4.
const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4";

/// Web host serving per-sheet CSV exports.
const DOCS_WEB_BASE: &str = "https://docs.google.com";

const BASIC_FIELDS: &str = "id,name,mimeType,size,createdTime,modifiedTime,webViewLink";

const DETAILED_FIELDS: &str = "id,name,mimeType,size,createdTime,modifiedTime,webViewLink,\
owners,lastModifyingUser,permissions,shared,description,starred,version,capabilities";

const LIST_FIELDS: &str =
    "nextPageToken,files(id,name,mimeType,size,createdTime,modifiedTime,webViewLink,owners)";

const COMMENT_FIELDS: &str = "nextPageToken,comments(id,content,author,createdTime,\
modifiedTime,resolved,deleted,replies,quotedFileContent)";

/// Largest page the files.list endpoint accepts.
const MAX_PAGE_SIZE: u32 = 1000;

/// What the export executor needs from the remote service.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Type, title, and tabs/sheets of a resource.
    async fn fetch_metadata(&self, id: &str) -> Result<ResourceMetadata>;

    /// Content of a resource (or one of its tabs) in the given format.
    async fn fetch_content(
        &self,
        id: &str,
        tab_id: Option<&str>,
        format: ExportFormat,
    ) -> Result<Vec<u8>>;
}

/// API base URLs; overridden in tests to point at a mock server.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub drive: String,
    pub docs: String,
    pub sheets: String,
    pub docs_web: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            drive: DRIVE_API_BASE.to_string(),
            docs: DOCS_API_BASE.to_string(),
            sheets: SHEETS_API_BASE.to_string(),
            docs_web: DOCS_WEB_BASE.to_string(),
        }
    }
}

impl Endpoints {
    /// Every API rooted at one base URL.
    pub fn single(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            drive: format!("{base}/drive/v3"),
            docs: format!("{base}/docs/v1"),
            sheets: format!("{base}/sheets/v4"),
            docs_web: base.to_string(),
        }
    }
}

/// Filters for [`DriveClient::list_files`].
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub text: Option<String>,
    pub mime_type: Option<String>,
    pub folder_id: Option<String>,
    pub max_results: u32,
    pub order_by: String,
    pub include_trashed: bool,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            text: None,
            mime_type: None,
            folder_id: None,
            max_results: 20,
            order_by: "modifiedTime desc".to_string(),
            include_trashed: false,
        }
    }
}

impl ListQuery {
    /// Map `docs`/`sheets`/`slides`/`folders` to their mime types; anything
    /// else is taken as a mime type already.
    pub fn mime_for_type(type_filter: &str) -> String {
        match type_filter.to_lowercase().as_str() {
            "docs" => DOCUMENT_MIME.to_string(),
            "sheets" => SPREADSHEET_MIME.to_string(),
            "slides" => PRESENTATION_MIME.to_string(),
            "folders" => FOLDER_MIME.to_string(),
            _ => type_filter.to_string(),
        }
    }

    /// The Drive `q` expression for these filters.
    pub fn to_query(&self) -> String {
        let mut parts = Vec::new();
        if !self.include_trashed {
            parts.push("trashed = false".to_string());
        }
        if let Some(text) = &self.text {
            let text = escape_query(text);
            parts.push(format!(
                "(name contains '{text}' or fullText contains '{text}')"
            ));
        }
        if let Some(mime) = &self.mime_type {
            parts.push(format!("mimeType = '{}'", escape_query(mime)));
        }
        if let Some(folder) = &self.folder_id {
            parts.push(format!("'{}' in parents", escape_query(folder)));
        }
        parts.join(" and ")
    }
}

fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Turn a non-success response body into the error taxonomy: quota and
/// server errors are transient, everything else is fatal.
pub fn classify_error(status: u16, body: &str) -> DriveError {
    let (message, reasons): (String, Vec<String>) =
        match serde_json::from_str::<ApiErrorResponse>(body) {
            Ok(api_error) => (
                api_error.error.message,
                api_error.error.errors.into_iter().map(|e| e.reason).collect(),
            ),
            Err(_) => (body.to_string(), Vec::new()),
        };

    let quota = reasons
        .iter()
        .any(|r| r == "rateLimitExceeded" || r == "userRateLimitExceeded");
    let transient = status == 429 || (status == 403 && quota) || matches!(status, 500 | 502 | 503 | 504);

    if transient {
        DriveError::RemoteTransient { status, message }
    } else {
        DriveError::RemoteFatal { status, message }
    }
}

async fn check_response(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_error(status.as_u16(), &body))
}

/// Client for the Drive family of APIs, authenticated by an [`AuthSession`].
pub struct DriveClient<'a> {
    auth: &'a AuthSession,
    http: Client,
    endpoints: Endpoints,
    /// Documents fetched for metadata or tab export, keyed by ID. One fetch
    /// serves every tab of a plan.
    documents: Mutex<HashMap<String, Arc<Document>>>,
}

impl<'a> DriveClient<'a> {
    pub fn new(auth: &'a AuthSession) -> Self {
        Self::with_endpoints(auth, Endpoints::default())
    }

    pub fn with_endpoints(auth: &'a AuthSession, endpoints: Endpoints) -> Self {
        Self {
            auth,
            http: Client::new(),
            endpoints,
            documents: Mutex::new(HashMap::new()),
        }
    }

    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<Response> {
        let token = self.auth.access_token().await?;
        debug!("GET {} {:?}", url, query);
        let response = self
            .http
            .get(url)
            .bearer_auth(&token)
            .query(query)
            .send()
            .await?;
        check_response(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T> {
        Ok(self.get(url, query).await?.json().await?)
    }

    async fn get_bytes(&self, url: &str, query: &[(&str, &str)]) -> Result<Vec<u8>> {
        Ok(self.get(url, query).await?.bytes().await?.to_vec())
    }

    /// List files matching the filters, following pages up to `max_results`.
    pub async fn list_files(&self, filters: &ListQuery) -> Result<Vec<FileMetadata>> {
        let q = filters.to_query();
        let url = format!("{}/files", self.endpoints.drive);
        let mut all_files = Vec::new();
        let mut page_token: Option<String> = None;

        while all_files.len() < filters.max_results as usize {
            let remaining = filters.max_results as usize - all_files.len();
            let page_size = remaining.min(MAX_PAGE_SIZE as usize).to_string();

            let mut query: Vec<(&str, &str)> = vec![
                ("pageSize", page_size.as_str()),
                ("orderBy", filters.order_by.as_str()),
                ("fields", LIST_FIELDS),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ];
            if !q.is_empty() {
                query.push(("q", q.as_str()));
            }
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let list_response: FileListResponse = self.get_json(&url, &query).await?;
            all_files.extend(list_response.files);

            match list_response.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        all_files.truncate(filters.max_results as usize);
        Ok(all_files)
    }

    /// Get file metadata by ID; `detailed` adds owners, permissions, and capabilities.
    pub async fn get_file(&self, file_id: &str, detailed: bool) -> Result<FileMetadata> {
        let fields = if detailed { DETAILED_FIELDS } else { BASIC_FIELDS };
        self.get_json(
            &format!("{}/files/{}", self.endpoints.drive, file_id),
            &[("supportsAllDrives", "true"), ("fields", fields)],
        )
        .await
    }

    /// Full document including every tab's content.
    pub async fn get_document(&self, document_id: &str) -> Result<Document> {
        self.get_json(
            &format!("{}/documents/{}", self.endpoints.docs, document_id),
            &[("includeTabsContent", "true")],
        )
        .await
    }

    /// Like [`get_document`](Self::get_document), but fetched at most once per client.
    async fn cached_document(&self, document_id: &str) -> Result<Arc<Document>> {
        let cached = self
            .documents
            .lock()
            .ok()
            .and_then(|docs| docs.get(document_id).cloned());
        if let Some(document) = cached {
            return Ok(document);
        }

        let document = Arc::new(self.get_document(document_id).await?);
        if let Ok(mut docs) = self.documents.lock() {
            docs.insert(document_id.to_string(), Arc::clone(&document));
        }
        Ok(document)
    }

    /// Spreadsheet title and sheet properties.
    pub async fn get_spreadsheet(&self, spreadsheet_id: &str) -> Result<Spreadsheet> {
        self.get_json(
            &format!("{}/spreadsheets/{}", self.endpoints.sheets, spreadsheet_id),
            &[("fields", "spreadsheetId,properties.title,sheets.properties")],
        )
        .await
    }

    /// All non-deleted comments on a file.
    pub async fn list_comments(&self, file_id: &str) -> Result<Vec<Comment>> {
        let url = format!("{}/files/{}/comments", self.endpoints.drive, file_id);
        let mut comments = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query: Vec<(&str, &str)> = vec![
                ("fields", COMMENT_FIELDS),
                ("includeDeleted", "false"),
                ("pageSize", "100"),
            ];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let response: CommentListResponse = self.get_json(&url, &query).await?;
            comments.extend(response.comments);

            match response.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(comments)
    }

    /// Export a Google-native file through Drive's converter.
    pub async fn export_file(&self, file_id: &str, mime_type: &str) -> Result<Vec<u8>> {
        self.get_bytes(
            &format!("{}/files/{}/export", self.endpoints.drive, file_id),
            &[("mimeType", mime_type)],
        )
        .await
    }

    /// One sheet of a spreadsheet as CSV.
    pub async fn export_sheet_csv(&self, spreadsheet_id: &str, sheet_id: &str) -> Result<Vec<u8>> {
        self.get_bytes(
            &format!(
                "{}/spreadsheets/d/{}/export",
                self.endpoints.docs_web, spreadsheet_id
            ),
            &[("format", "csv"), ("gid", sheet_id)],
        )
        .await
    }

    /// Raw bytes of a non-native file.
    pub async fn download_media(&self, file_id: &str) -> Result<Vec<u8>> {
        self.get_bytes(
            &format!("{}/files/{}", self.endpoints.drive, file_id),
            &[("alt", "media"), ("supportsAllDrives", "true")],
        )
        .await
    }
}

#[async_trait]
impl<'a> RemoteSource for DriveClient<'a> {
    async fn fetch_metadata(&self, id: &str) -> Result<ResourceMetadata> {
        let file = self.get_file(id, false).await?;
        let tabs = match file.kind() {
            ResourceKind::Document => self.cached_document(id).await?.tab_infos(),
            ResourceKind::Spreadsheet => self.get_spreadsheet(id).await?.tabs(),
            ResourceKind::BinaryFile | ResourceKind::Unknown => Vec::new(),
        };

        Ok(ResourceMetadata::new(
            file.id,
            file.name,
            file.mime_type.unwrap_or_default(),
            tabs,
        ))
    }

    async fn fetch_content(
        &self,
        id: &str,
        tab_id: Option<&str>,
        format: ExportFormat,
    ) -> Result<Vec<u8>> {
        match (format, tab_id) {
            (ExportFormat::Markdown, None) => self.export_file(id, "text/markdown").await,
            (ExportFormat::Markdown, Some(tab_id)) => {
                let document = self.cached_document(id).await?;
                let tab = document
                    .find_tab(tab_id)
                    .ok_or_else(|| DriveError::TabNotFound {
                        document_id: id.to_string(),
                        tab_id: tab_id.to_string(),
                    })?;
                Ok(tab.to_markdown().into_bytes())
            }
            (ExportFormat::Csv, Some(sheet_id)) => self.export_sheet_csv(id, sheet_id).await,
            (ExportFormat::Csv, None) => self.export_file(id, "text/csv").await,
            (ExportFormat::Binary, _) => self.download_media(id).await,
        }
    }
}
