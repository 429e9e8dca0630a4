//! Error types for the gcmd crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when resolving, planning, or fetching Drive resources.
#[derive(Error, Debug)]
pub enum DriveError {
    #[error("Invalid file reference: {input}\n{hint}")]
    InvalidReference { input: String, hint: String },

    #[error("Cannot decide where to write {title:?} (type {mime_type}); pass an output path with -o")]
    AmbiguousOutput { title: String, mime_type: String },

    #[error("Output path {} is an existing file but {artifacts} outputs are planned", .path.display())]
    OutputConflict { path: PathBuf, artifacts: usize },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Rate limited ({status}): {message}")]
    RemoteTransient { status: u16, message: String },

    #[error("API error ({status}): {message}")]
    RemoteFatal { status: u16, message: String },

    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Token refresh failed: {0}")]
    TokenRefreshError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JWT encoding error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Tab {tab_id} not found in document {document_id}")]
    TabNotFound { document_id: String, tab_id: String },
}

impl DriveError {
    /// Whether the export executor may retry the failed request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DriveError::RemoteTransient { .. })
    }

    /// Whether the error was raised before any remote call was made.
    pub fn is_planning_error(&self) -> bool {
        matches!(
            self,
            DriveError::InvalidReference { .. }
                | DriveError::AmbiguousOutput { .. }
                | DriveError::OutputConflict { .. }
                | DriveError::UnsupportedFormat(_)
        )
    }
}

/// Result type alias for DriveError.
pub type Result<T> = std::result::Result<T, DriveError>;
