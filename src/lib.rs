//! gcmd - A command-line tool for Google Drive, Docs, and Sheets.
//!
//! This library provides functionality to:
//! - List and search files across My Drive and shared drives
//! - Show file details, document structure, and comments
//! - Export Docs to markdown (optionally one file per tab) and Sheets to CSV per sheet
//! - Download non-native files as-is
//!
//! # Example
//!
//! ```no_run
//! use gcmd::{
//!     execute_plan, parse_reference, plan_export, resolve_metadata, AuthSession, ConfigPaths,
//!     DriveClient, FsWriter, OutputTarget, RetryPolicy, TokioSleeper,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let auth = AuthSession::load(ConfigPaths::discover()?)?;
//!     let client = DriveClient::new(&auth);
//!
//!     let reference = parse_reference("https://docs.google.com/document/d/abc123/edit")?;
//!     let policy = RetryPolicy::default();
//!     let metadata = resolve_metadata(&client, &reference.id, &TokioSleeper, &policy).await?;
//!     let plan = plan_export(&metadata, true, &OutputTarget::None)?;
//!
//!     let summary = execute_plan(&plan, &client, &FsWriter, &TokioSleeper, &policy).await;
//!     println!("{} file(s) written", summary.succeeded().count());
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod docs;
pub mod error;
pub mod export;
pub mod models;
pub mod namer;
pub mod output;
pub mod plan;
pub mod retry;
pub mod url_parser;

// Re-exports for convenience
pub use auth::AuthSession;
pub use client::{DriveClient, ListQuery, RemoteSource};
pub use config::{Config, ConfigPaths};
pub use error::{DriveError, Result};
pub use export::{execute_plan, resolve_metadata, ArtifactWriter, ExportSummary, FsWriter};
pub use models::{FileMetadata, ResourceKind, ResourceMetadata};
pub use plan::{plan_export, ExportPlan, OutputTarget};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use url_parser::{extract_id, parse_reference, ResourceRef};
