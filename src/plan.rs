//! Export planning: decide which files an export produces before fetching anything.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::error::{DriveError, Result};
use crate::models::{ResourceKind, ResourceMetadata};
use crate::namer::{dedupe, sanitize_name, CSV_SUFFIX, MARKDOWN_SUFFIX};

/// Content format requested from the remote service for one artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Markdown,
    Csv,
    Binary,
}

/// Where the user asked the output to go, resolved against the filesystem
/// before planning so that planning itself stays pure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// No `-o` given: write into the current directory.
    None,
    /// An existing directory, or a path spelled with a trailing separator.
    Directory(PathBuf),
    /// An existing non-directory file.
    ExistingFile(PathBuf),
    /// A path that does not exist yet.
    NewPath(PathBuf),
}

impl OutputTarget {
    /// Classify an optional `-o` argument by looking at the filesystem.
    pub fn resolve(output: Option<&Path>) -> Self {
        let Some(path) = output else {
            return OutputTarget::None;
        };

        let spelled_as_dir = path
            .to_str()
            .map(|s| s.ends_with('/') || s.ends_with(std::path::MAIN_SEPARATOR))
            .unwrap_or(false);

        if path.is_dir() || spelled_as_dir {
            OutputTarget::Directory(path.to_path_buf())
        } else if path.exists() {
            OutputTarget::ExistingFile(path.to_path_buf())
        } else {
            OutputTarget::NewPath(path.to_path_buf())
        }
    }

    fn base_dir(&self) -> Option<PathBuf> {
        match self {
            OutputTarget::None => None,
            OutputTarget::Directory(dir) | OutputTarget::NewPath(dir) => Some(dir.clone()),
            OutputTarget::ExistingFile(path) => Some(path.clone()),
        }
    }
}

/// One planned output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub source_tab_id: Option<String>,
    /// Directory to create and write into; `None` means the current directory.
    pub directory: Option<PathBuf>,
    pub file_name: String,
    pub format: ExportFormat,
}

impl Artifact {
    pub fn path(&self) -> PathBuf {
        match &self.directory {
            Some(dir) => dir.join(&self.file_name),
            None => PathBuf::from(&self.file_name),
        }
    }

    fn at_path(path: &Path, format: ExportFormat, source_tab_id: Option<String>) -> Self {
        let directory = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf);
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());

        Self {
            source_tab_id,
            directory,
            file_name,
            format,
        }
    }
}

/// The ordered list of artifacts one export produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportPlan {
    pub resource_id: String,
    pub artifacts: Vec<Artifact>,
}

/// Build the export plan for a resource.
///
/// Fails without side effects when the flags and output target cannot be
/// satisfied for this kind of resource.
pub fn plan_export(
    metadata: &ResourceMetadata,
    all_tabs: bool,
    output: &OutputTarget,
) -> Result<ExportPlan> {
    let artifacts = match metadata.kind {
        ResourceKind::Spreadsheet => plan_spreadsheet(metadata, all_tabs, output)?,
        ResourceKind::Document => plan_document(metadata, all_tabs, output)?,
        ResourceKind::BinaryFile => vec![plan_binary(metadata, output)],
        ResourceKind::Unknown => {
            if matches!(output, OutputTarget::None) {
                return Err(DriveError::AmbiguousOutput {
                    title: metadata.title.clone(),
                    mime_type: metadata.mime_type.clone(),
                });
            }
            vec![plan_binary(metadata, output)]
        }
    };

    Ok(ExportPlan {
        resource_id: metadata.id.clone(),
        artifacts,
    })
}

fn plan_spreadsheet(
    metadata: &ResourceMetadata,
    all_tabs: bool,
    output: &OutputTarget,
) -> Result<Vec<Artifact>> {
    if all_tabs {
        return Err(DriveError::UnsupportedFormat(
            "--all-tabs applies to Google Docs tabs; spreadsheets always export one CSV per sheet"
                .to_string(),
        ));
    }

    let title = sanitize_name(&metadata.title);

    if let OutputTarget::ExistingFile(path) = output {
        return Err(DriveError::OutputConflict {
            path: path.clone(),
            artifacts: metadata.tabs.len().max(1),
        });
    }

    let directory = match output.base_dir() {
        Some(base) => base.join(&title),
        None => PathBuf::from(&title),
    };

    if metadata.tabs.is_empty() {
        return Ok(vec![Artifact {
            source_tab_id: None,
            directory: Some(directory),
            file_name: format!("{title}{CSV_SUFFIX}"),
            format: ExportFormat::Csv,
        }]);
    }

    let stems = metadata.tabs.iter().map(|t| sanitize_name(&t.title)).collect();
    let names = dedupe(stems, CSV_SUFFIX);

    Ok(metadata
        .tabs
        .iter()
        .zip(names)
        .map(|(tab, file_name)| Artifact {
            source_tab_id: Some(tab.tab_id.clone()),
            directory: Some(directory.clone()),
            file_name,
            format: ExportFormat::Csv,
        })
        .collect())
}

fn plan_document(
    metadata: &ResourceMetadata,
    all_tabs: bool,
    output: &OutputTarget,
) -> Result<Vec<Artifact>> {
    let title = sanitize_name(&metadata.title);

    if !all_tabs || !metadata.is_multi_tab() {
        if all_tabs {
            info!(id = %metadata.id, "document has a single tab, exporting it as one file");
        }
        let default_name = format!("{title}{MARKDOWN_SUFFIX}");
        let artifact = match output {
            OutputTarget::None => Artifact {
                source_tab_id: None,
                directory: None,
                file_name: default_name,
                format: ExportFormat::Markdown,
            },
            OutputTarget::Directory(dir) => Artifact {
                source_tab_id: None,
                directory: Some(dir.clone()),
                file_name: default_name,
                format: ExportFormat::Markdown,
            },
            OutputTarget::ExistingFile(path) => {
                Artifact::at_path(path, ExportFormat::Markdown, None)
            }
            OutputTarget::NewPath(path) => {
                let path = if path.extension().is_none() {
                    path.with_extension("md")
                } else {
                    path.clone()
                };
                Artifact::at_path(&path, ExportFormat::Markdown, None)
            }
        };
        return Ok(vec![artifact]);
    }

    if let OutputTarget::ExistingFile(path) = output {
        return Err(DriveError::OutputConflict {
            path: path.clone(),
            artifacts: metadata.tabs.len(),
        });
    }

    let directory = output.base_dir();
    let stems = metadata
        .tabs
        .iter()
        .map(|t| format!("{title} - {}", sanitize_name(&t.title)))
        .collect();
    let names = dedupe(stems, MARKDOWN_SUFFIX);

    Ok(metadata
        .tabs
        .iter()
        .zip(names)
        .map(|(tab, file_name)| Artifact {
            source_tab_id: Some(tab.tab_id.clone()),
            directory: directory.clone(),
            file_name,
            format: ExportFormat::Markdown,
        })
        .collect())
}

fn plan_binary(metadata: &ResourceMetadata, output: &OutputTarget) -> Artifact {
    let name = sanitize_name(&metadata.title);
    match output {
        OutputTarget::None => Artifact {
            source_tab_id: None,
            directory: None,
            file_name: name,
            format: ExportFormat::Binary,
        },
        OutputTarget::Directory(dir) => Artifact {
            source_tab_id: None,
            directory: Some(dir.clone()),
            file_name: name,
            format: ExportFormat::Binary,
        },
        OutputTarget::ExistingFile(path) | OutputTarget::NewPath(path) => {
            Artifact::at_path(path, ExportFormat::Binary, None)
        }
    }
}
