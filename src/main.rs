//! gcmd CLI - Google Drive, Docs, and Sheets from the command line.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gcmd::models::{ResourceKind, FOLDER_MIME};
use gcmd::output::{self, FileReport};
use gcmd::url_parser::KindHint;
use gcmd::{
    execute_plan, parse_reference, plan_export, resolve_metadata, AuthSession, Config,
    ConfigPaths, DriveClient, DriveError, FsWriter, ListQuery, OutputTarget, ResourceRef,
    RetryPolicy, TokioSleeper,
};

/// Command-line access to Google Drive, Docs, and Sheets.
#[derive(Parser)]
#[command(name = "gcmd")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding credentials.json, token.json, and config.toml.
    #[arg(long, env = "GCMD_CONFIG_DIR", global = true)]
    config_dir: Option<PathBuf>,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    /// Log filter (e.g. "info", "gcmd=debug"); RUST_LOG takes precedence.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List or search files.
    List {
        /// Only list files inside this folder (URL or ID).
        folder: Option<String>,

        /// Match file names and full text.
        #[arg(long, short = 'q')]
        query: Option<String>,

        /// File type: docs, sheets, slides, folders, or a mime type.
        #[arg(long, short = 't')]
        r#type: Option<String>,

        /// Maximum number of results.
        #[arg(long, short = 'n')]
        max_results: Option<u32>,

        /// Show modified time, size, and owner.
        #[arg(long, short = 'v')]
        verbose: bool,

        /// Sort order, e.g. "name" or "modifiedTime desc".
        #[arg(long)]
        order_by: Option<String>,
    },

    /// Show file details.
    Info {
        /// File URL or ID.
        file: String,

        /// Add owners, permissions, capabilities, document structure, and comments.
        #[arg(long, short = 'v')]
        verbose: bool,

        /// Show comments without the rest of the verbose output.
        #[arg(long)]
        show_comments: bool,
    },

    /// Export a Doc to markdown or a Sheet to CSV (one file per sheet).
    Export {
        /// Document or spreadsheet URL or ID.
        file: String,

        /// Output file or directory.
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Write one markdown file per document tab.
        #[arg(long)]
        all_tabs: bool,
    },

    /// Download a non-Google file as-is.
    Download {
        /// File URL or ID.
        file: String,

        /// Output file or directory.
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Forget the cached access token.
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let paths = match &cli.config_dir {
        Some(dir) => ConfigPaths::in_dir(dir),
        None => ConfigPaths::discover().context("Failed to locate the config directory")?,
    };
    let config_file = paths.config_file();
    let config = Config::load(&config_file)
        .with_context(|| format!("Failed to load config from {:?}", config_file))?;

    init_logging(cli.log_level.as_deref().unwrap_or(&config.logging.level));

    run(cli, paths, config).await
}

async fn run(cli: Cli, paths: ConfigPaths, config: Config) -> Result<()> {
    match cli.command {
        Commands::Logout => {
            let removed = AuthSession::logout(&paths).context("Failed to remove cached token")?;
            if removed {
                println!("Logged out. Cached token removed.");
            } else {
                println!("No cached token found.");
            }
        }

        Commands::List {
            folder,
            query,
            r#type,
            max_results,
            verbose,
            order_by,
        } => {
            let folder_id = folder
                .as_deref()
                .map(parse_reference)
                .transpose()?
                .map(|r| r.id);

            let filters = ListQuery {
                text: query,
                mime_type: r#type.as_deref().map(ListQuery::mime_for_type),
                folder_id,
                max_results: max_results.unwrap_or(config.list.max_results),
                order_by: order_by.unwrap_or_else(|| config.list.order_by.clone()),
                include_trashed: false,
            };

            let auth = connect(&paths)?;
            let client = DriveClient::new(&auth);
            let files = client
                .list_files(&filters)
                .await
                .context("Failed to list files")?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&files)?);
            } else {
                println!("{}", output::format_file_list(&files, verbose));
            }
        }

        Commands::Info {
            file,
            verbose,
            show_comments,
        } => {
            let file_id = parse_reference(&file)?.id;

            let auth = connect(&paths)?;
            let client = DriveClient::new(&auth);
            let metadata = client
                .get_file(&file_id, verbose)
                .await
                .with_context(|| format!("Failed to get file info: {}", file_id))?;

            let mut tabs = None;
            let mut headings = None;
            let mut structure_error = None;
            if verbose {
                match metadata.kind() {
                    ResourceKind::Document => match client.get_document(&file_id).await {
                        Ok(document) => {
                            tabs = Some(document.tab_infos());
                            headings = Some(document.headings());
                        }
                        Err(e) => structure_error = Some(e.to_string()),
                    },
                    ResourceKind::Spreadsheet => match client.get_spreadsheet(&file_id).await {
                        Ok(spreadsheet) => tabs = Some(spreadsheet.tabs()),
                        Err(e) => structure_error = Some(e.to_string()),
                    },
                    ResourceKind::BinaryFile | ResourceKind::Unknown => {}
                }
            }

            let mut comments = None;
            let mut comments_error = None;
            if verbose || show_comments {
                match client.list_comments(&file_id).await {
                    Ok(list) => comments = Some(list),
                    Err(e) => comments_error = Some(e.to_string()),
                }
            }

            if cli.json {
                let notes: Vec<String> = structure_error.into_iter().chain(comments_error).collect();
                let report = json!({
                    "file": metadata,
                    "tabs": tabs,
                    "headings": headings,
                    "comments": comments,
                    "notes": notes,
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                let report = FileReport {
                    file: Some(&metadata),
                    verbose,
                    tabs: tabs.as_deref(),
                    headings: headings.as_deref(),
                    structure_error,
                    comments: comments.as_deref(),
                    comments_error,
                };
                print!("{}", output::format_file_report(&report));
            }
        }

        Commands::Export {
            file,
            output,
            all_tabs,
        } => {
            let reference = export_reference(&file)?;
            let auth = connect(&paths)?;
            let client = DriveClient::new(&auth);
            run_export(&client, &config, &reference, output, all_tabs, false, cli.json).await?;
        }

        Commands::Download { file, output } => {
            let reference = export_reference(&file)?;
            let auth = connect(&paths)?;
            let client = DriveClient::new(&auth);
            run_export(&client, &config, &reference, output, false, true, cli.json).await?;
        }
    }

    Ok(())
}

fn connect(paths: &ConfigPaths) -> Result<AuthSession> {
    AuthSession::load(paths.clone())
        .with_context(|| format!("Failed to load credentials from {:?}", paths.dir))
}

/// Parse an export/download argument; folders are rejected here.
fn export_reference(file: &str) -> Result<ResourceRef> {
    let reference = parse_reference(file)?;
    if reference.kind_hint == KindHint::Folder {
        bail!("{} is a folder; use `gcmd list {}` instead", file, reference.id);
    }
    Ok(reference)
}

/// Resolve, plan, and execute an export or download.
async fn run_export(
    client: &DriveClient<'_>,
    config: &Config,
    reference: &ResourceRef,
    output: Option<PathBuf>,
    all_tabs: bool,
    download: bool,
    as_json: bool,
) -> Result<()> {
    let policy = RetryPolicy::from(&config.export);
    let metadata = resolve_metadata(client, &reference.id, &TokioSleeper, &policy)
        .await
        .with_context(|| format!("Failed to get file info: {}", reference.id))?;

    if metadata.mime_type == FOLDER_MIME {
        bail!("{} is a folder; use `gcmd list {}` instead", metadata.title, reference.id);
    }

    if download && matches!(metadata.kind, ResourceKind::Document | ResourceKind::Spreadsheet) {
        return Err(DriveError::UnsupportedFormat(format!(
            "{} is a Google Docs/Sheets file; use `gcmd export` instead",
            metadata.title
        ))
        .into());
    }

    if let Some(tab_id) = &reference.tab_id {
        if !all_tabs {
            warn!(tab = %tab_id, "tab in URL ignored; exporting the whole document");
        }
    }

    let target = OutputTarget::resolve(output.as_deref());
    let plan = plan_export(&metadata, all_tabs, &target)?;
    info!(
        id = %plan.resource_id,
        artifacts = plan.artifacts.len(),
        "planned export"
    );

    let summary = execute_plan(&plan, client, &FsWriter, &TokioSleeper, &policy).await;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", output::format_export_summary(&summary));
    }

    if !summary.is_success() {
        bail!(
            "{} of {} file(s) were not exported",
            summary.failed().count(),
            summary.outcomes.len()
        );
    }
    Ok(())
}

/// Log to stderr, filtered by RUST_LOG or else `default_level`.
fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}
