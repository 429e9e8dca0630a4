//! Runs an export plan: fetch each artifact in order, write it, report per-artifact results.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::client::RemoteSource;
use crate::error::Result;
use crate::models::ResourceMetadata;
use crate::plan::{Artifact, ExportPlan};
use crate::retry::{with_retry, RetryPolicy, Sleeper};

/// Where exported bytes go.
pub trait ArtifactWriter: Send + Sync {
    fn ensure_directory(&self, path: &Path) -> Result<()>;
    fn write(&self, path: &Path, bytes: &[u8]) -> Result<()>;
}

/// Writes artifacts to the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsWriter;

impl ArtifactWriter for FsWriter {
    fn ensure_directory(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)?;
        Ok(())
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        fs::write(path, bytes)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ArtifactStatus {
    Succeeded,
    Failed(String),
    /// Not attempted because an earlier artifact exhausted its rate-limit retries.
    Skipped(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactOutcome {
    pub path: PathBuf,
    pub source_tab_id: Option<String>,
    #[serde(flatten)]
    pub status: ArtifactStatus,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportSummary {
    pub outcomes: Vec<ArtifactOutcome>,
}

impl ExportSummary {
    pub fn succeeded(&self) -> impl Iterator<Item = &ArtifactOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == ArtifactStatus::Succeeded)
    }

    pub fn failed(&self) -> impl Iterator<Item = &ArtifactOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status != ArtifactStatus::Succeeded)
    }

    pub fn is_success(&self) -> bool {
        self.failed().next().is_none()
    }
}

/// Fetch the metadata a plan is built from, retrying rate limits per `policy`.
pub async fn resolve_metadata<R, S>(
    remote: &R,
    id: &str,
    sleeper: &S,
    policy: &RetryPolicy,
) -> Result<ResourceMetadata>
where
    R: RemoteSource + ?Sized,
    S: Sleeper + ?Sized,
{
    with_retry(policy, sleeper, &format!("metadata for {id}"), || {
        remote.fetch_metadata(id)
    })
    .await
}

/// Execute `plan` one artifact at a time, in plan order.
///
/// Rate-limit errors are retried per `policy`; once an artifact runs out of
/// retries every remaining artifact is skipped. Any other error fails only
/// the artifact it happened on.
pub async fn execute_plan<R, W, S>(
    plan: &ExportPlan,
    remote: &R,
    writer: &W,
    sleeper: &S,
    policy: &RetryPolicy,
) -> ExportSummary
where
    R: RemoteSource + ?Sized,
    W: ArtifactWriter + ?Sized,
    S: Sleeper + ?Sized,
{
    let total = plan.artifacts.len();
    let mut summary = ExportSummary::default();
    let mut exhausted: Option<String> = None;

    for (idx, artifact) in plan.artifacts.iter().enumerate() {
        let path = artifact.path();

        if let Some(reason) = &exhausted {
            summary.outcomes.push(ArtifactOutcome {
                path,
                source_tab_id: artifact.source_tab_id.clone(),
                status: ArtifactStatus::Skipped(reason.clone()),
            });
            continue;
        }

        if idx > 0 && !policy.inter_request_delay.is_zero() {
            sleeper.sleep(policy.inter_request_delay).await;
        }

        info!("Exporting {}/{}: {}", idx + 1, total, path.display());

        let status = match export_one(plan, artifact, &path, remote, writer, sleeper, policy).await {
            Ok(()) => ArtifactStatus::Succeeded,
            Err(e) => {
                warn!("Failed to export {}: {}", path.display(), e);
                if e.is_retryable() {
                    exhausted = Some(format!("rate limit retries exhausted: {e}"));
                }
                ArtifactStatus::Failed(e.to_string())
            }
        };

        summary.outcomes.push(ArtifactOutcome {
            path,
            source_tab_id: artifact.source_tab_id.clone(),
            status,
        });
    }

    summary
}

async fn export_one<R, W, S>(
    plan: &ExportPlan,
    artifact: &Artifact,
    path: &Path,
    remote: &R,
    writer: &W,
    sleeper: &S,
    policy: &RetryPolicy,
) -> Result<()>
where
    R: RemoteSource + ?Sized,
    W: ArtifactWriter + ?Sized,
    S: Sleeper + ?Sized,
{
    let what = path.display().to_string();
    let bytes = with_retry(policy, sleeper, &what, || {
        remote.fetch_content(
            &plan.resource_id,
            artifact.source_tab_id.as_deref(),
            artifact.format,
        )
    })
    .await?;

    if let Some(dir) = &artifact.directory {
        writer.ensure_directory(dir)?;
    }
    writer.write(path, &bytes)
}
