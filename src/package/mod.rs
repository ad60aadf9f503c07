// ABOUTME: Package (Helm chart) fetching capability.
// ABOUTME: HelmCli shells out to `helm pull --untar` with a timeout.

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use crate::process::{ProcessCommand, ProcessError};
use crate::types::ChartRef;

const HELM: &str = "helm";

/// Errors from fetching a package.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("helm is not installed or not on PATH")]
    ToolMissing,

    #[error("helm pull of {reference} failed: {detail}")]
    Failed { reference: String, detail: String },

    #[error("helm pull of {reference} timed out after {}s", .after.as_secs())]
    Timeout { reference: String, after: Duration },
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }
}

/// Downloads and unpacks a package into a directory.
#[async_trait]
pub trait PackageFetcher: Send + Sync {
    async fn pull(
        &self,
        reference: &ChartRef,
        version: Option<&str>,
        dest: &Path,
    ) -> Result<(), FetchError>;
}

pub struct HelmCli {
    timeout: Duration,
}

impl HelmCli {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

/// Arguments for `helm pull`, without the program name.
pub fn pull_args(reference: &ChartRef, version: Option<&str>, dest: &Path) -> Vec<String> {
    let mut args = vec!["pull".to_string()];
    match reference {
        ChartRef::Oci { reference, .. } => args.push(reference.clone()),
        ChartRef::Repository { repo_url, name } => {
            args.push(name.clone());
            args.push("--repo".to_string());
            args.push(repo_url.clone());
        }
    }
    if let Some(version) = version.map(str::trim).filter(|v| !v.is_empty()) {
        args.push("--version".to_string());
        args.push(version.to_string());
    }
    args.push("--untar".to_string());
    args.push("--untardir".to_string());
    args.push(dest.to_string_lossy().into_owned());
    args
}

#[async_trait]
impl PackageFetcher for HelmCli {
    async fn pull(
        &self,
        reference: &ChartRef,
        version: Option<&str>,
        dest: &Path,
    ) -> Result<(), FetchError> {
        tracing::debug!("Fetching package {}", reference);
        ProcessCommand::new(HELM, self.timeout)
            .args(pull_args(reference, version, dest))
            .run()
            .await
            .map_err(|e| match e {
                ProcessError::NotFound { .. } => FetchError::ToolMissing,
                ProcessError::Timeout { after, .. } => FetchError::Timeout {
                    reference: reference.to_string(),
                    after,
                },
                ProcessError::Failed { stderr, .. } => FetchError::Failed {
                    reference: reference.to_string(),
                    detail: stderr.trim().to_string(),
                },
                ProcessError::Spawn { source, .. } => FetchError::Failed {
                    reference: reference.to_string(),
                    detail: source.to_string(),
                },
            })?;
        Ok(())
    }
}
