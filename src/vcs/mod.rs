// ABOUTME: Version control capability used to clone templates and publish device repositories.
// ABOUTME: Credentials are injected by the client, never formatted into URLs by callers.

mod credentials;
mod git;

pub use credentials::RemoteCredentials;
pub use git::GitCli;

use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use url::Url;

use crate::process::ProcessError;

/// Git operations needed by the provisioning workflow.
#[async_trait]
pub trait VersionControlClient: Send + Sync {
    /// Clone `url` into `dest`, which must not exist yet.
    async fn clone_repository(&self, url: &str, dest: &Path) -> Result<(), VcsError>;

    async fn init(&self, dir: &Path) -> Result<(), VcsError>;

    async fn config_identity(&self, dir: &Path, name: &str, email: &str) -> Result<(), VcsError>;

    /// Add a remote, injecting `credentials` into the URL authority when given.
    async fn add_remote(
        &self,
        dir: &Path,
        name: &str,
        url: &Url,
        credentials: Option<&RemoteCredentials>,
    ) -> Result<(), VcsError>;

    async fn remove_remote(&self, dir: &Path, name: &str) -> Result<(), VcsError>;

    async fn add_all(&self, dir: &Path) -> Result<(), VcsError>;

    async fn commit(&self, dir: &Path, message: &str, allow_empty: bool) -> Result<(), VcsError>;

    async fn rename_branch(&self, dir: &Path, name: &str) -> Result<(), VcsError>;

    async fn push(&self, dir: &Path, remote: &str, refspec: &str) -> Result<(), VcsError>;
}

/// Which git operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VcsStep {
    Clone,
    Init,
    ConfigIdentity,
    AddRemote,
    RemoveRemote,
    AddAll,
    Commit,
    RenameBranch,
    Push,
}

impl VcsStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            VcsStep::Clone => "clone",
            VcsStep::Init => "init",
            VcsStep::ConfigIdentity => "config",
            VcsStep::AddRemote => "remote add",
            VcsStep::RemoveRemote => "remote remove",
            VcsStep::AddAll => "add",
            VcsStep::Commit => "commit",
            VcsStep::RenameBranch => "branch",
            VcsStep::Push => "push",
        }
    }
}

impl fmt::Display for VcsStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from version control operations. Messages never contain credentials.
#[derive(Debug, thiserror::Error)]
pub enum VcsError {
    #[error("git {step} failed: {source}")]
    Command { step: VcsStep, source: ProcessError },

    #[error("remote URL cannot carry credentials: {0}")]
    InvalidRemote(String),
}

impl VcsError {
    pub fn step(&self) -> Option<VcsStep> {
        match self {
            VcsError::Command { step, .. } => Some(*step),
            VcsError::InvalidRemote(_) => Some(VcsStep::AddRemote),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, VcsError::Command { source, .. } if source.is_timeout())
    }
}
