// ABOUTME: VersionControlClient backed by the git command-line tool.
// ABOUTME: Tokens injected into remotes are remembered and scrubbed from every later command.

use async_trait::async_trait;
use parking_lot::Mutex;
use secrecy::{ExposeSecret, SecretString};
use std::path::Path;
use std::time::Duration;
use url::Url;

use super::{RemoteCredentials, VcsError, VcsStep, VersionControlClient};
use crate::config::Timeouts;
use crate::process::{CommandOutput, ProcessCommand};

const GIT: &str = "git";

/// Runs git as a subprocess with a timeout per invocation.
pub struct GitCli {
    clone_timeout: Duration,
    command_timeout: Duration,
    injected: Mutex<Vec<SecretString>>,
}

impl GitCli {
    pub fn new(timeouts: &Timeouts) -> Self {
        Self {
            clone_timeout: timeouts.clone,
            command_timeout: timeouts.git,
            injected: Mutex::new(Vec::new()),
        }
    }

    fn command(&self, dir: Option<&Path>, timeout: Duration) -> ProcessCommand {
        let mut cmd = ProcessCommand::new(GIT, timeout)
            .env("GIT_TERMINAL_PROMPT", "0")
            .redact(self.injected.lock().iter().cloned());
        if let Some(dir) = dir {
            cmd = cmd.current_dir(dir);
        }
        cmd
    }

    async fn run(
        &self,
        step: VcsStep,
        dir: &Path,
        args: &[&str],
    ) -> Result<CommandOutput, VcsError> {
        self.command(Some(dir), self.command_timeout)
            .args(args.iter().copied())
            .run()
            .await
            .map_err(|source| VcsError::Command { step, source })
    }
}

#[async_trait]
impl VersionControlClient for GitCli {
    async fn clone_repository(&self, url: &str, dest: &Path) -> Result<(), VcsError> {
        tracing::debug!("Cloning {} into {}", url, dest.display());
        self.command(None, self.clone_timeout)
            .args(["clone", url])
            .arg(dest.to_string_lossy())
            .run()
            .await
            .map_err(|source| VcsError::Command {
                step: VcsStep::Clone,
                source,
            })?;
        Ok(())
    }

    async fn init(&self, dir: &Path) -> Result<(), VcsError> {
        self.run(VcsStep::Init, dir, &["init"]).await?;
        Ok(())
    }

    async fn config_identity(&self, dir: &Path, name: &str, email: &str) -> Result<(), VcsError> {
        self.run(VcsStep::ConfigIdentity, dir, &["config", "user.name", name])
            .await?;
        self.run(VcsStep::ConfigIdentity, dir, &["config", "user.email", email])
            .await?;
        Ok(())
    }

    async fn add_remote(
        &self,
        dir: &Path,
        name: &str,
        url: &Url,
        credentials: Option<&RemoteCredentials>,
    ) -> Result<(), VcsError> {
        let target = match credentials {
            Some(creds) => {
                let authed = creds.inject(url)?;
                self.injected.lock().push(creds.token().clone());
                authed
            }
            None => SecretString::from(url.to_string()),
        };

        self.run(
            VcsStep::AddRemote,
            dir,
            &["remote", "add", name, target.expose_secret()],
        )
        .await?;
        Ok(())
    }

    async fn remove_remote(&self, dir: &Path, name: &str) -> Result<(), VcsError> {
        self.run(VcsStep::RemoveRemote, dir, &["remote", "remove", name])
            .await?;
        Ok(())
    }

    async fn add_all(&self, dir: &Path) -> Result<(), VcsError> {
        self.run(VcsStep::AddAll, dir, &["add", "-A"]).await?;
        Ok(())
    }

    async fn commit(&self, dir: &Path, message: &str, allow_empty: bool) -> Result<(), VcsError> {
        let mut args = vec!["commit", "-m", message];
        if allow_empty {
            args.push("--allow-empty");
        }
        self.run(VcsStep::Commit, dir, &args).await?;
        Ok(())
    }

    async fn rename_branch(&self, dir: &Path, name: &str) -> Result<(), VcsError> {
        self.run(VcsStep::RenameBranch, dir, &["branch", "-M", name])
            .await?;
        Ok(())
    }

    async fn push(&self, dir: &Path, remote: &str, refspec: &str) -> Result<(), VcsError> {
        self.run(VcsStep::Push, dir, &["push", "-u", remote, refspec])
            .await?;
        Ok(())
    }
}
