// ABOUTME: Publishes a materialized tree as a new remote repository.
// ABOUTME: Creates the remote through the source host, then pushes with injected credentials.

use secrecy::SecretString;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

use crate::config::CommitIdentity;
use crate::materialize::RepositoryArtifact;
use crate::source_host::{NewRepository, SourceHostClient, SourceHostError};
use crate::types::{CanonicalName, CanonicalNameError, DeviceIdentity};
use crate::vcs::{RemoteCredentials, VcsError, VersionControlClient};

const REMOTE: &str = "origin";
const BRANCH: &str = "main";
/// Username GitHub accepts alongside a token when no account name is known.
const TOKEN_USERNAME: &str = "x-access-token";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("cannot derive repository name: {0}")]
    Name(#[from] CanonicalNameError),

    #[error("remote repository creation failed: {0}")]
    RemoteCreation(#[source] SourceHostError),

    #[error("source host returned an unusable clone URL {url}: {reason}")]
    InvalidCloneUrl { url: String, reason: String },

    #[error("push failed: {0}")]
    Push(#[source] VcsError),
}

impl PublishError {
    pub fn is_timeout(&self) -> bool {
        match self {
            PublishError::RemoteCreation(e) => e.is_timeout(),
            PublishError::Push(e) => e.is_timeout(),
            _ => false,
        }
    }
}

/// A repository that exists on the source host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedRepository {
    pub clone_url: String,
    pub name: CanonicalName,
    pub owner: Option<String>,
}

pub struct RepositoryPublisher {
    host: Arc<dyn SourceHostClient>,
    vcs: Arc<dyn VersionControlClient>,
    username: Option<String>,
    token: SecretString,
    commit: CommitIdentity,
    private: bool,
}

impl RepositoryPublisher {
    pub fn new(
        host: Arc<dyn SourceHostClient>,
        vcs: Arc<dyn VersionControlClient>,
        username: Option<String>,
        token: SecretString,
        commit: CommitIdentity,
        private: bool,
    ) -> Self {
        Self {
            host,
            vcs,
            username,
            token,
            commit,
            private,
        }
    }

    /// Create the remote repository named after the device.
    pub async fn create_remote(
        &self,
        identity: &DeviceIdentity,
    ) -> Result<PublishedRepository, PublishError> {
        let name = CanonicalName::for_device(identity)?;
        let request = NewRepository {
            name: name.to_string(),
            description: format!(
                "Auto-generated for {} ({})",
                identity.device_name(),
                identity.device_id()
            ),
            private: self.private,
        };

        let created = self
            .host
            .create_repository(&request)
            .await
            .map_err(PublishError::RemoteCreation)?;

        Ok(PublishedRepository {
            clone_url: created.clone_url,
            name,
            owner: created.owner,
        })
    }

    /// Commit the artifact's tree and push it to `published` as `main`.
    pub async fn push(
        &self,
        artifact: &RepositoryArtifact,
        published: &PublishedRepository,
    ) -> Result<(), PublishError> {
        let remote_url =
            Url::parse(&published.clone_url).map_err(|e| PublishError::InvalidCloneUrl {
                url: published.clone_url.clone(),
                reason: e.to_string(),
            })?;
        let username = self
            .username
            .clone()
            .or_else(|| published.owner.clone())
            .unwrap_or_else(|| TOKEN_USERNAME.to_string());
        let credentials = RemoteCredentials::new(username, self.token.clone());

        let dir = artifact.root();
        let vcs = &self.vcs;
        let steps = async {
            vcs.init(dir).await?;
            vcs.config_identity(dir, &self.commit.name, &self.commit.email)
                .await?;
            if artifact.has_template_history() {
                vcs.remove_remote(dir, REMOTE).await?;
            }
            vcs.add_remote(dir, REMOTE, &remote_url, Some(&credentials))
                .await?;
            vcs.add_all(dir).await?;
            vcs.commit(dir, &self.commit.message, true).await?;
            vcs.rename_branch(dir, BRANCH).await?;
            vcs.push(dir, REMOTE, BRANCH).await?;
            Ok::<_, VcsError>(())
        };
        steps.await.map_err(PublishError::Push)?;

        tracing::info!("Pushed {} to {}", published.name, published.clone_url);
        Ok(())
    }

    /// Create the remote and push in one step.
    pub async fn publish(
        &self,
        artifact: &RepositoryArtifact,
        identity: &DeviceIdentity,
    ) -> Result<PublishedRepository, PublishError> {
        let published = self.create_remote(identity).await?;
        self.push(artifact, &published).await?;
        Ok(published)
    }
}
