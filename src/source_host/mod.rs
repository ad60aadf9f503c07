// ABOUTME: Source-control host capability: create and delete remote repositories.
// ABOUTME: GithubClient implements it over the GitHub REST API.

mod github;

pub use github::GithubClient;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// A repository to create on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRepository {
    pub name: String,
    pub description: String,
    pub private: bool,
}

/// What the host returned for a created repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedRepository {
    /// Credential-free HTTPS clone URL.
    pub clone_url: String,
    /// Account that owns the repository, when the host reports it.
    pub owner: Option<String>,
}

#[derive(Debug, Error)]
pub enum SourceHostError {
    /// Non-success status; `body` is the host's response verbatim.
    #[error("source host returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("source host request timed out after {}s", .after.as_secs())]
    Timeout { after: Duration },

    #[error("source host request failed: {0}")]
    Request(reqwest::Error),

    #[error("unexpected source host response: {0}")]
    Decode(String),
}

impl SourceHostError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, SourceHostError::Timeout { .. })
    }
}

#[async_trait]
pub trait SourceHostClient: Send + Sync {
    async fn create_repository(
        &self,
        repository: &NewRepository,
    ) -> Result<CreatedRepository, SourceHostError>;

    async fn delete_repository(&self, owner: &str, name: &str) -> Result<(), SourceHostError>;
}
