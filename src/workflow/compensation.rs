// ABOUTME: Undo actions for side effects left behind by a failed provisioning run.
// ABOUTME: Recorded in the failure outcome and executed only on explicit request.

use serde::Serialize;
use std::fmt;
use url::Url;

use crate::publish::PublishedRepository;
use crate::source_host::SourceHostClient;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Compensation {
    /// The remote repository was created but never received a complete push.
    DeleteRemoteRepository {
        owner: Option<String>,
        name: String,
        clone_url: String,
    },
}

impl Compensation {
    pub fn delete_remote(published: &PublishedRepository) -> Self {
        Compensation::DeleteRemoteRepository {
            owner: published
                .owner
                .clone()
                .or_else(|| owner_from_clone_url(&published.clone_url)),
            name: published.name.to_string(),
            clone_url: published.clone_url.clone(),
        }
    }

    pub async fn run(&self, host: &dyn SourceHostClient) -> CompensationResult {
        match self {
            Compensation::DeleteRemoteRepository { owner, name, .. } => {
                let Some(owner) = owner else {
                    return CompensationResult::failed(self, "repository owner is unknown");
                };
                match host.delete_repository(owner, name).await {
                    Ok(()) => CompensationResult {
                        compensation: self.clone(),
                        succeeded: true,
                        message: None,
                    },
                    Err(e) => CompensationResult::failed(self, e.to_string()),
                }
            }
        }
    }
}

impl fmt::Display for Compensation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compensation::DeleteRemoteRepository { clone_url, .. } => {
                write!(f, "delete orphaned remote repository {clone_url}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompensationResult {
    pub compensation: Compensation,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CompensationResult {
    fn failed(compensation: &Compensation, message: impl Into<String>) -> Self {
        Self {
            compensation: compensation.clone(),
            succeeded: false,
            message: Some(message.into()),
        }
    }
}

/// `owner` from `https://host/{owner}/{repo}.git`.
fn owner_from_clone_url(clone_url: &str) -> Option<String> {
    let url = Url::parse(clone_url).ok()?;
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    let owner = segments.next()?;
    segments.next()?;
    Some(owner.to_string())
}
