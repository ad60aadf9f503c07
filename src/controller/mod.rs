// ABOUTME: GitOps deployment controller capability and its Argo CD implementation.
// ABOUTME: Create/update return raw status and body so the reconciler decides what they mean.

mod argocd;

pub use argocd::{ArgoCdClient, SYNC_REQUEST};

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Status and verbatim body of a controller call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControllerResponse {
    pub status: u16,
    pub body: String,
}

impl ControllerResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_conflict(&self) -> bool {
        self.status == 409
    }
}

/// One application as reported by the controller's list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationSummary {
    pub name: String,
    pub annotations: BTreeMap<String, String>,
    pub destination_server: Option<String>,
    pub destination_namespace: Option<String>,
    pub repo_url: Option<String>,
    pub sync_status: Option<String>,
    pub health: Option<String>,
    pub last_sync: Option<String>,
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("controller returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("controller request timed out after {}s", .after.as_secs())]
    Timeout { after: Duration },

    #[error("controller request failed: {0}")]
    Request(reqwest::Error),

    #[error("unexpected controller response: {0}")]
    Decode(String),
}

impl ControllerError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ControllerError::Timeout { .. })
    }
}

#[async_trait]
pub trait DeploymentController: Send + Sync {
    async fn create_application(
        &self,
        payload: &serde_json::Value,
    ) -> Result<ControllerResponse, ControllerError>;

    async fn update_application(
        &self,
        name: &str,
        payload: &serde_json::Value,
    ) -> Result<ControllerResponse, ControllerError>;

    async fn sync_application(&self, name: &str) -> Result<ControllerResponse, ControllerError>;

    /// Every application the controller knows; non-success status is an error.
    async fn list_applications(&self) -> Result<Vec<ApplicationSummary>, ControllerError>;
}
