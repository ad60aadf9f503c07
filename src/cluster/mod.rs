// ABOUTME: Cluster capability for OpenShift route lookups.
// ABOUTME: KubeRouteClient talks to the Kubernetes REST API: explicit, in-cluster, or via kubeconfig.

mod kube;
mod kubeconfig;

pub use kube::{ClusterEnv, KubeRouteClient, SERVICE_ACCOUNT_DIR};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::http::TransportError;

/// A route as far as host resolution cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub name: String,
    pub host: Option<String>,
}

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("cluster client unavailable: {0}")]
    Unavailable(String),

    #[error("cluster API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("cluster request timed out after {}s", .after.as_secs())]
    Timeout { after: Duration },

    #[error("cluster request failed: {0}")]
    Request(reqwest::Error),

    #[error("unexpected cluster response: {0}")]
    Decode(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Routes in `namespace` matching `label_selector` (`key=value`).
    async fn list_routes(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<Route>, ClusterError>;

    /// The route called `name`, or `None` when it does not exist.
    async fn get_route(&self, namespace: &str, name: &str) -> Result<Option<Route>, ClusterError>;
}
