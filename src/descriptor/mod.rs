// ABOUTME: Argo CD Application descriptor built from device identity and destination.
// ABOUTME: Pure rendering to structured data, YAML text, and the controller's JSON payload.

mod manifest;

pub use manifest::ApplicationManifest;

use crate::types::{CanonicalName, CanonicalNameError, DeviceIdentity};
use thiserror::Error;

/// Errors from descriptor construction and rendering.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// A destination field was blank.
    #[error("invalid destination: {0} must not be empty")]
    InvalidDestination(&'static str),

    #[error("repository URL must not be empty")]
    EmptyRepoUrl,

    #[error("cannot derive application name: {0}")]
    Name(#[from] CanonicalNameError),

    #[error("failed to serialize descriptor: {0}")]
    Serialize(#[from] serde_yaml::Error),

    #[error("failed to encode descriptor payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Controller-side defaults that do not vary per device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorDefaults {
    /// Namespace the Application object lives in.
    pub namespace: String,
    pub project: String,
    pub target_revision: String,
    pub path: String,
}

impl Default for DescriptorDefaults {
    fn default() -> Self {
        Self {
            namespace: "openshift-gitops".to_string(),
            project: "default".to_string(),
            target_revision: "main".to_string(),
            path: ".".to_string(),
        }
    }
}

/// Cluster and namespace the application deploys into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub server: String,
    pub namespace: String,
}

impl Destination {
    pub fn new(server: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            namespace: namespace.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub repo_url: String,
    pub revision: String,
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPolicy {
    pub automated: bool,
    pub prune: bool,
    pub self_heal: bool,
    pub create_namespace: bool,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            automated: true,
            prune: true,
            self_heal: true,
            create_namespace: true,
        }
    }
}

/// The declarative deployment-application object for one device.
///
/// `name` is the same canonical name used for the device repository, so the
/// two resources are always correlatable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationDescriptor {
    pub name: CanonicalName,
    pub namespace: String,
    pub project: String,
    pub source: SourceSpec,
    pub destination: Destination,
    pub sync_policy: SyncPolicy,
}

impl ApplicationDescriptor {
    pub fn manifest(&self) -> ApplicationManifest<'_> {
        ApplicationManifest::from_descriptor(self)
    }

    /// Serialized YAML form, suitable for `kubectl apply`.
    pub fn to_yaml(&self) -> Result<String, DescriptorError> {
        Ok(serde_yaml::to_string(&self.manifest())?)
    }

    /// JSON body for the controller's create/update endpoints.
    pub fn to_json(&self) -> Result<serde_json::Value, DescriptorError> {
        Ok(serde_json::to_value(self.manifest())?)
    }
}

/// Builds descriptors. Holds only immutable defaults; `build` does no I/O.
#[derive(Debug, Clone, Default)]
pub struct ApplicationDescriptorBuilder {
    defaults: DescriptorDefaults,
}

impl ApplicationDescriptorBuilder {
    pub fn new(defaults: DescriptorDefaults) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &DescriptorDefaults {
        &self.defaults
    }

    pub fn build(
        &self,
        identity: &DeviceIdentity,
        repo_url: &str,
        destination: &Destination,
    ) -> Result<ApplicationDescriptor, DescriptorError> {
        let server = destination.server.trim();
        let namespace = destination.namespace.trim();
        if server.is_empty() {
            return Err(DescriptorError::InvalidDestination("destination.server"));
        }
        if namespace.is_empty() {
            return Err(DescriptorError::InvalidDestination("destination.namespace"));
        }

        let repo_url = repo_url.trim();
        if repo_url.is_empty() {
            return Err(DescriptorError::EmptyRepoUrl);
        }

        Ok(ApplicationDescriptor {
            name: CanonicalName::for_device(identity)?,
            namespace: self.defaults.namespace.clone(),
            project: self.defaults.project.clone(),
            source: SourceSpec {
                repo_url: repo_url.to_string(),
                revision: self.defaults.target_revision.clone(),
                path: self.defaults.path.clone(),
            },
            destination: Destination::new(server, namespace),
            sync_policy: SyncPolicy::default(),
        })
    }
}
