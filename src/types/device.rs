// ABOUTME: Device identity supplied by the caller of a provisioning request.
// ABOUTME: Validates required fields and derives the route host by convention.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeviceIdentityError {
    #[error("device_id is required")]
    MissingId,

    #[error("device_name is required")]
    MissingName,
}

/// Identity of the device a repository and application are provisioned for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    device_id: String,
    device_name: String,
    cluster_fqdn: Option<String>,
}

impl DeviceIdentity {
    /// Build an identity, trimming whitespace. A blank cluster FQDN counts as absent.
    pub fn new(
        device_id: &str,
        device_name: &str,
        cluster_fqdn: Option<&str>,
    ) -> Result<Self, DeviceIdentityError> {
        let device_id = device_id.trim();
        let device_name = device_name.trim();

        if device_id.is_empty() {
            return Err(DeviceIdentityError::MissingId);
        }
        if device_name.is_empty() {
            return Err(DeviceIdentityError::MissingName);
        }

        let cluster_fqdn = cluster_fqdn
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.trim_start_matches('.').to_string());

        Ok(Self {
            device_id: device_id.to_string(),
            device_name: device_name.to_string(),
            cluster_fqdn,
        })
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn cluster_fqdn(&self) -> Option<&str> {
        self.cluster_fqdn.as_deref()
    }

    /// `{device_name}-{device_id}.{cluster_fqdn}` when a cluster domain is known.
    pub fn route_host(&self) -> Option<String> {
        self.cluster_fqdn
            .as_ref()
            .map(|fqdn| format!("{}-{}.{}", self.device_name, self.device_id, fqdn))
    }
}
