// ABOUTME: Deploy workflow: build the application descriptor and reconcile it.
// ABOUTME: YAML is always returned; a failed sync or missing credentials are warnings.

use serde::Serialize;
use snafu::ResultExt;

use super::error::{DescribeSnafu, IdentitySnafu, StageError};
use super::{ControllerOverrides, Workflow};
use crate::descriptor::{ApplicationDescriptorBuilder, Destination};
use crate::diagnostics::{Diagnostics, Warning};
use crate::reconcile::{DeploymentReconciler, ReconcileMode, ReconciliationOutcome, SyncOutcome};
use crate::types::DeviceIdentity;

#[derive(Debug, Clone, Default)]
pub struct DeployRequest {
    pub repo_url: String,
    pub device_id: String,
    pub device_name: String,
    pub destination_server: String,
    pub destination_namespace: String,
    pub mode: ReconcileMode,
    pub controller: ControllerOverrides,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployReport {
    /// Absent when the device identity itself was invalid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(flatten)]
    pub outcome: ReconciliationOutcome,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

/// What a deploy produced before any failure.
#[derive(Default)]
struct Rendered {
    app_name: Option<String>,
    descriptor_text: String,
}

impl Workflow {
    /// Describe the device's application and deliver it per `request.mode`.
    pub async fn deploy(&self, request: &DeployRequest) -> DeployReport {
        let mut diagnostics = Diagnostics::default();
        let mut rendered = Rendered::default();

        let outcome = match self
            .run_deploy(request, &mut rendered, &mut diagnostics)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Deploy failed at {}: {}", e.stage(), e);
                ReconciliationOutcome::Failed {
                    stage: e.stage(),
                    kind: e.kind(),
                    message: e.to_string(),
                    descriptor_text: std::mem::take(&mut rendered.descriptor_text),
                }
            }
        };

        if let ReconciliationOutcome::Deployed {
            sync: SyncOutcome::Failed { ref message },
            ..
        } = outcome
        {
            diagnostics.warn(Warning::sync_failed(message.clone()));
        }

        DeployReport {
            app_name: rendered.app_name,
            outcome,
            warnings: diagnostics.into_warnings(),
        }
    }

    async fn run_deploy(
        &self,
        request: &DeployRequest,
        rendered: &mut Rendered,
        diagnostics: &mut Diagnostics,
    ) -> Result<ReconciliationOutcome, StageError> {
        let identity = DeviceIdentity::new(&request.device_id, &request.device_name, None)
            .context(IdentitySnafu)?;
        let builder = ApplicationDescriptorBuilder::new(self.settings.controller.descriptor.clone());
        let descriptor = builder
            .build(
                &identity,
                &request.repo_url,
                &Destination::new(
                    request.destination_server.as_str(),
                    request.destination_namespace.as_str(),
                ),
            )
            .context(DescribeSnafu)?;
        rendered.app_name = Some(descriptor.name.to_string());
        rendered.descriptor_text = descriptor.to_yaml().context(DescribeSnafu)?;

        let controller = match request.mode {
            ReconcileMode::YamlOnly => None,
            ReconcileMode::ApiUpsert => {
                let controller = self.controller_for(&request.controller)?;
                if controller.is_none() {
                    diagnostics.warn(Warning::yaml_only_fallback(format!(
                        "controller URL or token not configured; returning YAML for {}",
                        descriptor.name
                    )));
                }
                controller
            }
        };

        let reconciler =
            DeploymentReconciler::new(controller, self.settings.controller.sync_after_upsert);
        Ok(reconciler.reconcile(&descriptor, request.mode).await)
    }
}
