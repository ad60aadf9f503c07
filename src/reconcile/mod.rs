// ABOUTME: Upserts an application descriptor against the deployment controller.
// ABOUTME: Create, update on 409, then a best-effort sync; YAML-only mode makes no calls.

use serde::Serialize;
use std::sync::Arc;

use crate::controller::{ControllerResponse, DeploymentController};
use crate::descriptor::ApplicationDescriptor;
use crate::workflow::{ErrorKind, Stage};

/// How the descriptor is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconcileMode {
    /// Render and return the YAML only.
    #[default]
    YamlOnly,
    /// Create or update the application through the controller API.
    ApiUpsert,
}

/// Result of the post-upsert sync request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    Skipped,
    Triggered { response: ControllerResponse },
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReconciliationOutcome {
    YamlOnly {
        descriptor_text: String,
    },
    Deployed {
        descriptor_text: String,
        controller_response: ControllerResponse,
        sync: SyncOutcome,
    },
    Failed {
        stage: Stage,
        kind: ErrorKind,
        message: String,
        descriptor_text: String,
    },
}

impl ReconciliationOutcome {
    /// The rendered YAML, present on every outcome.
    pub fn descriptor_text(&self) -> &str {
        match self {
            ReconciliationOutcome::YamlOnly { descriptor_text }
            | ReconciliationOutcome::Deployed {
                descriptor_text, ..
            }
            | ReconciliationOutcome::Failed {
                descriptor_text, ..
            } => descriptor_text,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ReconciliationOutcome::Failed { .. })
    }
}

pub struct DeploymentReconciler {
    controller: Option<Arc<dyn DeploymentController>>,
    sync_after_upsert: bool,
}

impl DeploymentReconciler {
    /// `controller` is `None` when no controller credentials are configured.
    pub fn new(controller: Option<Arc<dyn DeploymentController>>, sync_after_upsert: bool) -> Self {
        Self {
            controller,
            sync_after_upsert,
        }
    }

    pub fn has_controller(&self) -> bool {
        self.controller.is_some()
    }

    pub async fn reconcile(
        &self,
        descriptor: &ApplicationDescriptor,
        mode: ReconcileMode,
    ) -> ReconciliationOutcome {
        let descriptor_text = match descriptor.to_yaml() {
            Ok(text) => text,
            Err(e) => {
                return ReconciliationOutcome::Failed {
                    stage: Stage::Describe,
                    kind: ErrorKind::Io,
                    message: e.to_string(),
                    descriptor_text: String::new(),
                };
            }
        };

        let controller = match (mode, &self.controller) {
            (ReconcileMode::YamlOnly, _) => {
                return ReconciliationOutcome::YamlOnly { descriptor_text };
            }
            (ReconcileMode::ApiUpsert, None) => {
                tracing::warn!(
                    "No controller credentials configured; returning YAML for {}",
                    descriptor.name
                );
                return ReconciliationOutcome::YamlOnly { descriptor_text };
            }
            (ReconcileMode::ApiUpsert, Some(controller)) => controller,
        };

        let failed = |kind: ErrorKind, message: String, descriptor_text: String| {
            ReconciliationOutcome::Failed {
                stage: Stage::ControllerUpsert,
                kind,
                message,
                descriptor_text,
            }
        };

        let payload = match descriptor.to_json() {
            Ok(payload) => payload,
            Err(e) => {
                return ReconciliationOutcome::Failed {
                    stage: Stage::Describe,
                    kind: ErrorKind::Io,
                    message: e.to_string(),
                    descriptor_text,
                };
            }
        };
        let name = descriptor.name.as_str();

        let mut response = match controller.create_application(&payload).await {
            Ok(response) => response,
            Err(e) => return failed(upsert_kind(&e), e.to_string(), descriptor_text),
        };
        if response.is_conflict() {
            tracing::debug!("Application {} exists, updating", name);
            response = match controller.update_application(name, &payload).await {
                Ok(response) => response,
                Err(e) => return failed(upsert_kind(&e), e.to_string(), descriptor_text),
            };
        }
        if !response.is_success() {
            return failed(
                ErrorKind::ControllerUpsert,
                format!("controller returned HTTP {}: {}", response.status, response.body),
                descriptor_text,
            );
        }
        tracing::info!("Application {} upserted", name);

        let sync = if self.sync_after_upsert {
            sync(&**controller, name).await
        } else {
            SyncOutcome::Skipped
        };

        ReconciliationOutcome::Deployed {
            descriptor_text,
            controller_response: response,
            sync,
        }
    }
}

fn upsert_kind(error: &crate::controller::ControllerError) -> ErrorKind {
    if error.is_timeout() {
        ErrorKind::Timeout
    } else {
        ErrorKind::ControllerUpsert
    }
}

async fn sync(controller: &dyn DeploymentController, name: &str) -> SyncOutcome {
    match controller.sync_application(name).await {
        Ok(response) if response.is_success() => SyncOutcome::Triggered { response },
        Ok(response) => {
            tracing::warn!("Sync of {} returned HTTP {}", name, response.status);
            SyncOutcome::Failed {
                message: format!("controller returned HTTP {}: {}", response.status, response.body),
            }
        }
        Err(e) => {
            tracing::warn!("Sync of {} failed: {}", name, e);
            SyncOutcome::Failed {
                message: e.to_string(),
            }
        }
    }
}
