// ABOUTME: Deploy command implementation.
// ABOUTME: Renders the application descriptor and optionally upserts it through Argo CD.

use crate::cli::DeployArgs;
use devforge::error::{Error, Result};
use devforge::output::Output;
use devforge::reconcile::{ReconcileMode, ReconciliationOutcome, SyncOutcome};
use devforge::workflow::{ControllerOverrides, DeployRequest, StageFailure, Workflow};

pub async fn deploy(workflow: Workflow, args: DeployArgs, output: Output) -> Result<()> {
    let request = DeployRequest {
        repo_url: args.repo_url,
        device_id: args.device_id,
        device_name: args.device_name,
        destination_server: args.destination_server,
        destination_namespace: args.destination_namespace,
        mode: if args.api {
            ReconcileMode::ApiUpsert
        } else {
            ReconcileMode::YamlOnly
        },
        controller: ControllerOverrides {
            url: args.argocd_url,
            token: args.argocd_token,
            disable_tls: args.disable_tls,
        },
    };

    let report = workflow.deploy(&request).await;
    output.warnings(&report.warnings);

    if !output.document(&report) {
        output.detail(report.outcome.descriptor_text());
        let name = report.app_name.as_deref().unwrap_or("application");
        match &report.outcome {
            ReconciliationOutcome::YamlOnly { .. } => {
                output.success(&format!("Rendered {name} (not applied)"));
            }
            ReconciliationOutcome::Deployed {
                controller_response,
                sync,
                ..
            } => {
                if let SyncOutcome::Triggered { response } = sync {
                    output.progress(&format!("  → Sync triggered (HTTP {})", response.status));
                }
                output.success(&format!(
                    "Upserted {name} (HTTP {})",
                    controller_response.status
                ));
            }
            ReconciliationOutcome::Failed { .. } => {}
        }
    }

    match report.outcome {
        ReconciliationOutcome::Failed {
            stage,
            kind,
            message,
            ..
        } => Err(Error::Workflow(StageFailure {
            stage,
            kind,
            message,
        })),
        _ => Ok(()),
    }
}
