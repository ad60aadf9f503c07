// ABOUTME: Provision command implementation.
// ABOUTME: Builds the request from CLI arguments and reports the workflow outcome.

use crate::cli::ProvisionArgs;
use devforge::error::{Error, Result};
use devforge::materialize::MaterializationSource;
use devforge::output::Output;
use devforge::workflow::{ProvisionOutcome, ProvisionRequest, Workflow};

pub async fn provision(workflow: Workflow, args: ProvisionArgs, output: Output) -> Result<()> {
    let source = match (args.chart_repo, args.template_repo) {
        (Some(repo_url), _) => MaterializationSource::PackageSource {
            repo_url,
            package_name: args.chart_name,
            package_version: args.chart_version,
        },
        (None, Some(repo_url)) => MaterializationSource::StaticTemplate { repo_url },
        (None, None) => {
            let repo_url = workflow.settings().template.repo_url.clone().ok_or_else(|| {
                Error::InvalidConfig(
                    "no template source: pass --template-repo or --chart-repo, or set template.repo_url"
                        .to_string(),
                )
            })?;
            MaterializationSource::StaticTemplate { repo_url }
        }
    };
    let values = args.values.map(std::fs::read_to_string).transpose()?;

    let request = ProvisionRequest {
        device_id: args.device_id,
        device_name: args.device_name,
        cluster_fqdn: args.cluster_fqdn,
        source,
        values,
        source_host_token: None,
        cleanup_on_failure: args.cleanup_on_failure,
    };

    output.progress(&format!(
        "Provisioning repository for {} ({})",
        request.device_name, request.device_id
    ));
    let report = workflow.provision(&request).await;
    output.warnings(&report.warnings);

    if !output.document(&report) {
        match &report.outcome {
            ProvisionOutcome::Ok {
                canonical_name,
                repo_url,
                files,
            } => {
                for file in files {
                    output.progress(&format!("  + {file}"));
                }
                output.success(&format!("Published {canonical_name} to {repo_url}"));
            }
            ProvisionOutcome::Failed {
                compensations,
                compensation_results,
                ..
            } => {
                for result in compensation_results {
                    let status = if result.succeeded { "done" } else { "failed" };
                    output.progress(&format!("  → {}: {status}", result.compensation));
                }
                if compensation_results.is_empty() {
                    for compensation in compensations {
                        output.progress(&format!("  ! Needs cleanup: {compensation}"));
                    }
                }
            }
        }
    }

    match report.failure() {
        Some(failure) => Err(Error::Workflow(failure)),
        None => Ok(()),
    }
}
