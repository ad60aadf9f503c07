// ABOUTME: Provision workflow: materialize, create the remote, write the devfile, push.
// ABOUTME: Records a compensation for any remote left behind by a later failure.

use serde::Serialize;
use snafu::ResultExt;
use std::sync::Arc;

use super::Workflow;
use super::compensation::{Compensation, CompensationResult};
use super::error::{
    CreateRemoteSnafu, DevfileSnafu, ErrorKind, IdentitySnafu, MaterializeSnafu, NamingSnafu,
    PushSnafu, Stage, StageError, StageFailure,
};
use crate::diagnostics::{Diagnostics, Warning};
use crate::materialize::{MaterializationSource, TemplateMaterializer};
use crate::publish::{PublishedRepository, RepositoryPublisher};
use crate::types::{CanonicalName, DeviceIdentity};

#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    pub device_id: String,
    pub device_name: String,
    pub cluster_fqdn: Option<String>,
    pub source: MaterializationSource,
    /// Caller-supplied `values.yaml` content.
    pub values: Option<String>,
    /// Overrides `source_host.token` for this request.
    pub source_host_token: Option<String>,
    /// Run recorded compensations immediately when the workflow fails.
    pub cleanup_on_failure: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProvisionOutcome {
    Ok {
        canonical_name: String,
        repo_url: String,
        files: Vec<String>,
    },
    Failed {
        stage: Stage,
        kind: ErrorKind,
        message: String,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        compensations: Vec<Compensation>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        compensation_results: Vec<CompensationResult>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionReport {
    #[serde(flatten)]
    pub outcome: ProvisionOutcome,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

impl ProvisionReport {
    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, ProvisionOutcome::Ok { .. })
    }

    /// The failure, when the workflow did not complete.
    pub fn failure(&self) -> Option<StageFailure> {
        match &self.outcome {
            ProvisionOutcome::Ok { .. } => None,
            ProvisionOutcome::Failed {
                stage,
                kind,
                message,
                ..
            } => Some(StageFailure {
                stage: *stage,
                kind: *kind,
                message: message.clone(),
            }),
        }
    }
}

struct Provisioned {
    name: CanonicalName,
    published: PublishedRepository,
    files: Vec<String>,
}

impl Workflow {
    /// Build and publish the repository for one device.
    ///
    /// Never returns an error: failures are reported in the outcome along
    /// with any compensations needed to undo side effects.
    pub async fn provision(&self, request: &ProvisionRequest) -> ProvisionReport {
        let mut diagnostics = Diagnostics::default();
        let mut compensations = Vec::new();

        let outcome = match self
            .run_provision(request, &mut diagnostics, &mut compensations)
            .await
        {
            Ok(done) => {
                tracing::info!("Provisioned {} at {}", done.name, done.published.clone_url);
                ProvisionOutcome::Ok {
                    canonical_name: done.name.to_string(),
                    repo_url: done.published.clone_url,
                    files: done.files,
                }
            }
            Err(e) => {
                tracing::error!("Provisioning failed at {}: {}", e.stage(), e);
                let compensation_results = if request.cleanup_on_failure {
                    self.run_compensations(request, &compensations, &mut diagnostics)
                        .await
                } else {
                    for compensation in &compensations {
                        diagnostics.warn(Warning::compensation(format!(
                            "left behind by failed provisioning: {compensation}"
                        )));
                    }
                    Vec::new()
                };
                ProvisionOutcome::Failed {
                    stage: e.stage(),
                    kind: e.kind(),
                    message: e.to_string(),
                    compensations,
                    compensation_results,
                }
            }
        };

        ProvisionReport {
            outcome,
            warnings: diagnostics.into_warnings(),
        }
    }

    async fn run_provision(
        &self,
        request: &ProvisionRequest,
        diagnostics: &mut Diagnostics,
        compensations: &mut Vec<Compensation>,
    ) -> Result<Provisioned, StageError> {
        let identity = DeviceIdentity::new(
            &request.device_id,
            &request.device_name,
            request.cluster_fqdn.as_deref(),
        )
        .context(IdentitySnafu)?;
        let name = CanonicalName::for_device(&identity).context(NamingSnafu)?;

        let token = self.source_host_token(request.source_host_token.as_deref())?;
        let host = self.source_host_client(request.source_host_token.as_deref())?;
        let materializer = TemplateMaterializer::new(
            Arc::clone(&self.vcs),
            Arc::clone(&self.fetcher),
            self.settings.template.files.clone(),
        );
        materializer
            .check(&request.source, &identity)
            .context(MaterializeSnafu)?;
        let publisher = RepositoryPublisher::new(
            host,
            Arc::clone(&self.vcs),
            self.settings.source_host.username.clone(),
            token,
            self.settings.commit.clone(),
            self.settings.source_host.private,
        );

        tracing::info!("Provisioning {}", name);
        let mut artifact = materializer
            .materialize(&request.source, &identity, request.values.as_deref())
            .await
            .context(MaterializeSnafu)?;

        let published = async {
            let published = publisher
                .create_remote(&identity)
                .await
                .context(CreateRemoteSnafu)?;
            compensations.push(Compensation::delete_remote(&published));

            materializer
                .write_devfile(
                    &mut artifact,
                    &name,
                    &published.clone_url,
                    &self.settings.commit,
                )
                .context(DevfileSnafu)?;
            publisher
                .push(&artifact, &published)
                .await
                .context(PushSnafu)?;
            compensations.clear();
            Ok::<_, StageError>(published)
        }
        .await;

        let files = artifact
            .files()
            .iter()
            .map(|f| f.display().to_string())
            .collect();
        if let Err(e) = artifact.close() {
            diagnostics.warn(Warning::workspace_cleanup(format!(
                "failed to remove workspace: {e}"
            )));
        }

        Ok(Provisioned {
            name,
            published: published?,
            files,
        })
    }

    async fn run_compensations(
        &self,
        request: &ProvisionRequest,
        compensations: &[Compensation],
        diagnostics: &mut Diagnostics,
    ) -> Vec<CompensationResult> {
        match self
            .compensate(compensations, request.source_host_token.as_deref())
            .await
        {
            Ok(results) => {
                for result in results.iter().filter(|r| !r.succeeded) {
                    diagnostics.warn(Warning::compensation(format!(
                        "{} failed: {}",
                        result.compensation,
                        result.message.as_deref().unwrap_or("unknown error")
                    )));
                }
                results
            }
            Err(e) => {
                diagnostics.warn(Warning::compensation(format!(
                    "could not run compensations: {e}"
                )));
                Vec::new()
            }
        }
    }
}
