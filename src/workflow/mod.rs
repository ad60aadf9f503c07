// ABOUTME: Orchestrates provision, deploy, list and sync across the capability clients.
// ABOUTME: Stage failures become structured outcomes; non-fatal problems become warnings.

mod apps;
mod compensation;
mod deploy;
mod error;
mod provision;

pub use apps::{AppListing, ListedApplication};
pub use compensation::{Compensation, CompensationResult};
pub use deploy::{DeployReport, DeployRequest};
pub use error::{ErrorKind, Stage, StageError, StageFailure};
pub use provision::{ProvisionOutcome, ProvisionReport, ProvisionRequest};

use secrecy::SecretString;
use serde::Serialize;
use snafu::ResultExt;
use std::sync::Arc;
use url::Url;

use crate::cluster::{ClusterClient, ClusterEnv, KubeRouteClient};
use crate::config::{MissingCredential, Settings, TlsPolicy, resolve_credential};
use crate::controller::{ArgoCdClient, ControllerResponse, DeploymentController};
use crate::http::TransportConfig;
use crate::package::{HelmCli, PackageFetcher};
use crate::route::RouteResolver;
use crate::source_host::{GithubClient, SourceHostClient};
use crate::vcs::{GitCli, VersionControlClient};
use error::{ClientSnafu, ControllerSnafu, CredentialSnafu, InvalidRequestSnafu};

/// Request-supplied controller connection details; blank fields fall back to settings.
#[derive(Debug, Clone, Default)]
pub struct ControllerOverrides {
    pub url: Option<String>,
    pub token: Option<String>,
    pub disable_tls: Option<String>,
}

/// Result of an explicit sync request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub app_name: String,
    pub response: ControllerResponse,
}

/// Entry point for every workflow.
///
/// Holds the resolved settings and the capability clients. Clients that
/// need request credentials (source host, controller) are built per call
/// unless one was injected with a `with_*` method.
pub struct Workflow {
    settings: Settings,
    vcs: Arc<dyn VersionControlClient>,
    fetcher: Arc<dyn PackageFetcher>,
    source_host: Option<Arc<dyn SourceHostClient>>,
    controller: Option<Arc<dyn DeploymentController>>,
    cluster: Option<Arc<dyn ClusterClient>>,
    cluster_env: ClusterEnv,
}

impl Workflow {
    /// Production capabilities: `git` and `helm` subprocesses plus REST clients.
    pub fn new(settings: Settings) -> Self {
        Self {
            vcs: Arc::new(GitCli::new(&settings.timeouts)),
            fetcher: Arc::new(HelmCli::new(settings.timeouts.fetch)),
            source_host: None,
            controller: None,
            cluster: None,
            cluster_env: ClusterEnv::from_process(),
            settings,
        }
    }

    pub fn with_version_control(mut self, vcs: Arc<dyn VersionControlClient>) -> Self {
        self.vcs = vcs;
        self
    }

    pub fn with_package_fetcher(mut self, fetcher: Arc<dyn PackageFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_source_host(mut self, host: Arc<dyn SourceHostClient>) -> Self {
        self.source_host = Some(host);
        self
    }

    pub fn with_controller(mut self, controller: Arc<dyn DeploymentController>) -> Self {
        self.controller = Some(controller);
        self
    }

    pub fn with_cluster_client(mut self, cluster: Arc<dyn ClusterClient>) -> Self {
        self.cluster = Some(cluster);
        self
    }

    pub fn with_cluster_env(mut self, env: ClusterEnv) -> Self {
        self.cluster_env = env;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Trigger a sync of `app_name`. Any status outside 2xx is a failure.
    pub async fn sync(&self, app_name: &str) -> Result<SyncReport, StageError> {
        let app_name = app_name.trim();
        if app_name.is_empty() {
            return InvalidRequestSnafu {
                message: "application name is required",
            }
            .fail();
        }

        let controller = self.require_controller()?;
        let response = controller
            .sync_application(app_name)
            .await
            .context(ControllerSnafu { stage: Stage::Sync })?;
        if !response.is_success() {
            return Err(StageError::ControllerStatus {
                stage: Stage::Sync,
                status: response.status,
                body: response.body,
            });
        }

        tracing::info!("Sync triggered for {}", app_name);
        Ok(SyncReport {
            app_name: app_name.to_string(),
            response,
        })
    }

    /// Run recorded compensations in order. Each one is attempted even if an earlier one failed.
    pub async fn compensate(
        &self,
        compensations: &[Compensation],
        source_host_token: Option<&str>,
    ) -> Result<Vec<CompensationResult>, StageError> {
        if compensations.is_empty() {
            return Ok(Vec::new());
        }
        let host = self.source_host_client(source_host_token)?;
        let mut results = Vec::with_capacity(compensations.len());
        for compensation in compensations {
            tracing::info!("Compensating: {}", compensation);
            let result = compensation.run(host.as_ref()).await;
            if let Some(ref message) = result.message {
                tracing::warn!("Compensation failed: {}: {}", compensation, message);
            }
            results.push(result);
        }
        Ok(results)
    }

    fn source_host_client(
        &self,
        request_token: Option<&str>,
    ) -> Result<Arc<dyn SourceHostClient>, StageError> {
        if let Some(ref host) = self.source_host {
            return Ok(Arc::clone(host));
        }
        let token = self.source_host_token(request_token)?;
        let client = GithubClient::new(
            self.settings.source_host.api_url.clone(),
            &token,
            &TransportConfig::new(self.settings.timeouts.api),
        )
        .context(ClientSnafu {
            client: "source host",
        })?;
        Ok(Arc::new(client))
    }

    fn source_host_token(&self, request_token: Option<&str>) -> Result<SecretString, StageError> {
        resolve_credential(
            request_token,
            self.settings.source_host.token.as_ref(),
            "source host token",
        )
        .context(CredentialSnafu)
    }

    /// The controller for a request, or `None` when neither the request nor
    /// the settings supply both a URL and a token.
    fn controller_for(
        &self,
        overrides: &ControllerOverrides,
    ) -> Result<Option<Arc<dyn DeploymentController>>, StageError> {
        if let Some(ref controller) = self.controller {
            return Ok(Some(Arc::clone(controller)));
        }

        let url = match overrides.url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            Some(raw) => Some(Url::parse(raw).map_err(|e| StageError::InvalidRequest {
                message: format!("invalid controller URL: {e}"),
            })?),
            None => self.settings.controller.url.clone(),
        };
        let token = resolve_credential(
            overrides.token.as_deref(),
            self.settings.controller.token.as_ref(),
            "controller token",
        )
        .ok();
        let (Some(url), Some(token)) = (url, token) else {
            return Ok(None);
        };

        let tls = TlsPolicy::from_disable_flags(
            overrides.disable_tls.as_deref(),
            self.settings.controller.disable_tls.as_deref(),
        );
        if !tls.verify() {
            tracing::warn!("TLS verification disabled for controller at {}", url);
        }
        let transport = TransportConfig::new(self.settings.timeouts.api).with_tls(tls);
        let client = ArgoCdClient::new(url, &token, &transport).context(ClientSnafu {
            client: "controller",
        })?;
        Ok(Some(Arc::new(client)))
    }

    fn require_controller(&self) -> Result<Arc<dyn DeploymentController>, StageError> {
        self.controller_for(&ControllerOverrides::default())?
            .ok_or(MissingCredential("controller URL and token"))
            .context(CredentialSnafu)
    }

    fn route_resolver(&self) -> RouteResolver {
        let domain = self.settings.cluster.apps_domain.clone();
        if let Some(ref cluster) = self.cluster {
            return RouteResolver::new(Arc::clone(cluster), domain);
        }
        match KubeRouteClient::from_settings(
            &self.settings.cluster,
            &self.cluster_env,
            self.settings.timeouts.api,
        ) {
            Ok(client) => RouteResolver::new(Arc::new(client), domain),
            Err(e) => {
                tracing::debug!("No cluster client: {}", e);
                RouteResolver::unavailable(e.to_string(), domain)
            }
        }
    }
}
