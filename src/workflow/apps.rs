// ABOUTME: List workflow: controller applications joined with their resolved route hosts.
// ABOUTME: Route lookups for all applications run concurrently.

use futures::future::join_all;
use serde::Serialize;
use snafu::ResultExt;

use super::Workflow;
use super::error::{ControllerSnafu, RouteSnafu, Stage, StageError};
use crate::controller::ApplicationSummary;
use crate::diagnostics::{Diagnostics, Warning};
use crate::route::{RouteHostResult, RouteQuery, RouteResolver, RouteStrategy};

/// Annotation carrying the device name the application was generated for.
pub const NAME_ANNOTATION: &str = "device-workflow/name";
const DEFAULT_NAMESPACE: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListedApplication {
    pub app_name: String,
    pub namespace: String,
    pub cluster: Option<String>,
    pub repo_url: Option<String>,
    pub sync_status: Option<String>,
    pub health: Option<String>,
    pub last_sync: Option<String>,
    pub cluster_fqdn: Option<String>,
    pub route_host: Option<String>,
    pub route_strategy: RouteStrategy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppListing {
    pub apps: Vec<ListedApplication>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

impl Workflow {
    /// Every application the controller knows about, with its route host.
    pub async fn list_apps(&self) -> Result<AppListing, StageError> {
        let controller = self.require_controller()?;
        let summaries = controller
            .list_applications()
            .await
            .context(ControllerSnafu { stage: Stage::List })?;
        tracing::debug!("Controller reported {} applications", summaries.len());

        let resolver = self.route_resolver();
        let lookups = summaries
            .iter()
            .map(|summary| resolve_for(&resolver, summary));
        let routes = join_all(lookups).await;

        let mut diagnostics = Diagnostics::default();
        let mut unavailable_reported = false;
        let mut apps = Vec::with_capacity(summaries.len());
        for (summary, route) in summaries.into_iter().zip(routes) {
            let route = match route {
                Ok(route) => {
                    for error in &route.lookup_errors {
                        diagnostics.warn(Warning::route_lookup(format!(
                            "{}: {}",
                            summary.name, error
                        )));
                    }
                    route
                }
                Err(e) => {
                    if !unavailable_reported {
                        diagnostics.warn(Warning::route_lookup(e.to_string()));
                        unavailable_reported = true;
                    }
                    RouteHostResult::none()
                }
            };
            apps.push(ListedApplication {
                namespace: destination_namespace(&summary).to_string(),
                app_name: summary.name,
                cluster: summary.destination_server,
                repo_url: summary.repo_url,
                sync_status: summary.sync_status,
                health: summary.health,
                last_sync: summary.last_sync,
                cluster_fqdn: resolver.fallback_domain().map(str::to_string),
                route_host: route.host,
                route_strategy: route.strategy,
            });
        }

        Ok(AppListing {
            apps,
            warnings: diagnostics.into_warnings(),
        })
    }

    /// Resolve the route host of one application.
    pub async fn resolve_route(
        &self,
        namespace: &str,
        app_name: &str,
    ) -> Result<RouteHostResult, StageError> {
        self.route_resolver()
            .resolve(RouteQuery::new(namespace, app_name))
            .await
            .context(RouteSnafu)
    }
}

async fn resolve_for(
    resolver: &RouteResolver,
    summary: &ApplicationSummary,
) -> Result<RouteHostResult, StageError> {
    let mut query = RouteQuery::new(destination_namespace(summary), &summary.name)
        .with_base_name(summary.annotations.get(NAME_ANNOTATION).map(String::as_str));
    if explicit_namespace(summary).is_none() {
        query = query.without_convention();
    }
    resolver.resolve(query).await.context(RouteSnafu)
}

fn explicit_namespace(summary: &ApplicationSummary) -> Option<&str> {
    summary
        .destination_namespace
        .as_deref()
        .map(str::trim)
        .filter(|ns| !ns.is_empty())
}

fn destination_namespace(summary: &ApplicationSummary) -> &str {
    explicit_namespace(summary).unwrap_or(DEFAULT_NAMESPACE)
}
