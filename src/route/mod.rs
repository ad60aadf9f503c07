// ABOUTME: Resolves the externally reachable host of a deployed application.
// ABOUTME: Label lookup, then name lookup, then the apps-domain convention, then none.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::cluster::ClusterClient;

/// Label Argo CD stamps on every resource it manages.
pub const INSTANCE_LABEL: &str = "argocd.argoproj.io/instance";

/// Which strategy produced the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouteStrategy {
    LabelSelectorLookup,
    NameLookup,
    DomainConvention,
    None,
}

impl fmt::Display for RouteStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RouteStrategy::LabelSelectorLookup => "label-selector-lookup",
            RouteStrategy::NameLookup => "name-lookup",
            RouteStrategy::DomainConvention => "domain-convention",
            RouteStrategy::None => "none",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteHostResult {
    pub host: Option<String>,
    pub strategy: RouteStrategy,
    /// Strategy failures that were skipped over.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub lookup_errors: Vec<String>,
}

impl RouteHostResult {
    fn found(host: String, strategy: RouteStrategy, lookup_errors: Vec<String>) -> Self {
        Self {
            host: Some(host),
            strategy,
            lookup_errors,
        }
    }

    pub fn none() -> Self {
        Self {
            host: None,
            strategy: RouteStrategy::None,
            lookup_errors: Vec::new(),
        }
    }
}

/// No cluster client could be constructed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("route lookup unavailable: {0}")]
pub struct RouteUnavailable(pub String);

/// What to resolve a host for.
#[derive(Debug, Clone, Copy)]
pub struct RouteQuery<'a> {
    pub namespace: &'a str,
    pub app_name: &'a str,
    /// Name used for the domain convention; defaults to `app_name`.
    pub base_name: Option<&'a str>,
    /// Whether the domain convention may supply a host.
    pub convention: bool,
}

impl<'a> RouteQuery<'a> {
    pub fn new(namespace: &'a str, app_name: &'a str) -> Self {
        Self {
            namespace,
            app_name,
            base_name: None,
            convention: true,
        }
    }

    pub fn with_base_name(mut self, base_name: Option<&'a str>) -> Self {
        self.base_name = base_name.filter(|b| !b.trim().is_empty());
        self
    }

    /// Only the cluster lookups; used when `namespace` was not actually set.
    pub fn without_convention(mut self) -> Self {
        self.convention = false;
        self
    }
}

pub struct RouteResolver {
    client: Result<Arc<dyn ClusterClient>, RouteUnavailable>,
    fallback_domain: Option<String>,
}

impl RouteResolver {
    pub fn new(client: Arc<dyn ClusterClient>, fallback_domain: Option<String>) -> Self {
        Self {
            client: Ok(client),
            fallback_domain: normalize_domain(fallback_domain),
        }
    }

    /// A resolver whose cluster client failed to construct.
    pub fn unavailable(reason: impl Into<String>, fallback_domain: Option<String>) -> Self {
        Self {
            client: Err(RouteUnavailable(reason.into())),
            fallback_domain: normalize_domain(fallback_domain),
        }
    }

    pub fn fallback_domain(&self) -> Option<&str> {
        self.fallback_domain.as_deref()
    }

    pub async fn resolve(&self, query: RouteQuery<'_>) -> Result<RouteHostResult, RouteUnavailable> {
        let client = self.client.as_ref().map_err(|e| e.clone())?;
        let RouteQuery {
            namespace,
            app_name,
            ..
        } = query;
        let mut lookup_errors = Vec::new();

        let selector = format!("{INSTANCE_LABEL}={app_name}");
        match client.list_routes(namespace, &selector).await {
            Ok(routes) => {
                if let Some(host) = routes.into_iter().find_map(|r| r.host) {
                    tracing::info!("Route host {} found via label for {}/{}", host, namespace, app_name);
                    return Ok(RouteHostResult::found(
                        host,
                        RouteStrategy::LabelSelectorLookup,
                        lookup_errors,
                    ));
                }
            }
            Err(e) => {
                tracing::warn!("Route lookup via label failed for {}/{}: {}", namespace, app_name, e);
                lookup_errors.push(format!("label lookup: {e}"));
            }
        }

        match client.get_route(namespace, app_name).await {
            Ok(Some(route)) => {
                if let Some(host) = route.host {
                    tracing::info!("Route host {} found via name for {}/{}", host, namespace, app_name);
                    return Ok(RouteHostResult::found(
                        host,
                        RouteStrategy::NameLookup,
                        lookup_errors,
                    ));
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Route lookup via name failed for {}/{}: {}", namespace, app_name, e);
                lookup_errors.push(format!("name lookup: {e}"));
            }
        }

        if query.convention
            && let Some(ref domain) = self.fallback_domain
        {
            let base = query.base_name.unwrap_or(app_name);
            let host = format!("{base}-{namespace}.{domain}");
            tracing::info!("Defaulting route host to {} for {}", host, app_name);
            return Ok(RouteHostResult::found(
                host,
                RouteStrategy::DomainConvention,
                lookup_errors,
            ));
        }

        Ok(RouteHostResult {
            host: None,
            strategy: RouteStrategy::None,
            lookup_errors,
        })
    }
}

fn normalize_domain(domain: Option<String>) -> Option<String> {
    domain
        .map(|d| d.trim().trim_start_matches('.').to_string())
        .filter(|d| !d.is_empty())
}
