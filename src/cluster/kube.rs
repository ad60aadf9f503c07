// ABOUTME: Kubernetes REST client for route.openshift.io/v1 routes.
// ABOUTME: Builds from explicit settings, the pod's service account, or a kubeconfig file.

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use super::kubeconfig;
use super::{ClusterClient, ClusterError, Route};
use crate::config::{ClusterSettings, TlsPolicy};
use crate::http::{self, TransportConfig};

pub const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";
const ROUTES_API: &str = "apis/route.openshift.io/v1";

/// The pieces of the process environment used to find a cluster.
#[derive(Debug, Clone, Default)]
pub struct ClusterEnv {
    pub service_host: Option<String>,
    pub service_port: Option<String>,
    pub service_account_dir: PathBuf,
    /// Kubeconfig tried when not running in a cluster.
    pub kubeconfig: Option<PathBuf>,
}

impl ClusterEnv {
    /// Read `KUBERNETES_SERVICE_HOST`/`_PORT`, the standard service account path,
    /// and the first `KUBECONFIG` entry (default `~/.kube/config`).
    pub fn from_process() -> Self {
        let kubeconfig = std::env::var_os("KUBECONFIG")
            .and_then(|paths| std::env::split_paths(&paths).find(|p| !p.as_os_str().is_empty()))
            .or_else(|| dirs::home_dir().map(|home| home.join(".kube").join("config")));
        Self {
            service_host: std::env::var("KUBERNETES_SERVICE_HOST").ok(),
            service_port: std::env::var("KUBERNETES_SERVICE_PORT").ok(),
            service_account_dir: PathBuf::from(SERVICE_ACCOUNT_DIR),
            kubeconfig,
        }
    }

    fn api_url(&self) -> Result<Url, ClusterError> {
        let host = self
            .service_host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| {
                ClusterError::Unavailable(
                    "not running in a cluster, no api_url configured, and no kubeconfig found"
                        .to_string(),
                )
            })?;
        let port = self
            .service_port
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or("443");
        let host = if host.contains(':') {
            format!("[{host}]")
        } else {
            host.to_string()
        };
        Url::parse(&format!("https://{host}:{port}"))
            .map_err(|e| ClusterError::Unavailable(format!("invalid in-cluster address: {e}")))
    }
}

#[derive(Deserialize)]
struct RouteList {
    #[serde(default)]
    items: Option<Vec<RouteObject>>,
}

#[derive(Deserialize)]
struct RouteObject {
    #[serde(default)]
    metadata: RouteMetadata,
    #[serde(default)]
    spec: Option<RouteSpec>,
}

#[derive(Default, Deserialize)]
struct RouteMetadata {
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
struct RouteSpec {
    #[serde(default)]
    host: Option<String>,
}

impl From<RouteObject> for Route {
    fn from(object: RouteObject) -> Self {
        Route {
            name: object.metadata.name,
            host: object
                .spec
                .and_then(|s| s.host)
                .filter(|h| !h.trim().is_empty()),
        }
    }
}

pub struct KubeRouteClient {
    http: reqwest::Client,
    api_url: Url,
    timeout: Duration,
}

impl KubeRouteClient {
    pub fn new(
        api_url: Url,
        token: Option<&SecretString>,
        ca_cert: Option<PathBuf>,
        timeout: Duration,
    ) -> Result<Self, ClusterError> {
        Self::with_transport(
            api_url,
            token,
            TransportConfig::new(timeout).with_ca_cert(ca_cert),
        )
    }

    fn with_transport(
        api_url: Url,
        token: Option<&SecretString>,
        transport: TransportConfig,
    ) -> Result<Self, ClusterError> {
        let headers = match token {
            Some(token) => http::auth_headers("Bearer", token)?,
            None => reqwest::header::HeaderMap::new(),
        };
        let http = transport.build_client(headers)?;
        Ok(Self {
            http,
            api_url,
            timeout: transport.timeout,
        })
    }

    /// Explicit `cluster.api_url` when configured, then the pod's service
    /// account, then the kubeconfig.
    pub fn from_settings(
        settings: &ClusterSettings,
        env: &ClusterEnv,
        timeout: Duration,
    ) -> Result<Self, ClusterError> {
        if let Some(ref api_url) = settings.api_url {
            return Self::new(
                api_url.clone(),
                settings.token.as_ref(),
                settings.ca_cert.clone(),
                timeout,
            );
        }
        match Self::in_cluster(env, timeout) {
            Ok(client) => Ok(client),
            Err(in_cluster) => match env.kubeconfig {
                Some(ref path) if path.is_file() => Self::from_kubeconfig(path, timeout),
                _ => Err(in_cluster),
            },
        }
    }

    pub fn from_kubeconfig(path: &Path, timeout: Duration) -> Result<Self, ClusterError> {
        let target = kubeconfig::load(path)?;
        let mut transport = TransportConfig::new(timeout)
            .with_ca_cert(target.ca_file)
            .with_ca_pem(target.ca_pem);
        if target.insecure {
            transport = transport.with_tls(TlsPolicy::insecure());
        }
        tracing::debug!("Using kubeconfig {} for {}", path.display(), target.server);
        Self::with_transport(target.server, target.token.as_ref(), transport)
    }

    pub fn in_cluster(env: &ClusterEnv, timeout: Duration) -> Result<Self, ClusterError> {
        let api_url = env.api_url()?;
        let token = read_token(&env.service_account_dir.join("token"))?;
        let ca = env.service_account_dir.join("ca.crt");
        let ca = ca.exists().then_some(ca);
        tracing::debug!("Using in-cluster configuration at {}", api_url);
        Self::new(api_url, Some(&token), ca, timeout)
    }

    fn routes_url(&self, namespace: &str) -> Url {
        http::endpoint(
            &self.api_url,
            &format!(
                "{ROUTES_API}/namespaces/{}/routes",
                urlencoding::encode(namespace)
            ),
        )
    }

    fn request_error(&self, e: reqwest::Error) -> ClusterError {
        if e.is_timeout() {
            ClusterError::Timeout {
                after: self.timeout,
            }
        } else {
            ClusterError::Request(e.without_url())
        }
    }

    async fn status_error(response: reqwest::Response) -> ClusterError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        ClusterError::Status { status, body }
    }
}

fn read_token(path: &Path) -> Result<SecretString, ClusterError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        ClusterError::Unavailable(format!("cannot read service account token: {e}"))
    })?;
    let token = raw.trim();
    if token.is_empty() {
        return Err(ClusterError::Unavailable(
            "service account token is empty".to_string(),
        ));
    }
    Ok(SecretString::from(token.to_string()))
}

#[async_trait]
impl ClusterClient for KubeRouteClient {
    async fn list_routes(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<Route>, ClusterError> {
        let url = self.routes_url(namespace);
        tracing::debug!("GET {} labelSelector={}", url, label_selector);

        let response = self
            .http
            .get(url)
            .query(&[("labelSelector", label_selector)])
            .send()
            .await
            .map_err(|e| self.request_error(e))?;
        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let list: RouteList = response
            .json()
            .await
            .map_err(|e| ClusterError::Decode(e.without_url().to_string()))?;
        Ok(list
            .items
            .unwrap_or_default()
            .into_iter()
            .map(Route::from)
            .collect())
    }

    async fn get_route(&self, namespace: &str, name: &str) -> Result<Option<Route>, ClusterError> {
        let mut url = self.routes_url(namespace);
        let path = format!("{}/{}", url.path(), urlencoding::encode(name));
        url.set_path(&path);
        tracing::debug!("GET {}", url);

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let object: RouteObject = response
            .json()
            .await
            .map_err(|e| ClusterError::Decode(e.without_url().to_string()))?;
        Ok(Some(Route::from(object)))
    }
}
