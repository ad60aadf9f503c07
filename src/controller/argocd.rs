// ABOUTME: Argo CD REST client over /api/v1/applications with bearer-token auth.
// ABOUTME: Decodes the list response into ApplicationSummary values.

use async_trait::async_trait;
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

use super::{ApplicationSummary, ControllerError, ControllerResponse, DeploymentController};
use crate::http::{self, TransportConfig, TransportError};

const APPLICATIONS: &str = "api/v1/applications";

/// Body of the sync request: prune, apply for real, default hook strategy.
pub const SYNC_REQUEST: &str = r#"{"prune":true,"dryRun":false,"strategy":{"hook":{}}}"#;

pub struct ArgoCdClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl ArgoCdClient {
    pub fn new(
        base_url: Url,
        token: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, TransportError> {
        let headers = http::auth_headers("Bearer", token)?;
        let http = transport.build_client(headers)?;
        Ok(Self {
            http,
            base_url,
            timeout: transport.timeout,
        })
    }

    fn application_url(&self, name: &str) -> Url {
        http::endpoint(
            &self.base_url,
            &format!("{APPLICATIONS}/{}", urlencoding::encode(name)),
        )
    }

    fn request_error(&self, e: reqwest::Error) -> ControllerError {
        if e.is_timeout() {
            ControllerError::Timeout {
                after: self.timeout,
            }
        } else {
            ControllerError::Request(e.without_url())
        }
    }

    async fn read_response(
        &self,
        result: Result<reqwest::Response, reqwest::Error>,
    ) -> Result<ControllerResponse, ControllerError> {
        let response = result.map_err(|e| self.request_error(e))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.request_error(e))?;
        Ok(ControllerResponse::new(status, body))
    }
}

#[async_trait]
impl DeploymentController for ArgoCdClient {
    async fn create_application(
        &self,
        payload: &serde_json::Value,
    ) -> Result<ControllerResponse, ControllerError> {
        let url = http::endpoint(&self.base_url, APPLICATIONS);
        tracing::debug!("POST {}", url);
        self.read_response(self.http.post(url).json(payload).send().await)
            .await
    }

    async fn update_application(
        &self,
        name: &str,
        payload: &serde_json::Value,
    ) -> Result<ControllerResponse, ControllerError> {
        let url = self.application_url(name);
        tracing::debug!("PUT {}", url);
        self.read_response(self.http.put(url).json(payload).send().await)
            .await
    }

    async fn sync_application(&self, name: &str) -> Result<ControllerResponse, ControllerError> {
        let mut url = self.application_url(name);
        let path = format!("{}/sync", url.path());
        url.set_path(&path);
        tracing::debug!("POST {}", url);
        self.read_response(
            self.http
                .post(url)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(SYNC_REQUEST)
                .send()
                .await,
        )
        .await
    }

    async fn list_applications(&self) -> Result<Vec<ApplicationSummary>, ControllerError> {
        let url = http::endpoint(&self.base_url, APPLICATIONS);
        tracing::debug!("GET {}", url);
        let response = self
            .read_response(self.http.get(url).send().await)
            .await?;
        if !response.is_success() {
            return Err(ControllerError::Status {
                status: response.status,
                body: response.body,
            });
        }
        parse_application_list(&response.body)
    }
}

#[derive(Deserialize)]
struct ApplicationList {
    #[serde(default)]
    items: Option<Vec<Application>>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct Application {
    metadata: Metadata,
    spec: Spec,
    status: Status,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct Metadata {
    name: String,
    annotations: Option<BTreeMap<String, String>>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct Spec {
    source: Source,
    destination: Destination,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct Source {
    #[serde(rename = "repoURL")]
    repo_url: Option<String>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct Destination {
    server: Option<String>,
    namespace: Option<String>,
}

#[derive(Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Status {
    sync: Option<StatusField>,
    health: Option<StatusField>,
    operation_state: Option<OperationState>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct StatusField {
    status: Option<String>,
}

#[derive(Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct OperationState {
    finished_at: Option<String>,
}

/// Decode a list body. Both `{"items": [...]}` and a bare array are accepted.
fn parse_application_list(body: &str) -> Result<Vec<ApplicationSummary>, ControllerError> {
    let items = match serde_json::from_str::<ApplicationList>(body) {
        Ok(list) => list.items.unwrap_or_default(),
        Err(_) => serde_json::from_str::<Vec<Application>>(body)
            .map_err(|e| ControllerError::Decode(e.to_string()))?,
    };

    Ok(items
        .into_iter()
        .filter(|app| !app.metadata.name.is_empty())
        .map(|app| ApplicationSummary {
            name: app.metadata.name,
            annotations: app.metadata.annotations.unwrap_or_default(),
            destination_server: app.spec.destination.server,
            destination_namespace: app.spec.destination.namespace,
            repo_url: app.spec.source.repo_url,
            sync_status: app.status.sync.and_then(|s| s.status),
            health: app.status.health.and_then(|h| h.status),
            last_sync: app.status.operation_state.and_then(|o| o.finished_at),
        })
        .collect())
}
