// ABOUTME: GitHub REST client for repository creation and deletion.

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use super::{CreatedRepository, NewRepository, SourceHostClient, SourceHostError};
use crate::http::{self, TransportConfig, TransportError};

const GITHUB_ACCEPT: &str = "application/vnd.github+json";

#[derive(Serialize)]
struct CreateRepositoryBody<'a> {
    name: &'a str,
    description: &'a str,
    private: bool,
}

#[derive(Deserialize)]
struct RepositoryResponse {
    clone_url: String,
    #[serde(default)]
    owner: Option<Owner>,
}

#[derive(Deserialize)]
struct Owner {
    login: String,
}

pub struct GithubClient {
    http: reqwest::Client,
    api_url: Url,
    timeout: Duration,
}

impl GithubClient {
    /// Client authenticating with `Authorization: token ...`.
    pub fn new(
        api_url: Url,
        token: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, TransportError> {
        let headers = http::with_accept(http::auth_headers("token", token)?, GITHUB_ACCEPT);
        let http = transport.build_client(headers)?;
        Ok(Self {
            http,
            api_url,
            timeout: transport.timeout,
        })
    }

    fn request_error(&self, e: reqwest::Error) -> SourceHostError {
        if e.is_timeout() {
            SourceHostError::Timeout {
                after: self.timeout,
            }
        } else {
            SourceHostError::Request(e.without_url())
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, SourceHostError> {
        let status = response.status();
        if status.as_u16() >= 300 {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceHostError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl SourceHostClient for GithubClient {
    async fn create_repository(
        &self,
        repository: &NewRepository,
    ) -> Result<CreatedRepository, SourceHostError> {
        let url = http::endpoint(&self.api_url, "user/repos");
        tracing::debug!("POST {}", url);

        let response = self
            .http
            .post(url)
            .json(&CreateRepositoryBody {
                name: &repository.name,
                description: &repository.description,
                private: repository.private,
            })
            .send()
            .await
            .map_err(|e| self.request_error(e))?;
        let response = Self::check(response).await?;

        let body: RepositoryResponse = response
            .json()
            .await
            .map_err(|e| SourceHostError::Decode(e.without_url().to_string()))?;

        tracing::info!("Created repository {}", repository.name);
        Ok(CreatedRepository {
            clone_url: body.clone_url,
            owner: body.owner.map(|o| o.login),
        })
    }

    async fn delete_repository(&self, owner: &str, name: &str) -> Result<(), SourceHostError> {
        let url = http::endpoint(
            &self.api_url,
            &format!(
                "repos/{}/{}",
                urlencoding::encode(owner),
                urlencoding::encode(name)
            ),
        );
        tracing::debug!("DELETE {}", url);

        let response = self
            .http
            .delete(url)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;
        Self::check(response).await?;

        tracing::info!("Deleted repository {}/{}", owner, name);
        Ok(())
    }
}
