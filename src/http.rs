// ABOUTME: Shared reqwest client construction for the REST collaborators.
// ABOUTME: Applies timeout, TLS policy, optional CA bundle, and sensitive auth headers.

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::config::TlsPolicy;

const USER_AGENT: &str = concat!("devforge/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid credential header value")]
    InvalidHeader,

    #[error("failed to read CA certificate {path}: {source}")]
    ReadCa {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid CA certificate: {0}")]
    InvalidCa(reqwest::Error),

    #[error("failed to build HTTP client: {0}")]
    Build(reqwest::Error),
}

/// How an HTTP client is built.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    pub tls: TlsPolicy,
    pub ca_cert: Option<PathBuf>,
    /// PEM bundle supplied inline, e.g. decoded from a kubeconfig.
    pub ca_pem: Option<Vec<u8>>,
}

impl TransportConfig {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            tls: TlsPolicy::verified(),
            ca_cert: None,
            ca_pem: None,
        }
    }

    pub fn with_tls(mut self, tls: TlsPolicy) -> Self {
        self.tls = tls;
        self
    }

    pub fn with_ca_cert(mut self, path: Option<PathBuf>) -> Self {
        self.ca_cert = path;
        self
    }

    pub fn with_ca_pem(mut self, pem: Option<Vec<u8>>) -> Self {
        self.ca_pem = pem;
        self
    }

    pub fn build_client(&self, headers: HeaderMap) -> Result<reqwest::Client, TransportError> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers);

        if !self.tls.verify() {
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(ref path) = self.ca_cert {
            let pem = std::fs::read(path).map_err(|source| TransportError::ReadCa {
                path: path.clone(),
                source,
            })?;
            let cert = reqwest::Certificate::from_pem(&pem).map_err(TransportError::InvalidCa)?;
            builder = builder.add_root_certificate(cert);
        }
        if let Some(ref pem) = self.ca_pem {
            let cert = reqwest::Certificate::from_pem(pem).map_err(TransportError::InvalidCa)?;
            builder = builder.add_root_certificate(cert);
        }

        builder.build().map_err(TransportError::Build)
    }
}

/// `Authorization: {scheme} {token}`, marked sensitive so it is never logged.
pub fn auth_headers(scheme: &str, token: &SecretString) -> Result<HeaderMap, TransportError> {
    let mut value = HeaderValue::from_str(&format!("{scheme} {}", token.expose_secret()))
        .map_err(|_| TransportError::InvalidHeader)?;
    value.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, value);
    Ok(headers)
}

pub fn with_accept(mut headers: HeaderMap, accept: &'static str) -> HeaderMap {
    headers.insert(ACCEPT, HeaderValue::from_static(accept));
    headers
}

/// Append `path` to `base`, keeping any path prefix `base` already has.
pub fn endpoint(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    let joined = format!(
        "{}/{}",
        base.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    url.set_path(&joined);
    url
}
