// ABOUTME: Resolved, process-wide settings built once from the config file.
// ABOUTME: Secrets are held as SecretString; request overrides take precedence over defaults.

use nonempty::NonEmpty;
use secrecy::SecretString;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use super::{Config, EnvValue, TemplateFile, resolve_opt};
use crate::descriptor::DescriptorDefaults;
use crate::error::{Error, Result};

/// Settings passed by reference into every component constructor.
#[derive(Debug, Clone)]
pub struct Settings {
    pub source_host: SourceHostSettings,
    pub controller: ControllerSettings,
    pub cluster: ClusterSettings,
    pub template: TemplateSettings,
    pub commit: CommitIdentity,
    pub timeouts: Timeouts,
}

#[derive(Debug, Clone)]
pub struct SourceHostSettings {
    pub api_url: Url,
    pub username: Option<String>,
    pub token: Option<SecretString>,
    pub private: bool,
}

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub url: Option<Url>,
    pub token: Option<SecretString>,
    /// Process-level "disable TLS" flag, interpreted by `TlsPolicy`.
    pub disable_tls: Option<String>,
    pub descriptor: DescriptorDefaults,
    pub sync_after_upsert: bool,
}

#[derive(Debug, Clone)]
pub struct ClusterSettings {
    pub api_url: Option<Url>,
    pub token: Option<SecretString>,
    pub ca_cert: Option<PathBuf>,
    pub apps_domain: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TemplateSettings {
    pub repo_url: Option<String>,
    pub files: NonEmpty<TemplateFile>,
}

/// Identity used for machine-generated commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitIdentity {
    pub name: String,
    pub email: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub api: Duration,
    pub clone: Duration,
    pub fetch: Duration,
    pub git: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::from(&super::TimeoutConfig::default())
    }
}

impl From<&super::TimeoutConfig> for Timeouts {
    fn from(config: &super::TimeoutConfig) -> Self {
        Self {
            api: config.api,
            clone: config.clone,
            fetch: config.fetch,
            git: config.git,
        }
    }
}

impl Settings {
    pub fn from_config(config: &Config) -> Result<Self> {
        let source_host = SourceHostSettings {
            api_url: parse_url("source_host.api_url", &config.source_host.api_url)?,
            username: resolve_opt(config.source_host.username.as_ref()),
            token: secret(config.source_host.token.as_ref()),
            private: config.source_host.private,
        };

        let controller = ControllerSettings {
            url: optional_url("controller.url", config.controller.url.as_ref())?,
            token: secret(config.controller.token.as_ref()),
            disable_tls: resolve_opt(config.controller.disable_tls.as_ref()),
            descriptor: DescriptorDefaults {
                namespace: config.controller.namespace.clone(),
                project: config.controller.project.clone(),
                target_revision: config.controller.target_revision.clone(),
                path: config.controller.path.clone(),
            },
            sync_after_upsert: config.controller.sync_after_upsert,
        };

        let cluster = ClusterSettings {
            api_url: optional_url("cluster.api_url", config.cluster.api_url.as_ref())?,
            token: secret(config.cluster.token.as_ref()),
            ca_cert: config.cluster.ca_cert.clone(),
            apps_domain: resolve_opt(config.cluster.apps_domain.as_ref())
                .map(|d| d.trim().trim_start_matches('.').to_string()),
        };

        let template = TemplateSettings {
            repo_url: config
                .template
                .repo_url
                .clone()
                .filter(|u| !u.trim().is_empty()),
            files: config.template.files.clone(),
        };

        let commit = CommitIdentity {
            name: config.commit.name.clone(),
            email: config.commit.email.clone(),
            message: config.commit.message.clone(),
        };

        let timeouts = Timeouts::from(&config.timeouts);

        Ok(Self {
            source_host,
            controller,
            cluster,
            template,
            commit,
            timeouts,
        })
    }
}

fn secret(value: Option<&EnvValue>) -> Option<SecretString> {
    value.and_then(EnvValue::resolve_secret)
}

fn parse_url(field: &str, raw: &str) -> Result<Url> {
    Url::parse(raw.trim()).map_err(|e| Error::InvalidConfig(format!("{field}: {e}")))
}

fn optional_url(field: &str, value: Option<&EnvValue>) -> Result<Option<Url>> {
    resolve_opt(value)
        .map(|raw| parse_url(field, &raw))
        .transpose()
}

/// A credential that was neither supplied with the request nor configured.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0} is not configured and was not supplied with the request")]
pub struct MissingCredential(pub &'static str);

/// Credential precedence: request value, else process default, else error.
pub fn resolve_credential(
    request: Option<&str>,
    default: Option<&SecretString>,
    what: &'static str,
) -> std::result::Result<SecretString, MissingCredential> {
    if let Some(value) = request.map(str::trim).filter(|v| !v.is_empty()) {
        return Ok(SecretString::from(value.to_string()));
    }
    default.cloned().ok_or(MissingCredential(what))
}
