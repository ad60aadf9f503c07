// ABOUTME: Configuration types and parsing for devforge.yml.
// ABOUTME: Handles YAML parsing, env var indirection for secrets, and file discovery.

mod deserialize;
mod env_value;
mod init;
mod settings;
mod tls;

pub use env_value::{EnvValue, resolve_opt};
pub use init::init_config;
pub use settings::{
    ClusterSettings, CommitIdentity, ControllerSettings, MissingCredential, Settings,
    SourceHostSettings, TemplateSettings, Timeouts, resolve_credential,
};
pub use tls::TlsPolicy;

use crate::error::{Error, Result};
use deserialize::deserialize_template_files;
use nonempty::NonEmpty;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "devforge.yml";
pub const CONFIG_FILENAME_ALT: &str = "devforge.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".devforge/config.yml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source_host: SourceHostConfig,

    #[serde(default)]
    pub controller: ControllerConfig,

    #[serde(default)]
    pub cluster: ClusterConfig,

    #[serde(default)]
    pub template: TemplateConfig,

    #[serde(default)]
    pub commit: CommitConfig,

    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceHostConfig {
    #[serde(default = "default_source_host_api")]
    pub api_url: String,
    #[serde(default)]
    pub username: Option<EnvValue>,
    #[serde(default)]
    pub token: Option<EnvValue>,
    /// Create repositories as private. Public matches the historical behavior.
    #[serde(default)]
    pub private: bool,
}

impl Default for SourceHostConfig {
    fn default() -> Self {
        Self {
            api_url: default_source_host_api(),
            username: None,
            token: None,
            private: false,
        }
    }
}

fn default_source_host_api() -> String {
    "https://api.github.com".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ControllerConfig {
    #[serde(default)]
    pub url: Option<EnvValue>,
    #[serde(default)]
    pub token: Option<EnvValue>,
    #[serde(default)]
    pub disable_tls: Option<EnvValue>,
    #[serde(default = "default_controller_namespace")]
    pub namespace: String,
    #[serde(default = "default_project")]
    pub project: String,
    #[serde(default = "default_target_revision")]
    pub target_revision: String,
    #[serde(default = "default_source_path")]
    pub path: String,
    #[serde(default = "default_true")]
    pub sync_after_upsert: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            url: None,
            token: None,
            disable_tls: None,
            namespace: default_controller_namespace(),
            project: default_project(),
            target_revision: default_target_revision(),
            path: default_source_path(),
            sync_after_upsert: true,
        }
    }
}

fn default_controller_namespace() -> String {
    "openshift-gitops".to_string()
}

fn default_project() -> String {
    "default".to_string()
}

fn default_target_revision() -> String {
    "main".to_string()
}

fn default_source_path() -> String {
    ".".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClusterConfig {
    #[serde(default)]
    pub api_url: Option<EnvValue>,
    #[serde(default)]
    pub token: Option<EnvValue>,
    #[serde(default)]
    pub ca_cert: Option<PathBuf>,
    /// Apps domain used for the route naming convention.
    #[serde(default)]
    pub apps_domain: Option<EnvValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateConfig {
    #[serde(default)]
    pub repo_url: Option<String>,
    #[serde(
        default = "default_template_files",
        deserialize_with = "deserialize_template_files"
    )]
    pub files: NonEmpty<TemplateFile>,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            repo_url: None,
            files: default_template_files(),
        }
    }
}

/// A template file that must carry the device placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TemplateFile {
    pub path: String,
    /// Route-defining files must also carry `{{CLUSTER_FQDN}}`.
    #[serde(default)]
    pub route: bool,
}

impl TemplateFile {
    pub fn new(path: impl Into<String>, route: bool) -> Self {
        Self {
            path: path.into(),
            route,
        }
    }
}

fn default_template_files() -> NonEmpty<TemplateFile> {
    NonEmpty {
        head: TemplateFile::new("bgd-configmaps.yaml", false),
        tail: vec![
            TemplateFile::new("bgd-deployment.yaml", false),
            TemplateFile::new("bgd-route.yaml", true),
            TemplateFile::new("bgd-svc.yaml", false),
        ],
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitConfig {
    #[serde(default = "default_commit_name")]
    pub name: String,
    #[serde(default = "default_commit_email")]
    pub email: String,
    #[serde(default = "default_commit_message")]
    pub message: String,
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            name: default_commit_name(),
            email: default_commit_email(),
            message: default_commit_message(),
        }
    }
}

fn default_commit_name() -> String {
    "Device Workflow Bot".to_string()
}

fn default_commit_email() -> String {
    "auto@example.com".to_string()
}

fn default_commit_message() -> String {
    "Initial commit".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_api_timeout", with = "humantime_serde")]
    pub api: Duration,
    #[serde(default = "default_long_timeout", with = "humantime_serde")]
    pub clone: Duration,
    #[serde(default = "default_long_timeout", with = "humantime_serde")]
    pub fetch: Duration,
    #[serde(default = "default_git_timeout", with = "humantime_serde")]
    pub git: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            api: default_api_timeout(),
            clone: default_long_timeout(),
            fetch: default_long_timeout(),
            git: default_git_timeout(),
        }
    }
}

fn default_api_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_long_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_git_timeout() -> Duration {
    Duration::from_secs(120)
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty file is a valid, all-defaults config.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!("Loading config from {}", path.display());
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Resolve env references and validate URLs, producing the settings every
    /// component is constructed from.
    pub fn resolve(&self) -> Result<Settings> {
        Settings::from_config(self)
    }
}
