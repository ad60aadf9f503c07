// ABOUTME: Reads the current context of a kubeconfig file for use outside a cluster.
// ABOUTME: Supports bearer tokens and CA certificates given as files or inline data.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

use super::ClusterError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct Kubeconfig {
    #[serde(default)]
    current_context: Option<String>,
    #[serde(default)]
    contexts: Vec<NamedContext>,
    #[serde(default)]
    clusters: Vec<NamedCluster>,
    #[serde(default)]
    users: Vec<NamedUser>,
}

#[derive(Debug, Deserialize)]
struct NamedContext {
    name: String,
    context: ContextEntry,
}

#[derive(Debug, Deserialize)]
struct ContextEntry {
    cluster: String,
    #[serde(default)]
    user: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamedCluster {
    name: String,
    cluster: ClusterEntry,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ClusterEntry {
    server: String,
    #[serde(default)]
    certificate_authority: Option<PathBuf>,
    #[serde(default)]
    certificate_authority_data: Option<String>,
    #[serde(default)]
    insecure_skip_tls_verify: bool,
}

#[derive(Debug, Deserialize)]
struct NamedUser {
    name: String,
    #[serde(default)]
    user: UserEntry,
}

#[derive(Debug, Default, Deserialize)]
struct UserEntry {
    #[serde(default)]
    token: Option<String>,
    #[serde(default, rename = "tokenFile")]
    token_file: Option<PathBuf>,
}

/// Connection details of the current context.
#[derive(Debug)]
pub struct KubeTarget {
    pub server: Url,
    pub token: Option<SecretString>,
    pub ca_file: Option<PathBuf>,
    pub ca_pem: Option<Vec<u8>>,
    pub insecure: bool,
}

fn unavailable(path: &Path, reason: impl std::fmt::Display) -> ClusterError {
    ClusterError::Unavailable(format!("kubeconfig {}: {reason}", path.display()))
}

/// Resolve the current context of the kubeconfig at `path`.
///
/// Relative file references are taken from the kubeconfig's directory.
pub fn load(path: &Path) -> Result<KubeTarget, ClusterError> {
    let raw = std::fs::read_to_string(path).map_err(|e| unavailable(path, e))?;
    let config: Kubeconfig = serde_yaml::from_str(&raw).map_err(|e| unavailable(path, e))?;
    let base = path.parent().unwrap_or(Path::new("."));

    let context_name = config
        .current_context
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| unavailable(path, "no current-context"))?;
    let context = config
        .contexts
        .iter()
        .find(|c| c.name == context_name)
        .map(|c| &c.context)
        .ok_or_else(|| unavailable(path, format!("context {context_name} not found")))?;
    let cluster = config
        .clusters
        .iter()
        .find(|c| c.name == context.cluster)
        .map(|c| &c.cluster)
        .ok_or_else(|| unavailable(path, format!("cluster {} not found", context.cluster)))?;

    let server = Url::parse(cluster.server.trim())
        .map_err(|e| unavailable(path, format!("invalid server URL: {e}")))?;

    let ca_pem = cluster
        .certificate_authority_data
        .as_deref()
        .map(|data| BASE64.decode(data.trim()))
        .transpose()
        .map_err(|e| unavailable(path, format!("invalid certificate-authority-data: {e}")))?;
    let ca_file = cluster.certificate_authority.as_ref().map(|f| base.join(f));

    let user = context
        .user
        .as_deref()
        .and_then(|name| config.users.iter().find(|u| u.name == name))
        .map(|u| &u.user);
    let token = match user {
        Some(UserEntry {
            token: Some(token), ..
        }) if !token.trim().is_empty() => Some(SecretString::from(token.trim().to_string())),
        Some(UserEntry {
            token_file: Some(file),
            ..
        }) => {
            let file = base.join(file);
            let token = std::fs::read_to_string(&file)
                .map_err(|e| unavailable(path, format!("cannot read {}: {e}", file.display())))?;
            Some(SecretString::from(token.trim().to_string()))
        }
        _ => None,
    };

    Ok(KubeTarget {
        server,
        token,
        ca_file,
        ca_pem,
        insecure: cluster.insecure_skip_tls_verify,
    })
}
