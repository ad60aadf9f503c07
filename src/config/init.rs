// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates devforge.yml template files.

use std::path::Path;

use crate::error::{Error, Result};

use super::CONFIG_FILENAME;

pub fn init_config(dir: &Path, template_repo: Option<&str>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    if let Some(repo) = template_repo
        && url::Url::parse(repo).is_err()
    {
        return Err(Error::InvalidConfig(format!(
            "template repository is not a valid URL: {repo}"
        )));
    }

    let yaml = generate_template_yaml(template_repo);
    std::fs::write(&config_path, yaml)?;

    Ok(())
}

fn generate_template_yaml(template_repo: Option<&str>) -> String {
    let template_repo = template_repo.unwrap_or("https://github.com/my-org/device-template.git");
    format!(
        r#"source_host:
  api_url: https://api.github.com
  username: {{ env: GITHUB_USERNAME }}
  token: {{ env: GITHUB_TOKEN }}
  # Repositories are public unless this is set
  # private: true

controller:
  url: {{ env: ARGOCD_URL }}
  token: {{ env: ARGOCD_TOKEN }}
  disable_tls: {{ env: ARGOCD_DISABLE_TLS, default: "false" }}
  namespace: openshift-gitops
  project: default
  target_revision: main

cluster:
  # In-cluster service account credentials are used when api_url is unset
  apps_domain: {{ env: APPS_DOMAIN, default: "" }}

template:
  repo_url: {template_repo}
  files:
    - bgd-configmaps.yaml
    - bgd-deployment.yaml
    - path: bgd-route.yaml
      route: true
    - bgd-svc.yaml

timeouts:
  api: 30s
  clone: 5m
  fetch: 5m
  git: 2m
"#
    )
}
