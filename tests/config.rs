// ABOUTME: Integration tests for configuration parsing and resolution.
// ABOUTME: Tests YAML parsing, env var indirection, defaults, and discovery.

use devforge::config::*;
use devforge::error::Error;
use secrecy::ExposeSecret;
use std::time::Duration;

mod parsing {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = Config::from_yaml("").unwrap();
        assert_eq!(config.source_host.api_url, "https://api.github.com");
        assert!(!config.source_host.private);
        assert_eq!(config.controller.namespace, "openshift-gitops");
        assert_eq!(config.controller.project, "default");
        assert_eq!(config.controller.target_revision, "main");
        assert_eq!(config.controller.path, ".");
        assert!(config.controller.sync_after_upsert);
        assert_eq!(config.commit.name, "Device Workflow Bot");
        assert_eq!(config.commit.email, "auto@example.com");
        assert_eq!(config.commit.message, "Initial commit");
        assert_eq!(config.timeouts.api, Duration::from_secs(30));
        assert_eq!(config.timeouts.clone, Duration::from_secs(300));
        assert_eq!(config.timeouts.git, Duration::from_secs(120));
    }

    #[test]
    fn default_template_files() {
        let config = Config::from_yaml("").unwrap();
        let paths: Vec<_> = config.template.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(
            paths,
            [
                "bgd-configmaps.yaml",
                "bgd-deployment.yaml",
                "bgd-route.yaml",
                "bgd-svc.yaml"
            ]
        );
        let routes: Vec<_> = config
            .template
            .files
            .iter()
            .filter(|f| f.route)
            .map(|f| f.path.as_str())
            .collect();
        assert_eq!(routes, ["bgd-route.yaml"]);
    }

    #[test]
    fn template_files_accept_both_forms() {
        let yaml = r#"
template:
  repo_url: https://github.com/acme/template.git
  files:
    - app.yaml
    - path: route.yaml
      route: true
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.template.files.len(), 2);
        assert_eq!(config.template.files.head, TemplateFile::new("app.yaml", false));
        assert_eq!(config.template.files.tail[0], TemplateFile::new("route.yaml", true));
    }

    #[test]
    fn empty_template_file_list_is_rejected() {
        let yaml = "template:\n  files: []\n";
        assert!(matches!(Config::from_yaml(yaml), Err(Error::Yaml(_))));
    }

    #[test]
    fn humantime_durations() {
        let yaml = "timeouts:\n  api: 5s\n  clone: 10m\n";
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.timeouts.api, Duration::from_secs(5));
        assert_eq!(config.timeouts.clone, Duration::from_secs(600));
        assert_eq!(config.timeouts.fetch, Duration::from_secs(300));
    }
}

mod resolution {
    use super::*;

    const YAML: &str = r#"
source_host:
  username: { env: DEVFORGE_TEST_GH_USER }
  token: { env: DEVFORGE_TEST_GH_TOKEN }
controller:
  url: { env: DEVFORGE_TEST_ARGOCD_URL, default: "https://argocd.example.com" }
  token: { env: DEVFORGE_TEST_ARGOCD_TOKEN }
  disable_tls: { env: DEVFORGE_TEST_DISABLE_TLS, default: "false" }
cluster:
  apps_domain: { env: DEVFORGE_TEST_APPS_DOMAIN }
"#;

    #[test]
    fn env_values_resolve_into_settings() {
        temp_env::with_vars(
            [
                ("DEVFORGE_TEST_GH_USER", Some("octocat")),
                ("DEVFORGE_TEST_GH_TOKEN", Some("ghp_secret")),
                ("DEVFORGE_TEST_ARGOCD_URL", None),
                ("DEVFORGE_TEST_ARGOCD_TOKEN", Some("argo-secret")),
                ("DEVFORGE_TEST_APPS_DOMAIN", Some(".apps.example.com")),
            ],
            || {
                let settings = Config::from_yaml(YAML).unwrap().resolve().unwrap();
                assert_eq!(settings.source_host.username.as_deref(), Some("octocat"));
                assert_eq!(
                    settings.source_host.token.as_ref().unwrap().expose_secret(),
                    "ghp_secret"
                );
                assert_eq!(
                    settings.controller.url.as_ref().unwrap().as_str(),
                    "https://argocd.example.com/"
                );
                assert_eq!(settings.controller.disable_tls.as_deref(), Some("false"));
                assert_eq!(
                    settings.cluster.apps_domain.as_deref(),
                    Some("apps.example.com")
                );
            },
        );
    }

    #[test]
    fn unset_secrets_are_absent() {
        temp_env::with_vars(
            [
                ("DEVFORGE_TEST_GH_USER", None::<&str>),
                ("DEVFORGE_TEST_GH_TOKEN", None),
                ("DEVFORGE_TEST_ARGOCD_TOKEN", None),
                ("DEVFORGE_TEST_APPS_DOMAIN", None),
            ],
            || {
                let settings = Config::from_yaml(YAML).unwrap().resolve().unwrap();
                assert!(settings.source_host.token.is_none());
                assert!(settings.controller.token.is_none());
                assert!(settings.cluster.apps_domain.is_none());
            },
        );
    }

    #[test]
    fn invalid_controller_url_is_a_config_error() {
        let config = Config::from_yaml("controller:\n  url: not a url\n").unwrap();
        let err = config.resolve().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(ref m) if m.contains("controller.url")));
    }

    #[test]
    fn settings_debug_does_not_expose_tokens() {
        let config =
            Config::from_yaml("source_host:\n  token: ghp_plaintext_token\n").unwrap();
        let settings = config.resolve().unwrap();
        assert!(!format!("{settings:?}").contains("ghp_plaintext_token"));
    }
}

mod discovery {
    use super::*;

    #[test]
    fn finds_primary_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("devforge.yml"), "source_host:\n  private: true\n").unwrap();
        let config = Config::discover(dir.path()).unwrap();
        assert!(config.source_host.private);
    }

    #[test]
    fn finds_dot_directory_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".devforge")).unwrap();
        std::fs::write(
            dir.path().join(".devforge/config.yml"),
            "commit:\n  name: Other Bot\n",
        )
        .unwrap();
        let config = Config::discover(dir.path()).unwrap();
        assert_eq!(config.commit.name, "Other Bot");
    }

    #[test]
    fn primary_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("devforge.yml"), "commit:\n  name: First\n").unwrap();
        std::fs::write(dir.path().join("devforge.yaml"), "commit:\n  name: Second\n").unwrap();
        assert_eq!(Config::discover(dir.path()).unwrap().commit.name, "First");
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Config::discover(dir.path()),
            Err(Error::ConfigNotFound(_))
        ));
    }
}

mod tls {
    use super::*;

    #[test]
    fn request_override_wins_over_default() {
        assert!(!TlsPolicy::from_disable_flags(Some("yes"), Some("false")).verify());
        assert!(TlsPolicy::from_disable_flags(Some("no"), Some("true")).verify());
        assert!(!TlsPolicy::from_disable_flags(None, Some("TRUE")).verify());
        assert!(TlsPolicy::from_disable_flags(None, None).verify());
    }
}
