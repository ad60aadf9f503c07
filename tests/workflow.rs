// ABOUTME: End-to-end workflow tests with every capability replaced by an in-process fake.
// ABOUTME: Covers provision, compensation, deploy fallback, listing with routes, and sync.

mod support;

use devforge::cluster::ClusterEnv;
use devforge::config::{Config, Settings};
use devforge::controller::ApplicationSummary;
use devforge::diagnostics::WarningKind;
use devforge::materialize::MaterializationSource;
use devforge::reconcile::{ReconcileMode, ReconciliationOutcome};
use devforge::route::RouteStrategy;
use devforge::vcs::VcsStep;
use devforge::workflow::{
    Compensation, ControllerOverrides, DeployRequest, ErrorKind, ProvisionOutcome,
    ProvisionRequest, Stage, Workflow,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use support::fakes::{FakeCluster, FakeController, FakeFetcher, FakeSourceHost, FakeVcs};

const CONFIGMAP: &str = "id: {{DEVICE_ID}}\nname: {{DEVICE_NAME}}\n";
const ROUTE: &str = "host: {{DEVICE_NAME}}-{{DEVICE_ID}}.{{CLUSTER_FQDN}}\n";
const CLONE_URL: &str = "https://github.com/acme/device-sensor-042.git";

fn settings(extra: &str) -> Settings {
    let yaml = format!(
        r#"
template:
  repo_url: https://github.com/acme/device-template.git
  files:
    - configmap.yaml
    - path: route.yaml
      route: true
cluster:
  apps_domain: apps.example.com
{extra}"#
    );
    Config::from_yaml(&yaml).unwrap().resolve().unwrap()
}

fn with_token() -> Settings {
    settings("source_host:\n  token: ghp_configured\n")
}

fn template_vcs() -> FakeVcs {
    FakeVcs::with_template(&[("configmap.yaml", CONFIGMAP), ("route.yaml", ROUTE)])
}

fn workflow(settings: Settings, vcs: Arc<FakeVcs>, host: Arc<FakeSourceHost>) -> Workflow {
    Workflow::new(settings)
        .with_version_control(vcs)
        .with_package_fetcher(Arc::new(FakeFetcher::default()))
        .with_source_host(host)
        .with_cluster_env(ClusterEnv::default())
}

fn provision_request() -> ProvisionRequest {
    ProvisionRequest {
        device_id: "042".to_string(),
        device_name: "sensor".to_string(),
        cluster_fqdn: Some("apps.example.com".to_string()),
        source: MaterializationSource::StaticTemplate {
            repo_url: "https://github.com/acme/device-template.git".to_string(),
        },
        values: None,
        source_host_token: None,
        cleanup_on_failure: false,
    }
}

fn deploy_request(mode: ReconcileMode) -> DeployRequest {
    DeployRequest {
        repo_url: CLONE_URL.to_string(),
        device_id: "042".to_string(),
        device_name: "sensor".to_string(),
        destination_server: "https://kubernetes.default.svc".to_string(),
        destination_namespace: "device-apps".to_string(),
        mode,
        ..Default::default()
    }
}

fn summary(name: &str, namespace: &str, device_name: Option<&str>) -> ApplicationSummary {
    let mut annotations = BTreeMap::new();
    if let Some(device_name) = device_name {
        annotations.insert("device-workflow/name".to_string(), device_name.to_string());
    }
    ApplicationSummary {
        name: name.to_string(),
        annotations,
        destination_server: Some("https://kubernetes.default.svc".to_string()),
        destination_namespace: Some(namespace.to_string()),
        sync_status: Some("Synced".to_string()),
        health: Some("Healthy".to_string()),
        ..Default::default()
    }
}

mod provision {
    use super::*;

    #[tokio::test]
    async fn publishes_rendered_repository() {
        support::init_tracing();
        let vcs = Arc::new(template_vcs());
        let host = Arc::new(FakeSourceHost::default());
        let report = workflow(with_token(), vcs.clone(), host.clone())
            .provision(&provision_request())
            .await;

        match &report.outcome {
            ProvisionOutcome::Ok {
                canonical_name,
                repo_url,
                files,
            } => {
                assert_eq!(canonical_name, "device-sensor-042");
                assert_eq!(repo_url, CLONE_URL);
                assert_eq!(
                    files,
                    &["configmap.yaml", "route.yaml", "values.yaml", "devfile.yaml"]
                );
            }
            other => panic!("expected ok, got {other:?}"),
        }
        assert!(report.warnings.is_empty());

        let created = host.created();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].name, "device-sensor-042");
        assert!(!created[0].private);

        assert_eq!(
            vcs.calls(),
            [
                "clone https://github.com/acme/device-template.git",
                "init",
                "config Device Workflow Bot <auto@example.com>",
                "remote remove origin",
                format!("remote add origin {CLONE_URL}").as_str(),
                "add -A",
                "commit --allow-empty Initial commit",
                "branch -M main",
                "push -u origin main [configmap.yaml,devfile.yaml,route.yaml,values.yaml]",
            ]
        );
        // The owner reported by the host is the push username.
        assert_eq!(vcs.remotes(), [(CLONE_URL.to_string(), Some("acme".to_string()))]);
    }

    #[tokio::test]
    async fn configured_username_wins_over_owner() {
        let vcs = Arc::new(template_vcs());
        let host = Arc::new(FakeSourceHost::default());
        let settings = settings("source_host:\n  token: ghp_configured\n  username: deploy-bot\n");
        let report = workflow(settings, vcs.clone(), host).provision(&provision_request()).await;

        assert!(report.is_ok());
        assert_eq!(vcs.remotes()[0].1.as_deref(), Some("deploy-bot"));
    }

    #[tokio::test]
    async fn missing_token_fails_before_side_effects() {
        let vcs = Arc::new(template_vcs());
        let host = Arc::new(FakeSourceHost::default());
        let report = workflow(settings(""), vcs.clone(), host.clone())
            .provision(&provision_request())
            .await;

        let failure = report.failure().unwrap();
        assert_eq!(failure.stage, Stage::Validate);
        assert_eq!(failure.kind, ErrorKind::Configuration);
        assert!(failure.message.contains("source host token"));
        assert!(vcs.calls().is_empty());
        assert!(host.created().is_empty());
    }

    #[tokio::test]
    async fn request_token_is_enough() {
        let vcs = Arc::new(template_vcs());
        let host = Arc::new(FakeSourceHost::default());
        let request = ProvisionRequest {
            source_host_token: Some("ghp_request".to_string()),
            ..provision_request()
        };
        let report = workflow(settings(""), vcs, host).provision(&request).await;
        assert!(report.is_ok());
    }

    #[tokio::test]
    async fn blank_device_id_is_configuration_error() {
        let vcs = Arc::new(template_vcs());
        let request = ProvisionRequest {
            device_id: "  ".to_string(),
            ..provision_request()
        };
        let report = workflow(with_token(), vcs.clone(), Arc::new(FakeSourceHost::default()))
            .provision(&request)
            .await;

        assert_eq!(report.failure().unwrap().kind, ErrorKind::Configuration);
        assert!(vcs.calls().is_empty());
    }

    #[tokio::test]
    async fn schema_error_creates_no_remote() {
        let vcs = Arc::new(FakeVcs::with_template(&[
            ("configmap.yaml", "id: {{DEVICE_ID}}\n"),
            ("route.yaml", ROUTE),
        ]));
        let host = Arc::new(FakeSourceHost::default());
        let report = workflow(with_token(), vcs, host.clone())
            .provision(&provision_request())
            .await;

        let failure = report.failure().unwrap();
        assert_eq!(failure.stage, Stage::Materialize);
        assert_eq!(failure.kind, ErrorKind::TemplateSchema);
        assert!(host.created().is_empty());
    }

    #[tokio::test]
    async fn rejected_remote_carries_host_body() {
        let vcs = Arc::new(template_vcs());
        let report = workflow(with_token(), vcs, Arc::new(FakeSourceHost::rejecting(422)))
            .provision(&provision_request())
            .await;

        match &report.outcome {
            ProvisionOutcome::Failed {
                stage,
                kind,
                message,
                compensations,
                ..
            } => {
                assert_eq!(*stage, Stage::CreateRemote);
                assert_eq!(*kind, ErrorKind::RemoteCreation);
                assert!(message.contains("name already exists on this account"));
                assert!(compensations.is_empty());
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn push_failure_records_compensation() {
        let vcs = Arc::new(template_vcs().failing_at(VcsStep::Push));
        let host = Arc::new(FakeSourceHost::default());
        let report = workflow(with_token(), vcs, host.clone())
            .provision(&provision_request())
            .await;

        match &report.outcome {
            ProvisionOutcome::Failed {
                stage,
                kind,
                compensations,
                compensation_results,
                ..
            } => {
                assert_eq!(*stage, Stage::Push);
                assert_eq!(*kind, ErrorKind::Push);
                assert_eq!(
                    compensations,
                    &[Compensation::DeleteRemoteRepository {
                        owner: Some("acme".to_string()),
                        name: "device-sensor-042".to_string(),
                        clone_url: CLONE_URL.to_string(),
                    }]
                );
                assert!(compensation_results.is_empty());
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(host.deleted().is_empty());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].kind, WarningKind::Compensation);
    }

    #[tokio::test]
    async fn cleanup_on_failure_deletes_remote() {
        let vcs = Arc::new(template_vcs().failing_at(VcsStep::Push));
        let host = Arc::new(FakeSourceHost::default());
        let request = ProvisionRequest {
            cleanup_on_failure: true,
            ..provision_request()
        };
        let report = workflow(with_token(), vcs, host.clone()).provision(&request).await;

        match &report.outcome {
            ProvisionOutcome::Failed {
                compensation_results,
                ..
            } => {
                assert_eq!(compensation_results.len(), 1);
                assert!(compensation_results[0].succeeded);
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(
            host.deleted(),
            [("acme".to_string(), "device-sensor-042".to_string())]
        );
        assert!(report.warnings.is_empty());
    }

    #[tokio::test]
    async fn failure_report_serializes_flat() {
        let vcs = Arc::new(template_vcs().failing_at(VcsStep::Push));
        let report = workflow(with_token(), vcs, Arc::new(FakeSourceHost::default()))
            .provision(&provision_request())
            .await;

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["stage"], "push");
        assert_eq!(json["kind"], "push");
        assert_eq!(json["compensations"][0]["action"], "delete-remote-repository");
        assert!(!json.to_string().contains("ghp_configured"));
    }
}

mod deploy {
    use super::*;

    fn deploy_workflow(settings: Settings) -> Workflow {
        workflow(
            settings,
            Arc::new(FakeVcs::default()),
            Arc::new(FakeSourceHost::default()),
        )
    }

    #[tokio::test]
    async fn yaml_only_returns_descriptor() {
        let report = deploy_workflow(with_token())
            .deploy(&deploy_request(ReconcileMode::YamlOnly))
            .await;

        assert_eq!(report.app_name.as_deref(), Some("device-sensor-042"));
        assert!(matches!(report.outcome, ReconciliationOutcome::YamlOnly { .. }));
        assert!(report.outcome.descriptor_text().contains(CLONE_URL));
        assert!(report.warnings.is_empty());
    }

    #[tokio::test]
    async fn api_mode_without_controller_falls_back_with_warning() {
        let report = deploy_workflow(with_token())
            .deploy(&deploy_request(ReconcileMode::ApiUpsert))
            .await;

        assert!(matches!(report.outcome, ReconciliationOutcome::YamlOnly { .. }));
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].kind, WarningKind::YamlOnlyFallback);
    }

    #[tokio::test]
    async fn upserts_and_syncs_through_controller() {
        let controller = Arc::new(FakeController::default());
        let workflow = deploy_workflow(with_token()).with_controller(controller.clone());

        let first = workflow.deploy(&deploy_request(ReconcileMode::ApiUpsert)).await;
        let second = workflow.deploy(&deploy_request(ReconcileMode::ApiUpsert)).await;

        assert!(matches!(first.outcome, ReconciliationOutcome::Deployed { .. }));
        assert!(matches!(second.outcome, ReconciliationOutcome::Deployed { .. }));
        assert_eq!(
            controller.calls(),
            [
                "POST device-sensor-042",
                "SYNC device-sensor-042",
                "POST device-sensor-042",
                "PUT device-sensor-042",
                "SYNC device-sensor-042",
            ]
        );
    }

    #[tokio::test]
    async fn sync_failure_is_a_warning() {
        let controller = Arc::new(FakeController::default().with_sync_status(500));
        let report = deploy_workflow(with_token())
            .with_controller(controller)
            .deploy(&deploy_request(ReconcileMode::ApiUpsert))
            .await;

        assert!(matches!(report.outcome, ReconciliationOutcome::Deployed { .. }));
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].kind, WarningKind::SyncFailed);
    }

    #[tokio::test]
    async fn rejected_upsert_fails_with_yaml() {
        let controller = Arc::new(FakeController::failing_create(403));
        let report = deploy_workflow(with_token())
            .with_controller(controller)
            .deploy(&deploy_request(ReconcileMode::ApiUpsert))
            .await;

        match &report.outcome {
            ReconciliationOutcome::Failed {
                kind,
                descriptor_text,
                ..
            } => {
                assert_eq!(*kind, ErrorKind::ControllerUpsert);
                assert!(!descriptor_text.is_empty());
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn bad_controller_url_still_returns_yaml() {
        let request = DeployRequest {
            controller: ControllerOverrides {
                url: Some("not a url".to_string()),
                token: Some("argo-token".to_string()),
                ..Default::default()
            },
            ..deploy_request(ReconcileMode::ApiUpsert)
        };
        let report = deploy_workflow(with_token()).deploy(&request).await;

        match &report.outcome {
            ReconciliationOutcome::Failed {
                stage,
                kind,
                message,
                descriptor_text,
            } => {
                assert_eq!(*stage, Stage::Validate);
                assert_eq!(*kind, ErrorKind::Configuration);
                assert!(message.contains("invalid controller URL"));
                assert!(descriptor_text.contains("name: device-sensor-042"));
                assert!(descriptor_text.contains(CLONE_URL));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(report.app_name.as_deref(), Some("device-sensor-042"));
        assert!(!serde_json::to_string(&report).unwrap().contains("argo-token"));
    }

    #[tokio::test]
    async fn blank_namespace_is_invalid_destination() {
        let request = DeployRequest {
            destination_namespace: " ".to_string(),
            ..deploy_request(ReconcileMode::YamlOnly)
        };
        let report = deploy_workflow(with_token()).deploy(&request).await;

        match &report.outcome {
            ReconciliationOutcome::Failed {
                stage,
                kind,
                message,
                ..
            } => {
                assert_eq!(*stage, Stage::Describe);
                assert_eq!(*kind, ErrorKind::InvalidDestination);
                assert!(message.contains("destination.namespace"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }
}

mod apps {
    use super::*;

    fn apps_workflow(controller: FakeController) -> Workflow {
        workflow(
            with_token(),
            Arc::new(FakeVcs::default()),
            Arc::new(FakeSourceHost::default()),
        )
        .with_controller(Arc::new(controller))
    }

    #[tokio::test]
    async fn lists_apps_with_route_hosts() {
        let controller = FakeController::with_apps(vec![
            summary("device-sensor-042", "device-apps", Some("sensor")),
            summary("device-gauge-7", "device-apps", None),
        ]);
        let cluster = FakeCluster::default().with_labelled(
            "device-apps",
            "device-sensor-042",
            Some("bgd.apps.example.com"),
        );
        let listing = apps_workflow(controller)
            .with_cluster_client(Arc::new(cluster))
            .list_apps()
            .await
            .unwrap();

        assert_eq!(listing.apps.len(), 2);
        let sensor = &listing.apps[0];
        assert_eq!(sensor.route_host.as_deref(), Some("bgd.apps.example.com"));
        assert_eq!(sensor.route_strategy, RouteStrategy::LabelSelectorLookup);
        assert_eq!(sensor.cluster_fqdn.as_deref(), Some("apps.example.com"));

        let gauge = &listing.apps[1];
        assert_eq!(
            gauge.route_host.as_deref(),
            Some("device-gauge-7-device-apps.apps.example.com")
        );
        assert_eq!(gauge.route_strategy, RouteStrategy::DomainConvention);
        assert!(listing.warnings.is_empty());
    }

    #[tokio::test]
    async fn app_without_namespace_gets_no_convention_host() {
        let mut unplaced = summary("device-meter-9", "", Some("meter"));
        unplaced.destination_namespace = None;
        let cluster = FakeCluster::default().with_named("default", "device-gauge-7", "gauge.example.com");
        let mut named = summary("device-gauge-7", "", None);
        named.destination_namespace = None;
        let listing = apps_workflow(FakeController::with_apps(vec![unplaced, named]))
            .with_cluster_client(Arc::new(cluster))
            .list_apps()
            .await
            .unwrap();

        let meter = &listing.apps[0];
        assert_eq!(meter.namespace, "default");
        assert_eq!(meter.route_host, None);
        assert_eq!(meter.route_strategy, RouteStrategy::None);

        // Cluster lookups still run in the default namespace.
        let gauge = &listing.apps[1];
        assert_eq!(gauge.route_host.as_deref(), Some("gauge.example.com"));
        assert_eq!(gauge.route_strategy, RouteStrategy::NameLookup);
        assert!(listing.warnings.is_empty());
    }

    #[tokio::test]
    async fn lookup_errors_become_warnings() {
        let controller =
            FakeController::with_apps(vec![summary("device-sensor-042", "device-apps", Some("sensor"))]);
        let cluster = FakeCluster::default().failing_label_lookup();
        let listing = apps_workflow(controller)
            .with_cluster_client(Arc::new(cluster))
            .list_apps()
            .await
            .unwrap();

        assert_eq!(
            listing.apps[0].route_host.as_deref(),
            Some("sensor-device-apps.apps.example.com")
        );
        assert_eq!(listing.warnings.len(), 1);
        assert_eq!(listing.warnings[0].kind, WarningKind::RouteLookup);
        assert!(listing.warnings[0].message.starts_with("device-sensor-042:"));
    }

    #[tokio::test]
    async fn unavailable_cluster_warns_once() {
        let controller = FakeController::with_apps(vec![
            summary("device-sensor-042", "device-apps", Some("sensor")),
            summary("device-gauge-7", "device-apps", Some("gauge")),
        ]);
        let listing = apps_workflow(controller).list_apps().await.unwrap();

        assert!(listing.apps.iter().all(|a| a.route_host.is_none()));
        assert!(listing.apps.iter().all(|a| a.route_strategy == RouteStrategy::None));
        assert_eq!(listing.warnings.len(), 1);
        assert!(listing.warnings[0].message.contains("route lookup unavailable"));
    }

    #[tokio::test]
    async fn resolve_route_surfaces_unavailable() {
        let err = apps_workflow(FakeController::default())
            .resolve_route("device-apps", "device-sensor-042")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RouteUnavailable);
        assert_eq!(err.stage(), Stage::Route);
    }

    #[tokio::test]
    async fn listing_without_controller_is_configuration_error() {
        let workflow = workflow(
            with_token(),
            Arc::new(FakeVcs::default()),
            Arc::new(FakeSourceHost::default()),
        );
        let err = workflow.list_apps().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("controller URL and token"));
    }
}

mod sync {
    use super::*;

    fn sync_workflow(controller: Arc<FakeController>) -> Workflow {
        workflow(
            with_token(),
            Arc::new(FakeVcs::default()),
            Arc::new(FakeSourceHost::default()),
        )
        .with_controller(controller)
    }

    #[tokio::test]
    async fn triggers_sync() {
        let controller = Arc::new(FakeController::default());
        let report = sync_workflow(controller.clone())
            .sync(" device-sensor-042 ")
            .await
            .unwrap();
        assert_eq!(report.app_name, "device-sensor-042");
        assert_eq!(controller.calls(), ["SYNC device-sensor-042"]);
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let controller = Arc::new(FakeController::default().with_sync_status(404));
        let err = sync_workflow(controller)
            .sync("device-missing-1")
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Stage::Sync);
        assert_eq!(err.kind(), ErrorKind::ControllerUpsert);
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn blank_name_makes_no_call() {
        let controller = Arc::new(FakeController::default());
        let err = sync_workflow(controller.clone()).sync("  ").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(controller.calls().is_empty());
    }
}
