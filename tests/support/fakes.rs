// ABOUTME: In-process fakes for git, helm, the source host, the controller and the cluster.
// ABOUTME: Each fake records its calls so tests can assert on ordering and counts.

use async_trait::async_trait;
use devforge::cluster::{ClusterClient, ClusterError, Route};
use devforge::controller::{
    ApplicationSummary, ControllerError, ControllerResponse, DeploymentController,
};
use devforge::package::{FetchError, PackageFetcher};
use devforge::process::ProcessError;
use devforge::source_host::{CreatedRepository, NewRepository, SourceHostClient, SourceHostError};
use devforge::types::ChartRef;
use devforge::vcs::{RemoteCredentials, VcsError, VcsStep, VersionControlClient};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use url::Url;

fn failure(step: VcsStep) -> VcsError {
    VcsError::Command {
        step,
        source: ProcessError::Failed {
            command: format!("git {step}"),
            exit_code: Some(128),
            stderr: "fatal: simulated failure".to_string(),
        },
    }
}

/// Git stand-in. `clone_repository` writes the configured template files.
#[derive(Default)]
pub struct FakeVcs {
    template: Vec<(String, String)>,
    fail_at: Option<VcsStep>,
    calls: Mutex<Vec<String>>,
    remotes: Mutex<Vec<(String, Option<String>)>>,
}

impl FakeVcs {
    pub fn with_template(files: &[(&str, &str)]) -> Self {
        Self {
            template: files
                .iter()
                .map(|(p, c)| (p.to_string(), c.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    pub fn failing_at(mut self, step: VcsStep) -> Self {
        self.fail_at = Some(step);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// `(url, username)` for every remote added.
    pub fn remotes(&self) -> Vec<(String, Option<String>)> {
        self.remotes.lock().unwrap().clone()
    }

    fn record(&self, step: VcsStep, call: String) -> Result<(), VcsError> {
        self.calls.lock().unwrap().push(call);
        if self.fail_at == Some(step) {
            return Err(failure(step));
        }
        Ok(())
    }
}

#[async_trait]
impl VersionControlClient for FakeVcs {
    async fn clone_repository(&self, url: &str, dest: &Path) -> Result<(), VcsError> {
        self.record(VcsStep::Clone, format!("clone {url}"))?;
        std::fs::create_dir_all(dest.join(".git")).unwrap();
        for (path, content) in &self.template {
            let target = dest.join(path);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(target, content).unwrap();
        }
        Ok(())
    }

    async fn init(&self, _dir: &Path) -> Result<(), VcsError> {
        self.record(VcsStep::Init, "init".to_string())
    }

    async fn config_identity(&self, _dir: &Path, name: &str, email: &str) -> Result<(), VcsError> {
        self.record(VcsStep::ConfigIdentity, format!("config {name} <{email}>"))
    }

    async fn add_remote(
        &self,
        _dir: &Path,
        name: &str,
        url: &Url,
        credentials: Option<&RemoteCredentials>,
    ) -> Result<(), VcsError> {
        self.remotes.lock().unwrap().push((
            url.to_string(),
            credentials.map(|c| c.username().to_string()),
        ));
        self.record(VcsStep::AddRemote, format!("remote add {name} {url}"))
    }

    async fn remove_remote(&self, _dir: &Path, name: &str) -> Result<(), VcsError> {
        self.record(VcsStep::RemoveRemote, format!("remote remove {name}"))
    }

    async fn add_all(&self, _dir: &Path) -> Result<(), VcsError> {
        self.record(VcsStep::AddAll, "add -A".to_string())
    }

    async fn commit(&self, _dir: &Path, message: &str, allow_empty: bool) -> Result<(), VcsError> {
        let flag = if allow_empty { " --allow-empty" } else { "" };
        self.record(VcsStep::Commit, format!("commit{flag} {message}"))
    }

    async fn rename_branch(&self, _dir: &Path, name: &str) -> Result<(), VcsError> {
        self.record(VcsStep::RenameBranch, format!("branch -M {name}"))
    }

    async fn push(&self, dir: &Path, remote: &str, refspec: &str) -> Result<(), VcsError> {
        // Snapshot what would have been committed.
        let mut files: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n != ".git")
            .collect();
        files.sort();
        self.record(
            VcsStep::Push,
            format!("push -u {remote} {refspec} [{}]", files.join(",")),
        )
    }
}

/// Helm stand-in. `pull` creates the configured directories under `dest`.
#[derive(Default)]
pub struct FakeFetcher {
    packages: Vec<(String, Vec<(String, String)>)>,
    missing_tool: bool,
    pulls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn with_package(mut self, dir: &str, files: &[(&str, &str)]) -> Self {
        self.packages.push((
            dir.to_string(),
            files
                .iter()
                .map(|(p, c)| (p.to_string(), c.to_string()))
                .collect(),
        ));
        self
    }

    pub fn without_tool() -> Self {
        Self {
            missing_tool: true,
            ..Default::default()
        }
    }

    pub fn pulls(&self) -> Vec<String> {
        self.pulls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PackageFetcher for FakeFetcher {
    async fn pull(
        &self,
        reference: &ChartRef,
        version: Option<&str>,
        dest: &Path,
    ) -> Result<(), FetchError> {
        self.pulls
            .lock()
            .unwrap()
            .push(format!("{reference}@{}", version.unwrap_or("latest")));
        if self.missing_tool {
            return Err(FetchError::ToolMissing);
        }
        for (dir, files) in &self.packages {
            let root = dest.join(dir);
            std::fs::create_dir_all(&root).unwrap();
            for (path, content) in files {
                let target = root.join(path);
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent).unwrap();
                }
                std::fs::write(target, content).unwrap();
            }
        }
        Ok(())
    }
}

/// Source host stand-in that hands out `https://github.com/acme/{name}.git`.
#[derive(Default)]
pub struct FakeSourceHost {
    reject_with: Option<u16>,
    created: Mutex<Vec<NewRepository>>,
    deleted: Mutex<Vec<(String, String)>>,
}

impl FakeSourceHost {
    pub fn rejecting(status: u16) -> Self {
        Self {
            reject_with: Some(status),
            ..Default::default()
        }
    }

    pub fn created(&self) -> Vec<NewRepository> {
        self.created.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<(String, String)> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceHostClient for FakeSourceHost {
    async fn create_repository(
        &self,
        repository: &NewRepository,
    ) -> Result<CreatedRepository, SourceHostError> {
        if let Some(status) = self.reject_with {
            return Err(SourceHostError::Status {
                status,
                body: r#"{"message":"name already exists on this account"}"#.to_string(),
            });
        }
        self.created.lock().unwrap().push(repository.clone());
        Ok(CreatedRepository {
            clone_url: format!("https://github.com/acme/{}.git", repository.name),
            owner: Some("acme".to_string()),
        })
    }

    async fn delete_repository(&self, owner: &str, name: &str) -> Result<(), SourceHostError> {
        self.deleted
            .lock()
            .unwrap()
            .push((owner.to_string(), name.to_string()));
        Ok(())
    }
}

/// Controller stand-in keyed by application name: create on an existing name returns 409.
pub struct FakeController {
    existing: Mutex<HashSet<String>>,
    create_status: Option<u16>,
    sync_status: u16,
    apps: Vec<ApplicationSummary>,
    calls: Mutex<Vec<String>>,
}

impl Default for FakeController {
    fn default() -> Self {
        Self {
            existing: Mutex::new(HashSet::new()),
            create_status: None,
            sync_status: 200,
            apps: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeController {
    pub fn with_apps(apps: Vec<ApplicationSummary>) -> Self {
        Self {
            apps,
            ..Default::default()
        }
    }

    pub fn failing_create(status: u16) -> Self {
        Self {
            create_status: Some(status),
            ..Default::default()
        }
    }

    pub fn with_sync_status(mut self, status: u16) -> Self {
        self.sync_status = status;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeploymentController for FakeController {
    async fn create_application(
        &self,
        application: &serde_json::Value,
    ) -> Result<ControllerResponse, ControllerError> {
        let name = application["metadata"]["name"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        self.calls.lock().unwrap().push(format!("POST {name}"));
        if let Some(status) = self.create_status {
            return Ok(ControllerResponse::new(status, "rejected"));
        }
        if !self.existing.lock().unwrap().insert(name) {
            return Ok(ControllerResponse::new(409, "already exists"));
        }
        Ok(ControllerResponse::new(200, "{}"))
    }

    async fn update_application(
        &self,
        name: &str,
        _application: &serde_json::Value,
    ) -> Result<ControllerResponse, ControllerError> {
        self.calls.lock().unwrap().push(format!("PUT {name}"));
        Ok(ControllerResponse::new(200, "{}"))
    }

    async fn sync_application(&self, name: &str) -> Result<ControllerResponse, ControllerError> {
        self.calls.lock().unwrap().push(format!("SYNC {name}"));
        Ok(ControllerResponse::new(self.sync_status, "sync"))
    }

    async fn list_applications(&self) -> Result<Vec<ApplicationSummary>, ControllerError> {
        self.calls.lock().unwrap().push("LIST".to_string());
        Ok(self.apps.clone())
    }
}

/// Cluster stand-in with per-namespace routes.
#[derive(Default)]
pub struct FakeCluster {
    labelled: HashMap<(String, String), Vec<Route>>,
    named: HashMap<(String, String), Route>,
    label_fails: bool,
    name_fails: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeCluster {
    /// A route carrying `argocd.argoproj.io/instance={app}`.
    pub fn with_labelled(mut self, namespace: &str, app: &str, host: Option<&str>) -> Self {
        self.labelled
            .entry((namespace.to_string(), app.to_string()))
            .or_default()
            .push(Route {
                name: format!("{app}-route"),
                host: host.map(str::to_string),
            });
        self
    }

    pub fn with_named(mut self, namespace: &str, name: &str, host: &str) -> Self {
        self.named.insert(
            (namespace.to_string(), name.to_string()),
            Route {
                name: name.to_string(),
                host: Some(host.to_string()),
            },
        );
        self
    }

    pub fn failing_label_lookup(mut self) -> Self {
        self.label_fails = true;
        self
    }

    pub fn failing_name_lookup(mut self) -> Self {
        self.name_fails = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn list_routes(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<Route>, ClusterError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("list {namespace} {label_selector}"));
        if self.label_fails {
            return Err(ClusterError::Status {
                status: 403,
                body: "forbidden".to_string(),
            });
        }
        let app = label_selector.rsplit('=').next().unwrap_or_default();
        Ok(self
            .labelled
            .get(&(namespace.to_string(), app.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_route(&self, namespace: &str, name: &str) -> Result<Option<Route>, ClusterError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("get {namespace} {name}"));
        if self.name_fails {
            return Err(ClusterError::Status {
                status: 500,
                body: "boom".to_string(),
            });
        }
        Ok(self
            .named
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }
}
