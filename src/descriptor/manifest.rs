// ABOUTME: Wire shape of the Argo CD Application resource.
// ABOUTME: Field names match the argoproj.io/v1alpha1 API exactly.

use serde::Serialize;

use super::ApplicationDescriptor;

pub const API_VERSION: &str = "argoproj.io/v1alpha1";
pub const KIND: &str = "Application";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationManifest<'a> {
    api_version: &'static str,
    kind: &'static str,
    metadata: Metadata<'a>,
    spec: Spec<'a>,
}

#[derive(Debug, Serialize)]
struct Metadata<'a> {
    name: &'a str,
    namespace: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Spec<'a> {
    project: &'a str,
    source: Source<'a>,
    destination: Destination<'a>,
    sync_policy: SyncPolicy,
}

#[derive(Debug, Serialize)]
struct Source<'a> {
    #[serde(rename = "repoURL")]
    repo_url: &'a str,
    #[serde(rename = "targetRevision")]
    target_revision: &'a str,
    path: &'a str,
}

#[derive(Debug, Serialize)]
struct Destination<'a> {
    server: &'a str,
    namespace: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SyncPolicy {
    #[serde(skip_serializing_if = "Option::is_none")]
    automated: Option<Automated>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sync_options: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Automated {
    prune: bool,
    self_heal: bool,
}

impl<'a> ApplicationManifest<'a> {
    pub fn from_descriptor(descriptor: &'a ApplicationDescriptor) -> Self {
        let policy = descriptor.sync_policy;
        let mut sync_options = Vec::new();
        if policy.create_namespace {
            sync_options.push("CreateNamespace=true");
        }

        Self {
            api_version: API_VERSION,
            kind: KIND,
            metadata: Metadata {
                name: descriptor.name.as_str(),
                namespace: &descriptor.namespace,
            },
            spec: Spec {
                project: &descriptor.project,
                source: Source {
                    repo_url: &descriptor.source.repo_url,
                    target_revision: &descriptor.source.revision,
                    path: &descriptor.source.path,
                },
                destination: Destination {
                    server: &descriptor.destination.server,
                    namespace: &descriptor.destination.namespace,
                },
                sync_policy: SyncPolicy {
                    automated: policy.automated.then_some(Automated {
                        prune: policy.prune,
                        self_heal: policy.self_heal,
                    }),
                    sync_options,
                },
            },
        }
    }
}
