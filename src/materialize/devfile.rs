// ABOUTME: Development-environment descriptor (devfile.yaml) for a device repository.
// ABOUTME: References only the credential-free clone URL.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::CommitIdentity;
use crate::types::CanonicalName;

pub const DEVFILE: &str = "devfile.yaml";

const SCHEMA_VERSION: &str = "2.2.0";
const EDITOR_ATTRIBUTE: &str = "controller.devfile.io/editor";
const EDITOR: &str = "che-code";
const COMPONENT: &str = "dev-tools";
const IMAGE: &str = "quay.io/devspaces/udi-rhel8:latest";
const MEMORY_LIMIT: &str = "2Gi";
const GIT_CONFIG_COMMAND: &str = "git-config";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Devfile<'a> {
    schema_version: &'static str,
    metadata: Metadata<'a>,
    attributes: BTreeMap<&'static str, &'static str>,
    components: Vec<Component>,
    commands: Vec<Command>,
    events: Events,
    projects: Vec<Project<'a>>,
}

#[derive(Serialize)]
struct Metadata<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct Component {
    name: &'static str,
    container: Container,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Container {
    image: &'static str,
    memory_limit: &'static str,
    mount_sources: bool,
}

#[derive(Serialize)]
struct Command {
    id: &'static str,
    exec: Exec,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Exec {
    component: &'static str,
    working_dir: &'static str,
    command_line: String,
    label: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Events {
    post_start: Vec<&'static str>,
}

#[derive(Serialize)]
struct Project<'a> {
    name: &'a str,
    git: Git<'a>,
}

#[derive(Serialize)]
struct Git<'a> {
    remotes: BTreeMap<&'static str, &'a str>,
}

/// Render the devfile for `name`, whose project clones from `clone_url`.
pub fn render(
    name: &CanonicalName,
    clone_url: &str,
    identity: &CommitIdentity,
) -> Result<String, serde_yaml::Error> {
    let command_line = format!(
        "git config --global user.name {} && git config --global user.email {}",
        shell_quote(&identity.name),
        shell_quote(&identity.email)
    );

    let devfile = Devfile {
        schema_version: SCHEMA_VERSION,
        metadata: Metadata {
            name: name.as_str(),
        },
        attributes: BTreeMap::from([(EDITOR_ATTRIBUTE, EDITOR)]),
        components: vec![Component {
            name: COMPONENT,
            container: Container {
                image: IMAGE,
                memory_limit: MEMORY_LIMIT,
                mount_sources: true,
            },
        }],
        commands: vec![Command {
            id: GIT_CONFIG_COMMAND,
            exec: Exec {
                component: COMPONENT,
                working_dir: "/projects",
                command_line,
                label: "Configure Git",
            },
        }],
        events: Events {
            post_start: vec![GIT_CONFIG_COMMAND],
        },
        projects: vec![Project {
            name: name.as_str(),
            git: Git {
                remotes: BTreeMap::from([("origin", clone_url)]),
            },
        }],
    };

    serde_yaml::to_string(&devfile)
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
