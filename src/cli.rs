// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "devforge")]
#[command(about = "Provision per-device GitOps repositories and Argo CD applications")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print only the final result
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print the outcome as a JSON document
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (default: discovered in the current directory)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new devforge.yml configuration file
    Init {
        /// Template repository written into the generated file
        #[arg(long, value_name = "URL")]
        template_repo: Option<String>,

        /// Overwrite an existing configuration file
        #[arg(short, long)]
        force: bool,
    },

    /// Generate and publish a device repository
    Provision(ProvisionArgs),

    /// Render the device's Argo CD application and optionally upsert it
    Deploy(DeployArgs),

    /// List applications with their route hosts
    Apps,

    /// Trigger a sync of an application
    Sync {
        /// Application name
        app_name: String,
    },
}

#[derive(Args)]
pub struct ProvisionArgs {
    #[arg(long)]
    pub device_id: String,

    #[arg(long)]
    pub device_name: String,

    /// Cluster apps domain used for the route host
    #[arg(long)]
    pub cluster_fqdn: Option<String>,

    /// Static template repository (defaults to template.repo_url)
    #[arg(long, value_name = "URL", conflicts_with = "chart_repo")]
    pub template_repo: Option<String>,

    /// Helm chart repository URL or oci:// reference
    #[arg(long, value_name = "URL")]
    pub chart_repo: Option<String>,

    /// Chart name, required for non-OCI repositories
    #[arg(long, requires = "chart_repo")]
    pub chart_name: Option<String>,

    #[arg(long, requires = "chart_repo")]
    pub chart_version: Option<String>,

    /// File whose content becomes values.yaml
    #[arg(long, value_name = "FILE")]
    pub values: Option<PathBuf>,

    /// Delete the remote repository if a later step fails
    #[arg(long)]
    pub cleanup_on_failure: bool,
}

#[derive(Args)]
pub struct DeployArgs {
    #[arg(long, value_name = "URL")]
    pub repo_url: String,

    #[arg(long)]
    pub device_id: String,

    #[arg(long)]
    pub device_name: String,

    #[arg(long, value_name = "URL")]
    pub destination_server: String,

    #[arg(long)]
    pub destination_namespace: String,

    /// Create or update the application through the Argo CD API
    #[arg(long)]
    pub api: bool,

    #[arg(long, value_name = "URL")]
    pub argocd_url: Option<String>,

    /// Overrides controller.token for this request
    #[arg(long)]
    pub argocd_token: Option<String>,

    /// Disable TLS verification (true/1/yes/on)
    #[arg(long, value_name = "VALUE")]
    pub disable_tls: Option<String>,
}
