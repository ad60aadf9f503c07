// ABOUTME: Entry point for the devforge CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use devforge::config::{self, CONFIG_FILENAME, Config};
use devforge::error::Result;
use devforge::output::{Output, OutputMode};
use devforge::workflow::Workflow;
use std::env;
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };

    if let Err(e) = run(cli, mode).await {
        Output::new(mode).error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, mode: OutputMode) -> Result<()> {
    let output = Output::new(mode);
    match cli.command {
        Commands::Init {
            template_repo,
            force,
        } => {
            let cwd = env::current_dir()?;
            config::init_config(&cwd, template_repo.as_deref(), force)?;
            output.success(&format!("Created {CONFIG_FILENAME}"));
            Ok(())
        }
        Commands::Provision(args) => {
            let workflow = load_workflow(cli.config.as_deref())?;
            commands::provision(workflow, args, output).await
        }
        Commands::Deploy(args) => {
            let workflow = load_workflow(cli.config.as_deref())?;
            commands::deploy(workflow, args, output).await
        }
        Commands::Apps => {
            let workflow = load_workflow(cli.config.as_deref())?;
            commands::apps(workflow, output).await
        }
        Commands::Sync { app_name } => {
            let workflow = load_workflow(cli.config.as_deref())?;
            commands::sync(workflow, &app_name, output).await
        }
    }
}

/// Load configuration once and build the workflow from it.
fn load_workflow(path: Option<&Path>) -> Result<Workflow> {
    let config = match path {
        Some(path) => Config::load(path)?,
        None => Config::discover(&env::current_dir()?)?,
    };
    Ok(Workflow::new(config.resolve()?))
}
