// ABOUTME: Library root for devforge - exposes the workflows and their building blocks.
// ABOUTME: The main binary is in main.rs.

pub mod cluster;
pub mod config;
pub mod controller;
pub mod descriptor;
pub mod diagnostics;
pub mod error;
pub mod http;
pub mod materialize;
pub mod output;
pub mod package;
pub mod process;
pub mod publish;
pub mod reconcile;
pub mod route;
pub mod source_host;
pub mod types;
pub mod vcs;
pub mod workflow;
