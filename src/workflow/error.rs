// ABOUTME: Stage-boundary error for the workflows, built with SNAFU context selectors.
// ABOUTME: Every failure maps to a workflow stage and an ErrorKind for programmatic handling.

use serde::Serialize;
use snafu::Snafu;
use std::fmt;

use crate::config::MissingCredential;
use crate::controller::ControllerError;
use crate::descriptor::DescriptorError;
use crate::http::TransportError;
use crate::materialize::MaterializeError;
use crate::publish::PublishError;
use crate::route::RouteUnavailable;
use crate::types::{CanonicalNameError, DeviceIdentityError};

/// The workflow step a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Validate,
    Materialize,
    CreateRemote,
    Devfile,
    Push,
    Describe,
    ControllerUpsert,
    Sync,
    List,
    Route,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Validate => "validate",
            Stage::Materialize => "materialize",
            Stage::CreateRemote => "create-remote",
            Stage::Devfile => "devfile",
            Stage::Push => "push",
            Stage::Describe => "describe",
            Stage::ControllerUpsert => "controller-upsert",
            Stage::Sync => "sync",
            Stage::List => "list",
            Stage::Route => "route",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Missing or invalid input, credentials, or settings. No side effects happened.
    Configuration,
    /// A template file lacks a required placeholder or is missing.
    TemplateSchema,
    /// The package could not be fetched or the requested name was not in it.
    PackageNotFound,
    /// The source host refused to create the repository.
    RemoteCreation,
    /// A git step of the push failed.
    Push,
    /// The controller rejected the application or a controller call failed.
    ControllerUpsert,
    /// No cluster client could be constructed.
    RouteUnavailable,
    /// The descriptor destination is incomplete.
    InvalidDestination,
    /// An external call exceeded its deadline.
    Timeout,
    /// Local filesystem failure, or a template clone that failed outright.
    Io,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StageError {
    #[snafu(display("invalid device identity: {source}"))]
    Identity { source: DeviceIdentityError },

    #[snafu(display("invalid device name: {source}"))]
    Naming { source: CanonicalNameError },

    #[snafu(display("{source}"))]
    Credential { source: MissingCredential },

    #[snafu(display("{message}"))]
    InvalidRequest { message: String },

    #[snafu(display("failed to build {client} client: {source}"))]
    Client {
        client: &'static str,
        source: TransportError,
    },

    #[snafu(display("materialization failed: {source}"))]
    Materialize { source: MaterializeError },

    #[snafu(display("{source}"))]
    CreateRemote { source: PublishError },

    #[snafu(display("failed to write devfile: {source}"))]
    Devfile { source: MaterializeError },

    #[snafu(display("{source}"))]
    Push { source: PublishError },

    #[snafu(display("{source}"))]
    Describe { source: DescriptorError },

    #[snafu(display("{stage} failed: {source}"))]
    Controller {
        stage: Stage,
        source: ControllerError,
    },

    #[snafu(display("{stage} failed: controller returned HTTP {status}: {body}"))]
    ControllerStatus {
        stage: Stage,
        status: u16,
        body: String,
    },

    #[snafu(display("{source}"))]
    Route { source: RouteUnavailable },
}

impl StageError {
    pub fn stage(&self) -> Stage {
        match self {
            StageError::Identity { .. }
            | StageError::Naming { .. }
            | StageError::Credential { .. }
            | StageError::InvalidRequest { .. }
            | StageError::Client { .. } => Stage::Validate,
            StageError::Materialize { source } if is_configuration(source) => Stage::Validate,
            StageError::Materialize { .. } => Stage::Materialize,
            StageError::CreateRemote { .. } => Stage::CreateRemote,
            StageError::Devfile { .. } => Stage::Devfile,
            StageError::Push { .. } => Stage::Push,
            StageError::Describe { .. } => Stage::Describe,
            StageError::Controller { stage, .. } | StageError::ControllerStatus { stage, .. } => {
                *stage
            }
            StageError::Route { .. } => Stage::Route,
        }
    }

    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StageError::Identity { .. }
            | StageError::Naming { .. }
            | StageError::Credential { .. }
            | StageError::InvalidRequest { .. }
            | StageError::Client { .. } => ErrorKind::Configuration,
            StageError::Materialize { source } => materialize_kind(source),
            StageError::Devfile { .. } => ErrorKind::Io,
            StageError::CreateRemote { source } | StageError::Push { source } => {
                match source {
                    _ if source.is_timeout() => ErrorKind::Timeout,
                    PublishError::Name(_) => ErrorKind::Configuration,
                    PublishError::RemoteCreation(_) => ErrorKind::RemoteCreation,
                    PublishError::InvalidCloneUrl { .. } | PublishError::Push(_) => {
                        ErrorKind::Push
                    }
                }
            }
            StageError::Describe { source } => match source {
                DescriptorError::InvalidDestination(_) => ErrorKind::InvalidDestination,
                DescriptorError::EmptyRepoUrl | DescriptorError::Name(_) => {
                    ErrorKind::Configuration
                }
                DescriptorError::Serialize(_) | DescriptorError::Encode(_) => ErrorKind::Io,
            },
            StageError::Controller { source, .. } if source.is_timeout() => ErrorKind::Timeout,
            StageError::Controller { .. } | StageError::ControllerStatus { .. } => {
                ErrorKind::ControllerUpsert
            }
            StageError::Route { .. } => ErrorKind::RouteUnavailable,
        }
    }

    /// Structured form carried in workflow outcomes.
    pub fn to_failure(&self) -> StageFailure {
        StageFailure {
            stage: self.stage(),
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

fn is_configuration(error: &MaterializeError) -> bool {
    matches!(error, MaterializeError::Configuration(_))
}

fn materialize_kind(error: &MaterializeError) -> ErrorKind {
    if error.is_timeout() {
        ErrorKind::Timeout
    } else if error.is_template_schema() {
        ErrorKind::TemplateSchema
    } else if error.is_package_not_found() {
        ErrorKind::PackageNotFound
    } else {
        match error {
            MaterializeError::Configuration(_) => ErrorKind::Configuration,
            _ => ErrorKind::Io,
        }
    }
}

/// A stage failure as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageFailure {
    pub stage: Stage,
    pub kind: ErrorKind,
    pub message: String,
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.message)
    }
}
