// ABOUTME: Non-fatal warnings collected while a workflow runs.
// ABOUTME: Each warning is logged when recorded and returned with the outcome.

use serde::Serialize;
use std::fmt;

/// What went wrong without failing the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningKind {
    /// The sync request after a successful upsert failed.
    SyncFailed,
    /// A route strategy failed, or no cluster client could be built.
    RouteLookup,
    /// The temporary workspace could not be removed.
    WorkspaceCleanup,
    /// API mode was requested but no controller credentials were available.
    YamlOnlyFallback,
    /// A side effect of a failed run remains, or undoing it failed.
    Compensation,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WarningKind::SyncFailed => "sync-failed",
            WarningKind::RouteLookup => "route-lookup",
            WarningKind::WorkspaceCleanup => "workspace-cleanup",
            WarningKind::YamlOnlyFallback => "yaml-only-fallback",
            WarningKind::Compensation => "compensation",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn sync_failed(message: impl Into<String>) -> Self {
        Self::new(WarningKind::SyncFailed, message)
    }

    pub fn route_lookup(message: impl Into<String>) -> Self {
        Self::new(WarningKind::RouteLookup, message)
    }

    pub fn workspace_cleanup(message: impl Into<String>) -> Self {
        Self::new(WarningKind::WorkspaceCleanup, message)
    }

    pub fn yaml_only_fallback(message: impl Into<String>) -> Self {
        Self::new(WarningKind::YamlOnlyFallback, message)
    }

    pub fn compensation(message: impl Into<String>) -> Self {
        Self::new(WarningKind::Compensation, message)
    }
}

/// Accumulates warnings for one workflow run.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record `warning` and log it at WARN.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!(kind = %warning.kind, "{}", warning.message);
        self.warnings.push(warning);
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}
