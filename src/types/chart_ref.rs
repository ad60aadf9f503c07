// ABOUTME: Helm chart reference parsing and validation.
// ABOUTME: Handles direct oci:// references and classic repository-plus-name references.

use std::fmt;
use thiserror::Error;

const OCI_SCHEME: &str = "oci://";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseChartRefError {
    #[error("chart repository URL cannot be empty")]
    Empty,

    #[error("chart name is required for non-OCI repository {0}")]
    MissingName(String),

    #[error("invalid character in chart reference: {0:?}")]
    InvalidChar(char),
}

/// Where a chart is pulled from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartRef {
    /// `oci://registry/path[/name]`, pulled directly.
    Oci { reference: String, name: Option<String> },
    /// Chart `name` served from the index at `repo_url`.
    Repository { repo_url: String, name: String },
}

impl ChartRef {
    pub fn parse(repo_url: &str, name: Option<&str>) -> Result<Self, ParseChartRefError> {
        let repo_url = repo_url.trim();
        if repo_url.is_empty() {
            return Err(ParseChartRefError::Empty);
        }

        if let Some(c) = repo_url.chars().find(|c| c.is_whitespace()) {
            return Err(ParseChartRefError::InvalidChar(c));
        }

        let name = name
            .map(|n| n.trim().trim_start_matches('/'))
            .filter(|n| !n.is_empty());

        if repo_url.starts_with(OCI_SCHEME) {
            let base = repo_url.trim_end_matches('/');
            let reference = match name {
                Some(n) => format!("{base}/{n}"),
                None => base.to_string(),
            };
            return Ok(ChartRef::Oci {
                reference,
                name: name.map(str::to_string),
            });
        }

        let name = name.ok_or_else(|| ParseChartRefError::MissingName(repo_url.to_string()))?;
        Ok(ChartRef::Repository {
            repo_url: repo_url.to_string(),
            name: name.to_string(),
        })
    }

    /// The chart name the caller asked for, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            ChartRef::Oci { name, .. } => name.as_deref(),
            ChartRef::Repository { name, .. } => Some(name),
        }
    }

    pub fn is_oci(&self) -> bool {
        matches!(self, ChartRef::Oci { .. })
    }
}

impl fmt::Display for ChartRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartRef::Oci { reference, .. } => write!(f, "{reference}"),
            ChartRef::Repository { repo_url, name } => write!(f, "{name} from {repo_url}"),
        }
    }
}
