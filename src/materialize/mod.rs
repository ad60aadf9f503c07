// ABOUTME: Builds the file tree of a new device repository from a template or a fetched package.
// ABOUTME: Structural phase in `materialize`; the devfile is written later by `write_devfile`.

mod devfile;
mod template;
mod values;
mod workspace;

pub use devfile::DEVFILE;
pub use template::{CLUSTER_FQDN_TOKEN, DEVICE_ID_TOKEN, DEVICE_NAME_TOKEN};
pub use values::VALUES_FILE;
pub use workspace::Workspace;

use nonempty::NonEmpty;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::config::{CommitIdentity, TemplateFile};
use crate::package::{FetchError, PackageFetcher};
use crate::types::{CanonicalName, ChartRef, DeviceIdentity};
use crate::vcs::{VcsError, VersionControlClient};

/// Where the repository content comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaterializationSource {
    /// A git repository whose files carry `{{...}}` placeholders.
    StaticTemplate { repo_url: String },
    /// A Helm chart, by `oci://` reference or repository URL plus name.
    PackageSource {
        repo_url: String,
        package_name: Option<String>,
        package_version: Option<String>,
    },
}

#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error("missing {token} in {file}")]
    TemplateSchema { file: String, token: &'static str },

    #[error("template file {0} not found in template repository")]
    TemplateFileMissing(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("package pull of {0} completed but produced no package directory")]
    NoPackageDirectory(String),

    #[error("package '{name}' not found in archive; found [{}]", .found.join(", "))]
    PackageNameMismatch { name: String, found: Vec<String> },

    #[error("{0}")]
    Configuration(String),

    #[error("failed to clone template: {0}")]
    Clone(#[from] VcsError),

    #[error("{context}: {source}")]
    Io {
        context: String,
        source: io::Error,
    },
}

impl MaterializeError {
    fn io(context: impl Into<String>) -> impl FnOnce(io::Error) -> Self {
        let context = context.into();
        move |source| MaterializeError::Io { context, source }
    }

    pub fn is_template_schema(&self) -> bool {
        matches!(
            self,
            MaterializeError::TemplateSchema { .. } | MaterializeError::TemplateFileMissing(_)
        )
    }

    pub fn is_package_not_found(&self) -> bool {
        matches!(
            self,
            MaterializeError::Fetch(FetchError::ToolMissing | FetchError::Failed { .. })
                | MaterializeError::NoPackageDirectory(_)
                | MaterializeError::PackageNameMismatch { .. }
        )
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            MaterializeError::Fetch(e) => e.is_timeout(),
            MaterializeError::Clone(e) => e.is_timeout(),
            _ => false,
        }
    }
}

/// A materialized repository tree inside its own workspace.
///
/// Dropping the artifact removes the workspace and everything in it.
#[derive(Debug)]
pub struct RepositoryArtifact {
    root: PathBuf,
    files: Vec<PathBuf>,
    values: String,
    cloned: bool,
    workspace: Workspace,
}

impl RepositoryArtifact {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Files rendered or written, relative to `root`.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Content written to `values.yaml`.
    pub fn values(&self) -> &str {
        &self.values
    }

    /// Whether the tree carries the template's git history and remote.
    pub fn has_template_history(&self) -> bool {
        self.cloned
    }

    /// Remove the workspace now, reporting cleanup failure.
    pub fn close(self) -> io::Result<()> {
        self.workspace.close()
    }
}

/// Produces repository trees. Holds its capabilities; no per-request state.
pub struct TemplateMaterializer {
    vcs: Arc<dyn VersionControlClient>,
    fetcher: Arc<dyn PackageFetcher>,
    template_files: NonEmpty<TemplateFile>,
}

impl TemplateMaterializer {
    pub fn new(
        vcs: Arc<dyn VersionControlClient>,
        fetcher: Arc<dyn PackageFetcher>,
        template_files: NonEmpty<TemplateFile>,
    ) -> Self {
        Self {
            vcs,
            fetcher,
            template_files,
        }
    }

    /// Fail before any side effect if `source` cannot be materialized for `identity`.
    pub fn check(
        &self,
        source: &MaterializationSource,
        identity: &DeviceIdentity,
    ) -> Result<(), MaterializeError> {
        match source {
            MaterializationSource::StaticTemplate { repo_url } => {
                if repo_url.trim().is_empty() {
                    return Err(MaterializeError::Configuration(
                        "template repository URL is required".to_string(),
                    ));
                }
                if identity.cluster_fqdn().is_none()
                    && let Some(file) = self.template_files.iter().find(|f| f.route)
                {
                    return Err(MaterializeError::Configuration(format!(
                        "cluster FQDN is required by route template {}",
                        file.path
                    )));
                }
                Ok(())
            }
            MaterializationSource::PackageSource {
                repo_url,
                package_name,
                ..
            } => {
                ChartRef::parse(repo_url, package_name.as_deref())
                    .map_err(|e| MaterializeError::Configuration(e.to_string()))?;
                Ok(())
            }
        }
    }

    /// Structural phase: populate a fresh workspace and write `values.yaml`.
    pub async fn materialize(
        &self,
        source: &MaterializationSource,
        identity: &DeviceIdentity,
        extra_values: Option<&str>,
    ) -> Result<RepositoryArtifact, MaterializeError> {
        self.check(source, identity)?;

        let workspace = Workspace::create().map_err(MaterializeError::io("create workspace"))?;
        let root = workspace.repo_dir();

        let (mut files, cloned) = match source {
            MaterializationSource::StaticTemplate { repo_url } => {
                tracing::info!("Materializing {} from template", identity.device_name());
                self.vcs.clone_repository(repo_url.trim(), &root).await?;
                (self.render_template(&root, identity)?, true)
            }
            MaterializationSource::PackageSource {
                repo_url,
                package_name,
                package_version,
            } => {
                tracing::info!("Materializing {} from package", identity.device_name());
                let chart = ChartRef::parse(repo_url, package_name.as_deref())
                    .map_err(|e| MaterializeError::Configuration(e.to_string()))?;
                let files = self
                    .unpack_package(&workspace, &root, &chart, package_version.as_deref())
                    .await?;
                (files, false)
            }
        };

        let values = values::render(identity, extra_values).map_err(|e| MaterializeError::Io {
            context: "render values".to_string(),
            source: io::Error::other(e),
        })?;
        std::fs::write(root.join(VALUES_FILE), &values)
            .map_err(MaterializeError::io(format!("write {VALUES_FILE}")))?;
        files.push(PathBuf::from(VALUES_FILE));

        Ok(RepositoryArtifact {
            root,
            files,
            values,
            cloned,
            workspace,
        })
    }

    /// Second phase: write `devfile.yaml` referencing the published clone URL.
    pub fn write_devfile(
        &self,
        artifact: &mut RepositoryArtifact,
        name: &CanonicalName,
        clone_url: &str,
        commit: &CommitIdentity,
    ) -> Result<(), MaterializeError> {
        let content = devfile::render(name, clone_url, commit).map_err(|e| MaterializeError::Io {
            context: "render devfile".to_string(),
            source: io::Error::other(e),
        })?;
        std::fs::write(artifact.root.join(DEVFILE), content)
            .map_err(MaterializeError::io(format!("write {DEVFILE}")))?;
        artifact.files.push(PathBuf::from(DEVFILE));
        Ok(())
    }

    /// Verify every required file, then substitute and write them all.
    fn render_template(
        &self,
        root: &Path,
        identity: &DeviceIdentity,
    ) -> Result<Vec<PathBuf>, MaterializeError> {
        let mut verified = Vec::with_capacity(self.template_files.len());
        for file in self.template_files.iter() {
            let path = root.join(&file.path);
            let content = match std::fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    return Err(MaterializeError::TemplateFileMissing(file.path.clone()));
                }
                Err(e) => return Err(MaterializeError::io(format!("read {}", file.path))(e)),
            };
            if let Some(token) = template::missing_placeholder(file, &content) {
                return Err(MaterializeError::TemplateSchema {
                    file: file.path.clone(),
                    token,
                });
            }
            verified.push((file, path, content));
        }

        let mut written = Vec::with_capacity(verified.len());
        for (file, path, content) in verified {
            std::fs::write(&path, template::substitute(&content, identity))
                .map_err(MaterializeError::io(format!("write {}", file.path)))?;
            tracing::debug!("Rendered {}", file.path);
            written.push(PathBuf::from(&file.path));
        }
        Ok(written)
    }

    async fn unpack_package(
        &self,
        workspace: &Workspace,
        root: &Path,
        chart: &ChartRef,
        version: Option<&str>,
    ) -> Result<Vec<PathBuf>, MaterializeError> {
        let unpack = workspace.unpack_dir();
        std::fs::create_dir_all(&unpack).map_err(MaterializeError::io("create unpack dir"))?;
        std::fs::create_dir_all(root).map_err(MaterializeError::io("create repository dir"))?;

        self.fetcher.pull(chart, version, &unpack).await?;

        let found = sorted_subdirs(&unpack).map_err(MaterializeError::io("list unpacked package"))?;
        let package_root = select_package_dir(&found, chart)?;

        let mut files = Vec::new();
        let source_dir = unpack.join(package_root);
        let mut entries = std::fs::read_dir(&source_dir)
            .map_err(MaterializeError::io("read package"))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(MaterializeError::io("read package"))?;
        entries.sort_by_key(|e| e.file_name());
        for entry in entries {
            let name = entry.file_name();
            std::fs::rename(entry.path(), root.join(&name))
                .map_err(MaterializeError::io("move package contents"))?;
            files.push(PathBuf::from(name));
        }

        if let Err(e) = std::fs::remove_dir_all(&unpack) {
            tracing::warn!("Failed to remove package scratch space: {}", e);
        }
        Ok(files)
    }
}

fn sorted_subdirs(dir: &Path) -> io::Result<Vec<String>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Pick the unpacked directory matching the requested package name, or the
/// first one when no name was given.
fn select_package_dir<'a>(
    found: &'a [String],
    chart: &ChartRef,
) -> Result<&'a str, MaterializeError> {
    let Some(first) = found.first() else {
        return Err(MaterializeError::NoPackageDirectory(chart.to_string()));
    };

    let Some(requested) = chart.name() else {
        return Ok(first.as_str());
    };
    let wanted = requested.rsplit('/').next().unwrap_or(requested);

    found
        .iter()
        .find(|d| d.as_str() == wanted)
        .map(String::as_str)
        .ok_or_else(|| MaterializeError::PackageNameMismatch {
            name: wanted.to_string(),
            found: found.to_vec(),
        })
}
