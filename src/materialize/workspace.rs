// ABOUTME: Request-scoped temporary workspace holding the repository tree and scratch space.
// ABOUTME: Removed recursively when dropped; `close` reports cleanup failures.

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const PREFIX: &str = "device-";
const REPO_DIR: &str = "repo";
const UNPACK_DIR: &str = "unpack";

/// A uniquely named temporary directory owned by one workflow run.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn create() -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix(PREFIX).tempdir()?;
        tracing::debug!("Created workspace {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where the repository tree lives.
    pub fn repo_dir(&self) -> PathBuf {
        self.dir.path().join(REPO_DIR)
    }

    /// Scratch directory for unpacking fetched packages.
    pub fn unpack_dir(&self) -> PathBuf {
        self.dir.path().join(UNPACK_DIR)
    }

    /// Remove the workspace now, surfacing any error instead of ignoring it.
    pub fn close(self) -> io::Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        tracing::debug!("Removed workspace {}", path.display());
        Ok(())
    }
}
