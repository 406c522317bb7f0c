use std::io;
use std::path::Path;

use tempfile::TempDir;

const WORKSPACE_PREFIX: &str = "diarscribe-run-";

/// Temporary working area owned by exactly one run.
///
/// Everything inside is removed when the workspace is closed or dropped,
/// including during unwinding.
pub struct RunWorkspace {
    dir: TempDir,
}

impl RunWorkspace {
    /// Create a fresh directory under `root`, or the system temp dir.
    pub fn create(root: Option<&Path>) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);
        let dir = match root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        log::debug!("Created run workspace {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Remove the workspace now, logging instead of failing if removal fails.
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => log::debug!("Removed run workspace {}", path.display()),
            Err(e) => log::warn!("Failed to remove run workspace {}: {e}", path.display()),
        }
    }
}
