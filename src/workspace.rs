//! Scratch workspace management.
//!
//! One `ScratchRoot` per pipeline run: created before the first release is
//! processed, removed unconditionally after the last, with one
//! non-overlapping subdirectory per release in between.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use crate::tags::ReleaseTag;

/// The scratch directory tree owned by one pipeline run.
#[derive(Debug, Clone)]
pub struct ScratchRoot {
    root: PathBuf,
}

impl ScratchRoot {
    /// Wraps the configured scratch path. Nothing is created until `init`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The scratch root path.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Creates the scratch root (and missing parents).
    pub async fn init(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.root).await?;
        debug!(path = %self.root.display(), "Scratch root ready");
        Ok(())
    }

    /// The workspace subdirectory exclusively owned by one release.
    pub fn workspace_for(&self, tag: &ReleaseTag) -> PathBuf {
        self.root.join(tag.as_str())
    }

    /// Removes the scratch root and everything under it.
    ///
    /// Runs on every exit path of the orchestrator. An already-missing root
    /// is not an error; any other failure is logged and swallowed so teardown
    /// can never mask the run's own result.
    pub async fn teardown(&self) {
        match fs::remove_dir_all(&self.root).await {
            Ok(()) => debug!(path = %self.root.display(), "Scratch root removed"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!(path = %self.root.display(), error = %err, "Failed to remove scratch root")
            }
        }
    }
}
