//! Version-conditioned harness injection.
//!
//! Releases before and after the test-mocking convention change need
//! different overlay sets. The selection is a single lexicographic comparison
//! against the boundary tag; the injector then copies the selected template
//! files into the checked-out tree at fixed relative paths.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::StageError;
use crate::tags::ReleaseTag;

// Workspace-relative destinations, fixed across releases.
const VITEST_CONFIG_DEST: &str = "apps/typegpu-docs/vitest.config.mts";
const BENCHMARK_ENTRY_DEST: &str = "apps/typegpu-docs/tests/benchmark.test.ts";
const EXTENDED_IT_DEST: &str = "packages/typegpu/tests/utils/extendedIt.ts";
const TEST_UTILS_DEST: &str = "packages/typegpu/tests/examples/utils/testUtils.ts";
const EXAMPLE_MOCKS_DEST: &str = "packages/typegpu/tests/examples";

/// Which overlay set a release gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchStrategy {
    /// Releases after the boundary: the tree ships its own mocks, only the
    /// cache-disabling test-utils override is needed.
    Modern,
    /// Releases at or before the boundary: mock fixtures and the extended
    /// test runner must be supplied by the harness.
    Legacy,
}

impl PatchStrategy {
    /// Selects the strategy for a tag: strictly greater than the boundary
    /// (lexicographic) means Modern, ties and everything below mean Legacy.
    pub fn select(tag: &ReleaseTag, boundary_tag: &str) -> Self {
        if tag.as_str() > boundary_tag {
            Self::Modern
        } else {
            Self::Legacy
        }
    }

    /// The overlay operations for this strategy.
    ///
    /// Diagnostics switches the modern benchmark entry to its debug variant;
    /// the legacy entry has no debug variant.
    pub fn overlays(&self, diagnostics: bool) -> Vec<Overlay> {
        match self {
            Self::Modern => vec![
                Overlay::file("vitest.config.mts.template", VITEST_CONFIG_DEST),
                Overlay::file(
                    if diagnostics {
                        "benchmark.test.ts.template.new.debug"
                    } else {
                        "benchmark.test.ts.template.new"
                    },
                    BENCHMARK_ENTRY_DEST,
                ),
                Overlay::file("testUtils.ts.template.new", TEST_UTILS_DEST),
            ],
            Self::Legacy => vec![
                Overlay::file("vitest.config.mts.template", VITEST_CONFIG_DEST),
                Overlay::dir("examples", EXAMPLE_MOCKS_DEST),
                Overlay::file("extendedIt.ts.template.old", EXTENDED_IT_DEST),
                Overlay::file("benchmark.test.ts.template.old", BENCHMARK_ENTRY_DEST),
            ],
        }
    }
}

impl std::fmt::Display for PatchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Modern => write!(f, "modern"),
            Self::Legacy => write!(f, "legacy"),
        }
    }
}

/// One copy operation from the template set into a workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlay {
    /// Name within the template directory.
    pub source: &'static str,
    /// Destination path relative to the workspace root.
    pub dest: &'static str,
    kind: OverlayKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OverlayKind {
    File,
    Dir,
}

impl Overlay {
    fn file(source: &'static str, dest: &'static str) -> Self {
        Self {
            source,
            dest,
            kind: OverlayKind::File,
        }
    }

    fn dir(source: &'static str, dest: &'static str) -> Self {
        Self {
            source,
            dest,
            kind: OverlayKind::Dir,
        }
    }
}

/// Copies a strategy's template overlays into a release workspace.
#[derive(Debug, Clone)]
pub struct HarnessInjector {
    templates_dir: PathBuf,
    diagnostics: bool,
}

impl HarnessInjector {
    /// Creates an injector reading from the local template set.
    pub fn new(templates_dir: impl Into<PathBuf>, diagnostics: bool) -> Self {
        Self {
            templates_dir: templates_dir.into(),
            diagnostics,
        }
    }

    /// Applies the strategy's overlay list to the workspace.
    ///
    /// The operations touch disjoint destinations, so they are issued
    /// concurrently; the set fails as a whole if any copy fails. These are
    /// local copies of files the harness ships, so a failure here is a
    /// packaging bug surfaced at the per-release boundary.
    pub async fn inject(
        &self,
        workspace: &Path,
        strategy: PatchStrategy,
    ) -> Result<(), StageError> {
        let overlays = strategy.overlays(self.diagnostics);
        futures::future::try_join_all(
            overlays
                .iter()
                .map(|overlay| self.apply(workspace, overlay)),
        )
        .await?;
        debug!(workspace = %workspace.display(), strategy = %strategy, "Harness overlays applied");
        Ok(())
    }

    async fn apply(&self, workspace: &Path, overlay: &Overlay) -> Result<(), StageError> {
        let source = self.templates_dir.join(overlay.source);
        let dest = workspace.join(overlay.dest);
        let result = match overlay.kind {
            OverlayKind::File => copy_file(&source, &dest).await,
            OverlayKind::Dir => copy_dir(&source, &dest).await,
        };
        result.map_err(|err| StageError::Inject {
            workspace: workspace.to_path_buf(),
            overlay: overlay.source.to_string(),
            source: err,
        })
    }
}

async fn copy_file(source: &Path, dest: &Path) -> std::io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::copy(source, dest).await?;
    Ok(())
}

/// Recursive directory overlay: files are copied over existing ones, project
/// files not shadowed by a template are left in place.
async fn copy_dir(source: &Path, dest: &Path) -> std::io::Result<()> {
    for entry in WalkDir::new(source) {
        let entry = entry.map_err(std::io::Error::from)?;
        let rel = entry
            .path()
            .strip_prefix(source)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).await?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::copy(entry.path(), &target).await?;
        }
    }
    Ok(())
}
