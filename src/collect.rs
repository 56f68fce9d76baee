//! Artifact collection.
//!
//! Relocates the opaque JSON artifacts a benchmark run leaves in the
//! workspace into the permanent, tag-keyed output directories. A missing
//! artifact means an upstream stage failed; the copy error surfaces at the
//! per-release boundary and the tag is simply absent from the results.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::info;

use crate::config::HarvestConfig;
use crate::error::StageError;
use crate::tags::ReleaseTag;

/// Benchmark measurements, written by every entry template variant.
const BENCHMARK_ARTIFACT: &str = "example-benchmark.json";

/// Per-example running times, written by the debug entry template only.
/// The name matches what the templates actually write, spelling included.
const RUNNING_TIMES_ARTIFACT: &str = "example-runnning-times.json";

/// Stage timestamps, written by the debug entry template only.
const TIMESTAMPS_ARTIFACT: &str = "timestamps.json";

/// Relocates benchmark artifacts out of release workspaces.
#[derive(Debug, Clone)]
pub struct ResultCollector {
    results_dir: PathBuf,
    running_times_dir: PathBuf,
    timestamps_dir: PathBuf,
    diagnostics: bool,
}

impl ResultCollector {
    /// Creates a collector writing to the configured output directories.
    pub fn new(config: &HarvestConfig) -> Self {
        Self {
            results_dir: config.results_dir.clone(),
            running_times_dir: config.running_times_dir.clone(),
            timestamps_dir: config.timestamps_dir.clone(),
            diagnostics: config.diagnostics,
        }
    }

    /// Ensures the output directories exist.
    ///
    /// The diagnostics directories are only created when diagnostics is
    /// enabled; a plain run leaves no empty side directories behind.
    pub async fn init(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.results_dir).await?;
        if self.diagnostics {
            fs::create_dir_all(&self.running_times_dir).await?;
            fs::create_dir_all(&self.timestamps_dir).await?;
        }
        Ok(())
    }

    /// Copies the release's artifacts into the output directories, keyed by
    /// tag.
    pub async fn collect(&self, workspace: &Path, tag: &ReleaseTag) -> Result<(), StageError> {
        self.relocate(workspace, BENCHMARK_ARTIFACT, &self.results_dir, tag)
            .await?;

        if self.diagnostics {
            self.relocate(workspace, RUNNING_TIMES_ARTIFACT, &self.running_times_dir, tag)
                .await?;
            self.relocate(workspace, TIMESTAMPS_ARTIFACT, &self.timestamps_dir, tag)
                .await?;
        }

        info!(tag = %tag, results_dir = %self.results_dir.display(), "Artifacts collected");
        Ok(())
    }

    async fn relocate(
        &self,
        workspace: &Path,
        artifact: &str,
        dest_dir: &Path,
        tag: &ReleaseTag,
    ) -> Result<(), StageError> {
        let source = workspace.join(artifact);
        let dest = dest_dir.join(format!("{}.json", tag.as_str()));
        fs::copy(&source, &dest)
            .await
            .map_err(|err| StageError::Collect {
                tag: tag.to_string(),
                artifact: artifact.to_string(),
                source: err,
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Stage;

    fn collector(base: &Path, diagnostics: bool) -> ResultCollector {
        ResultCollector {
            results_dir: base.join("benchmarks"),
            running_times_dir: base.join("example-running-times"),
            timestamps_dir: base.join("timestamps"),
            diagnostics,
        }
    }

    #[tokio::test]
    async fn collect_relocates_benchmark_artifact_keyed_by_tag() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = dir.path().join("ws");
        std::fs::create_dir_all(&workspace).unwrap();
        std::fs::write(workspace.join(BENCHMARK_ARTIFACT), r#"{"mean":1}"#).unwrap();

        let collector = collector(dir.path(), false);
        collector.init().await.unwrap();
        collector
            .collect(&workspace, &ReleaseTag::new("v0.6.0"))
            .await
            .unwrap();

        let collected = dir.path().join("benchmarks/v0.6.0.json");
        assert_eq!(
            std::fs::read_to_string(collected).unwrap(),
            r#"{"mean":1}"#
        );
    }

    #[tokio::test]
    async fn collect_fails_when_artifact_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = dir.path().join("ws");
        std::fs::create_dir_all(&workspace).unwrap();

        let collector = collector(dir.path(), false);
        collector.init().await.unwrap();
        let err = collector
            .collect(&workspace, &ReleaseTag::new("v0.6.0"))
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Stage::Collect);
        assert!(!dir.path().join("benchmarks/v0.6.0.json").exists());
    }

    #[tokio::test]
    async fn collect_includes_diagnostics_artifacts_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = dir.path().join("ws");
        std::fs::create_dir_all(&workspace).unwrap();
        std::fs::write(workspace.join(BENCHMARK_ARTIFACT), "{}").unwrap();
        std::fs::write(workspace.join(RUNNING_TIMES_ARTIFACT), "{}").unwrap();
        std::fs::write(workspace.join(TIMESTAMPS_ARTIFACT), "{}").unwrap();

        let collector = collector(dir.path(), true);
        collector.init().await.unwrap();
        collector
            .collect(&workspace, &ReleaseTag::new("v0.7.0"))
            .await
            .unwrap();

        assert!(dir.path().join("benchmarks/v0.7.0.json").is_file());
        assert!(dir
            .path()
            .join("example-running-times/v0.7.0.json")
            .is_file());
        assert!(dir.path().join("timestamps/v0.7.0.json").is_file());
    }

    #[tokio::test]
    async fn collect_ignores_diagnostics_artifacts_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = dir.path().join("ws");
        std::fs::create_dir_all(&workspace).unwrap();
        // Only the benchmark artifact exists; the extras must not be looked for.
        std::fs::write(workspace.join(BENCHMARK_ARTIFACT), "{}").unwrap();

        let collector = collector(dir.path(), false);
        collector.init().await.unwrap();
        collector
            .collect(&workspace, &ReleaseTag::new("v0.7.0"))
            .await
            .unwrap();

        assert!(dir.path().join("benchmarks/v0.7.0.json").is_file());
        assert!(!dir.path().join("example-running-times").exists());
        assert!(!dir.path().join("timestamps").exists());
    }
}
