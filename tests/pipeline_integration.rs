//! Integration tests for the harvest pipeline.
//!
//! Drives the orchestrator end-to-end with the real injector and collector
//! against tempdir-backed directories. Only the remote interactions (clone,
//! toolchain) are simulated: "fetch" creates the workspace, "run" writes the
//! artifacts the real toolchain would leave behind.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bench_harvest::collect::ResultCollector;
use bench_harvest::config::HarvestConfig;
use bench_harvest::error::StageError;
use bench_harvest::inject::{HarnessInjector, PatchStrategy};
use bench_harvest::pipeline::{
    HarvestOrchestrator, ReleaseProcessor, ReleaseStatus, TagSource,
};
use bench_harvest::tags::ReleaseTag;
use tempfile::TempDir;

struct FixedTags(Vec<ReleaseTag>);

#[async_trait]
impl TagSource for FixedTags {
    async fn resolve(&self) -> Vec<ReleaseTag> {
        self.0.clone()
    }
}

/// Stages with the remote pieces faked: fetch creates the workspace
/// directory, run writes the benchmark artifacts (or fails for the
/// configured tag). Inject and collect are the real components.
struct LocalProcessor {
    scratch: PathBuf,
    injector: HarnessInjector,
    collector: ResultCollector,
    diagnostics: bool,
    fail_run_for: Option<String>,
}

#[async_trait]
impl ReleaseProcessor for LocalProcessor {
    async fn prepare(&self) -> std::io::Result<()> {
        self.collector.init().await
    }

    async fn fetch(&self, tag: &ReleaseTag) -> Result<PathBuf, StageError> {
        let workspace = self.scratch.join(tag.as_str());
        std::fs::create_dir_all(&workspace).map_err(|err| StageError::Fetch {
            tag: tag.to_string(),
            reason: err.to_string(),
        })?;
        Ok(workspace)
    }

    async fn inject(&self, workspace: &Path, strategy: PatchStrategy) -> Result<(), StageError> {
        self.injector.inject(workspace, strategy).await
    }

    async fn run(&self, workspace: &Path, tag: &ReleaseTag) -> Result<(), StageError> {
        if self.fail_run_for.as_deref() == Some(tag.as_str()) {
            return Err(StageError::Run {
                tag: tag.to_string(),
                reason: "simulated toolchain failure".to_string(),
            });
        }
        std::fs::write(
            workspace.join("example-benchmark.json"),
            format!(r#"{{"tag":"{tag}"}}"#),
        )
        .unwrap();
        if self.diagnostics {
            std::fs::write(workspace.join("example-runnning-times.json"), "{}").unwrap();
            std::fs::write(workspace.join("timestamps.json"), "{}").unwrap();
        }
        Ok(())
    }

    async fn collect(&self, workspace: &Path, tag: &ReleaseTag) -> Result<(), StageError> {
        self.collector.collect(workspace, tag).await
    }
}

struct Harness {
    _dir: TempDir,
    base: PathBuf,
    config: HarvestConfig,
}

fn setup(diagnostics: bool) -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = dir.path().to_path_buf();
    let templates = base.join("templates");
    std::fs::create_dir_all(templates.join("examples")).unwrap();
    for name in [
        "vitest.config.mts.template",
        "benchmark.test.ts.template.new",
        "benchmark.test.ts.template.new.debug",
        "benchmark.test.ts.template.old",
        "testUtils.ts.template.new",
        "extendedIt.ts.template.old",
    ] {
        std::fs::write(templates.join(name), name).unwrap();
    }
    std::fs::write(templates.join("examples/mock.ts"), "mock").unwrap();

    let config = HarvestConfig::default()
        .with_scratch_root(base.join("tmp"))
        .with_results_dir(base.join("benchmarks"))
        .with_running_times_dir(base.join("example-running-times"))
        .with_timestamps_dir(base.join("timestamps"))
        .with_templates_dir(templates)
        .with_diagnostics(diagnostics);

    Harness {
        _dir: dir,
        base,
        config,
    }
}

fn orchestrator(
    harness: &Harness,
    tags: &[&str],
    fail_run_for: Option<&str>,
) -> HarvestOrchestrator {
    let config = harness.config.clone();
    let processor = LocalProcessor {
        scratch: config.scratch_root.clone(),
        injector: HarnessInjector::new(config.templates_dir.clone(), config.diagnostics),
        collector: ResultCollector::new(&config),
        diagnostics: config.diagnostics,
        fail_run_for: fail_run_for.map(str::to_string),
    };
    let tags = tags.iter().copied().map(ReleaseTag::new).collect();
    HarvestOrchestrator::new(config)
        .expect("valid test config")
        .with_components(Arc::new(FixedTags(tags)), Arc::new(processor))
}

#[tokio::test]
async fn test_full_run_collects_every_release() {
    let harness = setup(false);
    let report = orchestrator(&harness, &["v0.6.0", "v0.7.1", "v0.9.0"], None)
        .run()
        .await
        .expect("run should complete");

    assert_eq!(report.collected, 3);
    assert_eq!(report.failed, 0);
    for tag in ["v0.6.0", "v0.7.1", "v0.9.0"] {
        let artifact = harness.base.join("benchmarks").join(format!("{tag}.json"));
        assert!(artifact.is_file(), "missing artifact for {tag}");
    }
    // The scratch root must be gone after a full run.
    assert!(!harness.base.join("tmp").exists());
}

#[tokio::test]
async fn test_runner_failure_leaves_only_that_release_uncollected() {
    let harness = setup(false);
    let report = orchestrator(&harness, &["v0.6.0", "v0.7.0", "v0.9.0"], Some("v0.7.0"))
        .run()
        .await
        .expect("run should complete");

    assert_eq!(report.collected, 2);
    assert_eq!(report.failed, 1);
    assert!(harness.base.join("benchmarks/v0.6.0.json").is_file());
    assert!(
        !harness.base.join("benchmarks/v0.7.0.json").exists(),
        "failed release must not leave an artifact"
    );
    assert!(harness.base.join("benchmarks/v0.9.0.json").is_file());

    let failed: Vec<_> = report
        .releases
        .iter()
        .filter(|r| matches!(r.status, ReleaseStatus::Failed { .. }))
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].tag.as_str(), "v0.7.0");

    assert!(!harness.base.join("tmp").exists());
}

#[tokio::test]
async fn test_strategies_follow_the_boundary() {
    let harness = setup(false);
    let report = orchestrator(&harness, &["v0.6.0", "v0.7.1", "v0.9.0"], None)
        .run()
        .await
        .expect("run should complete");

    let strategies: Vec<PatchStrategy> = report.releases.iter().map(|r| r.strategy).collect();
    assert_eq!(
        strategies,
        vec![
            PatchStrategy::Legacy,
            PatchStrategy::Legacy,
            PatchStrategy::Modern,
        ]
    );
}

#[tokio::test]
async fn test_diagnostics_run_collects_extra_artifacts() {
    let harness = setup(true);
    let report = orchestrator(&harness, &["v0.9.0"], None)
        .run()
        .await
        .expect("run should complete");

    assert_eq!(report.collected, 1);
    assert!(harness.base.join("benchmarks/v0.9.0.json").is_file());
    assert!(harness
        .base
        .join("example-running-times/v0.9.0.json")
        .is_file());
    assert!(harness.base.join("timestamps/v0.9.0.json").is_file());
}

#[tokio::test]
async fn test_plain_run_leaves_no_diagnostics_directories() {
    let harness = setup(false);
    orchestrator(&harness, &["v0.9.0"], None)
        .run()
        .await
        .expect("run should complete");

    assert!(harness.base.join("benchmarks").is_dir());
    assert!(!harness.base.join("example-running-times").exists());
    assert!(!harness.base.join("timestamps").exists());
}
