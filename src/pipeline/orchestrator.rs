//! Release-harvest orchestrator.
//!
//! Sequences tag resolution, the per-release stage chain and scratch
//! teardown. Failure policy lives here and nowhere else: stages report the
//! uniform `StageError`, the orchestrator decides skip-vs-continue.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc::Sender;
use tracing::{debug, info, warn};

use crate::collect::ResultCollector;
use crate::config::HarvestConfig;
use crate::error::{Stage, StageError};
use crate::fetch::ReleaseFetcher;
use crate::inject::{HarnessInjector, PatchStrategy};
use crate::runner::BenchmarkRunner;
use crate::tags::{ReleaseTag, TagResolver};
use crate::workspace::ScratchRoot;

/// Errors that can abort a whole run (as opposed to a single release).
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// IO error during run setup.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Events emitted at stage boundaries.
///
/// Carries the stage timings the orchestrator observes, so nothing inside a
/// stage keeps timing state of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum PipelineEvent {
    RunStarted,
    TagsResolved { count: usize, duration_ms: u64 },
    StageCompleted { tag: ReleaseTag, stage: Stage, duration_ms: u64 },
    ReleaseCollected { tag: ReleaseTag },
    ReleaseFailed { tag: ReleaseTag, stage: Stage, reason: String },
    RunCompleted { collected: usize, failed: usize },
}

/// Source of the release tag set.
///
/// The production implementation queries the remote repository; tests swap
/// in a fixed list.
#[async_trait]
pub trait TagSource: Send + Sync {
    async fn resolve(&self) -> Vec<ReleaseTag>;
}

#[async_trait]
impl TagSource for TagResolver {
    async fn resolve(&self) -> Vec<ReleaseTag> {
        TagResolver::resolve(self).await
    }
}

/// The four per-release stages.
///
/// Every method is scoped to one release and reports the uniform
/// `StageError`; implementations never decide failure policy themselves.
#[async_trait]
pub trait ReleaseProcessor: Send + Sync {
    /// One-time run setup (output directories and the like).
    async fn prepare(&self) -> std::io::Result<()> {
        Ok(())
    }

    /// Checks the release out and returns its workspace path.
    async fn fetch(&self, tag: &ReleaseTag) -> Result<PathBuf, StageError>;

    /// Overlays the harness templates for the selected strategy.
    async fn inject(&self, workspace: &Path, strategy: PatchStrategy) -> Result<(), StageError>;

    /// Runs the benchmark toolchain inside the workspace.
    async fn run(&self, workspace: &Path, tag: &ReleaseTag) -> Result<(), StageError>;

    /// Relocates the produced artifacts into the results directories.
    async fn collect(&self, workspace: &Path, tag: &ReleaseTag) -> Result<(), StageError>;
}

/// Production wiring of the real stage components.
struct HarvestProcessor {
    fetcher: ReleaseFetcher,
    injector: HarnessInjector,
    runner: BenchmarkRunner,
    collector: ResultCollector,
}

#[async_trait]
impl ReleaseProcessor for HarvestProcessor {
    async fn prepare(&self) -> std::io::Result<()> {
        self.collector.init().await
    }

    async fn fetch(&self, tag: &ReleaseTag) -> Result<PathBuf, StageError> {
        self.fetcher.fetch(tag).await
    }

    async fn inject(&self, workspace: &Path, strategy: PatchStrategy) -> Result<(), StageError> {
        self.injector.inject(workspace, strategy).await
    }

    async fn run(&self, workspace: &Path, tag: &ReleaseTag) -> Result<(), StageError> {
        self.runner.run(workspace, tag).await
    }

    async fn collect(&self, workspace: &Path, tag: &ReleaseTag) -> Result<(), StageError> {
        self.collector.collect(workspace, tag).await
    }
}

/// How one release ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ReleaseStatus {
    /// All four stages succeeded; the artifact is in the results directory.
    Collected,
    /// A stage failed; later stages were skipped and no artifact exists.
    Failed { stage: Stage, reason: String },
}

/// Per-release record in the run report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseOutcome {
    pub tag: ReleaseTag,
    pub strategy: PatchStrategy,
    #[serde(flatten)]
    pub status: ReleaseStatus,
    pub duration_ms: u64,
}

/// Summary of a full harvest run.
///
/// The results directory remains the contract for which releases succeeded;
/// the report exists for operator visibility and the `--json` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub releases: Vec<ReleaseOutcome>,
    pub collected: usize,
    pub failed: usize,
    pub finished_at: DateTime<Utc>,
}

/// Coordinates a full harvest run.
pub struct HarvestOrchestrator {
    config: HarvestConfig,
    scratch: ScratchRoot,
    tag_source: Arc<dyn TagSource>,
    processor: Arc<dyn ReleaseProcessor>,
    events: Option<Sender<PipelineEvent>>,
}

impl HarvestOrchestrator {
    /// Creates an orchestrator with the production components.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Config` if the configuration is invalid.
    pub fn new(config: HarvestConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let scratch = ScratchRoot::new(&config.scratch_root);
        let processor = HarvestProcessor {
            fetcher: ReleaseFetcher::new(config.repo_url.clone(), scratch.clone()),
            injector: HarnessInjector::new(config.templates_dir.clone(), config.diagnostics),
            runner: BenchmarkRunner::new(&config),
            collector: ResultCollector::new(&config),
        };
        let tag_source = TagResolver::new(&config);
        Ok(Self {
            config,
            scratch,
            tag_source: Arc::new(tag_source),
            processor: Arc::new(processor),
            events: None,
        })
    }

    /// Replaces the tag source and processor with custom implementations.
    pub fn with_components(
        mut self,
        tag_source: Arc<dyn TagSource>,
        processor: Arc<dyn ReleaseProcessor>,
    ) -> Self {
        self.tag_source = tag_source;
        self.processor = processor;
        self
    }

    /// Attaches a channel receiving [`PipelineEvent`]s during the run.
    pub fn with_events(mut self, sender: Sender<PipelineEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Runs the full pipeline.
    ///
    /// The scratch root is removed on every exit path; a run-level fault is
    /// logged before it propagates, after teardown has happened.
    pub async fn run(&self) -> Result<RunReport, PipelineError> {
        self.emit(PipelineEvent::RunStarted).await;
        let result = self.run_inner().await;
        if let Err(err) = &result {
            warn!(error = %err, "Run aborted by an unexpected fault");
        }
        self.scratch.teardown().await;
        result
    }

    async fn run_inner(&self) -> Result<RunReport, PipelineError> {
        self.scratch.init().await?;
        self.processor.prepare().await?;

        let started = Instant::now();
        let mut tags = self.tag_source.resolve().await;
        let resolve_ms = started.elapsed().as_millis() as u64;
        if self.config.diagnostics {
            debug!(count = tags.len(), duration_ms = resolve_ms, "Tags resolved");
        }
        self.emit(PipelineEvent::TagsResolved {
            count: tags.len(),
            duration_ms: resolve_ms,
        })
        .await;

        // Subset selection filters only; order and strategy are untouched.
        if !self.config.only_tags.is_empty() {
            tags.retain(|tag| {
                self.config
                    .only_tags
                    .iter()
                    .any(|only| only == tag.as_str())
            });
        }

        info!(count = tags.len(), "Processing releases");

        let mut releases = Vec::with_capacity(tags.len());
        let mut collected = 0usize;
        let mut failed = 0usize;
        for tag in &tags {
            let outcome = self.process_release(tag).await;
            match outcome.status {
                ReleaseStatus::Collected => collected += 1,
                ReleaseStatus::Failed { .. } => failed += 1,
            }
            releases.push(outcome);
        }

        self.emit(PipelineEvent::RunCompleted { collected, failed })
            .await;
        info!(collected, failed, "Run completed");

        Ok(RunReport {
            releases,
            collected,
            failed,
            finished_at: Utc::now(),
        })
    }

    async fn process_release(&self, tag: &ReleaseTag) -> ReleaseOutcome {
        let strategy = PatchStrategy::select(tag, &self.config.boundary_tag);
        let started = Instant::now();

        let status = match self.stages(tag, strategy).await {
            Ok(()) => {
                self.emit(PipelineEvent::ReleaseCollected { tag: tag.clone() })
                    .await;
                ReleaseStatus::Collected
            }
            Err(err) => {
                let stage = err.stage();
                warn!(tag = %tag, stage = %stage, error = %err, "Release failed; continuing with next tag");
                self.emit(PipelineEvent::ReleaseFailed {
                    tag: tag.clone(),
                    stage,
                    reason: err.to_string(),
                })
                .await;
                ReleaseStatus::Failed {
                    stage,
                    reason: err.to_string(),
                }
            }
        };

        ReleaseOutcome {
            tag: tag.clone(),
            strategy,
            status,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Fetch → Inject → Run → Collect. The `?` after each stage is the
    /// short-circuit that isolates a failure to this release.
    async fn stages(&self, tag: &ReleaseTag, strategy: PatchStrategy) -> Result<(), StageError> {
        let workspace = self
            .timed(tag, Stage::Fetch, self.processor.fetch(tag))
            .await?;
        self.timed(tag, Stage::Inject, self.processor.inject(&workspace, strategy))
            .await?;
        self.timed(tag, Stage::Run, self.processor.run(&workspace, tag))
            .await?;
        self.timed(tag, Stage::Collect, self.processor.collect(&workspace, tag))
            .await?;
        Ok(())
    }

    async fn timed<T>(
        &self,
        tag: &ReleaseTag,
        stage: Stage,
        fut: impl Future<Output = Result<T, StageError>> + Send,
    ) -> Result<T, StageError> {
        let started = Instant::now();
        let result = fut.await;
        let duration_ms = started.elapsed().as_millis() as u64;
        if result.is_ok() {
            if self.config.diagnostics {
                debug!(tag = %tag, stage = %stage, duration_ms, "Stage completed");
            }
            self.emit(PipelineEvent::StageCompleted {
                tag: tag.clone(),
                stage,
                duration_ms,
            })
            .await;
        }
        result
    }

    async fn emit(&self, event: PipelineEvent) {
        if let Some(sender) = &self.events {
            let _ = sender.send(event).await;
        }
    }
}
