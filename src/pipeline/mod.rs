//! Pipeline orchestration for the release harvest.
//!
//! # Architecture
//!
//! The orchestrator resolves the tag set once, then walks it sequentially;
//! every release goes through the same four stages:
//!
//! 1. **Fetch**: shallow clone of the tag into its scratch workspace
//! 2. **Inject**: overlay the version-appropriate harness templates
//! 3. **Run**: execute the external benchmark toolchain
//! 4. **Collect**: relocate the artifacts into the results directories
//!
//! Each stage returns the uniform [`crate::error::StageError`]; a failure
//! short-circuits the remaining stages *for that release only* and the loop
//! advances to the next tag. The scratch root is removed on every exit path,
//! including a run-level fault escaping the loop.
//!
//! Stage boundaries are announced on an optional [`PipelineEvent`] channel
//! carrying per-stage durations, so timing observation lives outside the
//! stages themselves.
//!
//! # Example
//!
//! ```rust,ignore
//! use bench_harvest::config::HarvestConfig;
//! use bench_harvest::pipeline::HarvestOrchestrator;
//!
//! let config = HarvestConfig::from_env()?.with_diagnostics(true);
//! let orchestrator = HarvestOrchestrator::new(config)?;
//! let report = orchestrator.run().await?;
//!
//! println!("collected {} of {} releases", report.collected, report.releases.len());
//! ```

pub mod orchestrator;

// Re-export main types for convenience
pub use orchestrator::{
    HarvestOrchestrator, PipelineError, PipelineEvent, ReleaseOutcome, ReleaseProcessor,
    ReleaseStatus, RunReport, TagSource,
};
