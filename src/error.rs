//! Error types for harvest operations.
//!
//! Every per-release stage returns the same `StageError` type so the
//! orchestrator decides skip-vs-continue in one place instead of each stage
//! carrying its own catch logic.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The stages a single release moves through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fetch,
    Inject,
    Run,
    Collect,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch => write!(f, "fetch"),
            Self::Inject => write!(f, "inject"),
            Self::Run => write!(f, "run"),
            Self::Collect => write!(f, "collect"),
        }
    }
}

/// Errors that can occur while processing a single release.
///
/// A `StageError` is always scoped to one release: the orchestrator logs it,
/// skips the remaining stages for that tag and moves on to the next one.
#[derive(Debug, Error)]
pub enum StageError {
    /// Shallow clone of the tag failed (network, missing tag, disk).
    #[error("cloning tag '{tag}' failed: {reason}")]
    Fetch { tag: String, reason: String },

    /// Copying a harness overlay into the workspace failed.
    #[error("injecting '{overlay}' into {workspace:?} failed: {source}")]
    Inject {
        workspace: PathBuf,
        overlay: String,
        #[source]
        source: std::io::Error,
    },

    /// The external toolchain exited non-zero, crashed or timed out.
    #[error("benchmark run for tag '{tag}' failed: {reason}")]
    Run { tag: String, reason: String },

    /// The expected artifact was missing or could not be relocated.
    #[error("collecting '{artifact}' for tag '{tag}' failed: {source}")]
    Collect {
        tag: String,
        artifact: String,
        #[source]
        source: std::io::Error,
    },
}

impl StageError {
    /// The stage this error belongs to.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Fetch { .. } => Stage::Fetch,
            Self::Inject { .. } => Stage::Inject,
            Self::Run { .. } => Stage::Run,
            Self::Collect { .. } => Stage::Collect,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_display_is_snake_case() {
        assert_eq!(Stage::Fetch.to_string(), "fetch");
        assert_eq!(Stage::Inject.to_string(), "inject");
        assert_eq!(Stage::Run.to_string(), "run");
        assert_eq!(Stage::Collect.to_string(), "collect");
    }

    #[test]
    fn stage_error_reports_its_stage() {
        let err = StageError::Fetch {
            tag: "v0.6.0".to_string(),
            reason: "network unreachable".to_string(),
        };
        assert_eq!(err.stage(), Stage::Fetch);
        assert!(err.to_string().contains("v0.6.0"));

        let err = StageError::Run {
            tag: "v0.7.0".to_string(),
            reason: "exit code 1".to_string(),
        };
        assert_eq!(err.stage(), Stage::Run);
    }
}
