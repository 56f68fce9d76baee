//! External benchmark execution.
//!
//! Runs the project's own toolchain against a patched workspace: first an
//! idempotent install of the DOM-emulation dependency (older lockfiles are
//! sometimes missing it), then the dependency install plus the benchmark
//! entry under the test runner. Stderr of both children is suppressed; older
//! releases emit a wall of expected deprecation warnings.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::info;

use crate::config::HarvestConfig;
use crate::error::StageError;
use crate::tags::ReleaseTag;

/// Idempotent install of the DOM-emulation dependency.
const INSTALL_DOM_CMD: &str = "pnpm add --dir apps/typegpu-docs -d jsdom";

/// Install dependencies and execute the benchmark entry.
const BENCH_CMD: &str =
    "pnpm install && ATTEST_skipTypes=1 pnpm vitest run apps/typegpu-docs/tests/benchmark.test.ts";

/// Invokes the external toolchain for one release workspace.
#[derive(Debug, Clone)]
pub struct BenchmarkRunner {
    diagnostics: bool,
    install_timeout: Duration,
    bench_timeout: Duration,
}

impl BenchmarkRunner {
    /// Creates a runner with the configured timeouts and diagnostics mode.
    pub fn new(config: &HarvestConfig) -> Self {
        Self {
            diagnostics: config.diagnostics,
            install_timeout: config.install_timeout,
            bench_timeout: config.bench_timeout,
        }
    }

    /// Runs the benchmark suite inside `workspace`.
    ///
    /// Non-zero exit, spawn failure or timeout of either invocation maps to
    /// `StageError::Run`; the artifact for this release simply never appears.
    pub async fn run(&self, workspace: &Path, tag: &ReleaseTag) -> Result<(), StageError> {
        self.sh(workspace, tag, INSTALL_DOM_CMD, self.install_timeout)
            .await?;
        self.sh(workspace, tag, BENCH_CMD, self.bench_timeout)
            .await?;
        info!(tag = %tag, "Benchmark run finished");
        Ok(())
    }

    async fn sh(
        &self,
        workspace: &Path,
        tag: &ReleaseTag,
        cmd: &str,
        timeout: Duration,
    ) -> Result<(), StageError> {
        let mut command = Command::new("sh");
        command
            .args(["-c", cmd])
            .current_dir(workspace)
            .stderr(Stdio::null());
        if self.diagnostics {
            command.env("DEBUG", "1");
        }

        let status = tokio::time::timeout(timeout, command.status()).await;
        match status {
            Ok(Ok(status)) if status.success() => Ok(()),
            Ok(Ok(status)) => Err(StageError::Run {
                tag: tag.to_string(),
                reason: format!("'{cmd}' exited with {status}"),
            }),
            Ok(Err(err)) => Err(StageError::Run {
                tag: tag.to_string(),
                reason: format!("'{cmd}' could not be spawned: {err}"),
            }),
            Err(_) => Err(StageError::Run {
                tag: tag.to_string(),
                reason: format!("'{cmd}' timed out after {}s", timeout.as_secs()),
            }),
        }
    }
}
