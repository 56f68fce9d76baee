//! Release checkout.
//!
//! Materializes one release's source tree into its scratch workspace via a
//! shallow, single-branch clone of exactly that tag. Fetch failures are
//! per-release faults: the orchestrator skips the release and moves on.

use std::path::PathBuf;

use tokio::process::Command;
use tracing::info;

use crate::error::StageError;
use crate::tags::ReleaseTag;
use crate::workspace::ScratchRoot;

/// Validate a tag name before it is interpolated into a git invocation.
///
/// Accepts standard git ref names (alphanumeric, `/`, `.`, `-`, `_`).
/// Rejects shell metacharacters, `..` sequences and names starting with `-`
/// (flag injection).
pub fn validate_tag_ref(s: &str) -> Result<(), anyhow::Error> {
    if s.is_empty() {
        anyhow::bail!("tag name is empty");
    }
    if s.len() > 256 {
        anyhow::bail!("tag name too long ({} chars, max 256)", s.len());
    }
    if s.starts_with('-') {
        anyhow::bail!(
            "tag name '{}' must not start with '-' (could be interpreted as a flag)",
            s
        );
    }
    if s.contains("..") {
        anyhow::bail!("tag name '{}' must not contain '..' (path traversal)", s);
    }
    for ch in s.chars() {
        if !matches!(ch, 'a'..='z' | 'A'..='Z' | '0'..='9' | '/' | '.' | '-' | '_' | '+') {
            anyhow::bail!(
                "invalid character '{}' in tag name '{}': only alphanumeric, /, ., -, _, + allowed",
                ch,
                s
            );
        }
    }
    Ok(())
}

/// Fetches single releases into their scratch workspaces.
#[derive(Debug, Clone)]
pub struct ReleaseFetcher {
    repo_url: String,
    scratch: ScratchRoot,
}

impl ReleaseFetcher {
    /// Creates a fetcher cloning from `repo_url` into `scratch`.
    pub fn new(repo_url: impl Into<String>, scratch: ScratchRoot) -> Self {
        Self {
            repo_url: repo_url.into(),
            scratch,
        }
    }

    /// Shallow single-branch clone of exactly `tag` into its workspace.
    ///
    /// Returns the workspace path the release was checked out into.
    pub async fn fetch(&self, tag: &ReleaseTag) -> Result<PathBuf, StageError> {
        validate_tag_ref(tag.as_str()).map_err(|err| StageError::Fetch {
            tag: tag.to_string(),
            reason: err.to_string(),
        })?;

        let dest = self.scratch.workspace_for(tag);
        let output = Command::new("git")
            .args([
                "clone",
                "--depth=1",
                "--single-branch",
                &format!("--branch={}", tag.as_str()),
                &self.repo_url,
            ])
            .arg(&dest)
            .output()
            .await
            .map_err(|err| StageError::Fetch {
                tag: tag.to_string(),
                reason: err.to_string(),
            })?;

        if !output.status.success() {
            return Err(StageError::Fetch {
                tag: tag.to_string(),
                reason: format!(
                    "git clone exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        info!(tag = %tag, workspace = %dest.display(), "Release checked out");
        Ok(dest)
    }
}
