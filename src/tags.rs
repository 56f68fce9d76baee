//! Release tag discovery and filtering.
//!
//! Queries the remote repository's tag references once per run and narrows
//! them to the ordered set of releases worth benchmarking. Resolution is
//! fail-open: a bad remote query degrades to an empty set with a warning
//! instead of aborting the batch.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::warn;

use crate::config::HarvestConfig;

/// Marker git appends to dereferenced annotated-tag entries.
const DEREF_MARKER: &str = "^{}";

/// Prefix of tag references in `git ls-remote` output.
const TAG_REF_PREFIX: &str = "refs/tags/";

/// Pre-release heuristic: any lowercase letter after the leading version
/// marker (e.g. "v0.8.0-beta").
fn unstable_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new("[a-z]").expect("hard-coded pattern is valid"))
}

/// A release tag as published by the benchmarked repository.
///
/// Ordering is plain lexicographic byte comparison of the raw string, not
/// semantic-version ordering: "v0.10.0" sorts before "v0.2.0". Collection
/// order carries no meaning (each release is processed independently), and
/// the strategy boundary below is defined in terms of the same comparison,
/// so this must not be "fixed" to semver.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReleaseTag(String);

impl ReleaseTag {
    /// Wraps a raw tag string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw tag string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the tag looks like a pre-release: any lowercase letter after
    /// the leading version marker. "v0.8.0-beta" is unstable, "v0.8.0" is
    /// not; an uppercase-only suffix does not trip the heuristic.
    pub fn is_prerelease(&self) -> bool {
        let rest = self
            .0
            .char_indices()
            .nth(1)
            .map(|(idx, _)| &self.0[idx..])
            .unwrap_or("");
        unstable_pattern().is_match(rest)
    }
}

impl std::fmt::Display for ReleaseTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resolves the remote tag listing into an ordered set of release tags.
#[derive(Debug, Clone)]
pub struct TagResolver {
    repo_url: String,
    min_tag: String,
    include_unstable: bool,
}

impl TagResolver {
    /// Creates a resolver for the configured repository and filters.
    pub fn new(config: &HarvestConfig) -> Self {
        Self {
            repo_url: config.repo_url.clone(),
            min_tag: config.min_tag.clone(),
            include_unstable: config.include_unstable,
        }
    }

    /// Queries the remote and returns the filtered, ascending tag set.
    ///
    /// Never fails the run: remote-listing failures are logged and degrade to
    /// an empty result.
    pub async fn resolve(&self) -> Vec<ReleaseTag> {
        let listing = match self.list_remote().await {
            Ok(listing) => listing,
            Err(err) => {
                warn!(repo = %self.repo_url, error = %err, "Could not fetch tags from the repository");
                return Vec::new();
            }
        };

        if listing.trim().is_empty() {
            warn!(repo = %self.repo_url, "Remote returned an empty tag listing");
        }

        self.filter_listing(&listing)
    }

    /// Runs `git ls-remote --tags` and returns its raw stdout.
    async fn list_remote(&self) -> anyhow::Result<String> {
        let output = Command::new("git")
            .args(["ls-remote", "--tags", &self.repo_url])
            .output()
            .await?;

        if !output.status.success() {
            anyhow::bail!(
                "git ls-remote exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// The pure parse-and-filter core, separated from the subprocess call.
    ///
    /// Takes the newline-delimited `<sha>\trefs/tags/<name>` listing and
    /// applies, in order: reference parsing, dereferenced-marker exclusion,
    /// the pre-release heuristic (unless `include_unstable`), the minimum-tag
    /// cutoff, and an ascending lexicographic sort.
    pub fn filter_listing(&self, listing: &str) -> Vec<ReleaseTag> {
        let mut tags: Vec<ReleaseTag> = listing
            .lines()
            .filter_map(parse_ref_line)
            .filter(|tag| self.keep(tag))
            .map(ReleaseTag::new)
            .collect();
        tags.sort();
        tags
    }

    fn keep(&self, tag: &str) -> bool {
        let candidate = ReleaseTag::new(tag);
        if candidate.is_prerelease() && !self.include_unstable {
            return false;
        }
        tag >= self.min_tag.as_str()
    }
}

/// Extracts the tag name from one `<sha>\trefs/tags/<name>` listing line.
///
/// Lines without the tag-reference prefix and dereferenced annotated-tag
/// entries (`<name>^{}`) yield `None`.
fn parse_ref_line(line: &str) -> Option<&str> {
    let (_, name) = line.rsplit_once(TAG_REF_PREFIX)?;
    let name = name.trim();
    if name.is_empty() || name.contains(DEREF_MARKER) {
        return None;
    }
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(min_tag: &str, include_unstable: bool) -> TagResolver {
        TagResolver {
            repo_url: "https://example.com/project.git".to_string(),
            min_tag: min_tag.to_string(),
            include_unstable,
        }
    }

    fn listing(tags: &[&str]) -> String {
        tags.iter()
            .map(|tag| format!("0000000000000000000000000000000000000000\trefs/tags/{tag}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn parse_ref_line_extracts_tag_name() {
        assert_eq!(
            parse_ref_line("abc123\trefs/tags/v0.6.0"),
            Some("v0.6.0")
        );
    }

    #[test]
    fn parse_ref_line_drops_dereferenced_entries() {
        assert_eq!(parse_ref_line("abc123\trefs/tags/v0.6.0^{}"), None);
    }

    #[test]
    fn parse_ref_line_drops_unparsable_lines() {
        assert_eq!(parse_ref_line(""), None);
        assert_eq!(parse_ref_line("abc123\trefs/heads/main"), None);
        assert_eq!(parse_ref_line("no tabs or refs here"), None);
    }

    #[test]
    fn prerelease_heuristic_matches_lowercase_suffix() {
        assert!(ReleaseTag::new("v0.8.0-beta").is_prerelease());
        assert!(ReleaseTag::new("v0.8.0-rc.1").is_prerelease());
        assert!(!ReleaseTag::new("v0.8.0").is_prerelease());
        // Only lowercase letters after the leading marker count.
        assert!(!ReleaseTag::new("v0.8.0-RC1").is_prerelease());
    }

    #[test]
    fn prerelease_heuristic_skips_leading_marker() {
        // The leading 'v' itself is lowercase but never counted.
        assert!(!ReleaseTag::new("v1.0.0").is_prerelease());
        assert!(ReleaseTag::new("vv1.0.0").is_prerelease());
    }

    #[test]
    fn filter_drops_tags_below_minimum() {
        let resolver = resolver("v0.6.0", false);
        let tags = resolver.filter_listing(&listing(&["v0.5.0", "v0.5.9", "v0.6.0", "v0.7.0"]));
        let raw: Vec<&str> = tags.iter().map(ReleaseTag::as_str).collect();
        assert_eq!(raw, vec!["v0.6.0", "v0.7.0"]);
    }

    #[test]
    fn filter_drops_prereleases_unless_flag_set() {
        let lines = listing(&["v0.6.0", "v0.8.0-beta", "v0.9.0"]);

        let excluded = resolver("v0.6.0", false).filter_listing(&lines);
        let raw: Vec<&str> = excluded.iter().map(ReleaseTag::as_str).collect();
        assert_eq!(raw, vec!["v0.6.0", "v0.9.0"]);

        // Flipping the flag is the only thing that changes the outcome.
        let included = resolver("v0.6.0", true).filter_listing(&lines);
        let raw: Vec<&str> = included.iter().map(ReleaseTag::as_str).collect();
        assert_eq!(raw, vec!["v0.6.0", "v0.8.0-beta", "v0.9.0"]);
    }

    #[test]
    fn filter_always_drops_dereferenced_entries() {
        let lines = format!(
            "{}\n{}",
            listing(&["v0.6.0"]),
            "abc123\trefs/tags/v0.6.0^{}"
        );
        let tags = resolver("v0.0.0", true).filter_listing(&lines);
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].as_str(), "v0.6.0");
    }

    #[test]
    fn filter_sorts_ascending_lexicographically() {
        let tags =
            resolver("v0.6.0", false).filter_listing(&listing(&["v0.9.0", "v0.6.0", "v0.7.1"]));
        let raw: Vec<&str> = tags.iter().map(ReleaseTag::as_str).collect();
        assert_eq!(raw, vec!["v0.6.0", "v0.7.1", "v0.9.0"]);
    }

    #[test]
    fn ordering_is_lexicographic_not_semver() {
        // Deliberate simplification: "v0.10.0" sorts before "v0.2.0".
        assert!(ReleaseTag::new("v0.10.0") < ReleaseTag::new("v0.2.0"));

        let tags =
            resolver("v0.0.0", false).filter_listing(&listing(&["v0.2.0", "v0.10.0"]));
        let raw: Vec<&str> = tags.iter().map(ReleaseTag::as_str).collect();
        assert_eq!(raw, vec!["v0.10.0", "v0.2.0"]);
    }

    #[test]
    fn filter_matches_worked_example() {
        // Boundary v0.7.1, minimum v0.6.0, unstable excluded.
        let lines = listing(&[
            "v0.5.0",
            "v0.6.0",
            "v0.7.0",
            "v0.7.1",
            "v0.8.0-beta",
            "v0.9.0",
        ]);
        let tags = resolver("v0.6.0", false).filter_listing(&lines);
        let raw: Vec<&str> = tags.iter().map(ReleaseTag::as_str).collect();
        assert_eq!(raw, vec!["v0.6.0", "v0.7.0", "v0.7.1", "v0.9.0"]);
    }

    #[test]
    fn filter_preserves_unique_input_as_unique_output() {
        let tags = resolver("v0.0.0", false)
            .filter_listing(&listing(&["v0.6.0", "v0.7.0", "v0.8.0"]));
        let mut deduped = tags.clone();
        deduped.dedup();
        assert_eq!(tags, deduped);
    }
}
