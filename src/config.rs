//! Harvest configuration.
//!
//! All behavior toggles for a run are resolved here once, before the
//! orchestrator is constructed. Nothing downstream reads the process
//! environment; the diagnostics flag in particular only switches template
//! variants, child-process environment and extra artifact collection, never
//! tag filtering or control flow.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Repository whose releases are benchmarked.
pub const DEFAULT_REPO_URL: &str = "https://github.com/software-mansion/TypeGPU.git";

/// Earliest tag the benchmark entry point exists for. Tags comparing
/// lexicographically below this are dropped during resolution.
pub const DEFAULT_MIN_TAG: &str = "v0.6.0";

/// Last release still using the old test-mocking conventions. Tags at or
/// below it get the legacy overlay set, tags strictly above get the modern
/// one.
pub const DEFAULT_BOUNDARY_TAG: &str = "v0.7.1";

/// Whether pre-release tags are kept by default.
pub const DEFAULT_INCLUDE_UNSTABLE: bool = false;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// IO error while reading configuration.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration for a harvest run.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    // Remote settings
    /// Git URL of the benchmarked repository.
    pub repo_url: String,

    // Tag filtering
    /// Tags lexicographically below this are dropped.
    pub min_tag: String,
    /// Strategy boundary: tags above it are Modern, at or below Legacy.
    pub boundary_tag: String,
    /// Keep pre-release tags (any lowercase letter after the leading marker).
    pub include_unstable: bool,
    /// Restrict the run to these tags (applied after resolution; empty means
    /// all resolved tags).
    pub only_tags: Vec<String>,

    // Filesystem settings
    /// Scratch root holding one workspace per release; removed at run end.
    pub scratch_root: PathBuf,
    /// Permanent output directory for `<tag>.json` artifacts.
    pub results_dir: PathBuf,
    /// Output directory for per-example running times (diagnostics only).
    pub running_times_dir: PathBuf,
    /// Output directory for stage timestamps (diagnostics only).
    pub timestamps_dir: PathBuf,
    /// Local template set copied into each checkout.
    pub templates_dir: PathBuf,

    // Execution settings
    /// Timeout for the DOM-emulation dependency install.
    pub install_timeout: Duration,
    /// Timeout for the install-and-benchmark invocation.
    pub bench_timeout: Duration,

    // Diagnostics
    /// Switches the benchmark-entry template variant, sets DEBUG=1 in the
    /// toolchain environment, logs stage timings and collects the extra
    /// artifacts.
    pub diagnostics: bool,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            repo_url: DEFAULT_REPO_URL.to_string(),
            min_tag: DEFAULT_MIN_TAG.to_string(),
            boundary_tag: DEFAULT_BOUNDARY_TAG.to_string(),
            include_unstable: DEFAULT_INCLUDE_UNSTABLE,
            only_tags: Vec::new(),
            scratch_root: PathBuf::from("./tmp"),
            results_dir: PathBuf::from("./benchmarks"),
            running_times_dir: PathBuf::from("./example-running-times"),
            timestamps_dir: PathBuf::from("./timestamps"),
            templates_dir: PathBuf::from("./templates"),
            install_timeout: Duration::from_secs(300), // 5 minutes
            bench_timeout: Duration::from_secs(1800),  // 30 minutes
            diagnostics: false,
        }
    }
}

impl HarvestConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `HARVEST_REPO_URL`: benchmarked repository (default: TypeGPU)
    /// - `HARVEST_MIN_TAG`: minimum tag cutoff (default: v0.6.0)
    /// - `HARVEST_BOUNDARY_TAG`: legacy/modern boundary (default: v0.7.1)
    /// - `HARVEST_INCLUDE_UNSTABLE`: keep pre-release tags (default: false)
    /// - `HARVEST_SCRATCH_ROOT`: scratch directory (default: ./tmp)
    /// - `HARVEST_RESULTS_DIR`: results directory (default: ./benchmarks)
    /// - `HARVEST_RUNNING_TIMES_DIR`: diagnostics running-times directory
    /// - `HARVEST_TIMESTAMPS_DIR`: diagnostics timestamps directory
    /// - `HARVEST_TEMPLATES_DIR`: template set (default: ./templates)
    /// - `HARVEST_INSTALL_TIMEOUT_SECS`: install timeout (default: 300)
    /// - `HARVEST_BENCH_TIMEOUT_SECS`: benchmark timeout (default: 1800)
    /// - `HARVEST_DEBUG`: diagnostics mode (default: false)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable has an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("HARVEST_REPO_URL") {
            config.repo_url = val;
        }

        if let Ok(val) = std::env::var("HARVEST_MIN_TAG") {
            config.min_tag = val;
        }

        if let Ok(val) = std::env::var("HARVEST_BOUNDARY_TAG") {
            config.boundary_tag = val;
        }

        if let Ok(val) = std::env::var("HARVEST_INCLUDE_UNSTABLE") {
            config.include_unstable = parse_env_bool(&val, "HARVEST_INCLUDE_UNSTABLE")?;
        }

        if let Ok(val) = std::env::var("HARVEST_SCRATCH_ROOT") {
            config.scratch_root = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("HARVEST_RESULTS_DIR") {
            config.results_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("HARVEST_RUNNING_TIMES_DIR") {
            config.running_times_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("HARVEST_TIMESTAMPS_DIR") {
            config.timestamps_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("HARVEST_TEMPLATES_DIR") {
            config.templates_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("HARVEST_INSTALL_TIMEOUT_SECS") {
            let secs: u64 = parse_env_value(&val, "HARVEST_INSTALL_TIMEOUT_SECS")?;
            config.install_timeout = Duration::from_secs(secs);
        }

        if let Ok(val) = std::env::var("HARVEST_BENCH_TIMEOUT_SECS") {
            let secs: u64 = parse_env_value(&val, "HARVEST_BENCH_TIMEOUT_SECS")?;
            config.bench_timeout = Duration::from_secs(secs);
        }

        if let Ok(val) = std::env::var("HARVEST_DEBUG") {
            config.diagnostics = parse_env_bool(&val, "HARVEST_DEBUG")?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` if any values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.repo_url.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "repo_url cannot be empty".to_string(),
            ));
        }

        if self.min_tag.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "min_tag cannot be empty".to_string(),
            ));
        }

        if self.boundary_tag.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "boundary_tag cannot be empty".to_string(),
            ));
        }

        if self.install_timeout.as_secs() == 0 {
            return Err(ConfigError::ValidationFailed(
                "install_timeout must be greater than 0".to_string(),
            ));
        }

        if self.bench_timeout.as_secs() == 0 {
            return Err(ConfigError::ValidationFailed(
                "bench_timeout must be greater than 0".to_string(),
            ));
        }

        if self.scratch_root.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "scratch_root cannot be empty".to_string(),
            ));
        }

        // The scratch root is removed wholesale at run end; refuse a layout
        // where that would take the results with it.
        if self.results_dir.starts_with(&self.scratch_root) {
            return Err(ConfigError::ValidationFailed(
                "results_dir cannot live inside scratch_root".to_string(),
            ));
        }

        Ok(())
    }

    /// Builder method to set the repository URL.
    pub fn with_repo_url(mut self, url: impl Into<String>) -> Self {
        self.repo_url = url.into();
        self
    }

    /// Builder method to set the minimum tag cutoff.
    pub fn with_min_tag(mut self, tag: impl Into<String>) -> Self {
        self.min_tag = tag.into();
        self
    }

    /// Builder method to set the strategy boundary tag.
    pub fn with_boundary_tag(mut self, tag: impl Into<String>) -> Self {
        self.boundary_tag = tag.into();
        self
    }

    /// Builder method to include or exclude pre-release tags.
    pub fn with_include_unstable(mut self, include: bool) -> Self {
        self.include_unstable = include;
        self
    }

    /// Builder method to restrict the run to specific tags.
    pub fn with_only_tags(mut self, tags: Vec<String>) -> Self {
        self.only_tags = tags;
        self
    }

    /// Builder method to set the scratch root.
    pub fn with_scratch_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.scratch_root = path.into();
        self
    }

    /// Builder method to set the results directory.
    pub fn with_results_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.results_dir = path.into();
        self
    }

    /// Builder method to set the running-times directory.
    pub fn with_running_times_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.running_times_dir = path.into();
        self
    }

    /// Builder method to set the timestamps directory.
    pub fn with_timestamps_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.timestamps_dir = path.into();
        self
    }

    /// Builder method to set the template directory.
    pub fn with_templates_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.templates_dir = path.into();
        self
    }

    /// Builder method to set the install timeout.
    pub fn with_install_timeout(mut self, timeout: Duration) -> Self {
        self.install_timeout = timeout;
        self
    }

    /// Builder method to set the benchmark timeout.
    pub fn with_bench_timeout(mut self, timeout: Duration) -> Self {
        self.bench_timeout = timeout;
        self
    }

    /// Builder method to enable or disable diagnostics.
    pub fn with_diagnostics(mut self, enabled: bool) -> Self {
        self.diagnostics = enabled;
        self
    }
}

/// Parse an environment variable value into a type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}

/// Parse an environment variable as a boolean.
fn parse_env_bool(value: &str, key: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected boolean value, got '{}'", value),
        }),
    }
}
