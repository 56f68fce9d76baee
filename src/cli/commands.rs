//! CLI command definitions for bench-harvest.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::{HarvestConfig, DEFAULT_BOUNDARY_TAG, DEFAULT_MIN_TAG, DEFAULT_REPO_URL};
use crate::inject::PatchStrategy;
use crate::pipeline::{HarvestOrchestrator, ReleaseStatus};
use crate::tags::TagResolver;

/// Historical benchmark harvester.
#[derive(Parser)]
#[command(name = "bench-harvest")]
#[command(about = "Benchmark a project across its release tags and collect the results")]
#[command(version)]
#[command(
    long_about = "bench-harvest resolves a repository's release tags, checks each one out into a scratch workspace, overlays version-appropriate harness files, runs the project's benchmark suite and collects the JSON artifacts into a results directory.\n\nExample usage:\n  bench-harvest run --results-dir ./benchmarks\n  bench-harvest tags --include-unstable"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Benchmark every qualifying release and collect the artifacts.
    Run(RunArgs),

    /// Resolve and print the release tags a run would process.
    ///
    /// Dry-run introspection: queries the remote tag listing and applies the
    /// same filters and strategy selection as `run`, but clones nothing and
    /// creates no directories.
    Tags(TagsArgs),
}

/// Arguments for `bench-harvest run`.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Git URL of the benchmarked repository.
    #[arg(long, env = "HARVEST_REPO_URL", default_value = DEFAULT_REPO_URL)]
    pub repo_url: String,

    /// Minimum tag; releases below it predate the benchmark entry point.
    #[arg(long, env = "HARVEST_MIN_TAG", default_value = DEFAULT_MIN_TAG)]
    pub min_tag: String,

    /// Last release with the old test-mocking conventions; tags above it get
    /// the modern overlay set.
    #[arg(long, env = "HARVEST_BOUNDARY_TAG", default_value = DEFAULT_BOUNDARY_TAG)]
    pub boundary_tag: String,

    /// Keep pre-release tags.
    #[arg(long, env = "HARVEST_INCLUDE_UNSTABLE")]
    pub include_unstable: bool,

    /// Restrict the run to this tag (repeatable). Filters the resolved set;
    /// processing order is unaffected.
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Scratch directory holding per-release workspaces; removed at run end.
    #[arg(long, env = "HARVEST_SCRATCH_ROOT", default_value = "./tmp")]
    pub scratch_root: PathBuf,

    /// Output directory for collected benchmark artifacts.
    #[arg(short = 'o', long, env = "HARVEST_RESULTS_DIR", default_value = "./benchmarks")]
    pub results_dir: PathBuf,

    /// Output directory for per-example running times (diagnostics only).
    #[arg(
        long,
        env = "HARVEST_RUNNING_TIMES_DIR",
        default_value = "./example-running-times"
    )]
    pub running_times_dir: PathBuf,

    /// Output directory for stage timestamps (diagnostics only).
    #[arg(long, env = "HARVEST_TIMESTAMPS_DIR", default_value = "./timestamps")]
    pub timestamps_dir: PathBuf,

    /// Directory holding the harness template set.
    #[arg(long, env = "HARVEST_TEMPLATES_DIR", default_value = "./templates")]
    pub templates_dir: PathBuf,

    /// Timeout for the DOM-emulation dependency install, in seconds.
    #[arg(long, env = "HARVEST_INSTALL_TIMEOUT_SECS", default_value = "300")]
    pub install_timeout_secs: u64,

    /// Timeout for the install-and-benchmark invocation, in seconds.
    #[arg(long, env = "HARVEST_BENCH_TIMEOUT_SECS", default_value = "1800")]
    pub bench_timeout_secs: u64,

    /// Diagnostics mode: debug benchmark entry, DEBUG=1 in the toolchain
    /// environment, stage timing logs and extra artifact collection.
    #[arg(long = "debug", env = "HARVEST_DEBUG")]
    pub diagnostics: bool,

    /// Output the run report as JSON.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for `bench-harvest tags`.
#[derive(Parser, Debug)]
pub struct TagsArgs {
    /// Git URL of the benchmarked repository.
    #[arg(long, env = "HARVEST_REPO_URL", default_value = DEFAULT_REPO_URL)]
    pub repo_url: String,

    /// Minimum tag; releases below it predate the benchmark entry point.
    #[arg(long, env = "HARVEST_MIN_TAG", default_value = DEFAULT_MIN_TAG)]
    pub min_tag: String,

    /// Boundary used to show each tag's overlay strategy.
    #[arg(long, env = "HARVEST_BOUNDARY_TAG", default_value = DEFAULT_BOUNDARY_TAG)]
    pub boundary_tag: String,

    /// Keep pre-release tags.
    #[arg(long, env = "HARVEST_INCLUDE_UNSTABLE")]
    pub include_unstable: bool,

    /// Output the tag list as JSON.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Parses CLI arguments from the process environment.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Parses arguments and dispatches the selected command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Dispatches an already-parsed CLI invocation.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => run_harvest(args).await,
        Commands::Tags(args) => list_tags(args).await,
    }
}

async fn run_harvest(args: RunArgs) -> anyhow::Result<()> {
    let config = HarvestConfig::new()
        .with_repo_url(args.repo_url)
        .with_min_tag(args.min_tag)
        .with_boundary_tag(args.boundary_tag)
        .with_include_unstable(args.include_unstable)
        .with_only_tags(args.tags)
        .with_scratch_root(args.scratch_root)
        .with_results_dir(args.results_dir.clone())
        .with_running_times_dir(args.running_times_dir)
        .with_timestamps_dir(args.timestamps_dir)
        .with_templates_dir(args.templates_dir)
        .with_install_timeout(Duration::from_secs(args.install_timeout_secs))
        .with_bench_timeout(Duration::from_secs(args.bench_timeout_secs))
        .with_diagnostics(args.diagnostics);

    let orchestrator = HarvestOrchestrator::new(config)?;
    let report = orchestrator.run().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for release in &report.releases {
        match &release.status {
            ReleaseStatus::Collected => {
                println!("{}: collected ({})", release.tag, release.strategy)
            }
            ReleaseStatus::Failed { stage, reason } => {
                println!("{}: failed at {}: {}", release.tag, stage, reason)
            }
        }
    }
    println!(
        "{} collected, {} failed, results in {}",
        report.collected,
        report.failed,
        args.results_dir.display()
    );
    Ok(())
}

async fn list_tags(args: TagsArgs) -> anyhow::Result<()> {
    let config = HarvestConfig::new()
        .with_repo_url(args.repo_url)
        .with_min_tag(args.min_tag)
        .with_boundary_tag(args.boundary_tag.clone())
        .with_include_unstable(args.include_unstable);
    config.validate()?;

    let tags = TagResolver::new(&config).resolve().await;

    if args.json {
        let lines: Vec<serde_json::Value> = tags
            .iter()
            .map(|tag| {
                serde_json::json!({
                    "tag": tag,
                    "strategy": PatchStrategy::select(tag, &args.boundary_tag),
                    "prerelease": tag.is_prerelease(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&lines)?);
        return Ok(());
    }

    for tag in &tags {
        println!("{} ({})", tag, PatchStrategy::select(tag, &args.boundary_tag));
    }
    println!("{} release(s)", tags.len());
    Ok(())
}
