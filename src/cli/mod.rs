//! Command-line interface for bench-harvest.
//!
//! Provides the `run` command executing a full harvest and the `tags`
//! command for inspecting the resolved release set without touching disk.

mod commands;

pub use commands::{parse_cli, run, run_with_cli};
