//! CLI argument definitions for lienwatch.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ingest` | Run one ingestion across all enabled sources |
//! | `lapsed` | List lapsed filings older than a minimum age |
//! | `run` | Start the scheduler and stream its events |
//! | `refresh` | Re-enrich one stored prospect |
//! | `runs` | Show the most recent ingestion runs |
//! | `sources` | List configured sources |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--config` | `$LIENWATCH_CONFIG` or `lienwatch.yaml` | Configuration file |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--memory` | `false` | Keep runs and prospects in memory only |
//!
//! # Examples
//!
//! ```bash
//! lienwatch --config lienwatch.yaml ingest --jurisdiction CA --jurisdiction NV
//! lienwatch lapsed --min-age-days 1095 --pretty
//! RUST_LOG=lienwatch_core=debug lienwatch run
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Secured-lending filing ingestion with rate limiting, retries and circuit
/// breaking per source.
#[derive(Debug, Parser)]
#[command(
    name = "lienwatch",
    author,
    version,
    about = "Secured-lending filing ingestion and prospect scheduler"
)]
pub struct Cli {
    /// Configuration file (YAML).
    #[arg(long, global = true, env = "LIENWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Do not open the DuckDB warehouse; runs and prospects live in memory.
    #[arg(long, global = true, default_value_t = false)]
    pub memory: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one ingestion, enrich the results and print per-source outcomes.
    ///
    /// Exits with code 3 when any source failed.
    Ingest(IngestArgs),

    /// List lapsed filings at least `--min-age-days` old.
    Lapsed(LapsedArgs),

    /// Start the scheduler and stream events as NDJSON until Ctrl-C.
    Run,

    /// Re-enrich one stored prospect by id.
    Refresh(RefreshArgs),

    /// Show the most recent ingestion runs, newest first.
    Runs(RunsArgs),

    /// List configured sources and their limits.
    Sources,
}

/// Arguments for the `ingest` command.
#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Jurisdiction to query (repeatable). Defaults to the configured list.
    #[arg(long = "jurisdiction", short = 'j')]
    pub jurisdictions: Vec<String>,
}

/// Arguments for the `lapsed` command.
#[derive(Debug, Args)]
pub struct LapsedArgs {
    /// Minimum filing age in days.
    #[arg(long, default_value_t = 1095)]
    pub min_age_days: u32,
}

/// Arguments for the `refresh` command.
#[derive(Debug, Args)]
pub struct RefreshArgs {
    /// Prospect id, e.g. `CA-2019-0001234`.
    pub id: String,
}

/// Arguments for the `runs` command.
#[derive(Debug, Args)]
pub struct RunsArgs {
    /// Maximum number of runs to show.
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}
