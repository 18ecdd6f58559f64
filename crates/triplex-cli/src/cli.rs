//! CLI command definitions and argument parsing.

use crate::config::{SourceKind, DEFAULT_CONFIG_PATH};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Triplex - Extract knowledge triples from text with a language model.
#[derive(Debug, Parser)]
#[command(name = "triplex")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract triples from the configured source
    Run(RunArgs),

    /// Summarize entities and predicates across existing artifacts
    Themes(ThemesArgs),
}

/// Source kind as given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SourceArg {
    /// Files below the input directory
    File,
    /// Database query
    Db,
}

impl From<SourceArg> for SourceKind {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::File => SourceKind::File,
            SourceArg::Db => SourceKind::Database,
        }
    }
}

/// Arguments for the run command.
#[derive(Debug, Parser)]
pub struct RunArgs {
    /// Configuration file
    #[arg(short, long, env = "TRIPLEX_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// System prompt file
    #[arg(short, long, default_value = "prompt.txt")]
    pub prompt: PathBuf,

    /// Log file (appended to)
    #[arg(long, default_value = "logs/triplex.log")]
    pub log_file: PathBuf,

    /// Override the configured source kind
    #[arg(short, long, value_enum)]
    pub source: Option<SourceArg>,

    /// Process a single file (relative to the input directory) or record id
    #[arg(short, long)]
    pub file: Option<String>,

    /// Override the abstraction level (1 = core claims, 5 = maximal detail)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub granularity: Option<u8>,

    /// Skip records that already have an artifact
    #[arg(long, conflicts_with = "update_metadata")]
    pub skip_existing: bool,

    /// Re-attach source text to existing artifacts without calling the model
    #[arg(long)]
    pub update_metadata: bool,

    /// Stop after this many attempted records
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Do not write the HTML visualization
    #[arg(long)]
    pub no_visualization: bool,

    /// Also print info-level log events to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

/// Arguments for the themes command.
#[derive(Debug, Parser)]
pub struct ThemesArgs {
    /// Artifact directory
    #[arg(short, long, default_value = "output_json")]
    pub input_dir: PathBuf,

    /// Labels shown per entity type
    #[arg(short, long, default_value = "10")]
    pub top: usize,
}
