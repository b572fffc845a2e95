//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Solidafy Pager CLI
#[derive(Parser, Debug)]
#[command(name = "solidafy-pager")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Collection definition file (YAML)
    #[arg(short, long, global = true)]
    pub collection: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Walk a collection and print its merged items
    Fetch {
        /// Dependency key (e.g. a category slug or search query)
        #[arg(short, long, conflicts_with = "key_json")]
        key: Option<String>,

        /// Structured dependency key as inline JSON
        #[arg(long)]
        key_json: Option<String>,

        /// Stop after this many pages
        #[arg(long)]
        max_pages: Option<usize>,

        /// Override the definition's page size
        #[arg(long)]
        page_size: Option<u32>,

        /// Override the definition's base URL
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Validate a collection definition
    Validate,

    /// Print the normalized collection definition
    Inspect,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one item per line)
    Json,
    /// Human-readable output
    Pretty,
}
