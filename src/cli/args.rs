//! CLI argument definitions using clap
//!
//! Commands:
//! - sqlguard check --reports <path> --diff <path>
//! - sqlguard convert-stats --input <tsv> --output <json>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// sqlguard - static cost analysis for captured SQL query traffic
#[derive(Parser, Debug)]
#[command(name = "sqlguard")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Report analyzer findings attributable to a diff
    Check {
        /// Analyzer output, one JSON report per line
        #[arg(long)]
        reports: PathBuf,

        /// Unified diff, produced with --unified=0
        #[arg(long)]
        diff: PathBuf,
    },

    /// Convert a TSV index-statistics dump to a JSON snapshot
    ConvertStats {
        /// TSV dump with a header row
        #[arg(long)]
        input: PathBuf,

        /// Destination snapshot path
        #[arg(long)]
        output: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
