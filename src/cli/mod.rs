//! Command-line interface
//!
//! Commands:
//! - check: match analyzer reports against a code diff
//! - convert-stats: turn a TSV statistics dump into a JSON snapshot

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{check, convert_stats, run_command};
pub use errors::{CliError, CliResult};

/// Parse arguments and dispatch
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}
