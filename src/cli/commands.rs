//! CLI command implementations

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::analyzer::QueryReport;
use crate::diff::DiffMapper;
use crate::observability::Logger;
use crate::review::ExplainDiff;
use crate::stats::Snapshot;

use super::args::Command;
use super::errors::{CliError, CliResult};

/// Dispatch one parsed command
pub fn run_command(command: Command) -> CliResult<()> {
    match command {
        Command::Check { reports, diff } => check(&reports, &diff),
        Command::ConvertStats { input, output } => convert_stats(&input, &output),
    }
}

/// Match analyzer reports against a diff; nonzero exit when any
/// finding lands on an inserted line
pub fn check(reports_path: &Path, diff_path: &Path) -> CliResult<()> {
    let reports = load_reports(reports_path)?;

    let diff_file = File::open(diff_path).map_err(|e| CliError::io(diff_path, e))?;
    let mapper = DiffMapper::new(BufReader::new(diff_file))?;

    let problems = ExplainDiff::new(&reports, &mapper).problems();
    for problem in &problems {
        let line = serde_json::json!({
            "location": problem.location,
            "report": problem.report,
        });
        println!("{}", line);
    }

    if problems.is_empty() {
        Logger::info("check_clean", &[("reports", &reports.len().to_string())]);
        Ok(())
    } else {
        Err(CliError::ProblemsFound {
            count: problems.len(),
        })
    }
}

/// Convert a TSV statistics dump into the JSON snapshot format
pub fn convert_stats(input: &Path, output: &Path) -> CliResult<()> {
    let stats = Snapshot::load_tsv(input)?;
    Snapshot::save_json(&stats, output)?;
    Logger::info(
        "stats_converted",
        &[
            ("tables", &stats.tables().len().to_string()),
            ("output", &output.display().to_string()),
        ],
    );
    Ok(())
}

fn load_reports(path: &Path) -> CliResult<Vec<QueryReport>> {
    let file = File::open(path).map_err(|e| CliError::io(path, e))?;
    let mut reports = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| CliError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<QueryReport>(&line) {
            Ok(report) => reports.push(report),
            // one mangled line should not sink the review
            Err(e) => Logger::warn("report_line_skipped", &[("error", &e.to_string())]),
        }
    }
    Ok(reports)
}
