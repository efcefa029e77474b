//! Review flow tests: analyzer records + diff -> attributable problems
//!
//! Exercises both the library surface (`review::ExplainDiff`) and the
//! `check` CLI command over real files.

use std::io::Cursor;

use serde_json::json;

use sqlguard::analyzer::QueryReport;
use sqlguard::cli::{self, CliError};
use sqlguard::diff::DiffMapper;
use sqlguard::explain::{Message, Severity};
use sqlguard::review::ExplainDiff;

const DIFF: &str = "\
diff --git a/app/models/report.rb b/app/models/report.rb
index aaa..bbb 100644
--- a/app/models/report.rb
+++ b/app/models/report.rb
@@ -41,0 +42,2 @@ class Report
+  def self.dangerous
+    where(\"created_at > ?\", 1.week.ago).to_a
";

fn report(severity: Severity, cost: f64, frames: &[&str]) -> QueryReport {
    QueryReport {
        sql: "select * from reports where created_at > '2026-08-22'".to_string(),
        table: Some("reports".to_string()),
        md5: "0123456789abcdef0123456789abcdef".to_string(),
        messages: vec![Message {
            tag: "access_type_tablescan".to_string(),
            table: Some("reports".to_string()),
            cost: Some(cost),
            ..Message::default()
        }],
        cost,
        severity,
        backtrace: frames.iter().map(|f| f.to_string()).collect(),
        raw_explain: json!(null),
    }
}

// =============================================================================
// LIBRARY SURFACE
// =============================================================================

/// A costly query introduced by the diff is pinned to its inserted
/// line.
#[test]
fn test_problem_attributed_to_inserted_line() {
    let reports = [
        report(Severity::High, 2.4, &["app/models/report.rb:43:in `dangerous`"]),
        // same query reached from an untouched call site
        report(Severity::High, 2.4, &["app/models/legacy.rb:9:in `old`"]),
        // touched line, harmless query
        report(Severity::None, 0.0, &["app/models/report.rb:42:in `dangerous`"]),
    ];
    let diff = DiffMapper::new(Cursor::new(DIFF)).unwrap();

    let problems = ExplainDiff::new(&reports, &diff).problems();
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0].location, "app/models/report.rb:43");
    assert_eq!(problems[0].report.severity, Severity::High);
}

/// No reports, no problems.
#[test]
fn test_empty_reports_pass() {
    let diff = DiffMapper::new(Cursor::new(DIFF)).unwrap();
    assert!(ExplainDiff::new(&[], &diff).problems().is_empty());
}

// =============================================================================
// CLI COMMAND
// =============================================================================

fn write_reports(dir: &std::path::Path, reports: &[QueryReport]) -> std::path::PathBuf {
    let path = dir.join("reports.jsonl");
    let lines: Vec<String> = reports
        .iter()
        .map(|r| serde_json::to_string(r).unwrap())
        .collect();
    std::fs::write(&path, lines.join("\n")).unwrap();
    path
}

/// `check` exits nonzero when the diff introduces a problem.
#[test]
fn test_check_command_fails_on_problem() {
    let dir = tempfile::tempdir().unwrap();
    let reports = write_reports(
        dir.path(),
        &[report(Severity::High, 2.4, &["app/models/report.rb:43:in `dangerous`"])],
    );
    let diff = dir.path().join("change.diff");
    std::fs::write(&diff, DIFF).unwrap();

    let err = cli::check(&reports, &diff).unwrap_err();
    assert!(matches!(err, CliError::ProblemsFound { count: 1 }));
}

/// `check` passes when nothing in the diff causes a finding.
#[test]
fn test_check_command_passes_when_clean() {
    let dir = tempfile::tempdir().unwrap();
    let reports = write_reports(
        dir.path(),
        &[report(Severity::High, 2.4, &["app/models/elsewhere.rb:10:in `fine`"])],
    );
    let diff = dir.path().join("change.diff");
    std::fs::write(&diff, DIFF).unwrap();

    assert!(cli::check(&reports, &diff).is_ok());
}

/// A mangled report line is skipped; the rest still review.
#[test]
fn test_check_tolerates_mangled_report_line() {
    let dir = tempfile::tempdir().unwrap();
    let good = serde_json::to_string(&report(
        Severity::High,
        2.4,
        &["app/models/report.rb:43:in `dangerous`"],
    ))
    .unwrap();
    let path = dir.path().join("reports.jsonl");
    std::fs::write(&path, format!("{{truncated\n{}\n", good)).unwrap();
    let diff = dir.path().join("change.diff");
    std::fs::write(&diff, DIFF).unwrap();

    let err = cli::check(&path, &diff).unwrap_err();
    assert!(matches!(err, CliError::ProblemsFound { count: 1 }));
}
