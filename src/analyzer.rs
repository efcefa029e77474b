//! Batch analysis of captured query logs
//!
//! Reads newline-delimited log text, pulls out the SELECT statements,
//! dedups them by fingerprint, explains and scores each one, and
//! writes one JSON record per unique query. One bad query is logged
//! and skipped; the batch always runs to completion.

use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::connection::Explainer;
use crate::explain::{Explain, ExplainError, Message, Severity};
use crate::fingerprint::Fingerprinter;
use crate::observability::Logger;
use crate::options::Options;
use crate::query::Query;
use crate::stats::TableStats;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("cannot read query log: {0}")]
    Read(#[source] std::io::Error),

    #[error("cannot write analysis output: {0}")]
    Write(#[source] std::io::Error),
}

/// One scored query, as serialized to the output stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryReport {
    pub sql: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    pub md5: String,
    pub messages: Vec<Message>,
    pub cost: f64,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub backtrace: Vec<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub raw_explain: Value,
}

fn ansi_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\x1b\[?.*?[@-~]").unwrap())
}

fn select_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(select.*from.*)").unwrap())
}

/// Drives the log-to-reports pipeline
pub struct Analyzer<'a> {
    stats: &'a TableStats,
    options: &'a Options,
    fingerprinter: &'a Fingerprinter,
    next_index: usize,
}

impl<'a> Analyzer<'a> {
    pub fn new(
        stats: &'a TableStats,
        options: &'a Options,
        fingerprinter: &'a Fingerprinter,
    ) -> Self {
        Analyzer {
            stats,
            options,
            fingerprinter,
            next_index: 0,
        }
    }

    /// Analyze every SELECT in `input`, writing one JSON line per
    /// unique query to `output`. Returns the reports it wrote.
    pub fn analyze(
        &mut self,
        input: impl BufRead,
        mut output: impl Write,
        conn: &mut dyn Explainer,
    ) -> Result<Vec<QueryReport>, AnalyzerError> {
        let mut reports = Vec::new();
        for line in input.lines() {
            let line = line.map_err(AnalyzerError::Read)?;
            let clean = ansi_re().replace_all(&line, "");
            let Some(captures) = select_re().captures(&clean) else {
                continue;
            };
            let sql = captures[1].trim_end();
            if let Some(report) = self.analyze_sql(sql, conn) {
                serde_json::to_writer(&mut output, &report)
                    .map_err(|e| AnalyzerError::Write(e.into()))?;
                output.write_all(b"\n").map_err(AnalyzerError::Write)?;
                reports.push(report);
            }
        }
        Ok(reports)
    }

    /// Score a single statement; None when deduplicated, not a SELECT,
    /// or failed to explain
    pub fn analyze_sql(&mut self, sql: &str, conn: &mut dyn Explainer) -> Option<QueryReport> {
        let query = Query::new(sql, self.next_index);
        self.next_index += 1;

        let dedup_key = query
            .fingerprint(self.fingerprinter)
            .unwrap_or_else(|| query.sql())
            .to_string();
        if self.fingerprinter.seen_before(&dedup_key) {
            return None;
        }
        if !query.sql().to_lowercase().starts_with("select") {
            return None;
        }

        let explain = match Explain::run(&query, self.stats, self.options, conn) {
            Ok(explain) => explain,
            Err(e) => {
                self.log_explain_failure(&query, &e);
                return None;
            }
        };
        let explain = self.cheapest_path(explain, &query, conn);

        Some(QueryReport {
            sql: query.sql().to_string(),
            table: explain.table().map(str::to_string),
            md5: query.md5(self.fingerprinter),
            messages: explain.messages().to_vec(),
            cost: explain.cost(),
            severity: explain.severity(),
            backtrace: query.backtrace().to_vec(),
            raw_explain: explain.raw_plan().clone(),
        })
    }

    // a bad chosen plan may have had better options available; report
    // the cheapest plan, preferring the chosen one on a tie
    fn cheapest_path(&self, explain: Explain, query: &Query, conn: &mut dyn Explainer) -> Explain {
        if explain.severity() == Severity::None {
            return explain;
        }
        let alternates = explain.other_paths(query, self.stats, self.options, conn);
        let mut best = explain;
        for alternate in alternates {
            if alternate.cost() < best.cost() {
                best = alternate;
            }
        }
        best
    }

    fn log_explain_failure(&self, query: &Query, error: &ExplainError) {
        // server-side refusals are routine noise unless asked for
        if matches!(error, ExplainError::Connection(_)) && !self.options.verbose {
            return;
        }
        Logger::error(
            "explain_failed",
            &[
                ("sql", query.sql()),
                ("index", &query.index().to_string()),
                ("error", &error.to_string()),
            ],
        );
    }
}
