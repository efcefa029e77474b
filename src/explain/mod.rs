//! Plan normalization and cost scoring
//!
//! `Explain` ties the stages together for one query: run the
//! database's EXPLAIN, normalize the dialect-specific plan into
//! `PlanNode`s, then score it with the check pipeline. `other_paths`
//! re-plans a MySQL query once per index the planner considered but
//! rejected, so the analyzer can report the cheapest plan available
//! rather than the one chosen.

pub mod checks;
pub mod errors;
pub mod mysql;
pub mod plan;
pub mod postgres;
pub mod result;

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::connection::{Dialect, Explainer};
use crate::observability::Logger;
use crate::options::Options;
use crate::parsers::MysqlSelectFields;
use crate::query::Query;
use crate::stats::TableStats;

pub use checks::{CostEngine, SelectedFields, COST_PER_KB_RETURNED, COST_PER_ROW_READ};
pub use errors::{ExplainError, ExplainResult};
pub use mysql::MysqlExplain;
pub use plan::PlanNode;
pub use postgres::PostgresExplain;
pub use result::{CostResult, Message, Severity};

/// One explained and scored query
#[derive(Debug)]
pub struct Explain {
    rows: Vec<PlanNode>,
    result: CostResult,
    raw_plan: Value,
}

impl Explain {
    /// Explain `query` over `conn` and score the plan
    pub fn run(
        query: &Query,
        stats: &TableStats,
        options: &Options,
        conn: &mut dyn Explainer,
    ) -> ExplainResult<Explain> {
        Self::run_sql(query.sql(), query, stats, options, conn)
    }

    fn run_sql(
        sql: &str,
        query: &Query,
        stats: &TableStats,
        options: &Options,
        conn: &mut dyn Explainer,
    ) -> ExplainResult<Explain> {
        let raw = conn.explain(sql)?;
        let rows = match conn.dialect() {
            Dialect::Mysql => MysqlExplain::transform(&raw.plan),
            Dialect::Postgres => PostgresExplain::transform(&raw.plan)?,
        };

        // the normalized SQL from SHOW WARNINGS names every selected
        // column; without it the engine falls back to whole-row widths
        let selected_fields: Option<SelectedFields> = raw
            .normalized_sql
            .as_deref()
            .map(MysqlSelectFields::parse_fields);

        let result =
            CostEngine::new(&rows, stats, options, query, selected_fields.as_ref()).run();

        Ok(Explain {
            rows,
            result,
            raw_plan: raw.plan,
        })
    }

    pub fn cost(&self) -> f64 {
        self.result.cost
    }

    pub fn severity(&self) -> Severity {
        self.result.severity()
    }

    pub fn result(&self) -> &CostResult {
        &self.result
    }

    pub fn messages(&self) -> &[Message] {
        &self.result.messages
    }

    pub fn rows(&self) -> &[PlanNode] {
        &self.rows
    }

    pub fn raw_plan(&self) -> &Value {
        &self.raw_plan
    }

    /// First table the plan touches
    pub fn table(&self) -> Option<&str> {
        self.rows.iter().find_map(|r| r.table.as_deref())
    }

    /// Alternate plans forced through each index the planner considered
    /// but did not choose. MySQL only; a key the server refuses (dropped
    /// since the plan was captured) is skipped silently, any other
    /// explain failure is logged and that alternate is dropped.
    pub fn other_paths(
        &self,
        query: &Query,
        stats: &TableStats,
        options: &Options,
        conn: &mut dyn Explainer,
    ) -> Vec<Explain> {
        if !conn.dialect().is_mysql() {
            return Vec::new();
        }

        let mut alternates = Vec::new();
        for row in &self.rows {
            let (Some(table), Some(possible)) = (row.table.as_deref(), row.possible_keys.as_deref())
            else {
                continue;
            };
            for key in possible {
                if Some(key.as_str()) == row.key.as_deref() {
                    continue;
                }
                let Some(sql) = force_index_sql(query.sql(), table, key) else {
                    continue;
                };
                match Self::run_sql(&sql, query, stats, options, conn) {
                    Ok(explain) => alternates.push(explain),
                    // MySQL lists possible keys it then refuses to force
                    Err(ExplainError::Connection(e)) if e.is_missing_key() => {}
                    Err(e) => Logger::warn(
                        "alternate_explain_failed",
                        &[("key", key), ("error", &e.to_string())],
                    ),
                }
            }
        }
        alternates
    }
}

// rewrite `... from `tbl` ...` as `... from tbl FORCE INDEX (`key`) ...`
fn force_index_sql(sql: &str, table: &str, key: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?i)\bfrom\s+`?([a-zA-Z0-9_]+)`?").unwrap());
    let captures = re.captures(sql)?;
    if captures.get(1)?.as_str() != table {
        return None;
    }
    let matched = captures.get(0)?;
    let mut out = String::with_capacity(sql.len() + key.len() + 16);
    out.push_str(&sql[..matched.end()]);
    out.push_str(&format!(" FORCE INDEX (`{}`)", key));
    out.push_str(&sql[matched.end()..]);
    Some(out)
}
