//! Rule pipeline assigning a cost score to a normalized plan
//!
//! Two explicit ordered tables of check functions: query-level checks
//! run once against the whole plan, node-level checks run per access
//! node. A check that settles a cost stops its pipeline stage; `cost`
//! on the result only ever grows. Every cost contribution leaves a
//! tagged message, so a report can always show its arithmetic.

use std::collections::BTreeMap;

use crate::options::Options;
use crate::query::Query;
use crate::stats::TableStats;

use super::plan::{PlanNode, ACCESS_ALL, ACCESS_INDEX};
use super::result::{CostResult, Message};

/// Cost of examining one row
pub const COST_PER_ROW_READ: f64 = 2.5e-7;
/// Cost of shipping one kilobyte to the client
pub const COST_PER_KB_RETURNED: f64 = 2.5e-5;
/// A full table scan never scores below this, however small the table
pub const TABLESCAN_COST_FLOOR: f64 = 0.01;

// width guesses when the statistics carry no column sizes
const DEFAULT_COLUMN_BYTES: u64 = 8;
const DEFAULT_ROW_BYTES: u64 = 100;

const SHORTCIRCUIT_PHRASES: &[&str] = &[
    "No tables used",
    "Impossible WHERE",
    "Select tables optimized away",
    "No matching min/max row",
];

/// Selected columns per table, from the normalized-SQL projection
pub type SelectedFields = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Continue,
    Stop,
}

type QueryCheck = fn(&CostEngine<'_>, &mut CostResult) -> Control;
type NodeCheck = fn(&mut NodeChecks<'_, '_>);

// closures rather than method paths so the pointers stay generic over
// the engine's borrow lifetimes
const QUERY_CHECKS: &[QueryCheck] = &[
    |engine, result| engine.check_ignored(result),
    |engine, result| engine.check_no_matching_const_row(result),
    |engine, result| engine.check_query_shortcircuit(result),
    |engine, result| engine.check_fuzzed_data(result),
];

const NODE_CHECKS: &[NodeCheck] = &[
    |node| node.check_limited_scan(),
    |node| node.check_derived(),
    |node| node.tag_query_type(),
    |node| node.check_join(),
    |node| node.check_key_size(),
];

/// Scores one normalized plan against table statistics
pub struct CostEngine<'a> {
    rows: &'a [PlanNode],
    stats: &'a TableStats,
    options: &'a Options,
    query: &'a Query,
    selected_fields: Option<&'a SelectedFields>,
}

impl<'a> CostEngine<'a> {
    pub fn new(
        rows: &'a [PlanNode],
        stats: &'a TableStats,
        options: &'a Options,
        query: &'a Query,
        selected_fields: Option<&'a SelectedFields>,
    ) -> Self {
        CostEngine {
            rows,
            stats,
            options,
            query,
            selected_fields,
        }
    }

    /// Run the full pipeline and return the scored result
    pub fn run(&self) -> CostResult {
        let mut result = CostResult::default();

        for check in QUERY_CHECKS {
            if check(self, &mut result) == Control::Stop {
                return result;
            }
        }

        for index in 0..self.rows.len() {
            let mut node = NodeChecks::new(self, index, &mut result);
            node.run();
            if node.query_done {
                return result;
            }
        }

        self.check_return_size(&mut result);
        result
    }

    fn first_extra(&self) -> Option<&str> {
        self.rows.first().and_then(|r| r.extra.as_deref())
    }

    fn check_ignored(&self, result: &mut CostResult) -> Control {
        if self.options.ignored(self.query.backtrace()) {
            result.messages.push(Message::tagged("ignored"));
            return Control::Stop;
        }
        Control::Continue
    }

    fn check_no_matching_const_row(&self, result: &mut CostResult) -> Control {
        let hit = self
            .first_extra()
            .map(|e| e.contains("no matching row in const table"))
            .unwrap_or(false);
        if hit {
            // a const lookup that found nothing: one primary-key probe
            result.messages.push(Message {
                tag: "access_type_const".to_string(),
                table: self.query.from_table().map(str::to_string),
                index: Some("PRIMARY".to_string()),
                ..Message::default()
            });
            return Control::Stop;
        }
        Control::Continue
    }

    fn check_query_shortcircuit(&self, result: &mut CostResult) -> Control {
        let hit = self
            .first_extra()
            .map(|e| SHORTCIRCUIT_PHRASES.iter().any(|p| e.contains(p)))
            .unwrap_or(false);
        if hit {
            result.messages.push(Message {
                tag: "query_shortcircuit".to_string(),
                detail: self.first_extra().map(str::to_string),
                ..Message::default()
            });
            return Control::Stop;
        }
        Control::Continue
    }

    fn check_fuzzed_data(&self, result: &mut CostResult) -> Control {
        let mut seen: Vec<&str> = Vec::new();
        for row in self.rows {
            let Some(table) = row.table.as_deref() else {
                continue;
            };
            if seen.contains(&table) || !self.stats.fuzzed(table) {
                continue;
            }
            seen.push(table);
            result.messages.push(Message {
                tag: "fuzzed_data".to_string(),
                table: Some(table.to_string()),
                table_size: self.stats.table_count(table),
                ..Message::default()
            });
        }
        Control::Continue
    }

    // Once per query: charge for shipping the result set back
    fn check_return_size(&self, result: &mut CostResult) {
        let rows_returned = if let Some(limit) = self.query.limit() {
            limit.min(result.result_size)
        } else if self.query.aggregate() {
            1
        } else {
            result.result_size
        };

        let bytes = rows_returned * self.row_width();
        let cost = bytes as f64 / 1024.0 * COST_PER_KB_RETURNED;
        result.cost += cost;
        result.messages.push(Message {
            tag: "return_size".to_string(),
            cost: Some(cost),
            result_rows: Some(rows_returned),
            result_bytes: Some(bytes),
            ..Message::default()
        });
    }

    fn row_width(&self) -> u64 {
        if let Some(fields) = self.selected_fields {
            if !fields.is_empty() {
                return fields
                    .iter()
                    .flat_map(|(table, columns)| {
                        columns.iter().map(move |c| {
                            self.stats
                                .column_size(table, c)
                                .unwrap_or(DEFAULT_COLUMN_BYTES)
                        })
                    })
                    .sum();
            }
        }
        // no projection info: assume the whole row of the lead table
        self.query
            .from_table()
            .and_then(|t| self.stats.row_size(t))
            .unwrap_or(DEFAULT_ROW_BYTES)
    }
}

/// Per-node pipeline state
struct NodeChecks<'a, 'r> {
    engine: &'a CostEngine<'a>,
    row: &'a PlanNode,
    result: &'r mut CostResult,
    access_label: Option<String>,
    join_to: Option<String>,
    cost: Option<f64>,
    query_done: bool,
}

impl<'a, 'r> NodeChecks<'a, 'r> {
    fn new(engine: &'a CostEngine<'a>, index: usize, result: &'r mut CostResult) -> Self {
        NodeChecks {
            engine,
            row: &engine.rows[index],
            result,
            access_label: None,
            join_to: None,
            cost: None,
            query_done: false,
        }
    }

    fn run(&mut self) {
        for check in NODE_CHECKS {
            check(self);
            if self.cost.is_some() {
                break;
            }
        }
    }

    fn table(&self) -> Option<&str> {
        self.row.table.as_deref()
    }

    fn table_size(&self) -> Option<u64> {
        self.table().and_then(|t| self.engine.stats.table_count(t))
    }

    fn add_message(&mut self, tag: &str, extra: Message) {
        self.result.messages.push(Message {
            tag: tag.to_string(),
            table: self.table().map(str::to_string),
            table_size: self.table_size(),
            ..extra
        });
    }

    fn simple_table_scan(&self) -> Option<u64> {
        let sql = self.engine.query.sql();
        let has_where = where_re().is_match(sql);
        let has_order = order_by_re().is_match(sql);
        if self.engine.rows.len() == 1
            && (self.row.using_index || !has_where)
            && (self.row.access_type.as_deref() == Some(ACCESS_INDEX) || !has_order)
        {
            self.engine.query.limit()
        } else {
            None
        }
    }

    // LIMIT N over a scan with nothing to filter or sort reads N rows
    // and stops, however big the table
    fn check_limited_scan(&mut self) {
        let Some(limit) = self.simple_table_scan() else {
            return;
        };
        let rows_read = match self.table_size() {
            Some(size) => limit.min(size),
            None => limit,
        };
        let cost = rows_read as f64 * COST_PER_ROW_READ;
        self.result.cost = cost;
        self.result.messages.push(Message {
            tag: "limited_scan".to_string(),
            table: self.table().map(str::to_string),
            cost: Some(cost),
            rows_read: Some(rows_read),
            ..Message::default()
        });
        self.cost = Some(cost);
        self.query_done = true;
    }

    fn check_derived(&mut self) {
        if self.row.is_derived() {
            // select count(*) from (select ... from real_table ...):
            // the inner nodes carry the real cost
            self.add_message("derived_table", Message::default());
            self.cost = Some(0.0);
        }
    }

    fn tag_query_type(&mut self) {
        let Some(access) = self.row.access_type.as_deref() else {
            self.cost = Some(0.0);
            return;
        };
        let access = if access == ACCESS_ALL { "tablescan" } else { access };
        self.access_label = Some(format!("access_type_{}", access));
    }

    fn check_join(&mut self) {
        let Some(refs) = self.row.join_ref.as_deref() else {
            return;
        };
        if let Some(label) = self.access_label.take() {
            self.access_label = Some(label.replacen("access_type", "join_type", 1));
        }
        if let Some(outer) = refs.iter().find(|r| r.as_str() != "const") {
            self.join_to = outer_table(outer).map(str::to_string);
        }
    }

    fn check_key_size(&mut self) {
        let tablescan = self.access_label.as_deref() == Some("access_type_tablescan");
        let index_scan = self.access_label.as_deref() == Some("access_type_index");

        let key_size = if index_scan {
            // a scan over the whole index still touches every row
            self.table_size()
        } else if let Some(key) = self.row.key.as_deref() {
            self.table().and_then(|t| {
                self.engine
                    .stats
                    .estimate_key(t, key, &self.row.used_key_parts)
            })
        } else {
            self.table_size()
        };
        // unknown tables and unmodeled index merges land here
        let key_size = key_size.unwrap_or(1);

        let rows_read = if self.row.join_ref.is_some() {
            // joining reads key_size rows per row already in hand,
            // capped at the table itself
            let cap = self.table_size().unwrap_or(1 << 32);
            let read = self.result.result_size.saturating_mul(key_size).min(cap);
            self.result.result_size = self.result.result_size.saturating_mul(key_size);
            read
        } else {
            self.result.result_size = self.result.result_size.saturating_add(key_size);
            key_size
        };

        let mut cost = rows_read as f64 * COST_PER_ROW_READ;
        if tablescan {
            cost = cost.max(TABLESCAN_COST_FLOOR);
        }
        self.result.cost += cost;

        let label = self
            .access_label
            .clone()
            .unwrap_or_else(|| "access_type_unknown".to_string());
        self.add_message(
            &label,
            Message {
                cost: Some(cost),
                rows_read: Some(rows_read),
                index: self.row.key.clone(),
                index_used: self.row.used_key_parts.clone(),
                join_to: self.join_to.clone(),
                ..Message::default()
            },
        );
        self.cost = Some(cost);
    }
}

// join refs arrive as `db.table.column` from MySQL and `table.column`
// from Postgres
fn outer_table(join_ref: &str) -> Option<&str> {
    let parts: Vec<&str> = join_ref.split('.').collect();
    match parts.len() {
        3 => Some(parts[1]),
        2 => Some(parts[0]),
        _ => None,
    }
}

fn where_re() -> &'static regex::Regex {
    static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"(?i)\s+WHERE\s+").unwrap())
}

fn order_by_re() -> &'static regex::Regex {
    static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"(?i)order\s+by").unwrap())
}
