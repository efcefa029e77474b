//! In-memory statistics model
//!
//! Tables own indexes, indexes own an ordered sequence of columns (an
//! index is a composite key, column order matters). Facts arrive one
//! index column at a time; `resolve` runs once after loading and fills
//! in everything derivable, after which the model is read-only.

use std::collections::BTreeMap;

/// One column of an index, with its observed cardinality and the
/// derived rows-per-distinct-value estimate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    /// Distinct-value count as reported by the engine
    pub cardinality: Option<u64>,
    /// Expected rows sharing one value of the index prefix ending here
    pub rows_per: Option<u64>,
}

/// A (possibly composite) key on a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    pub name: String,
    pub unique: bool,
    pub columns: Vec<Column>,
}

/// Statistics for one table
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    pub name: String,
    /// Estimated or known row total; None until resolved
    pub count: Option<u64>,
    pub indexes: BTreeMap<String, Index>,
    /// Estimated byte widths for columns we know about
    pub column_sizes: BTreeMap<String, u64>,
}

/// The statistics model for one analysis run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    tables: BTreeMap<String, Table>,
}

impl IndexStats {
    pub fn new() -> Self {
        IndexStats::default()
    }

    /// Record one index-column fact. Idempotent upsert; creates the
    /// table and index lazily. A unique index's cardinality doubles as
    /// the row count when none is known yet.
    pub fn add_index_column(
        &mut self,
        table: &str,
        index_name: &str,
        column_name: &str,
        cardinality: Option<u64>,
        is_unique: bool,
    ) {
        let tbl = self
            .tables
            .entry(table.to_string())
            .or_insert_with(|| Table {
                name: table.to_string(),
                ..Table::default()
            });

        let idx = tbl
            .indexes
            .entry(index_name.to_string())
            .or_insert_with(|| Index {
                name: index_name.to_string(),
                unique: is_unique,
                columns: Vec::new(),
            });
        idx.unique = is_unique;

        match idx.columns.iter_mut().find(|c| c.name == column_name) {
            Some(col) => col.cardinality = cardinality,
            None => idx.columns.push(Column {
                name: column_name.to_string(),
                cardinality,
                rows_per: None,
            }),
        }

        if is_unique && tbl.count.is_none() {
            tbl.count = cardinality;
        }
    }

    /// Record the estimated byte width of a table column
    pub fn set_column_size(&mut self, table: &str, column: &str, bytes: u64) {
        let tbl = self
            .tables
            .entry(table.to_string())
            .or_insert_with(|| Table {
                name: table.to_string(),
                ..Table::default()
            });
        tbl.column_sizes.insert(column.to_string(), bytes);
    }

    /// Force a table's row count (used by the fuzzer's size guesses)
    pub fn set_table_count(&mut self, table: &str, count: u64) {
        let tbl = self
            .tables
            .entry(table.to_string())
            .or_insert_with(|| Table {
                name: table.to_string(),
                ..Table::default()
            });
        tbl.count = Some(count);
    }

    /// Derive everything derivable, once, after loading:
    /// - a table with no unique index falls back to the max cardinality
    ///   observed across its indexes
    /// - each column's `rows_per` becomes `max(1, count / cardinality)`,
    ///   or 1 when the table is empty
    ///
    /// Columns loaded with an authoritative `rows_per` keep it.
    /// Idempotent; the model is treated as immutable afterwards.
    pub fn resolve(&mut self) {
        for tbl in self.tables.values_mut() {
            if tbl.count.is_none() {
                tbl.count = tbl
                    .indexes
                    .values()
                    .flat_map(|i| i.columns.iter())
                    .filter_map(|c| c.cardinality)
                    .max();
            }

            let count = tbl.count;
            for idx in tbl.indexes.values_mut() {
                for col in idx.columns.iter_mut() {
                    if col.rows_per.is_some() {
                        continue;
                    }
                    col.rows_per = match (count, col.cardinality) {
                        (Some(0), _) => Some(1),
                        (Some(n), Some(0)) => Some(n.max(1)),
                        (Some(n), Some(c)) => Some((n / c).max(1)),
                        _ => None,
                    };
                }
            }
        }
    }

    /// Row count for a table, None when the table is unknown
    pub fn table_count(&self, table: &str) -> Option<u64> {
        self.tables.get(table).and_then(|t| t.count)
    }

    /// Rows-per-value for the chosen key, keyed off the last used
    /// column of the prefix. Longer used prefixes imply higher
    /// selectivity, but this model only consults the final column's
    /// cardinality; composite-prefix cardinality is not modeled.
    pub fn estimate_key(&self, table: &str, key: &str, used_parts: &[String]) -> Option<u64> {
        let idx = self.tables.get(table)?.indexes.get(key)?;
        let last = used_parts.last()?;
        idx.columns
            .iter()
            .find(|c| &c.name == last)
            .and_then(|c| c.rows_per)
    }

    /// Estimated byte width of one column, when known
    pub fn column_size(&self, table: &str, column: &str) -> Option<u64> {
        self.tables
            .get(table)
            .and_then(|t| t.column_sizes.get(column))
            .copied()
    }

    /// Summed byte width of every known column, None when no widths
    /// were observed for the table
    pub fn row_size(&self, table: &str) -> Option<u64> {
        let table = self.tables.get(table)?;
        if table.column_sizes.is_empty() {
            return None;
        }
        Some(table.column_sizes.values().sum())
    }

    /// True when any fact about this table was observed
    pub fn has_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    /// All tables in the model
    pub fn tables(&self) -> &BTreeMap<String, Table> {
        &self.tables
    }

    /// Mutable access for builders (fuzzer, snapshot loader)
    pub(crate) fn tables_mut(&mut self) -> &mut BTreeMap<String, Table> {
        &mut self.tables
    }
}

/// Layered statistics: an explicit snapshot wins over fuzzed guesses,
/// manual overrides beat both for the fuzzed-or-not question.
#[derive(Debug, Clone, Default)]
pub struct TableStats {
    snapshot: IndexStats,
    fuzzed: IndexStats,
    manual: IndexStats,
}

impl TableStats {
    pub fn new(snapshot: IndexStats, fuzzed: IndexStats, manual: IndexStats) -> Self {
        TableStats {
            snapshot,
            fuzzed,
            manual,
        }
    }

    /// Statistics from a snapshot only, nothing synthesized
    pub fn from_snapshot(snapshot: IndexStats) -> Self {
        TableStats {
            snapshot,
            ..TableStats::default()
        }
    }

    fn ask_each<T>(&self, f: impl Fn(&IndexStats) -> Option<T>) -> Option<T> {
        f(&self.snapshot).or_else(|| f(&self.fuzzed))
    }

    /// Row count for a table, preferring observed statistics
    pub fn table_count(&self, table: &str) -> Option<u64> {
        self.ask_each(|s| s.table_count(table))
    }

    /// Rows-per-value for a chosen key prefix
    pub fn estimate_key(&self, table: &str, key: &str, used_parts: &[String]) -> Option<u64> {
        self.ask_each(|s| s.estimate_key(table, key, used_parts))
    }

    /// Estimated byte width of one column
    pub fn column_size(&self, table: &str, column: &str) -> Option<u64> {
        self.ask_each(|s| s.column_size(table, column))
    }

    /// Summed byte width of every known column of a table
    pub fn row_size(&self, table: &str) -> Option<u64> {
        self.ask_each(|s| s.row_size(table))
    }

    /// True when this table's numbers were synthesized, not observed;
    /// lets a reader discount the estimate
    pub fn fuzzed(&self, table: &str) -> bool {
        !self.snapshot.has_table(table)
            && !self.manual.has_table(table)
            && self.fuzzed.has_table(table)
    }
}
