//! Statistics snapshots
//!
//! Two on-disk shapes:
//! - a structured JSON document,
//!   `table -> { count, column_sizes, indexes: { name -> { unique, columns } } }`,
//!   loadable with no live connection
//! - a raw tab-separated dump of MySQL `information_schema.statistics`
//!   (header line first), the format `mysql --batch` produces
//!
//! Saving always goes through the structured form.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::{StatsError, StatsResult};
use super::model::{Column, Index, IndexStats, Table};

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotColumn {
    column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cardinality: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rows_per: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotIndex {
    unique: bool,
    columns: Vec<SnapshotColumn>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotTable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    count: Option<u64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    column_sizes: BTreeMap<String, u64>,
    #[serde(default)]
    indexes: BTreeMap<String, SnapshotIndex>,
}

/// Loader/saver for statistics snapshots
pub struct Snapshot;

impl Snapshot {
    /// Load a structured JSON snapshot; the returned model is resolved
    pub fn load_json(path: &Path) -> StatsResult<IndexStats> {
        let text = fs::read_to_string(path).map_err(|e| StatsError::io(path, e))?;
        let doc: BTreeMap<String, SnapshotTable> =
            serde_json::from_str(&text).map_err(|e| StatsError::malformed(path, e))?;

        let mut stats = IndexStats::new();
        for (name, tbl) in doc {
            let table = Table {
                name: name.clone(),
                count: tbl.count,
                column_sizes: tbl.column_sizes,
                indexes: tbl
                    .indexes
                    .into_iter()
                    .map(|(iname, idx)| {
                        (
                            iname.clone(),
                            Index {
                                name: iname,
                                unique: idx.unique,
                                columns: idx
                                    .columns
                                    .into_iter()
                                    .map(|c| Column {
                                        name: c.column,
                                        cardinality: c.cardinality,
                                        rows_per: c.rows_per,
                                    })
                                    .collect(),
                            },
                        )
                    })
                    .collect(),
            };
            stats.tables_mut().insert(name, table);
        }
        stats.resolve();
        Ok(stats)
    }

    /// Save the structured JSON snapshot
    pub fn save_json(stats: &IndexStats, path: &Path) -> StatsResult<()> {
        let doc: BTreeMap<String, SnapshotTable> = stats
            .tables()
            .iter()
            .map(|(name, tbl)| {
                (
                    name.clone(),
                    SnapshotTable {
                        count: tbl.count,
                        column_sizes: tbl.column_sizes.clone(),
                        indexes: tbl
                            .indexes
                            .iter()
                            .map(|(iname, idx)| {
                                (
                                    iname.clone(),
                                    SnapshotIndex {
                                        unique: idx.unique,
                                        columns: idx
                                            .columns
                                            .iter()
                                            .map(|c| SnapshotColumn {
                                                column: c.name.clone(),
                                                cardinality: c.cardinality,
                                                rows_per: c.rows_per,
                                            })
                                            .collect(),
                                    },
                                )
                            })
                            .collect(),
                    },
                )
            })
            .collect();

        let text = serde_json::to_string_pretty(&doc)
            .map_err(|e| StatsError::malformed(path, e))?;
        fs::write(path, text).map_err(|e| StatsError::io(path, e))
    }

    /// Load a tab-separated `information_schema.statistics` dump.
    /// The header line names the columns; only `table_name`,
    /// `index_name`, `column_name`, `cardinality` and `non_unique` are
    /// consumed. The returned model is resolved.
    pub fn load_tsv(path: &Path) -> StatsResult<IndexStats> {
        let text = fs::read_to_string(path).map_err(|e| StatsError::io(path, e))?;
        let mut lines = text.lines();

        let header = lines
            .next()
            .ok_or_else(|| StatsError::bad_catalog_dump(path, "empty file"))?;
        let headers: Vec<String> = header
            .split('\t')
            .map(|h| h.trim().to_ascii_lowercase())
            .collect();

        let col = |name: &str| headers.iter().position(|h| h == name);
        let (Some(table_i), Some(index_i), Some(column_i), Some(card_i), Some(nonuniq_i)) = (
            col("table_name"),
            col("index_name"),
            col("column_name"),
            col("cardinality"),
            col("non_unique"),
        ) else {
            return Err(StatsError::bad_catalog_dump(
                path,
                "missing one of table_name/index_name/column_name/cardinality/non_unique",
            ));
        };

        let mut stats = IndexStats::new();
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            let row: Vec<&str> = line.split('\t').map(str::trim).collect();
            if row.len() != headers.len() {
                return Err(StatsError::bad_catalog_dump(
                    path,
                    format!("row has {} fields, header has {}", row.len(), headers.len()),
                ));
            }

            let cardinality = row[card_i].parse::<u64>().ok();
            let unique = row[nonuniq_i] == "0";
            stats.add_index_column(row[table_i], row[index_i], row[column_i], cardinality, unique);
        }
        stats.resolve();
        Ok(stats)
    }
}
