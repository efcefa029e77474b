//! Synthesized statistics for near-empty databases
//!
//! Development and test databases rarely carry usable cardinality, so
//! the fuzzer invents sizes instead: tables with many indexes are
//! assumed big, the rest small. The guesses rank tables surprisingly
//! well; the cost engine flags every estimate built from them as
//! low-confidence.

use crate::connection::{ConnectionResult, Explainer};

use super::model::IndexStats;

const BIG_FUZZ_SIZE: u64 = 5_000;
const SMALL_FUZZ_SIZE: u64 = 100;

/// Builds a fully synthesized statistics model from a live schema
pub struct Fuzzer;

impl Fuzzer {
    /// Fetch the schema's indexes and invent table sizes for them
    pub fn fuzz(conn: &mut dyn Explainer) -> ConnectionResult<IndexStats> {
        let mut stats = Self::fetch_indexes(conn)?;
        let sizes = Self::guess_table_sizes(conn)?;

        for (name, table) in stats.tables_mut().iter_mut() {
            if let Some((_, size)) = sizes.iter().find(|(t, _)| t == name) {
                table.count = Some(*size);
            }
            for index in table.indexes.values_mut() {
                let rows_per = if index.unique { 1 } else { 2 };
                for column in index.columns.iter_mut() {
                    column.rows_per = Some(rows_per);
                }
            }
        }

        stats.resolve();
        Ok(stats)
    }

    fn fetch_indexes(conn: &mut dyn Explainer) -> ConnectionResult<IndexStats> {
        let mut stats = IndexStats::new();
        for rec in conn.fetch_indexes()? {
            stats.add_index_column(
                &rec.table_name,
                &rec.index_name,
                &rec.column_name,
                Some(rec.cardinality),
                rec.unique,
            );
        }
        Ok(stats)
    }

    // Fake table sizes from index counts: tables at or above the 90th
    // percentile of index count get BIG_FUZZ_SIZE rows, the rest
    // SMALL_FUZZ_SIZE.
    fn guess_table_sizes(conn: &mut dyn Explainer) -> ConnectionResult<Vec<(String, u64)>> {
        let counts = conn.count_indexes_by_table()?;
        if counts.is_empty() {
            return Ok(Vec::new());
        }

        // rounds down so small schemas don't blow up
        let large_table_idx = (counts.len() as f64 * 0.9).floor() as usize;
        let large_table_index_count = counts[large_table_idx.min(counts.len() - 1)].index_count;

        Ok(counts
            .iter()
            .map(|c| {
                let index_count = c.index_count.max(1);
                let size = if index_count >= large_table_index_count {
                    BIG_FUZZ_SIZE
                } else {
                    SMALL_FUZZ_SIZE
                };
                (c.table_name.clone(), size)
            })
            .collect())
    }
}
